use num_cpus;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{debug, warn};
use std::fs::File;
use std::io::prelude::*;

use crate::exception::ConfigError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_local")]
    local: bool,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_max_request_size")]
    max_request_size: usize,
    #[serde(default = "default_compression")]
    compression: bool,
    #[serde(default = "default_compression_min_size")]
    compression_min_size: usize,
}

fn default_port() -> u16 {
    7878
}

fn default_local() -> bool {
    true
}

fn default_max_request_size() -> usize {
    65536 // 64KB
}

fn default_compression() -> bool {
    true
}

fn default_compression_min_size() -> usize {
    1024 // 1KB
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            port: default_port(),
            local: default_local(),
            worker_threads: num_cpus::get(),
            max_request_size: default_max_request_size(),
            compression: default_compression(),
            compression_min_size: default_compression_min_size(),
        }
    }

    pub fn from_toml(filename: &str) -> Result<Self, ConfigError> {
        let mut file = File::open(filename).map_err(|e| ConfigError::Io {
            path: filename.to_string(),
            detail: e.to_string(),
        })?;
        let mut str_val = String::new();
        file.read_to_string(&mut str_val).map_err(|e| ConfigError::Io {
            path: filename.to_string(),
            detail: e.to_string(),
        })?;

        let mut raw_config: Config = toml::from_str(&str_val).map_err(|e| ConfigError::Parse {
            path: filename.to_string(),
            detail: e.to_string(),
        })?;
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.max_request_size == 0 {
            warn!("max_request_size被设置为0，这将拒绝所有请求，因此该值将被改为{}。", default_max_request_size());
            raw_config.max_request_size = default_max_request_size();
        }
        debug!("配置文件{}解析完成：{:?}", filename, raw_config);
        Ok(raw_config)
    }
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn max_request_size(&self) -> usize {
        self.max_request_size
    }

    pub fn compression(&self) -> bool {
        self.compression
    }

    pub fn compression_min_size(&self) -> usize {
        self.compression_min_size
    }

    /// 测试与嵌入场景下覆盖监听端口
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_max_request_size(mut self, size: usize) -> Self {
        self.max_request_size = size;
        self
    }

    pub fn with_compression(mut self, enabled: bool, min_size: usize) -> Self {
        self.compression = enabled;
        self.compression_min_size = min_size;
        self
    }
}
