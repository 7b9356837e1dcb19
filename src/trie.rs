// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由段前缀树
//!
//! 只保存包含捕获段的路由模式。模式按 `/` 切分，每一段成为一个节点：
//! 字面段存放在以文本为键的子节点表中，捕获段存放在唯一的参数子节点槽位里。
//! 例如 `/user/:user_id/message/:message_id` 得到
//! `user -> :user_id -> message -> :message_id`。
//!
//! 解析时每一层优先匹配字面子节点，其次才是参数子节点，并且不回溯：
//! 字面分支在更深处走不通时，不会回到上层改走参数分支。

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    context::Params,
    exception::ConfigError,
    param::CAPTURE_MARKER,
    util::split_segments,
};

lazy_static! {
    /// 捕获名必须由字母、数字或下划线组成
    static ref CAPTURE_NAME: Regex = Regex::new(r"^\w+$").unwrap_or_else(|e| panic!("捕获名正则非法：{}", e));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Root,
    Static,
    Param,
}

#[derive(Debug)]
struct TrieNode {
    kind: NodeKind,
    /// 字面段的文本，或参数段的捕获名
    segment: String,
    children: HashMap<String, TrieNode>,
    param: Option<Box<TrieNode>>,
}

impl TrieNode {
    fn new(kind: NodeKind, segment: &str) -> Self {
        Self {
            kind,
            segment: segment.to_string(),
            children: HashMap::new(),
            param: None,
        }
    }

    /// 把本节点在规范模式中的文本追加到 `pattern`
    fn push_pattern(&self, pattern: &mut String) {
        match self.kind {
            NodeKind::Root => {}
            NodeKind::Static => {
                pattern.push('/');
                pattern.push_str(&self.segment);
            }
            NodeKind::Param => {
                pattern.push('/');
                pattern.push(CAPTURE_MARKER);
                pattern.push_str(&self.segment);
            }
        }
    }
}

/// 一次成功解析的结果：规范模式与捕获参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrieMatch {
    pub pattern: String,
    pub params: Params,
}

/// 参数化路由的前缀树
#[derive(Debug)]
pub struct SegmentTrie {
    root: TrieNode,
}

impl Default for SegmentTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentTrie {
    pub fn new() -> Self {
        Self {
            root: TrieNode::new(NodeKind::Root, "/"),
        }
    }

    /// 把路由模式插入前缀树。
    ///
    /// 沿途已存在的节点会被复用，缺失的节点才会创建。同一深度上已经存在
    /// 名称不同的参数子节点时返回 [`ConfigError::ConflictingParam`]。
    pub fn insert(&mut self, pattern: &str) -> Result<(), ConfigError> {
        let mut node = &mut self.root;
        for segment in split_segments(pattern) {
            node = match segment.strip_prefix(CAPTURE_MARKER) {
                Some(name) => {
                    if !CAPTURE_NAME.is_match(name) {
                        return Err(ConfigError::InvalidPattern {
                            pattern: pattern.to_string(),
                            reason: format!("capture name \"{}\" must match \\w+", name),
                        });
                    }
                    let child = node
                        .param
                        .get_or_insert_with(|| Box::new(TrieNode::new(NodeKind::Param, name)));
                    if child.segment != name {
                        return Err(ConfigError::ConflictingParam {
                            pattern: pattern.to_string(),
                            existing: child.segment.clone(),
                            requested: name.to_string(),
                        });
                    }
                    child.as_mut()
                }
                None => node
                    .children
                    .entry(segment.to_string())
                    .or_insert_with(|| TrieNode::new(NodeKind::Static, segment)),
            };
        }
        Ok(())
    }

    /// 逐段解析请求路径，返回规范模式与捕获参数。
    ///
    /// 根路径或任意一层无法继续时返回 `None`。调用方仍需确认该模式
    /// 在路由表中存在。
    pub fn resolve(&self, path: &str) -> Option<TrieMatch> {
        let mut node = &self.root;
        let mut pattern = String::new();
        let mut params = Params::new();

        for segment in split_segments(path) {
            node = node
                .children
                .get(segment)
                .or_else(|| node.param.as_deref())?;
            if node.kind == NodeKind::Param {
                params.insert(&node.segment, segment);
            }
            node.push_pattern(&mut pattern);
        }

        if node.kind == NodeKind::Root {
            return None;
        }
        Some(TrieMatch { pattern, params })
    }
}
