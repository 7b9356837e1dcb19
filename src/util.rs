use chrono::{DateTime, Utc};

use crate::param::STATUS_CODES;

/// 规范化请求路径：绝对形式的目标先去掉 `scheme://authority`，
/// 再去掉查询串与片段，最后去掉结尾的单个 `/`（根路径除外）。
pub fn normalize_path(target: &str) -> String {
    let target = strip_origin(target);
    let path = match target.find(|c| c == '?' || c == '#') {
        Some(idx) => &target[..idx],
        None => target,
    };
    if path.is_empty() {
        return "/".to_string();
    }
    match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        Some(_) => "/".to_string(),
        None => path.to_string(),
    }
}

/// `http://host:port/foo?x` 得到 `/foo?x`，没有路径部分时得到空串
fn strip_origin(target: &str) -> &str {
    if target.starts_with('/') {
        return target;
    }
    match target.find("://") {
        Some(idx) => {
            let rest = &target[idx + 3..];
            match rest.find(|c| c == '/' || c == '?' || c == '#') {
                Some(end) => &rest[end..],
                None => "",
            }
        }
        None => target,
    }
}

/// 按 `/` 切分路径，丢弃空段
pub fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// 路由模式的规范文本：`/` 加上非空段。`//a/b/` 与 `/a/b` 得到相同结果。
pub fn canonical_pattern(pattern: &str) -> String {
    let joined = split_segments(pattern).collect::<Vec<_>>().join("/");
    format!("/{}", joined)
}

/// 状态码对应的原因短语，未知状态码返回 `Unknown Status`
pub fn reason_phrase(code: u16) -> &'static str {
    STATUS_CODES.get(&code).copied().unwrap_or("Unknown Status")
}

/// IMF-fixdate 格式，供 `Date` 响应头使用
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
