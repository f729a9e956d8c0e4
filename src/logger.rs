//! 日志初始化
//!
//! 优先读取 `RUST_LOG`；未设置时 `VERBOSE_LOGGING=true` 使用 debug，否则 info。

use tracing_subscriber::EnvFilter;

/// 初始化全局日志（重复调用是安全的）
pub fn init() {
    let verbose = std::env::var("VERBOSE_LOGGING")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let fallback = if verbose { "debug" } else { "info" };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
