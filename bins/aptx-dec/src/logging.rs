//! 日志初始化模块.
//!
//! stdout 被数据流占用, 全部诊断输出到 stderr.
//! 级别由 -v/-vv 或 APTX_LOG 环境变量控制, 默认 info.

use tracing_subscriber::EnvFilter;

/// 初始化日志系统
///
/// - `verbosity`: 0=info, 1=debug, 2+=trace (由 -v/-vv 控制)
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("APTX_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
