//! 日誌初始化
//!
//! 函式庫本身只發出 `tracing` 事件，由執行檔決定輸出方式。

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日誌
///
/// 讀取 `RUST_LOG`（預設 `info`），例如 `RUST_LOG=cutplan_optimizer=debug`。
///
/// ```no_run
/// cutplan::logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();
}

/// 測試用：輸出到測試擷取，可重複呼叫
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
