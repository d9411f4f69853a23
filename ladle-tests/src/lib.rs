mod journal;
mod pool;
mod queue_pool;
mod script;

pub use journal::*;
pub use pool::*;
pub use queue_pool::*;
pub use script::*;

use ladle_core::{Context, CursorProvider, RowLabeled, Value};
use log::LevelFilter;
use std::{env, sync::Arc};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        let result = { $($code)+ };
        log::set_max_level(level);
        result
    }};
}

/// Provider over a [`TestPool`] with the default parameter check and error formatter.
pub fn provider(pool: TestPool) -> CursorProvider<TestPool> {
    CursorProvider::new(Context::new(pool))
}

/// Single column rows labeled `n`, with values `1..=count`.
pub fn numbered_rows(count: i64) -> Vec<RowLabeled> {
    let labels: Arc<[String]> = Arc::new(["n".to_string()]);
    (1..=count)
        .map(|n| RowLabeled::new(labels.clone(), Box::new([Value::Int64(n)])))
        .collect()
}
