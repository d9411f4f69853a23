mod context;
mod cursor;
mod driver;
mod error;
mod parameters;
mod pool;
mod provider;
mod raw_cursor;
mod row;
mod util;
mod value;

pub use ::anyhow::Context as ErrorContext;
pub use context::*;
pub use cursor::*;
pub use driver::*;
pub use error::*;
pub use parameters::*;
pub use pool::*;
pub use provider::*;
pub use raw_cursor::*;
pub use row::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
