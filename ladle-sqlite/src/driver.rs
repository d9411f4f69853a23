use crate::SqliteConnection;
use ladle_core::{Driver, Result};
use std::{borrow::Cow, future::Future};

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl SqliteDriver {
    pub const fn new() -> Self {
        Self
    }
}

impl Driver for SqliteDriver {
    type Connection = SqliteConnection;

    const NAME: &'static str = "sqlite";

    fn connect(
        &self,
        url: Cow<'static, str>,
    ) -> impl Future<Output = Result<SqliteConnection>> + Send {
        SqliteConnection::connect(url)
    }
}
