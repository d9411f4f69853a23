use crate::{Parameters, RawCursor, Result};
use std::{borrow::Cow, future::Future};

/// A single live session to the database.
pub trait Connection: Send + 'static {
    /// Row stream produced by [`Connection::cursor`]. It must not borrow the connection.
    type Cursor: RawCursor;

    /// Start executing `sql` and return the lazy sequence of its rows.
    fn cursor(
        &mut self,
        sql: &str,
        parameters: Option<&Parameters>,
    ) -> impl Future<Output = Result<Self::Cursor>> + Send;
}

/// Backend entry point, creates connections from a URL like `name://...`.
pub trait Driver: Send + Sync {
    type Connection: Connection;

    /// Scheme expected in connection URLs.
    const NAME: &'static str;

    fn connect(
        &self,
        url: Cow<'static, str>,
    ) -> impl Future<Output = Result<Self::Connection>> + Send;
}
