use crate::{Connection, Result};
use std::future::Future;

/// A bounded set of reusable connections.
///
/// How connections are admitted, queued and recycled is up to the implementation,
/// the provider only relies on this acquire/release contract.
pub trait Pool: Send + Sync + 'static {
    type Connection: Connection;

    /// Acquire a connection, waiting if the pool is exhausted.
    fn grab(&self) -> impl Future<Output = Result<Self::Connection>> + Send;

    /// Give the connection back. Must not lose the connection, even on failure.
    fn release(&self, connection: Self::Connection);
}
