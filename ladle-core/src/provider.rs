use crate::{
    Connection, Context, Cursor, CursorId, Error, ErrorKind, Parameters, Pool, Result,
    cursor::{CursorState, Termination},
    future::join_all,
    lock, truncate_long,
};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

type Registry = Mutex<HashMap<CursorId, Arc<CursorState>>>;

/// A grabbed connection, given back to its pool when dropped.
///
/// Covers every way `open` can end, including its future being dropped while the
/// connection is starting the query.
struct Lease<P: Pool> {
    pool: Arc<P>,
    connection: Option<P::Connection>,
}

impl<P: Pool> Lease<P> {
    async fn cursor(
        &mut self,
        sql: &str,
        parameters: Option<&Parameters>,
    ) -> Result<<P::Connection as Connection>::Cursor> {
        match self.connection.as_mut() {
            Some(connection) => connection.cursor(sql, parameters).await,
            None => Err(Error::msg("The connection was already released")),
        }
    }
}

impl<P: Pool> Drop for Lease<P> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.pool.release(connection);
        }
    }
}

/// Opens cursors over pooled connections and keeps track of the ones still open.
///
/// A cursor is in the registry exactly as long as its connection is out of the pool.
pub struct CursorProvider<P: Pool> {
    context: Context<P>,
    items: Arc<Registry>,
    next_id: AtomicU64,
}

impl<P: Pool> CursorProvider<P> {
    pub fn new(context: Context<P>) -> Self {
        Self {
            context,
            items: Default::default(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn context(&self) -> &Context<P> {
        &self.context
    }

    /// Number of cursors still holding a connection.
    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `sql` on a connection grabbed from the pool and return its rows as a [`Cursor`].
    ///
    /// Parameters are checked before the pool is touched. If the connection cannot start
    /// the query, it goes back to the pool before the error is returned.
    pub async fn open(&self, sql: &str, parameters: Option<&Parameters>) -> Result<Cursor> {
        self.context.check.check_parameters(parameters)?;
        let pool = self.context.pool.clone();
        let connection = pool.grab().await.map_err(|e| {
            self.context
                .formatter
                .format(ErrorKind::AcquisitionFailure, e)
        })?;
        let mut lease = Lease {
            pool,
            connection: Some(connection),
        };
        let raw = match lease.cursor(sql, parameters).await {
            Ok(raw) => raw,
            Err(e) => {
                drop(lease);
                let e = e.context(format!("While opening a cursor on:\n{}", truncate_long(sql)));
                return Err(self
                    .context
                    .formatter
                    .format(ErrorKind::CursorCreationFailure, e));
            }
        };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let items = Arc::downgrade(&self.items);
        let end: Termination = Box::new(move |id| {
            if let Some(items) = items.upgrade() {
                lock(&items).remove(&id);
            }
            drop(lease);
        });
        let state = Arc::new(CursorState::new(id, Box::new(raw), end));
        lock(&self.items).insert(id, state.clone());
        log::debug!("Cursor {} opened on:\n{}", id, truncate_long(sql));
        Ok(Cursor::new(state))
    }

    /// Stop every open cursor concurrently and wait for all of them.
    ///
    /// Afterwards no cursor opened before the call holds a connection. Every cursor is
    /// stopped even if some cleanup fails, the first failure is returned.
    pub async fn close_all(&self) -> Result<()> {
        let items: Vec<_> = lock(&self.items).values().cloned().collect();
        if items.is_empty() {
            return Ok(());
        }
        log::debug!("Closing {} open cursors", items.len());
        join_all(items.iter().map(|item| item.stop()))
            .await
            .into_iter()
            .collect()
    }
}
