use ladle_core::{Connection, Error, Pool, Result, lock};
use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::Semaphore;

/// Pool over a fixed set of already opened connections, counting grabs and releases.
pub struct QueuePool<C: Connection> {
    idle: Mutex<Vec<C>>,
    permits: Semaphore,
    grabs: AtomicUsize,
    releases: AtomicUsize,
}

impl<C: Connection> QueuePool<C> {
    pub fn new(connections: impl IntoIterator<Item = C>) -> Self {
        let idle: Vec<C> = connections.into_iter().collect();
        Self {
            permits: Semaphore::new(idle.len()),
            idle: Mutex::new(idle),
            grabs: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    pub fn idle(&self) -> usize {
        lock(&self.idle).len()
    }

    pub fn grabs(&self) -> usize {
        self.grabs.load(Ordering::Relaxed)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::Relaxed)
    }
}

impl<C: Connection> Pool for QueuePool<C> {
    type Connection = C;

    async fn grab(&self) -> Result<C> {
        self.permits.acquire().await?.forget();
        let connection = lock(&self.idle)
            .pop()
            .ok_or_else(|| Error::msg("No idle connection left in the pool"))?;
        self.grabs.fetch_add(1, Ordering::Relaxed);
        Ok(connection)
    }

    fn release(&self, connection: C) {
        lock(&self.idle).push(connection);
        self.releases.fetch_add(1, Ordering::Relaxed);
        self.permits.add_permits(1);
    }
}
