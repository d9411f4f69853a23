use crate::{
    Error, RawCursor, Result, RowLabeled, lock,
    stream::{FusedStream, Stream, StreamExt},
};
use std::{
    fmt::{self, Debug, Formatter},
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll},
};

pub type CursorId = u64;

/// Runs when a cursor closes: deregisters it and gives its connection back.
pub(crate) type Termination = Box<dyn FnOnce(CursorId) + Send>;

struct State {
    /// `None` once closed, or while a step has it checked out.
    raw: Option<Box<dyn RawCursor>>,
    /// Taken exactly once, the cursor is closed from then on.
    end: Option<Termination>,
}

/// State shared between a [`Cursor`] and the registry of its provider.
pub(crate) struct CursorState {
    id: CursorId,
    state: Mutex<State>,
}

impl CursorState {
    pub(crate) fn new(id: CursorId, raw: Box<dyn RawCursor>, end: Termination) -> Self {
        Self {
            id,
            state: Mutex::new(State {
                raw: Some(raw),
                end: Some(end),
            }),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        lock(&self.state).end.is_none()
    }

    /// Closes the cursor and fires the termination.
    ///
    /// Returns `None` when it was already closed, otherwise the raw cursor if it was not
    /// checked out by a step in flight.
    fn terminate(&self) -> Option<Option<Box<dyn RawCursor>>> {
        let (end, raw) = {
            let mut state = lock(&self.state);
            let end = state.end.take()?;
            (end, state.raw.take())
        };
        log::trace!("Cursor {} closed", self.id);
        end(self.id);
        Some(raw)
    }

    fn checkout(&self) -> Option<Box<dyn RawCursor>> {
        let mut state = lock(&self.state);
        if state.end.is_none() {
            return None;
        }
        state.raw.take()
    }

    fn checkin(&self, raw: Box<dyn RawCursor>) {
        let mut state = lock(&self.state);
        if state.end.is_none() {
            drop(state);
            log::debug!(
                "Cursor {} was closed while reading from it, discarding the driver cursor",
                self.id
            );
            return;
        }
        state.raw = Some(raw);
    }

    pub(crate) async fn stop(&self) -> Result<()> {
        let Some(raw) = self.terminate() else {
            return Ok(());
        };
        match raw.and_then(|raw| raw.cancel()) {
            Some(cancel) => cancel.await,
            None => Ok(()),
        }
    }

    async fn fail<T>(&self, error: Error) -> Result<T> {
        let Some(raw) = self.terminate() else {
            return Err(error);
        };
        if let Some(cancel) = raw.and_then(|raw| raw.cancel()) {
            if let Err(e) = cancel.await {
                log::warn!(
                    "Cleanup of cursor {} failed while handling another error: {:#}",
                    self.id,
                    e
                );
            }
        }
        Err(error)
    }
}

/// Lazy sequence of rows over a pooled connection, returned by
/// [`CursorProvider::open`](crate::CursorProvider::open).
///
/// The connection is released exactly once, as soon as one of these happens:
/// * the rows are exhausted ([`Cursor::step`] returns `Ok(None)`, or the stream ends),
/// * [`Cursor::stop`] or [`Cursor::fail`] is called,
/// * the provider's [`close_all`](crate::CursorProvider::close_all) runs,
/// * the cursor is dropped.
///
/// Once closed every further step yields no rows.
pub struct Cursor {
    state: Arc<CursorState>,
    in_flight: Option<Box<dyn RawCursor>>,
}

impl Cursor {
    pub(crate) fn new(state: Arc<CursorState>) -> Self {
        Self {
            state,
            in_flight: None,
        }
    }

    pub fn id(&self) -> CursorId {
        self.state.id
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Advance to the next row.
    ///
    /// `Ok(None)` means no more rows: the cursor is closed and the connection released.
    /// An error from the driver leaves the cursor open, pass it to [`Cursor::fail`]
    /// (or drop the cursor) to release the connection.
    pub async fn step(&mut self) -> Result<Option<RowLabeled>> {
        self.next().await.transpose()
    }

    /// Stop early.
    ///
    /// The connection is released before the driver cursor's own cleanup runs, the
    /// returned result is the result of that cleanup. Calling it on a closed cursor does
    /// nothing.
    pub async fn stop(&mut self) -> Result<()> {
        self.park();
        self.state.stop().await
    }

    /// Abort with `error`, which is always returned unchanged.
    ///
    /// When the cursor is still open it is closed first and the driver cursor cleanup is
    /// awaited, its own failure is only logged.
    pub async fn fail<T>(&mut self, error: Error) -> Result<T> {
        self.park();
        self.state.fail(error).await
    }

    /// Put back a raw cursor left over by an interrupted step.
    fn park(&mut self) {
        if let Some(raw) = self.in_flight.take() {
            self.state.checkin(raw);
        }
    }
}

impl Stream for Cursor {
    type Item = Result<RowLabeled>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        let mut raw = match this.in_flight.take() {
            Some(raw) if this.state.is_closed() => {
                drop(raw);
                return Poll::Ready(None);
            }
            Some(raw) => raw,
            None => match this.state.checkout() {
                Some(raw) => raw,
                None => return Poll::Ready(None),
            },
        };
        match raw.poll_next_unpin(cx) {
            Poll::Pending => {
                this.in_flight = Some(raw);
                Poll::Pending
            }
            Poll::Ready(Some(item)) => {
                this.state.checkin(raw);
                Poll::Ready(Some(item))
            }
            Poll::Ready(None) => {
                drop(raw);
                this.state.terminate();
                Poll::Ready(None)
            }
        }
    }
}

impl FusedStream for Cursor {
    fn is_terminated(&self) -> bool {
        self.in_flight.is_none() && self.state.is_closed()
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        self.park();
        if self.state.terminate().is_some() {
            log::debug!(
                "Cursor {} dropped before the end, its connection was released",
                self.state.id
            );
        }
    }
}

impl Debug for Cursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("id", &self.state.id)
            .field("closed", &self.state.is_closed())
            .finish()
    }
}
