use crate::{ConnectionId, Event, Journal};
use ladle_core::{
    Error, ErrorKind, RawCursor, Result, RowLabeled,
    future::{BoxFuture, FutureExt},
    stream::Stream,
};
use std::{
    collections::VecDeque,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, ready},
};
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub enum ScriptRow {
    Row(RowLabeled),
    /// Produces an error tagged [`ErrorKind::StreamFailure`] with this message.
    Error(String),
}

/// What the cursors opened by a [`TestPool`](crate::TestPool) connection do.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub rows: Vec<ScriptRow>,
    /// `None`: the cursor has no cancellation hook. `Some(Err)`: the hook fails.
    pub cancel: Option<std::result::Result<(), String>>,
    /// Opening the cursor fails with this message.
    pub open_error: Option<String>,
    /// Every row waits for a permit of this semaphore before being produced.
    pub gate: Option<Arc<Semaphore>>,
    /// Opening the cursor waits for a permit of this semaphore.
    pub open_gate: Option<Arc<Semaphore>>,
}

impl Script {
    pub fn rows(rows: impl IntoIterator<Item = RowLabeled>) -> Self {
        Self {
            rows: rows.into_iter().map(ScriptRow::Row).collect(),
            ..Default::default()
        }
    }

    pub fn failing_open(message: &str) -> Self {
        Self {
            open_error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn then_error(mut self, message: &str) -> Self {
        self.rows.push(ScriptRow::Error(message.into()));
        self
    }

    pub fn with_cancel(mut self) -> Self {
        self.cancel = Some(Ok(()));
        self
    }

    pub fn with_failing_cancel(mut self, message: &str) -> Self {
        self.cancel = Some(Err(message.into()));
        self
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn gated_open(mut self, gate: Arc<Semaphore>) -> Self {
        self.open_gate = Some(gate);
        self
    }
}

/// Raw cursor replaying a [`Script`] and recording its cleanup in the [`Journal`].
pub struct ScriptedCursor {
    connection: ConnectionId,
    rows: VecDeque<ScriptRow>,
    cancel: Option<std::result::Result<(), String>>,
    gate: Option<Arc<Semaphore>>,
    waiting: Option<BoxFuture<'static, ()>>,
    journal: Arc<Journal>,
}

impl ScriptedCursor {
    pub(crate) fn new(connection: ConnectionId, script: &Script, journal: Arc<Journal>) -> Self {
        Self {
            connection,
            rows: script.rows.iter().cloned().collect(),
            cancel: script.cancel.clone(),
            gate: script.gate.clone(),
            waiting: None,
            journal,
        }
    }
}

impl Stream for ScriptedCursor {
    type Item = Result<RowLabeled>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if let Some(gate) = &this.gate {
            let waiting = this.waiting.get_or_insert_with(|| {
                let gate = gate.clone();
                async move {
                    if let Ok(permit) = gate.acquire_owned().await {
                        permit.forget();
                    }
                }
                .boxed()
            });
            ready!(waiting.as_mut().poll(cx));
            this.waiting = None;
        }
        Poll::Ready(this.rows.pop_front().map(|row| match row {
            ScriptRow::Row(row) => Ok(row),
            ScriptRow::Error(message) => Err(Error::msg(message).context(ErrorKind::StreamFailure)),
        }))
    }
}

impl RawCursor for ScriptedCursor {
    fn cancel(mut self: Box<Self>) -> Option<BoxFuture<'static, Result<()>>> {
        let outcome = self.cancel.take()?;
        let connection = self.connection;
        let journal = self.journal.clone();
        journal.push(Event::CancelStarted(connection));
        Some(
            async move {
                tokio::task::yield_now().await;
                drop(self);
                journal.push(Event::CancelFinished(connection));
                outcome.map_err(Error::msg)
            }
            .boxed(),
        )
    }
}

impl Drop for ScriptedCursor {
    fn drop(&mut self) {
        self.journal.push(Event::Dropped(self.connection));
    }
}
