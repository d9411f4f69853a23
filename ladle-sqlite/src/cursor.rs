use crate::statement::Statement;
use ladle_core::{
    Error, ErrorKind, RawCursor, Result, Row, RowLabeled, RowNames,
    future::{BoxFuture, FutureExt},
    stream::Stream,
};
use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, ready},
};
use tokio::task::{JoinHandle, spawn_blocking};

/// Rows of a prepared sqlite statement, each step runs on the blocking thread pool.
pub struct SqliteCursor {
    statement: Arc<Statement>,
    labels: RowNames,
    pending: Option<JoinHandle<Result<Option<Row>>>>,
    done: bool,
}

impl SqliteCursor {
    pub(crate) fn new(statement: Statement, labels: RowNames) -> Self {
        Self {
            statement: Arc::new(statement),
            labels,
            pending: None,
            done: false,
        }
    }

    pub fn labels(&self) -> &RowNames {
        &self.labels
    }
}

impl Stream for SqliteCursor {
    type Item = Result<RowLabeled>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.done {
            return Poll::Ready(None);
        }
        let pending = this.pending.get_or_insert_with(|| {
            let statement = this.statement.clone();
            let columns = this.labels.len();
            spawn_blocking(move || statement.step(columns))
        });
        let result = ready!(Pin::new(pending).poll(cx));
        this.pending = None;
        Poll::Ready(match result {
            Ok(Ok(Some(values))) => Some(Ok(RowLabeled::new(this.labels.clone(), values))),
            Ok(Ok(None)) => {
                this.done = true;
                None
            }
            Ok(Err(e)) => {
                this.done = true;
                Some(Err(e))
            }
            Err(e) => {
                this.done = true;
                let error = Error::new(e).context(ErrorKind::StreamFailure);
                log::error!("{:#}", error);
                Some(Err(error))
            }
        })
    }
}

impl RawCursor for SqliteCursor {
    /// Waits for a step still running, then finalizes the statement off the async threads.
    fn cancel(self: Box<Self>) -> Option<BoxFuture<'static, Result<()>>> {
        let SqliteCursor {
            statement, pending, ..
        } = *self;
        Some(
            async move {
                if let Some(pending) = pending {
                    if let Err(e) = pending.await {
                        log::warn!("The step running during cleanup did not complete: {:#}", e);
                    }
                }
                spawn_blocking(move || drop(statement)).await?;
                Ok(())
            }
            .boxed(),
        )
    }
}
