use crate::{Result, RowLabeled, stream::Stream};
use futures::future::BoxFuture;
use std::{
    pin::Pin,
    task::{Context, Poll},
};

/// Driver level row stream of one executed query.
///
/// `cancel` is the optional cleanup hook invoked when the consumer stops early or fails.
/// Cursors without one are simply dropped.
pub trait RawCursor: Stream<Item = Result<RowLabeled>> + Send + Unpin + 'static {
    fn cancel(self: Box<Self>) -> Option<BoxFuture<'static, Result<()>>> {
        None
    }
}

/// Adapts any row [`Stream`] into a [`RawCursor`] without a cancellation hook.
pub struct StreamCursor<S> {
    stream: S,
}

impl<S> StreamCursor<S>
where
    S: Stream<Item = Result<RowLabeled>> + Send + Unpin + 'static,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

impl<S> Stream for StreamCursor<S>
where
    S: Stream<Item = Result<RowLabeled>> + Send + Unpin + 'static,
{
    type Item = Result<RowLabeled>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.stream).poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.stream.size_hint()
    }
}

impl<S> RawCursor for StreamCursor<S> where
    S: Stream<Item = Result<RowLabeled>> + Send + Unpin + 'static
{
}
