//! Pull-style asynchronous sequences.
//!
//! A [`PullSource`] is polled for one value at a time, ending in end-of-sequence or an error, and
//! can be closed early by its consumer. [`PullStream`](crate::future::PullStream) is the source
//! for a [`Channel`](crate::Channel). [`FromStream`] adapts any [`Stream`] of results, and
//! [`IntoStream`] goes the other way.

use crate::combinator::{Map, Filter, Then, OnClose, CloseWith};
use futures::{
    stream::FusedStream,
    Stream,
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};


/// Pull-style asynchronous sequence of values, ending in end-of-sequence or an error
pub trait PullSource {
    /// Value type
    type Item;
    /// Error type
    type Error;

    /// Attempt to pull the next value
    ///
    /// Resolves to `Ok(Some(value))` for a value, `Ok(None)` for end-of-sequence, or `Err` for a
    /// failure. If this returns `Poll::Pending`, the waker in `cx` is woken when it's worth
    /// polling again.
    fn poll_pull(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<Self::Item>, Self::Error>>;

    /// Request early termination
    ///
    /// Must be safe to call any number of times, including after the sequence has ended. Only the
    /// first effective call has any effect.
    fn close(&mut self);
}

impl<S: PullSource + ?Sized> PullSource for &mut S {
    type Item = S::Item;
    type Error = S::Error;

    fn poll_pull(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<Self::Item>, Self::Error>> {
        (**self).poll_pull(cx)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl<S: PullSource + ?Sized> PullSource for Box<S> {
    type Item = S::Item;
    type Error = S::Error;

    fn poll_pull(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<Self::Item>, Self::Error>> {
        (**self).poll_pull(cx)
    }

    fn close(&mut self) {
        (**self).close()
    }
}


/// Combinators for [`PullSource`]s
pub trait PullSourceExt: PullSource {
    /// Create a future to pull the next value
    fn pull(&mut self) -> Pull<'_, Self> {
        Pull(self)
    }

    /// Apply `f` to each value
    ///
    /// Errors and end-of-sequence pass through unchanged. Closing closes this source.
    fn map<O, F>(self, f: F) -> Map<Self, F>
    where
        Self: Sized,
        F: FnMut(Self::Item) -> O,
    {
        Map::new(self, f)
    }

    /// Apply the asynchronous `f` to each value, yielding what its future resolves to
    ///
    /// One future is in flight at a time, so outputs keep input order. Errors and end-of-sequence
    /// pass through unchanged. Closing drops any future in flight and closes this source.
    fn then<Fut, F>(self, f: F) -> Then<Self, F, Fut>
    where
        Self: Sized,
        F: FnMut(Self::Item) -> Fut,
        Fut: Future,
    {
        Then::new(self, f)
    }

    /// Skip values for which `predicate` does not hold
    ///
    /// Errors and end-of-sequence pass through unchanged. Closing closes this source.
    fn filter<P>(self, predicate: P) -> Filter<Self, P>
    where
        Self: Sized,
        P: FnMut(&Self::Item) -> bool,
    {
        Filter::new(self, predicate)
    }

    /// Run `on_close` the first time this source is closed, before closing it
    fn on_close<F>(self, on_close: F) -> OnClose<Self, F>
    where
        Self: Sized,
        F: FnOnce(),
    {
        OnClose::new(self, on_close)
    }

    /// Close `target` whenever this source is closed
    ///
    /// Used to tie an upstream source's lifetime to a source derived from it.
    fn close_with<T>(self, target: T) -> CloseWith<Self, T>
    where
        Self: Sized,
        T: PullSource,
    {
        CloseWith::new(self, target)
    }

    /// Convert into a [`Stream`] of results
    fn into_stream(self) -> IntoStream<Self>
    where
        Self: Sized,
    {
        IntoStream { source: self, ended: false }
    }
}

impl<S: PullSource + ?Sized> PullSourceExt for S {}


/// Future for [`PullSourceExt::pull`]
#[derive(Debug)]
pub struct Pull<'a, S: ?Sized>(&'a mut S);

impl<S: PullSource + ?Sized> Future for Pull<'_, S> {
    type Output = Result<Option<S::Item>, S::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().0.poll_pull(cx)
    }
}


/// Construct a [`PullSource`] from a [`Stream`] of results
///
/// Closing drops the stream, and from then on the source yields end-of-sequence.
pub fn from_stream<S>(stream: S) -> FromStream<S> {
    FromStream(Some(stream))
}

/// [`PullSource`] adapted from a [`Stream`]
///
/// See [`from_stream`].
#[derive(Debug)]
pub struct FromStream<S>(Option<S>);

impl<S, T, E> PullSource for FromStream<S>
where
    S: Stream<Item = Result<T, E>> + Unpin,
{
    type Item = T;
    type Error = E;

    fn poll_pull(&mut self, cx: &mut Context<'_>) -> Poll<Result<Option<T>, E>> {
        let Some(stream) = self.0.as_mut() else { return Poll::Ready(Ok(None)) };
        Pin::new(stream).poll_next(cx).map(Option::transpose)
    }

    fn close(&mut self) {
        self.0 = None;
    }
}


/// [`Stream`] adapted from a [`PullSource`]
///
/// Yields `Ok(value)` for each value, then ends after end-of-sequence, or after yielding an error
/// once. Dropping it does not close the source; call [`close`](Self::close) for that.
#[derive(Debug)]
pub struct IntoStream<S> {
    source: S,
    ended: bool,
}

impl<S: PullSource> IntoStream<S> {
    /// Close the underlying source and end this stream
    pub fn close(&mut self) {
        self.ended = true;
        self.source.close();
    }

    /// Take back the underlying source
    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: PullSource + Unpin> Stream for IntoStream<S> {
    type Item = Result<S::Item, S::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.ended {
            return Poll::Ready(None);
        }
        let item = futures::ready!(this.source.poll_pull(cx)).transpose();
        if !matches!(item, Some(Ok(_))) {
            this.ended = true;
        }
        Poll::Ready(item)
    }
}

impl<S: PullSource + Unpin> FusedStream for IntoStream<S> {
    fn is_terminated(&self) -> bool {
        self.ended
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel;
    use futures::{
        executor::block_on,
        stream,
    };

    #[test]
    fn pull_from_channel_stream() {
        let chan = channel::<u32, ()>();
        let mut source = chan.stream();
        chan.push(1);
        chan.complete();

        assert_eq!(block_on(source.pull()), Ok(Some(1)));
        assert_eq!(block_on(source.pull()), Ok(None));
        assert_eq!(block_on(source.pull()), Ok(None));
    }

    #[test]
    fn channel_stream_source_repeats_error() {
        let chan = channel::<u32, &str>();
        let mut source = chan.stream();
        chan.fail("boom");

        assert_eq!(block_on(source.pull()), Err("boom"));
        assert_eq!(block_on(source.pull()), Err("boom"));
    }

    #[test]
    fn closing_channel_stream_is_idempotent() {
        let chan = channel::<u32, ()>();
        let mut source = chan.stream();
        chan.push(1);

        source.close();
        source.close();
        assert_eq!(block_on(source.pull()), Ok(None));
        assert!(chan.is_terminated());
        // the value pushed before closing is still in the channel for other consumers
        assert_eq!(chan.buffered(), 1);
    }

    #[test]
    fn from_stream_transposes_results() {
        let mut source = from_stream(stream::iter(vec![Ok(1), Err("bad"), Ok(2)]));

        assert_eq!(block_on(source.pull()), Ok(Some(1)));
        assert_eq!(block_on(source.pull()), Err("bad"));
        assert_eq!(block_on(source.pull()), Ok(Some(2)));
        assert_eq!(block_on(source.pull()), Ok(None));
    }

    #[test]
    fn from_stream_close_ends_it() {
        let mut source = from_stream(stream::iter(vec![Ok::<_, ()>(1), Ok(2)]));
        source.close();
        source.close();
        assert_eq!(block_on(source.pull()), Ok(None));
    }

    #[test]
    fn into_stream_ends_after_error() {
        use futures::StreamExt;

        let source = from_stream(stream::iter(vec![Ok(1), Err("bad"), Ok(2)]));
        let items = block_on(source.into_stream().collect::<Vec<_>>());
        assert_eq!(items, vec![Ok(1), Err("bad")]);
    }
}
