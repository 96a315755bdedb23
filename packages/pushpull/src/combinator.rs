//! Transform combinators for [`PullSource`]s.
//!
//! Each wraps one source into another. They are lazy: nothing is pulled from the wrapped source
//! until the combinator itself is pulled. Closing a combinator closes the source it wraps.

use crate::source::PullSource;
use std::{
    fmt::{self, Formatter, Debug},
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};


// values a Filter may reject in one poll before yielding back to the executor.
const SKIP_BUDGET: usize = 64;


/// Source for [`PullSourceExt::map`](crate::source::PullSourceExt::map)
pub struct Map<S, F> {
    source: S,
    f: F,
}

impl<S, F> Map<S, F> {
    pub(crate) fn new(source: S, f: F) -> Self {
        Map { source, f }
    }

    /// Take back the wrapped source
    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S, F, O> PullSource for Map<S, F>
where
    S: PullSource,
    F: FnMut(S::Item) -> O,
{
    type Item = O;
    type Error = S::Error;

    fn poll_pull(&mut self, cx: &mut Context<'_>) -> Poll<Result<Option<O>, S::Error>> {
        self.source
            .poll_pull(cx)
            .map(|outcome| outcome.map(|value| value.map(&mut self.f)))
    }

    fn close(&mut self) {
        self.source.close();
    }
}

impl<S: Debug, F> Debug for Map<S, F> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Map").field("source", &self.source).finish_non_exhaustive()
    }
}


/// Source for [`PullSourceExt::filter`](crate::source::PullSourceExt::filter)
pub struct Filter<S, P> {
    source: S,
    predicate: P,
}

impl<S, P> Filter<S, P> {
    pub(crate) fn new(source: S, predicate: P) -> Self {
        Filter { source, predicate }
    }

    /// Take back the wrapped source
    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S, P> PullSource for Filter<S, P>
where
    S: PullSource,
    P: FnMut(&S::Item) -> bool,
{
    type Item = S::Item;
    type Error = S::Error;

    fn poll_pull(&mut self, cx: &mut Context<'_>) -> Poll<Result<Option<S::Item>, S::Error>> {
        for _ in 0..SKIP_BUDGET {
            match futures::ready!(self.source.poll_pull(cx)) {
                Ok(Some(value)) if !(self.predicate)(&value) => continue,
                outcome => return Poll::Ready(outcome),
            }
        }

        // rejected a run of ready values, let other tasks run
        cx.waker().wake_by_ref();
        Poll::Pending
    }

    fn close(&mut self) {
        self.source.close();
    }
}

impl<S: Debug, P> Debug for Filter<S, P> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Filter").field("source", &self.source).finish_non_exhaustive()
    }
}


/// Source for [`PullSourceExt::then`](crate::source::PullSourceExt::then)
///
/// Holds at most one mapping future in flight. The next value is not pulled from the wrapped
/// source until it resolves.
pub struct Then<S, F, Fut> {
    source: S,
    f: F,
    pending: Option<Pin<Box<Fut>>>,
}

impl<S, F, Fut> Then<S, F, Fut> {
    pub(crate) fn new(source: S, f: F) -> Self {
        Then { source, f, pending: None }
    }
}

impl<S, F, Fut> PullSource for Then<S, F, Fut>
where
    S: PullSource,
    F: FnMut(S::Item) -> Fut,
    Fut: Future,
{
    type Item = Fut::Output;
    type Error = S::Error;

    fn poll_pull(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<Fut::Output>, S::Error>> {
        loop {
            if let Some(fut) = self.pending.as_mut() {
                let output = futures::ready!(fut.as_mut().poll(cx));
                self.pending = None;
                return Poll::Ready(Ok(Some(output)));
            }
            match futures::ready!(self.source.poll_pull(cx)) {
                Ok(Some(value)) => self.pending = Some(Box::pin((self.f)(value))),
                Ok(None) => return Poll::Ready(Ok(None)),
                Err(error) => return Poll::Ready(Err(error)),
            }
        }
    }

    fn close(&mut self) {
        self.pending = None;
        self.source.close();
    }
}

impl<S: Debug, F, Fut> Debug for Then<S, F, Fut> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Then")
            .field("source", &self.source)
            .field("in_flight", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}


/// Source for [`PullSourceExt::on_close`](crate::source::PullSourceExt::on_close)
///
/// Intercepts the first [`close`](PullSource::close) to run a callback, then delegates to the
/// wrapped source.
pub struct OnClose<S, F> {
    source: S,
    on_close: Option<F>,
}

impl<S, F> OnClose<S, F> {
    pub(crate) fn new(source: S, on_close: F) -> Self {
        OnClose { source, on_close: Some(on_close) }
    }
}

impl<S, F> PullSource for OnClose<S, F>
where
    S: PullSource,
    F: FnOnce(),
{
    type Item = S::Item;
    type Error = S::Error;

    fn poll_pull(&mut self, cx: &mut Context<'_>) -> Poll<Result<Option<S::Item>, S::Error>> {
        self.source.poll_pull(cx)
    }

    fn close(&mut self) {
        if let Some(on_close) = self.on_close.take() {
            on_close();
        }
        self.source.close();
    }
}

impl<S: Debug, F> Debug for OnClose<S, F> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("OnClose")
            .field("source", &self.source)
            .field("armed", &self.on_close.is_some())
            .finish()
    }
}


/// Source for [`PullSourceExt::close_with`](crate::source::PullSourceExt::close_with)
///
/// Closing it closes `target` as well as the wrapped source.
#[derive(Debug)]
pub struct CloseWith<S, T> {
    source: S,
    target: T,
}

impl<S, T> CloseWith<S, T> {
    pub(crate) fn new(source: S, target: T) -> Self {
        CloseWith { source, target }
    }
}

impl<S: PullSource, T: PullSource> PullSource for CloseWith<S, T> {
    type Item = S::Item;
    type Error = S::Error;

    fn poll_pull(&mut self, cx: &mut Context<'_>) -> Poll<Result<Option<S::Item>, S::Error>> {
        self.source.poll_pull(cx)
    }

    fn close(&mut self) {
        self.target.close();
        self.source.close();
    }
}
