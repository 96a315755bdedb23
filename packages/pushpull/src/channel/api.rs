// exposed API of channels

use self::future::*;
use super::{
    error::*,
    core,
};
use crate::{
    sink::ChannelSink,
    util::disposer::Disposer,
};
use std::fmt::{self, Formatter, Debug};


// ==== the exposed API ====


/// Create a channel
///
/// Shorthand for [`Channel::new`].
pub fn channel<T, E>() -> Channel<T, E> {
    Channel::new()
}

/// Create a channel fed by a callback-style producer
///
/// Constructs a fresh channel and calls `make` with a [`ChannelSink`] into it. `make` should
/// arrange for its producer to push into the sink, and return a cleanup action for that producer.
/// The cleanup action runs exactly once, the first time the producer
/// [completes](crate::sink::Sink::complete) the sink, or a consumer [closes](Channel::close) or
/// [throws into](Channel::throw) the channel, no matter how many times or from how many handles
/// that happens. A producer that completes the sink before `make` returns has its cleanup action
/// run as soon as it is returned. Failing the sink does not run it.
pub fn from_sink_fn<T, E, F, D>(make: F) -> Channel<T, E>
where
    F: FnOnce(ChannelSink<T, E>) -> D,
    D: FnOnce() + Send + 'static,
{
    let channel = Channel::new();
    let disposer = Disposer::new(make(channel.sink()));
    let finished = {
        let mut lock = channel.0.lock();
        lock.set_on_close(disposer.clone());
        lock.closed_state() == Some(ClosedState::Finished)
    };
    if finished {
        // completed while being made
        disposer.dispose();
    }
    channel
}

/// Single-producer, multi-waiter push-pull queue
///
/// Producers call [`push`](Self::push), [`complete`](Self::complete), and [`fail`](Self::fail)
/// at arbitrary times. Consumers call [`pull`](Self::pull) to get a future for the next value.
///
/// - Values are delivered in push order, each to exactly one pull.
/// - Pulls are served in the order they were made. A push while pulls are waiting hands the value
///   directly to the earliest one.
/// - Values buffered before the channel terminates are still delivered before the terminal
///   signal.
/// - Once drained, a finished channel yields end-of-sequence forever, and a failed channel yields
///   its error forever.
///
/// This is a cheaply clonable handle. All clones refer to the same channel.
pub struct Channel<T, E>(pub(crate) core::Channel<T, E>);

impl<T, E> Channel<T, E> {
    /// Construct an empty, running channel
    pub fn new() -> Self {
        Channel(core::Channel::new())
    }

    /// Push a value
    ///
    /// If a pull is waiting, the value goes directly to the earliest one. Otherwise it is
    /// buffered. If the channel has already finished or failed, the value is silently dropped. Use
    /// [`try_push`](Self::try_push) to find out.
    pub fn push(&self, value: T) {
        if let Err(e) = self.try_push(value) {
            trace!(state = %e.state, "dropping value pushed into terminated channel");
        }
    }

    /// Push a value, or get it back if the channel has already finished or failed
    pub fn try_push(&self, value: T) -> Result<(), PushError<T>> {
        self.0.lock()
            .push(value)
            .map_err(|(value, state)| PushError { value, state })
    }

    /// Finish the channel
    ///
    /// All pulls currently waiting resolve to end-of-sequence. Values still buffered remain
    /// available to future pulls, after which they too resolve to end-of-sequence. Does nothing if
    /// the channel has already finished or failed.
    pub fn complete(&self) {
        self.0.lock().complete();
    }

    /// Close the channel from the consumer side
    ///
    /// Finishes the channel like [`complete`](Self::complete), and additionally runs the
    /// producer's cleanup action if the channel was made by [`from_sink_fn`] and it has not run
    /// yet. Safe to call any number of times.
    pub fn close(&self) {
        let on_close = {
            let mut lock = self.0.lock();
            lock.complete();
            lock.on_close()
        };
        if let Some(disposer) = on_close {
            disposer.dispose();
        }
    }

    /// Get a sink which forwards into this channel
    pub fn sink(&self) -> ChannelSink<T, E> {
        ChannelSink::new(self.clone())
    }

    /// Get a consumer stream of this channel's values
    ///
    /// See [`PullStream`].
    pub fn stream(&self) -> PullStream<T, E> {
        PullStream::new(self.clone())
    }

    /// Number of values pushed but not yet pulled
    pub fn buffered(&self) -> usize {
        self.0.lock().buffered()
    }

    /// Number of pulls registered and not yet resolved
    ///
    /// This may count pulls whose future has been dropped, until a push skips past them.
    pub fn waiting(&self) -> usize {
        self.0.lock().waiting()
    }

    /// Whether the channel has finished or failed
    ///
    /// Values may still be buffered.
    pub fn is_terminated(&self) -> bool {
        self.0.lock().closed_state().is_some()
    }

    /// Whether two handles refer to the same channel
    pub fn same_channel(&self, other: &Self) -> bool {
        self.0.same_channel(&other.0)
    }
}

impl<T, E: Clone> Channel<T, E> {
    /// Create a future to pull the next value
    ///
    /// The pull is registered immediately, not when the future is first polled, so pulls are
    /// served in the order this method is called. Resolves to:
    ///
    /// - `Ok(Some(value))` for the next value.
    /// - `Ok(None)` once the channel has finished and its buffer is drained.
    /// - `Err(error)` once the channel has failed and its buffer is drained.
    ///
    /// See the API of [`PullFut`], which also provides methods for trying to resolve immediately
    /// or blocking.
    pub fn pull(&self) -> PullFut<T, E> {
        let pulled = self.0.lock().pull();
        PullFut::new(self.0.clone(), pulled)
    }

    /// Pull the next value only if that does not require waiting
    pub fn try_pull(&self) -> Result<Option<T>, TryPullError<E>> {
        match self.0.lock().try_pull() {
            Some(Ok(value)) => Ok(value),
            Some(Err(error)) => Err(TryPullError::Failed(error)),
            None => Err(WouldBlockError.into()),
        }
    }

    /// Fail the channel
    ///
    /// All pulls currently waiting resolve to `error`. Values still buffered remain available to
    /// future pulls, after which every pull resolves to a clone of `error`. Does nothing if the
    /// channel has already finished or failed.
    pub fn fail(&self, error: E) {
        self.0.lock().fail(error);
    }

    /// Fail the channel from the consumer side
    ///
    /// Fails the channel like [`fail`](Self::fail), and additionally runs the producer's cleanup
    /// action if the channel was made by [`from_sink_fn`] and it has not run yet.
    pub fn throw(&self, error: E) {
        let on_close = {
            let mut lock = self.0.lock();
            lock.fail(error);
            lock.on_close()
        };
        if let Some(disposer) = on_close {
            disposer.dispose();
        }
    }

    /// If the channel has finished or failed, get that terminal state
    ///
    /// Values may still be buffered.
    pub fn terminal_state(&self) -> Option<TerminalState<E>> {
        self.0.lock().terminal_state()
    }
}

impl<T, E> Clone for Channel<T, E> {
    fn clone(&self) -> Self {
        Channel(self.0.clone())
    }
}

impl<T, E> Default for Channel<T, E> {
    fn default() -> Self {
        Channel::new()
    }
}

impl<T, E> Debug for Channel<T, E> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let lock = self.0.lock();
        f.debug_struct("Channel")
            .field("state", &lock.closed_state())
            .field("buffered", &lock.buffered())
            .field("waiting", &lock.waiting())
            .finish()
    }
}


// future and stream types for channels.
pub(crate) mod future {
    use super::*;
    use crate::{
        channel::core::{Outcome, Pulled},
        source::PullSource,
    };
    use futures::channel::oneshot;
    use std::{
        task::{Poll, Context},
        future::Future,
        pin::Pin,
        mem::replace,
    };

    /// Future for pulling from a [`Channel`]
    ///
    /// Resolves to `Ok(None)` to represent end-of-sequence, once the channel has finished and all
    /// buffered values have been pulled.
    ///
    /// The pull is registered with the channel when this future is created. If a value is handed
    /// to this future but it is dropped or [aborted](Self::abort) before resolving, the value is
    /// given back to the channel, ahead of any values buffered since.
    pub struct PullFut<T, E> {
        channel: core::Channel<T, E>,
        state: PullState<T, E>,
    }

    enum PullState<T, E> {
        // resolved when created, not yet polled.
        Ready(Outcome<T, E>),
        // registered as a waiter.
        Waiting(oneshot::Receiver<Outcome<T, E>>),
        // resolved and polled, or aborted.
        Terminated,
    }

    // the state is never pinned.
    impl<T, E> Unpin for PullFut<T, E> {}

    impl<T, E> PullFut<T, E> {
        pub(super) fn new(channel: core::Channel<T, E>, pulled: Pulled<T, E>) -> Self {
            let state = match pulled {
                Pulled::Ready(outcome) => PullState::Ready(outcome),
                Pulled::Waiting(receiver) => PullState::Waiting(receiver),
            };
            PullFut { channel, state }
        }

        /// Abort this pull
        ///
        /// If a value was already handed to this future, it is given back to the channel. Does
        /// nothing if this future has already resolved or aborted. This method never panics.
        pub fn abort(&mut self) {
            let value = match replace(&mut self.state, PullState::Terminated) {
                PullState::Ready(Ok(Some(value))) => Some(value),
                PullState::Waiting(mut receiver) => {
                    // after closing, no more hand off can race with us
                    receiver.close();
                    match receiver.try_recv() {
                        Ok(Some(Ok(Some(value)))) => Some(value),
                        _ => None,
                    }
                }
                _ => None,
            };
            if let Some(value) = value {
                trace!("giving back value handed to aborted pull");
                self.channel.lock().requeue(value);
            }
        }

        /// Try to resolve this future immediately without waiting
        ///
        /// Calling this method counts as polling this future, and if this method returns anything
        /// other than [`WouldBlockError`], that counts as this future resolving. This method will
        /// panic if this future has already resolved or aborted.
        pub fn try_now(&mut self) -> Result<Option<T>, TryPullError<E>> {
            assert!(!self.is_terminated(), "PullFut.try_now called after terminated");
            let mut cx = Context::from_waker(futures::task::noop_waker_ref());
            match Pin::new(self).poll(&mut cx) {
                Poll::Ready(Ok(value)) => Ok(value),
                Poll::Ready(Err(error)) => Err(TryPullError::Failed(error)),
                Poll::Pending => Err(WouldBlockError.into()),
            }
        }

        /// Block the current thread until this future resolves
        ///
        /// The value must be pushed from another thread, or this blocks forever. This method will
        /// panic if this future has already resolved or aborted.
        pub fn block(mut self) -> Result<Option<T>, E> {
            assert!(!self.is_terminated(), "PullFut.block called after terminated");
            futures::executor::block_on(&mut self)
        }

        /// Whether this future has already resolved or aborted
        pub fn is_terminated(&self) -> bool {
            matches!(&self.state, PullState::Terminated)
        }
    }

    impl<T, E> Future for PullFut<T, E> {
        type Output = Result<Option<T>, E>;

        fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
            let this = self.get_mut();
            match replace(&mut this.state, PullState::Terminated) {
                PullState::Ready(outcome) => Poll::Ready(outcome),
                PullState::Waiting(mut receiver) => match Pin::new(&mut receiver).poll(cx) {
                    Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
                    // waiters are only dropped unresolved if the channel is dropped, and we hold
                    // a handle to it
                    Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Ok(None)),
                    Poll::Pending => {
                        this.state = PullState::Waiting(receiver);
                        Poll::Pending
                    }
                },
                // for implementation of FusedFuture
                PullState::Terminated => Poll::Pending,
            }
        }
    }

    impl<T, E> futures::future::FusedFuture for PullFut<T, E> {
        fn is_terminated(&self) -> bool {
            Self::is_terminated(self)
        }
    }

    impl<T, E> Drop for PullFut<T, E> {
        fn drop(&mut self) {
            // to make sure a handed-off value isn't lost
            self.abort();
        }
    }

    impl<T, E> Debug for PullFut<T, E> {
        fn fmt(&self, f: &mut Formatter) -> fmt::Result {
            let state = match &self.state {
                PullState::Ready(_) => "ready",
                PullState::Waiting(_) => "waiting",
                PullState::Terminated => "terminated",
            };
            f.debug_struct("PullFut").field("state", &state).finish()
        }
    }


    /// Consumer stream of a [`Channel`]'s values
    ///
    /// As a [`Stream`](futures::Stream), yields `Ok(value)` for each value, then ends after
    /// end-of-sequence, or after yielding the channel's error once.
    ///
    /// As a [`PullSource`], yields exactly what [`Channel::pull`] would, including the sticky
    /// error, until [closed](PullSource::close). Closing closes the channel and from then on
    /// yields end-of-sequence.
    ///
    /// By default, dropping a `PullStream` which has not ended or closed closes the channel. See
    /// [`set_close_on_drop`](Self::set_close_on_drop).
    pub struct PullStream<T, E> {
        channel: Channel<T, E>,
        pending: Option<PullFut<T, E>>,
        // ended as a stream.
        ended: bool,
        // closed by this consumer.
        closed: bool,
        close_on_drop: bool,
    }

    impl<T, E> PullStream<T, E> {
        pub(super) fn new(channel: Channel<T, E>) -> Self {
            PullStream {
                channel,
                pending: None,
                ended: false,
                closed: false,
                close_on_drop: true,
            }
        }

        /// Set whether this `PullStream` closes the channel if dropped before ending
        ///
        /// Defaults to true. Only a property of this individual stream.
        pub fn set_close_on_drop(&mut self, close_on_drop: bool) -> &mut Self {
            self.close_on_drop = close_on_drop;
            self
        }

        /// Ownership-chaining version of [`set_close_on_drop`](Self::set_close_on_drop)
        pub fn with_close_on_drop(mut self, close_on_drop: bool) -> Self {
            self.close_on_drop = close_on_drop;
            self
        }

        /// The channel this stream pulls from
        pub fn channel(&self) -> &Channel<T, E> {
            &self.channel
        }
    }

    impl<T, E: Clone> PullStream<T, E> {
        fn poll_outcome(&mut self, cx: &mut Context) -> Poll<Outcome<T, E>> {
            let channel = &self.channel;
            let fut = self.pending.get_or_insert_with(|| channel.pull());
            let outcome = futures::ready!(Pin::new(fut).poll(cx));
            self.pending = None;
            Poll::Ready(outcome)
        }
    }

    impl<T, E: Clone> futures::Stream for PullStream<T, E> {
        type Item = Result<T, E>;

        fn poll_next(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
            let this = self.get_mut();
            if this.ended || this.closed {
                return Poll::Ready(None);
            }
            let item = match futures::ready!(this.poll_outcome(cx)) {
                Ok(Some(value)) => Some(Ok(value)),
                Ok(None) => None,
                Err(error) => {
                    this.ended = true;
                    Some(Err(error))
                }
            };
            if item.is_none() {
                this.ended = true;
            }
            Poll::Ready(item)
        }
    }

    impl<T, E: Clone> futures::stream::FusedStream for PullStream<T, E> {
        fn is_terminated(&self) -> bool {
            self.ended || self.closed
        }
    }

    impl<T, E: Clone> PullSource for PullStream<T, E> {
        type Item = T;
        type Error = E;

        fn poll_pull(&mut self, cx: &mut Context<'_>) -> Poll<Outcome<T, E>> {
            if self.closed {
                return Poll::Ready(Ok(None));
            }
            let outcome = futures::ready!(self.poll_outcome(cx));
            if !matches!(outcome, Ok(Some(_))) {
                self.ended = true;
            }
            Poll::Ready(outcome)
        }

        fn close(&mut self) {
            if let Some(mut fut) = self.pending.take() {
                fut.abort();
            }
            if !self.closed {
                self.closed = true;
                self.channel.close();
            }
        }
    }

    impl<T, E> Drop for PullStream<T, E> {
        fn drop(&mut self) {
            // give back any value already handed to us before closing
            self.pending = None;
            if self.close_on_drop && !self.ended && !self.closed {
                self.channel.close();
            }
        }
    }

    impl<T, E> Debug for PullStream<T, E> {
        fn fmt(&self, f: &mut Formatter) -> fmt::Result {
            f.debug_struct("PullStream")
                .field("channel", &self.channel)
                .field("ended", &self.ended)
                .field("closed", &self.closed)
                .field("close_on_drop", &self.close_on_drop)
                .finish()
        }
    }
}


// ==== tests ====


#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering::Relaxed},
            Arc,
        },
        thread,
        time::Duration,
    };

    #[derive(Debug, Clone, PartialEq)]
    struct Boom(&'static str);

    #[test]
    fn pushes_before_pulls_come_out_in_order() {
        let chan = channel::<u32, Boom>();
        for i in 1..=100 {
            chan.push(i);
        }
        for i in 1..=100 {
            assert_eq!(block_on(chan.pull()), Ok(Some(i)));
        }
    }

    #[test]
    fn complete_after_pushes() {
        let chan = channel::<u32, Boom>();
        chan.push(1);
        chan.push(2);
        chan.push(3);
        chan.complete();

        assert_eq!(block_on(chan.pull()), Ok(Some(1)));
        assert_eq!(block_on(chan.pull()), Ok(Some(2)));
        assert_eq!(block_on(chan.pull()), Ok(Some(3)));
        assert_eq!(block_on(chan.pull()), Ok(None));
        assert_eq!(block_on(chan.pull()), Ok(None));
    }

    #[test]
    fn pending_pull_gets_handed_pushed_value() {
        let chan = channel::<&str, Boom>();
        let mut fut = chan.pull();
        assert_eq!(fut.try_now(), Err(TryPullError::WouldBlock(WouldBlockError)));
        assert_eq!(chan.waiting(), 1);

        chan.push("x");
        assert_eq!(chan.buffered(), 0);
        assert_eq!(chan.waiting(), 0);
        assert_eq!(block_on(fut), Ok(Some("x")));
    }

    #[test]
    fn concurrent_pulls_served_in_call_order() {
        let chan = channel::<u32, Boom>();
        let fut_1 = chan.pull();
        let fut_2 = chan.pull();
        let fut_3 = chan.pull();
        chan.push(1);
        chan.push(2);
        chan.complete();

        assert_eq!(block_on(fut_3), Ok(None));
        assert_eq!(block_on(fut_2), Ok(Some(2)));
        assert_eq!(block_on(fut_1), Ok(Some(1)));
    }

    #[test]
    fn buffered_values_drain_before_failure() {
        let chan = channel::<&str, Boom>();
        chan.push("a");
        chan.push("b");
        chan.fail(Boom("boom"));

        assert_eq!(block_on(chan.pull()), Ok(Some("a")));
        assert_eq!(block_on(chan.pull()), Ok(Some("b")));
        assert_eq!(block_on(chan.pull()), Err(Boom("boom")));
        assert_eq!(block_on(chan.pull()), Err(Boom("boom")));
    }

    #[test]
    fn failure_is_the_identical_value_every_time() {
        let chan = channel::<(), Arc<anyhow::Error>>();
        chan.fail(Arc::new(anyhow::anyhow!("e")));

        let error_1 = block_on(chan.pull()).unwrap_err();
        let error_2 = block_on(chan.pull()).unwrap_err();
        assert!(Arc::ptr_eq(&error_1, &error_2));
        assert_eq!(error_1.to_string(), "e");
    }

    #[test]
    fn waiting_pulls_fail_with_error() {
        let chan = channel::<u32, Boom>();
        let fut_1 = chan.pull();
        let fut_2 = chan.pull();
        chan.fail(Boom("boom"));

        assert_eq!(block_on(fut_1), Err(Boom("boom")));
        assert_eq!(block_on(fut_2), Err(Boom("boom")));
    }

    #[test]
    fn push_after_terminal_is_dropped() {
        let chan = channel::<u32, Boom>();
        chan.complete();
        chan.push(1);
        assert_eq!(chan.buffered(), 0);
        assert_eq!(
            chan.try_push(2),
            Err(PushError { value: 2, state: ClosedState::Finished }),
        );
        assert_eq!(block_on(chan.pull()), Ok(None));
    }

    #[test]
    fn first_terminal_transition_wins() {
        let chan = channel::<u32, Boom>();
        chan.complete();
        chan.fail(Boom("late"));
        assert_eq!(chan.terminal_state(), Some(TerminalState::Finished));
        assert_eq!(block_on(chan.pull()), Ok(None));

        let chan = channel::<u32, Boom>();
        chan.fail(Boom("first"));
        chan.fail(Boom("second"));
        chan.complete();
        assert_eq!(chan.terminal_state(), Some(TerminalState::Failed(Boom("first"))));
        assert_eq!(block_on(chan.pull()), Err(Boom("first")));
    }

    #[test]
    fn try_pull_does_not_register() {
        let chan = channel::<u32, Boom>();
        assert_eq!(chan.try_pull(), Err(TryPullError::WouldBlock(WouldBlockError)));
        assert_eq!(chan.waiting(), 0);

        chan.push(5);
        assert_eq!(chan.try_pull(), Ok(Some(5)));
        chan.fail(Boom("boom"));
        assert_eq!(chan.try_pull(), Err(TryPullError::Failed(Boom("boom"))));
    }

    #[test]
    fn dropped_pull_gives_back_handed_value() {
        let chan = channel::<u32, Boom>();
        let fut_1 = chan.pull();
        chan.push(1);
        chan.push(2);
        drop(fut_1);

        assert_eq!(block_on(chan.pull()), Ok(Some(1)));
        assert_eq!(block_on(chan.pull()), Ok(Some(2)));
    }

    #[test]
    fn dropped_ready_pull_gives_back_value() {
        let chan = channel::<u32, Boom>();
        chan.push(1);
        chan.push(2);
        let mut fut = chan.pull();
        fut.abort();
        assert!(fut.is_terminated());

        assert_eq!(block_on(chan.pull()), Ok(Some(1)));
        assert_eq!(block_on(chan.pull()), Ok(Some(2)));
    }

    #[test]
    fn dropped_pull_is_skipped_by_hand_off() {
        let chan = channel::<u32, Boom>();
        drop(chan.pull());
        let fut = chan.pull();
        chan.push(1);
        assert_eq!(block_on(fut), Ok(Some(1)));
    }

    #[test]
    fn close_runs_disposer_exactly_once() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let disposed_2 = Arc::clone(&disposed);
        let chan = from_sink_fn::<u32, Boom, _, _>(move |_sink| {
            move || { disposed_2.fetch_add(1, Relaxed); }
        });

        chan.close();
        chan.close();
        chan.clone().close();
        assert_eq!(disposed.load(Relaxed), 1);
        assert_eq!(block_on(chan.pull()), Ok(None));
    }

    #[test]
    fn close_runs_disposer_once_across_threads() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let disposed_2 = Arc::clone(&disposed);
        let chan = from_sink_fn::<u32, Boom, _, _>(move |_sink| {
            move || { disposed_2.fetch_add(1, Relaxed); }
        });

        let joins = (0..4)
            .map(|_| {
                let chan = chan.clone();
                thread::spawn(move || chan.close())
            })
            .collect::<Vec<_>>();
        for join in joins {
            join.join().unwrap();
        }
        assert_eq!(disposed.load(Relaxed), 1);
    }

    #[test]
    fn throw_fails_and_disposes() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let disposed_2 = Arc::clone(&disposed);
        let chan = from_sink_fn::<u32, Boom, _, _>(move |_sink| {
            move || { disposed_2.fetch_add(1, Relaxed); }
        });
        let fut = chan.pull();

        chan.throw(Boom("stop"));
        chan.close();
        assert_eq!(disposed.load(Relaxed), 1);
        assert_eq!(block_on(fut), Err(Boom("stop")));
    }

    #[test]
    fn producer_completion_disposes_once() {
        use crate::sink::Sink;

        let disposed = Arc::new(AtomicUsize::new(0));
        let disposed_2 = Arc::clone(&disposed);
        let mut stored = None;
        let chan = from_sink_fn::<u32, Boom, _, _>(|sink| {
            stored = Some(sink);
            move || { disposed_2.fetch_add(1, Relaxed); }
        });
        let mut sink = stored.take().unwrap();

        sink.next(1);
        assert_eq!(disposed.load(Relaxed), 0);
        sink.complete();
        assert_eq!(disposed.load(Relaxed), 1);

        assert_eq!(block_on(chan.pull()), Ok(Some(1)));
        assert_eq!(block_on(chan.pull()), Ok(None));
        sink.complete();
        chan.close();
        assert_eq!(disposed.load(Relaxed), 1);
    }

    #[test]
    fn producer_completing_while_made_disposes_once() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let disposed_2 = Arc::clone(&disposed);
        let chan = from_sink_fn::<u32, Boom, _, _>(move |mut sink| {
            use crate::sink::Sink;
            sink.next(1);
            sink.complete();
            move || { disposed_2.fetch_add(1, Relaxed); }
        });

        assert_eq!(disposed.load(Relaxed), 1);
        assert_eq!(block_on(chan.pull()), Ok(Some(1)));
        assert_eq!(block_on(chan.pull()), Ok(None));
        chan.close();
        assert_eq!(disposed.load(Relaxed), 1);
    }

    #[test]
    fn producer_failure_does_not_dispose() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let disposed_2 = Arc::clone(&disposed);
        let chan = from_sink_fn::<u32, Boom, _, _>(move |mut sink| {
            use crate::sink::Sink;
            sink.error(Boom("boom"));
            move || { disposed_2.fetch_add(1, Relaxed); }
        });

        assert_eq!(block_on(chan.pull()), Err(Boom("boom")));
        assert_eq!(disposed.load(Relaxed), 0);
        chan.close();
        assert_eq!(disposed.load(Relaxed), 1);
    }

    #[test]
    fn stream_yields_values_then_error_once() {
        use futures::StreamExt;

        let chan = channel::<u32, Boom>();
        chan.push(1);
        chan.push(2);
        chan.fail(Boom("boom"));

        let items = block_on(chan.stream().collect::<Vec<_>>());
        assert_eq!(items, vec![Ok(1), Ok(2), Err(Boom("boom"))]);
    }

    #[test]
    fn dropping_stream_closes_channel() {
        let chan = channel::<u32, Boom>();
        drop(chan.stream());
        assert_eq!(chan.terminal_state(), Some(TerminalState::Finished));

        let chan = channel::<u32, Boom>();
        drop(chan.stream().with_close_on_drop(false));
        assert_eq!(chan.terminal_state(), None);
    }

    #[test]
    fn cross_thread_1000() {
        let chan = channel::<u32, Boom>();
        let producer = chan.clone();

        let join_1 = thread::spawn(move || {
            for i in 1..=1000 {
                producer.push(i);
                if i < 1000 && i % 100 == 0 {
                    thread::sleep(Duration::from_millis(5));
                }
            }
            producer.complete();
        });
        let join_2 = thread::spawn(move || {
            for i in 1..=1000 {
                assert_eq!(chan.pull().block(), Ok(Some(i)));
            }
            assert_eq!(chan.pull().block(), Ok(None));
        });
        join_1.join().unwrap();
        join_2.join().unwrap();
    }
}
