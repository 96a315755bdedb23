//! Driving a [`PullSource`] into a [`Sink`].

use crate::{
    sink::Sink,
    source::PullSource,
    util::disposer::Disposer,
};
use futures::task::AtomicWaker;
use std::{
    fmt::{self, Formatter, Debug},
    future::Future,
    pin::Pin,
    sync::{
        atomic::{
            Ordering::{Acquire, Release},
            AtomicBool,
        },
        Arc,
    },
    task::{Context, Poll},
};


// values forwarded per poll before yielding back to the executor.
const FORWARD_BUDGET: usize = 64;


/// How a [`Drain`] ended
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Drained {
    /// The source reached end-of-sequence and the sink was completed
    Completed,
    /// The source failed and the sink was given the error
    Failed,
    /// The drain was disposed and the source was closed
    Cancelled,
}

// cancellation signal shared between a Drain and its Disposer.
#[derive(Default)]
struct Cancel {
    cancelled: AtomicBool,
    waker: AtomicWaker,
}

impl Cancel {
    fn cancel(&self) {
        self.cancelled.store(true, Release);
        self.waker.wake();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Acquire)
    }
}


/// Future which pulls every value from a [`PullSource`] and forwards it into a [`Sink`]
///
/// Each value goes to [`Sink::next`]. End-of-sequence goes to [`Sink::complete`] and a failure
/// goes to [`Sink::error`], after which the future resolves.
///
/// Created together with a [`Disposer`] which cancels it. Once the disposer has run, nothing more
/// is forwarded, even a pull that had already resolved, and on its next poll the future closes
/// the source and resolves to [`Drained::Cancelled`].
pub struct Drain<S, K> {
    source: S,
    sink: K,
    cancel: Arc<Cancel>,
    terminated: bool,
}

// neither the source nor the sink is ever pinned.
impl<S, K> Unpin for Drain<S, K> {}

impl<S, K> Drain<S, K>
where
    S: PullSource,
    K: Sink<S::Item, S::Error>,
{
    /// Construct a drain and the disposer that cancels it
    ///
    /// Running the disposer only marks the drain cancelled and wakes it. The source is closed on
    /// the drain's next poll, so a drain that is never polled again never closes its source. Use
    /// [`drain`] to have a spawned task do the polling.
    pub fn new(source: S, sink: K) -> (Self, Disposer) {
        let cancel = Arc::new(Cancel::default());
        let drain = Drain {
            source,
            sink,
            cancel: Arc::clone(&cancel),
            terminated: false,
        };
        let disposer = Disposer::new(move || cancel.cancel());
        (drain, disposer)
    }

    /// Whether this future has already resolved
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn finish(&mut self, drained: Drained) -> Poll<Drained> {
        self.terminated = true;
        debug!(?drained, "drain finished");
        Poll::Ready(drained)
    }
}

impl<S, K> Future for Drain<S, K>
where
    S: PullSource,
    K: Sink<S::Item, S::Error>,
{
    type Output = Drained;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Drained> {
        let this = self.get_mut();
        // for implementation of FusedFuture
        if this.terminated {
            return Poll::Pending;
        }
        this.cancel.waker.register(cx.waker());

        for _ in 0..FORWARD_BUDGET {
            if this.cancel.is_cancelled() {
                this.source.close();
                return this.finish(Drained::Cancelled);
            }
            let outcome = match this.source.poll_pull(cx) {
                Poll::Ready(outcome) => outcome,
                Poll::Pending => return Poll::Pending,
            };
            // a pull that resolved after disposal is swallowed
            if this.cancel.is_cancelled() {
                continue;
            }
            match outcome {
                Ok(Some(value)) => this.sink.next(value),
                Ok(None) => {
                    this.sink.complete();
                    return this.finish(Drained::Completed);
                }
                Err(error) => {
                    this.sink.error(error);
                    return this.finish(Drained::Failed);
                }
            }
        }

        // out of budget, let other tasks run
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

impl<S, K> futures::future::FusedFuture for Drain<S, K>
where
    S: PullSource,
    K: Sink<S::Item, S::Error>,
{
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl<S: Debug, K: Debug> Debug for Drain<S, K> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Drain")
            .field("source", &self.source)
            .field("sink", &self.sink)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("terminated", &self.terminated)
            .finish()
    }
}


/// Spawn a tokio task which forwards every value from `source` into `sink`
///
/// Returns a disposer which cancels the forwarding. The spawned task then closes the source the
/// next time the runtime polls it. See [`Drain`]. Must be called from within a tokio runtime.
#[cfg(feature = "tokio")]
pub fn drain<S, K>(source: S, sink: K) -> Disposer
where
    S: PullSource + Send + 'static,
    K: Sink<S::Item, S::Error> + Send + 'static,
{
    let (drain, disposer) = Drain::new(source, sink);
    // the task is detached: disposing is how it gets stopped early
    drop(tokio::spawn(drain));
    disposer
}
