// minimal safe API for the channel. the exposed API is a convenience wrapper around this.

use super::error::{ClosedState, TerminalState};
use crate::util::disposer::Disposer;
use futures::channel::oneshot;
use std::{
    collections::VecDeque,
    mem::replace,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};


// what a pull resolves to: a value, end-of-sequence, or the channel's failure.
pub(crate) type Outcome<T, E> = Result<Option<T>, E>;

// a pending pull. resolving it is sending into it. if the pull future was dropped, sending fails
// and gives the outcome back.
pub(crate) type Waiter<T, E> = oneshot::Sender<Outcome<T, E>>;

// handle to a channel.
pub(crate) struct Channel<T, E>(Arc<Mutex<Shared<T, E>>>);

// channel shared state.
pub(crate) struct Shared<T, E> {
    // buffered values or pending pulls, never both.
    queue: Queue<T, E>,
    // begins as State::Running. once it changes, never changes again.
    state: State<E>,
    // cleanup action to run when a consumer closes or throws into the channel.
    on_close: Option<Disposer>,
}

// the two mutually exclusive queues.
//
// - Buffered may be empty, Waiting may not (outside of a method call in progress).
// - if state is not Running, queue is Buffered.
enum Queue<T, E> {
    // values pushed but not yet pulled, in push order.
    Buffered(VecDeque<T>),
    // pulls waiting for a value, in pull order.
    Waiting(VecDeque<Waiter<T, E>>),
}

// channel lifecycle state.
pub(crate) enum State<E> {
    // pushes are accepted.
    Running,
    // pulls return end-of-sequence once the buffer is drained.
    Finished,
    // pulls return this error, repeatedly, once the buffer is drained.
    Failed(E),
}

// result of registering a pull.
pub(crate) enum Pulled<T, E> {
    // resolved without waiting.
    Ready(Outcome<T, E>),
    // registered as a waiter.
    Waiting(oneshot::Receiver<Outcome<T, E>>),
}

impl<T, E> Channel<T, E> {
    // construct empty running channel.
    pub(crate) fn new() -> Self {
        Channel(Arc::new(Mutex::new(Shared {
            queue: Queue::Buffered(VecDeque::new()),
            state: State::Running,
            on_close: None,
        })))
    }

    // clone another handle to the channel.
    pub(crate) fn clone(&self) -> Self {
        Channel(Arc::clone(&self.0))
    }

    // whether two handles are to the same channel.
    pub(crate) fn same_channel(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    // lock the channel.
    //
    // no user code runs while the lock is held, so a poisoned lock still guards consistent state.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Shared<T, E>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, E> Queue<T, E> {
    // borrow the buffer, converting from an empty waiting queue if necessary.
    fn buffer(&mut self) -> &mut VecDeque<T> {
        if let Queue::Waiting(waiters) = self {
            debug_assert!(waiters.is_empty(), "buffer requested while pulls waiting (internal bug)");
            *self = Queue::Buffered(VecDeque::new());
        }
        match self {
            Queue::Buffered(buffer) => buffer,
            Queue::Waiting(_) => unreachable!(),
        }
    }

    // borrow the waiting queue, converting from an empty buffer if necessary.
    fn waiters(&mut self) -> &mut VecDeque<Waiter<T, E>> {
        if let Queue::Buffered(buffer) = self {
            debug_assert!(buffer.is_empty(), "waiter registered while values buffered (internal bug)");
            *self = Queue::Waiting(VecDeque::new());
        }
        match self {
            Queue::Waiting(waiters) => waiters,
            Queue::Buffered(_) => unreachable!(),
        }
    }

    // take all waiters, leaving an empty buffer.
    fn drain_waiters(&mut self) -> VecDeque<Waiter<T, E>> {
        match replace(self, Queue::Buffered(VecDeque::new())) {
            Queue::Waiting(waiters) => waiters,
            buffered => {
                *self = buffered;
                VecDeque::new()
            }
        }
    }

    // restore the "waiting is never empty" invariant.
    fn settle(&mut self) {
        if matches!(self, Queue::Waiting(waiters) if waiters.is_empty()) {
            *self = Queue::Buffered(VecDeque::new());
        }
    }
}

impl<T, E> Shared<T, E> {
    // kind of terminal state, if terminated.
    pub(crate) fn closed_state(&self) -> Option<ClosedState> {
        match &self.state {
            State::Running => None,
            State::Finished => Some(ClosedState::Finished),
            State::Failed(_) => Some(ClosedState::Failed),
        }
    }

    // push a value, handing it directly to the earliest waiter if there is one.
    //
    // if the channel is terminated, returns the value back with the terminal state.
    pub(crate) fn push(&mut self, value: T) -> Result<(), (T, ClosedState)> {
        if let Some(state) = self.closed_state() {
            return Err((value, state));
        }
        if let Some(value) = self.hand_off(value) {
            self.queue.buffer().push_back(value);
        }
        Ok(())
    }

    // give a value to the earliest still-live waiter. returns the value back if there is none.
    fn hand_off(&mut self, mut value: T) -> Option<T> {
        if let Queue::Waiting(waiters) = &mut self.queue {
            while let Some(waiter) = waiters.pop_front() {
                match waiter.send(Ok(Some(value))) {
                    Ok(()) => {
                        self.queue.settle();
                        return None;
                    }
                    // that pull was dropped, try the next one
                    Err(Ok(Some(returned))) => value = returned,
                    Err(_) => unreachable!("oneshot returned a different outcome than was sent"),
                }
            }
        }
        self.queue.settle();
        Some(value)
    }

    // give back a value which was handed to a pull that was then dropped unresolved.
    //
    // it goes to the next waiter, or else to the front of the buffer, regardless of state, since
    // it was pushed before any termination.
    pub(crate) fn requeue(&mut self, value: T) {
        if let Some(value) = self.hand_off(value) {
            self.queue.buffer().push_front(value);
        }
    }

    // resolve a pull without waiting, or return None if it would have to wait.
    pub(crate) fn try_pull(&mut self) -> Option<Outcome<T, E>>
    where
        E: Clone,
    {
        if let Queue::Buffered(buffer) = &mut self.queue {
            if let Some(value) = buffer.pop_front() {
                return Some(Ok(Some(value)));
            }
        }
        match &self.state {
            State::Running => None,
            State::Finished => Some(Ok(None)),
            State::Failed(error) => Some(Err(error.clone())),
        }
    }

    // resolve a pull without waiting if possible, otherwise register it as a waiter.
    pub(crate) fn pull(&mut self) -> Pulled<T, E>
    where
        E: Clone,
    {
        if let Some(outcome) = self.try_pull() {
            return Pulled::Ready(outcome);
        }
        let (waiter, receiver) = oneshot::channel();
        self.queue.waiters().push_back(waiter);
        Pulled::Waiting(receiver)
    }

    // transition to finished, if running. resolves all waiters with end-of-sequence.
    pub(crate) fn complete(&mut self) -> bool {
        if !matches!(self.state, State::Running) {
            return false;
        }
        self.state = State::Finished;
        let waiters = self.queue.drain_waiters();
        trace!(waiters = waiters.len(), buffered = self.buffered(), "channel finished");
        for waiter in waiters {
            // a dropped pull doesn't need telling
            let _ = waiter.send(Ok(None));
        }
        true
    }

    // transition to failed, if running. resolves all waiters with the error.
    pub(crate) fn fail(&mut self, error: E) -> bool
    where
        E: Clone,
    {
        if !matches!(self.state, State::Running) {
            return false;
        }
        let waiters = self.queue.drain_waiters();
        trace!(waiters = waiters.len(), buffered = self.buffered(), "channel failed");
        for waiter in waiters {
            let _ = waiter.send(Err(error.clone()));
        }
        self.state = State::Failed(error);
        true
    }

    // terminal state, if terminated.
    pub(crate) fn terminal_state(&self) -> Option<TerminalState<E>>
    where
        E: Clone,
    {
        match &self.state {
            State::Running => None,
            State::Finished => Some(TerminalState::Finished),
            State::Failed(error) => Some(TerminalState::Failed(error.clone())),
        }
    }

    // number of buffered values.
    pub(crate) fn buffered(&self) -> usize {
        match &self.queue {
            Queue::Buffered(buffer) => buffer.len(),
            Queue::Waiting(_) => 0,
        }
    }

    // number of registered waiters, including ones whose pull has since been dropped.
    pub(crate) fn waiting(&self) -> usize {
        match &self.queue {
            Queue::Buffered(_) => 0,
            Queue::Waiting(waiters) => waiters.len(),
        }
    }

    // install the action to run when a consumer closes the channel, replacing any previous one.
    pub(crate) fn set_on_close(&mut self, disposer: Disposer) -> Option<Disposer> {
        self.on_close.replace(disposer)
    }

    // clone out the action to run when a consumer closes the channel. the caller must run it only
    // after unlocking.
    pub(crate) fn on_close(&self) -> Option<Disposer> {
        self.on_close.clone()
    }
}
