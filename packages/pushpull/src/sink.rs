//! Push-style receivers.
//!
//! A [`Sink`] is what callback-style producers speak: a value callback, an error callback, and a
//! completion callback, called in delivery order. [`ChannelSink`] adapts a [`Channel`] into one,
//! and [`FnSink`] builds one out of closures.

use crate::channel::api::Channel;
use std::fmt::{self, Formatter, Debug};


/// Push-style receiver of values, followed by at most one error or completion
pub trait Sink<T, E> {
    /// Receive a value
    fn next(&mut self, value: T);

    /// Receive a failure
    fn error(&mut self, error: E);

    /// Receive completion
    fn complete(&mut self);
}

impl<T, E, K: Sink<T, E> + ?Sized> Sink<T, E> for &mut K {
    fn next(&mut self, value: T) {
        (**self).next(value)
    }

    fn error(&mut self, error: E) {
        (**self).error(error)
    }

    fn complete(&mut self) {
        (**self).complete()
    }
}

impl<T, E, K: Sink<T, E> + ?Sized> Sink<T, E> for Box<K> {
    fn next(&mut self, value: T) {
        (**self).next(value)
    }

    fn error(&mut self, error: E) {
        (**self).error(error)
    }

    fn complete(&mut self) {
        (**self).complete()
    }
}


/// Sink which forwards into a [`Channel`]
///
/// `next` pushes and `error` fails. `complete` [closes](Channel::close) the channel, which
/// finishes it and runs the producer's cleanup action if it was made by
/// [`from_sink_fn`](crate::from_sink_fn). Clones forward into the same channel.
pub struct ChannelSink<T, E>(Channel<T, E>);

impl<T, E> ChannelSink<T, E> {
    pub(crate) fn new(channel: Channel<T, E>) -> Self {
        ChannelSink(channel)
    }

    /// The channel this sink forwards into
    pub fn channel(&self) -> &Channel<T, E> {
        &self.0
    }
}

impl<T, E: Clone> Sink<T, E> for ChannelSink<T, E> {
    fn next(&mut self, value: T) {
        self.0.push(value);
    }

    fn error(&mut self, error: E) {
        self.0.fail(error);
    }

    fn complete(&mut self) {
        self.0.close();
    }
}

impl<T, E> Clone for ChannelSink<T, E> {
    fn clone(&self) -> Self {
        ChannelSink(self.0.clone())
    }
}

impl<T, E> Debug for ChannelSink<T, E> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_tuple("ChannelSink").field(&self.0).finish()
    }
}


/// Sink made of three closures
///
/// See [`from_fns`].
pub struct FnSink<N, Er, C> {
    next: N,
    error: Er,
    complete: C,
}

/// Construct a sink which calls `next`, `error`, and `complete`
pub fn from_fns<N, Er, C>(next: N, error: Er, complete: C) -> FnSink<N, Er, C> {
    FnSink { next, error, complete }
}

impl<T, E, N, Er, C> Sink<T, E> for FnSink<N, Er, C>
where
    N: FnMut(T),
    Er: FnMut(E),
    C: FnMut(),
{
    fn next(&mut self, value: T) {
        (self.next)(value)
    }

    fn error(&mut self, error: E) {
        (self.error)(error)
    }

    fn complete(&mut self) {
        (self.complete)()
    }
}

impl<N, Er, C> Debug for FnSink<N, Er, C> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("FnSink")
    }
}
