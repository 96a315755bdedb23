//! Push-pull channel: an asynchronous queue bridging push-style producers and pull-style
//! consumers.
//!
//! A [`Channel`] accepts values from a producer which calls [`push`](Channel::push),
//! [`complete`](Channel::complete), and [`fail`](Channel::fail) whenever it likes, and hands them
//! out to consumers which [`pull`](Channel::pull) one value at a time, waiting when nothing is
//! buffered. The [`sink`] module adapts channels to and from callback-style producers, the
//! [`source`] module is the pull-style side, and [`Drain`] forwards a pull-style source into a
//! sink.
//!
//! ```
//! use futures::executor::block_on;
//!
//! let chan = pushpull::channel::<u32, String>();
//! chan.push(1);
//! chan.push(2);
//! chan.complete();
//!
//! assert_eq!(block_on(chan.pull()), Ok(Some(1)));
//! assert_eq!(block_on(chan.pull()), Ok(Some(2)));
//! assert_eq!(block_on(chan.pull()), Ok(None));
//! ```

#[macro_use]
extern crate tracing;

mod channel;
mod drain;
pub mod combinator;
pub mod sink;
pub mod source;
pub mod util;

pub use crate::{
    channel::api::*,
    drain::*,
    util::disposer::Disposer,
};

/// Error types
pub mod error {
    pub use crate::channel::error::*;
}

/// Future and stream types
pub mod future {
    pub use crate::channel::api::future::*;
}
