// implementation of the push-pull channel.
//
// the basic architecture is as such:
//
// channel handles wrap around Arc<Mutex<shared state>>
//                                         |
//          /------------------------------/
//          v
//       shared state
//          |
//          |------ it contains a queue, which is either a buffer of values pushed but not yet
//          |       pulled, or a queue of waiters for pulls made while nothing was buffered. it is
//          |       never both at once: a push finding a waiter hands the value straight to it, and
//          |       a pull finding a buffered value takes it straight away.
//          |
//          |------ each waiter is the send half of a oneshot. the pull future holds the receive
//          |       half, so resolving a pull is just sending into its oneshot. if the pull future
//          |       was dropped the send fails and the value moves on to the next waiter.
//          |
//          |------ it contains the lifecycle state: running, finished, or failed with an error.
//          |       once it leaves running it never changes again.
//          |
//          \------ it contains an optional disposer, run when a consumer closes the channel.
//
// no user code is ever called while the mutex is held. the disposer is cloned out and run after
// unlocking.
//
// the organization of these modules is as such:
//
//      core: The state machine. Safe and minimal, but works in terms of raw outcomes and waiters.
//       ^
//       |
//      api: A wrapper around core that adapts it into the public handle, futures, and stream
//           types. The crate re-exports this API publically.
//
// there is also the error module, which contains the relevant error types, which is also
// re-exported publically.

pub(crate) mod error;
pub(crate) mod api;

mod core;
