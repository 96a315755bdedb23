//! Exactly-once cleanup actions.

use std::{
    fmt::{self, Formatter, Debug},
    mem::MaybeUninit,
    sync::{
        atomic::{
            Ordering::{AcqRel, Acquire},
            AtomicBool,
        },
        Arc,
    },
};


type Action = Box<dyn FnOnce() + Send>;

// like an atomic `Option<Action>` that can be `take`n once.
struct OnceAction {
    // action is initialized if armed is true. the thread that transitions it from true to false
    // claims the right to read it and take ownership of it.
    armed: AtomicBool,
    action: MaybeUninit<Action>,
}

// safety: the action is only ever moved out by the single caller that wins the swap on `armed`,
// so sharing a `&OnceAction` never gives two threads access to it.
unsafe impl Sync for OnceAction {}

impl OnceAction {
    fn some(action: Action) -> Self {
        OnceAction {
            armed: AtomicBool::new(true),
            action: MaybeUninit::new(action),
        }
    }

    fn none() -> Self {
        OnceAction {
            armed: AtomicBool::new(false),
            action: MaybeUninit::uninit(),
        }
    }

    fn take(&self) -> Option<Action> {
        if self.armed.swap(false, AcqRel) {
            Some(unsafe { self.action.as_ptr().read() })
        } else {
            None
        }
    }

    fn is_armed(&self) -> bool {
        self.armed.load(Acquire)
    }
}

impl Drop for OnceAction {
    fn drop(&mut self) {
        // drop the action without running it if never disposed
        drop(self.take());
    }
}


/// Zero-argument cleanup action which runs at most once
///
/// Clones share the same action: whichever clone calls [`dispose`](Self::dispose) first runs it,
/// and every later call, on any clone, does nothing. Dropping every clone without disposing drops
/// the action without running it.
#[derive(Clone)]
pub struct Disposer(Arc<OnceAction>);

impl Disposer {
    /// Wrap a cleanup action
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Disposer(Arc::new(OnceAction::some(Box::new(action))))
    }

    /// Construct a disposer that does nothing
    pub fn noop() -> Self {
        Disposer(Arc::new(OnceAction::none()))
    }

    /// Run the action, unless it has already run
    ///
    /// Returns whether this call was the one that ran it.
    pub fn dispose(&self) -> bool {
        match self.0.take() {
            Some(action) => {
                trace!("running disposer");
                action();
                true
            }
            None => false,
        }
    }

    /// Whether the action is still waiting to run
    pub fn is_armed(&self) -> bool {
        self.0.is_armed()
    }
}

impl Default for Disposer {
    fn default() -> Self {
        Disposer::noop()
    }
}

impl Debug for Disposer {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("armed", &self.is_armed())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering::Relaxed},
            Barrier,
        },
        thread,
    };

    #[test]
    fn runs_once_across_clones() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_2 = Arc::clone(&count);
        let disposer = Disposer::new(move || { count_2.fetch_add(1, Relaxed); });
        let clone = disposer.clone();

        assert!(disposer.dispose());
        assert!(!clone.dispose());
        assert!(!disposer.dispose());
        assert_eq!(count.load(Relaxed), 1);
        assert!(!clone.is_armed());
    }

    #[test]
    fn runs_once_under_contention() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_2 = Arc::clone(&count);
        let disposer = Disposer::new(move || { count_2.fetch_add(1, Relaxed); });
        let barrier = Arc::new(Barrier::new(8));

        let joins = (0..8)
            .map(|_| {
                let disposer = disposer.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    disposer.dispose()
                })
            })
            .collect::<Vec<_>>();
        let winners = joins.into_iter()
            .map(|join| join.join().unwrap())
            .filter(|&won| won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(count.load(Relaxed), 1);
    }

    #[test]
    fn dropping_unrun_action_does_not_run_it() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_2 = Arc::clone(&count);
        let disposer = Disposer::new(move || { count_2.fetch_add(1, Relaxed); });
        drop(disposer);
        assert_eq!(count.load(Relaxed), 0);
    }

    #[test]
    fn noop_is_not_armed() {
        let disposer = Disposer::noop();
        assert!(!disposer.is_armed());
        assert!(!disposer.dispose());
    }
}
