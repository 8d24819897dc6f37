//! Ambient security context.
//!
//! One slot per thread holds the "current" [`Authentication`]. Lifecycle:
//! a request handler enters a [`RequestScope`] at request start and the
//! slot is cleared when the scope is dropped. A [`ContextSwap`] installs a
//! substitute identity and puts the previous one back on drop, on every
//! exit path including unwinding.
//!
//! The slot is thread-local: guards are `!Send` and must not be held
//! across an `.await`.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::Authentication;

thread_local! {
    static CURRENT: RefCell<Option<Arc<Authentication>>> = const { RefCell::new(None) };
}

/// The authentication currently installed on this thread, if any.
#[must_use]
pub fn current() -> Option<Arc<Authentication>> {
    CURRENT.with(|slot| slot.borrow().clone())
}

/// Install `authentication` as the current identity on this thread.
pub fn set(authentication: impl Into<Arc<Authentication>>) {
    replace(Some(authentication.into()));
}

/// Remove any identity from this thread.
pub fn clear() {
    replace(None);
}

fn replace(next: Option<Arc<Authentication>>) -> Option<Arc<Authentication>> {
    CURRENT.with(|slot| slot.replace(next))
}

/// Request-lifetime guard: installs the request's identity and clears the
/// slot when dropped.
#[derive(Debug)]
#[must_use = "the context is cleared as soon as the scope is dropped"]
pub struct RequestScope {
    _not_send: PhantomData<*const ()>,
}

impl RequestScope {
    pub fn enter(authentication: Option<Arc<Authentication>>) -> Self {
        replace(authentication);
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        clear();
    }
}

/// Scoped identity substitution. The identity that was current when the
/// swap was installed is restored on drop.
#[derive(Debug)]
#[must_use = "the substitution is reverted as soon as the guard is dropped"]
pub struct ContextSwap {
    previous: Option<Arc<Authentication>>,
    _not_send: PhantomData<*const ()>,
}

impl ContextSwap {
    pub fn install(substitute: Arc<Authentication>) -> Self {
        let previous = replace(Some(substitute));
        Self {
            previous,
            _not_send: PhantomData,
        }
    }

    /// The identity that will be restored.
    #[must_use]
    pub fn previous(&self) -> Option<&Arc<Authentication>> {
        self.previous.as_ref()
    }
}

impl Drop for ContextSwap {
    fn drop(&mut self) {
        replace(self.previous.take());
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn auth(principal: &str) -> Arc<Authentication> {
        Arc::new(Authentication::builder(principal).authenticated().build())
    }

    fn current_principal() -> Option<String> {
        current().map(|a| a.principal().to_owned())
    }

    #[test]
    fn set_get_clear() {
        clear();
        assert!(current().is_none());

        set(auth("alice"));
        assert_eq!(current_principal().as_deref(), Some("alice"));

        clear();
        assert!(current().is_none());
    }

    #[test]
    fn request_scope_clears_on_drop() {
        clear();
        {
            let _scope = RequestScope::enter(Some(auth("alice")));
            assert_eq!(current_principal().as_deref(), Some("alice"));
        }
        assert!(current().is_none());
    }

    #[test]
    fn swap_restores_previous() {
        clear();
        set(auth("alice"));
        {
            let swap = ContextSwap::install(auth("system"));
            assert_eq!(current_principal().as_deref(), Some("system"));
            assert_eq!(
                swap.previous().map(|a| a.principal()),
                Some("alice")
            );
        }
        assert_eq!(current_principal().as_deref(), Some("alice"));
        clear();
    }

    #[test]
    fn swap_restores_empty_slot() {
        clear();
        {
            let _swap = ContextSwap::install(auth("system"));
            assert!(current().is_some());
        }
        assert!(current().is_none());
    }

    #[test]
    fn nested_swaps_unwind_in_order() {
        clear();
        set(auth("alice"));
        {
            let _outer = ContextSwap::install(auth("bob"));
            {
                let _inner = ContextSwap::install(auth("system"));
                assert_eq!(current_principal().as_deref(), Some("system"));
            }
            assert_eq!(current_principal().as_deref(), Some("bob"));
        }
        assert_eq!(current_principal().as_deref(), Some("alice"));
        clear();
    }

    #[test]
    fn swap_restores_on_panic() {
        clear();
        set(auth("alice"));

        let result = std::panic::catch_unwind(|| {
            let _swap = ContextSwap::install(auth("system"));
            panic!("decision blew up");
        });

        assert!(result.is_err());
        assert_eq!(current_principal().as_deref(), Some("alice"));
        clear();
    }
}
