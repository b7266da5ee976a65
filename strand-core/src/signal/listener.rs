//! Change listener types.
//!
//! A [`TransientListener`] is the single notification contract used by the
//! whole signal runtime. It is invoked with a flag telling whether the
//! change it is waiting for had already happened at registration time, and
//! its return value decides whether it stays subscribed for the next change.

/// A change callback that can renew or drop its own subscription.
///
/// Listeners are invoked at most once per change. Returning `true` keeps the
/// listener subscribed for the following change; returning `false` ends the
/// subscription.
///
/// A blanket implementation covers plain closures:
///
/// ```rust,ignore
/// usage.on_next_change(Box::new(|already_changed: bool| {
///     println!("changed (already: {already_changed})");
///     false // stop after the first delivery
/// }));
/// ```
pub trait TransientListener: Send {
    /// Notifies the listener.
    ///
    /// `already_changed` is `true` when the listener is invoked directly at
    /// registration time because the change had already happened, and
    /// `false` for deliveries triggered by a later change.
    ///
    /// Returns `true` to stay subscribed for the next change.
    fn invoke(&mut self, already_changed: bool) -> bool;
}

impl<F> TransientListener for F
where
    F: FnMut(bool) -> bool + Send,
{
    fn invoke(&mut self, already_changed: bool) -> bool {
        self(already_changed)
    }
}

/// Handle for removing a listener registered through
/// [`Usage::on_next_change`](super::Usage::on_next_change).
///
/// Invoking [`cleanup`](CleanupHandle::cleanup) before the listener fires
/// unregisters it. Once the listener has fired and declined renewal the
/// handle is a no-op. Dropping the handle without calling `cleanup` leaves
/// the registration in place.
pub struct CleanupHandle {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl CleanupHandle {
    /// Creates a handle wrapping the given removal action.
    pub fn new(remove: impl FnOnce() + Send + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }

    /// A handle with nothing to clean up.
    pub fn noop() -> Self {
        Self { remove: None }
    }

    /// Removes the registration this handle belongs to, if it still exists.
    pub fn cleanup(self) {
        if let Some(remove) = self.remove {
            remove();
        }
    }
}

impl std::fmt::Debug for CleanupHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupHandle")
            .field("armed", &self.remove.is_some())
            .finish()
    }
}
