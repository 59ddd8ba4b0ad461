//! The cancellable event dispatch contract.
//!
//! Every event type carries an allow/deny flag defaulting to allow. Subscribers are
//! notified in registration order, in a single pass, and notification never stops early:
//! a subscriber that denies the event does not prevent later subscribers from observing
//! and further mutating it. The only actor that acts on the final flag value is the
//! injected continuation check, after dispatch completes. Denial is normal control flow,
//! never an error.

use std::fmt;

/// The uniform shape every dispatched event exposes.
pub trait CancellableEvent {
    /// Whether the original host logic is currently allowed to continue.
    fn is_allowed(&self) -> bool;

    /// Set the allow/deny flag. Any subscriber may flip it at any point during
    /// notification; the last state when dispatch completes wins.
    fn set_allowed(&mut self, allowed: bool);

    /// Deny with a reason, for subscribers that want to record why.
    fn deny_with(&mut self, reason: String);

    /// The reason given by the last denying subscriber, if any.
    fn denial_reason(&self) -> Option<&str>;
}

/// Allow/deny state embedded in each concrete event type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    denied: bool,
    reason: Option<String>,
}

impl Verdict {
    /// The default-allow verdict.
    #[must_use]
    pub fn allow() -> Self {
        Verdict::default()
    }

    /// Whether the verdict currently allows continuation.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        !self.denied
    }

    /// Flip the flag. Re-allowing clears any recorded reason.
    pub fn set_allowed(&mut self, allowed: bool) {
        self.denied = !allowed;
        if allowed {
            self.reason = None;
        }
    }

    /// Deny, recording a reason.
    pub fn deny_with(&mut self, reason: String) {
        self.denied = true;
        self.reason = Some(reason);
    }

    /// The recorded denial reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

type Subscriber<E> = Box<dyn Fn(&mut E) + Send + Sync>;

/// Ordered subscriber list for one event type.
///
/// Registration order is notification order - there is no priority reordering. The list
/// is append-only and lock-free: dispatch iterates without holding any lock, so a
/// subscriber may reenter instrumented code (and thereby trigger nested dispatch, on
/// this handler or another) without deadlocking. A subscriber registered while a
/// dispatch is in flight is guaranteed to be seen by every later dispatch.
pub struct EventHandler<E> {
    subscribers: boxcar::Vec<Subscriber<E>>,
}

impl<E> EventHandler<E> {
    /// Create a handler with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        EventHandler {
            subscribers: boxcar::Vec::new(),
        }
    }

    /// Register a subscriber; it will be notified after all previously registered ones.
    pub fn subscribe(&self, subscriber: impl Fn(&mut E) + Send + Sync + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.count()
    }

    /// Whether no subscribers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.count() == 0
    }

    /// Notify all subscribers of `event`, in registration order, single pass.
    ///
    /// Does not stop early when a subscriber denies; every subscriber observes the event
    /// and may read and further mutate it. The caller inspects the event's final state
    /// afterwards.
    pub fn dispatch(&self, event: &mut E) {
        for (_, subscriber) in self.subscribers.iter() {
            subscriber(event);
        }
    }
}

impl<E> Default for EventHandler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventHandler<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("subscribers", &self.subscribers.count())
            .finish()
    }
}
