//! Ordered shape-rule table driving polymorphic wrapper construction.
//!
//! The concrete [`WrapperKind`] for a host object is chosen by evaluating an ordered
//! list of shape predicates, most specific first; the first match wins and anything
//! unmatched falls back to [`WrapperKind::Generic`]. The table is configuration data
//! supplied by the surrounding domain catalog - the cache never inspects host shapes
//! itself, so new shapes are added by extending the table, not by touching dispatch
//! logic.

use crate::host::{HostObject, HostTraits};
use crate::wrappers::WrapperKind;

/// Predicate over a host object's runtime shape.
pub type ShapePredicate = fn(&HostObject) -> bool;

/// One catalog entry: when `matches` holds, construct `kind`.
#[derive(Debug, Clone, Copy)]
pub struct ShapeRule {
    /// Predicate evaluated against the host object's runtime shape
    pub matches: ShapePredicate,
    /// Wrapper subtype constructed when the predicate is the first to match
    pub kind: WrapperKind,
}

/// The ordered rule list, evaluated front to back.
#[derive(Debug, Clone, Default)]
pub struct ShapeTable {
    rules: Vec<ShapeRule>,
}

impl ShapeTable {
    /// Create an empty table; everything classifies as [`WrapperKind::Generic`].
    #[must_use]
    pub fn new() -> Self {
        ShapeTable { rules: Vec::new() }
    }

    /// The standard catalog slice, ordered most specific first.
    #[must_use]
    pub fn standard() -> Self {
        ShapeTable {
            rules: vec![
                ShapeRule {
                    matches: |host| host.traits().contains(HostTraits::EXPLOSIVE),
                    kind: WrapperKind::FragGrenade,
                },
                ShapeRule {
                    matches: |host| host.traits().contains(HostTraits::THROWABLE),
                    kind: WrapperKind::Throwable,
                },
                ShapeRule {
                    matches: |host| host.traits().contains(HostTraits::TRANSMITTER),
                    kind: WrapperKind::Radio,
                },
                ShapeRule {
                    matches: |host| host.traits().contains(HostTraits::PROTECTIVE),
                    kind: WrapperKind::Armor,
                },
                ShapeRule {
                    matches: |host| host.traits().contains(HostTraits::ACCESS_PASS),
                    kind: WrapperKind::Keycard,
                },
                ShapeRule {
                    matches: |host| host.traits().contains(HostTraits::CONSUMABLE),
                    kind: WrapperKind::Consumable,
                },
                ShapeRule {
                    matches: |host| host.traits().contains(HostTraits::USABLE),
                    kind: WrapperKind::Usable,
                },
            ],
        }
    }

    /// Append a rule; later rules only see objects no earlier rule matched.
    pub fn push(&mut self, rule: ShapeRule) {
        self.rules.push(rule);
    }

    /// Classify a host object: first matching rule wins, generic otherwise.
    #[must_use]
    pub fn classify(&self, host: &HostObject) -> WrapperKind {
        self.rules
            .iter()
            .find(|rule| (rule.matches)(host))
            .map(|rule| rule.kind)
            .unwrap_or(WrapperKind::Generic)
    }
}
