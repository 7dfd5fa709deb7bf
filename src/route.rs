//! Route definitions and type erasure
//!
//! A [`Route`] is a value a coordinator can navigate to. Coordinators are
//! parameterized by their own route type; when a navigation request crosses
//! a coordinator boundary it travels as an [`AnyRoute`], a type-erased
//! handle that compares by identifier only and can be downcast back to the
//! concrete type on the other side.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A navigation destination.
///
/// Routes are immutable values with a stable string identifier. Within a
/// single coordinator the concrete type is known and full value equality
/// applies; across coordinator boundaries the engine compares routes by
/// identifier only.
///
/// # Example
///
/// ```
/// use navflow::Route;
/// use std::borrow::Cow;
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug)]
/// enum ShopRoute {
///     Catalog,
///     Product(u32),
/// }
///
/// impl Route for ShopRoute {
///     fn identifier(&self) -> Cow<'_, str> {
///         match self {
///             ShopRoute::Catalog => Cow::Borrowed("catalog"),
///             ShopRoute::Product(id) => Cow::Owned(format!("product-{id}")),
///         }
///     }
/// }
///
/// assert_eq!(ShopRoute::Product(7).identifier(), "product-7");
/// ```
pub trait Route: Clone + PartialEq + Eq + Hash + fmt::Debug + 'static {
    /// Stable identifier used for cross-type comparison and diagnostics.
    fn identifier(&self) -> Cow<'_, str>;
}

// ============================================================================
// AnyRoute
// ============================================================================

/// Type-erased route handle.
///
/// Carries the original route value (recoverable via
/// [`downcast_ref`](AnyRoute::downcast_ref)), its identifier, and its type
/// name for error payloads. Equality and hashing use the identifier only,
/// which is the defined cross-type comparison rule: two routes of different
/// concrete types are equal exactly when their identifiers are equal.
#[derive(Clone)]
pub struct AnyRoute {
    identifier: Rc<str>,
    route_type: &'static str,
    value: Rc<dyn Any>,
}

impl AnyRoute {
    /// Erase a concrete route.
    pub fn new<R: Route>(route: R) -> Self {
        let identifier = Rc::from(route.identifier().as_ref());
        Self {
            identifier,
            route_type: std::any::type_name::<R>(),
            value: Rc::new(route),
        }
    }

    /// The route's identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Name of the concrete route type this handle was erased from.
    ///
    /// Diagnostic only; carried into error payloads.
    pub fn route_type(&self) -> &'static str {
        self.route_type
    }

    /// Whether the erased value is of route type `R`.
    pub fn is<R: Route>(&self) -> bool {
        self.value.is::<R>()
    }

    /// Recover the concrete route, if this handle erases an `R`.
    pub fn downcast_ref<R: Route>(&self) -> Option<&R> {
        self.value.downcast_ref::<R>()
    }
}

impl PartialEq for AnyRoute {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for AnyRoute {}

impl Hash for AnyRoute {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
    }
}

impl fmt::Debug for AnyRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyRoute")
            .field("identifier", &self.identifier)
            .field("route_type", &self.route_type)
            .finish()
    }
}

impl fmt::Display for AnyRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Eq, Hash, Debug)]
    struct Screen(&'static str);

    impl Route for Screen {
        fn identifier(&self) -> Cow<'_, str> {
            Cow::Borrowed(self.0)
        }
    }

    #[derive(Clone, PartialEq, Eq, Hash, Debug)]
    struct Sheet(String);

    impl Route for Sheet {
        fn identifier(&self) -> Cow<'_, str> {
            Cow::Borrowed(&self.0)
        }
    }

    #[test]
    fn test_identifier_round_trip() {
        let erased = AnyRoute::new(Screen("home"));
        assert_eq!(erased.identifier(), "home");
        assert_eq!(erased.downcast_ref::<Screen>(), Some(&Screen("home")));
    }

    #[test]
    fn test_downcast_wrong_type() {
        let erased = AnyRoute::new(Screen("home"));
        assert!(erased.is::<Screen>());
        assert!(!erased.is::<Sheet>());
        assert_eq!(erased.downcast_ref::<Sheet>(), None);
    }

    #[test]
    fn test_cross_type_identifier_equality() {
        let a = AnyRoute::new(Screen("profile"));
        let b = AnyRoute::new(Sheet("profile".to_string()));
        let c = AnyRoute::new(Sheet("settings".to_string()));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_debug_carries_type_name() {
        let erased = AnyRoute::new(Screen("home"));
        let debug = format!("{erased:?}");
        assert!(debug.contains("home"));
        assert!(debug.contains("Screen"));
    }
}
