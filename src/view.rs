//! View factory contract
//!
//! The engine never interprets views: the embedder supplies a
//! [`ViewFactory`] mapping routes to opaque [`AnyView`] values, and the view
//! layer downcasts them back on its side of the boundary. When a factory is
//! missing or declines a route that is on screen, the engine reports
//! [`ViewCreationFailed`](crate::FlowError::ViewCreationFailed) and
//! substitutes a fallback [`ErrorView`] so the UI never blanks.

use crate::error::FlowError;
use crate::route::Route;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// The presentation slot a view is being built for.
///
/// Carried in [`ViewCreationFailed`](crate::FlowError::ViewCreationFailed)
/// payloads so embedders can tell which part of the screen failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewSlot {
    /// The coordinator's root content.
    Root,
    /// An entry of the push stack.
    Pushed,
    /// The presented modal sheet or cover.
    Modal,
    /// The presented detour overlay.
    Detour,
}

impl fmt::Display for ViewSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViewSlot::Root => "root",
            ViewSlot::Pushed => "pushed",
            ViewSlot::Modal => "modal",
            ViewSlot::Detour => "detour",
        };
        f.write_str(name)
    }
}

// ============================================================================
// AnyView
// ============================================================================

/// An opaque view value.
///
/// The engine only moves these around; the view layer knows the concrete
/// type and recovers it with [`downcast`](AnyView::downcast).
pub struct AnyView(Box<dyn Any>);

impl AnyView {
    /// Wrap a concrete view value.
    pub fn new<V: 'static>(view: V) -> Self {
        Self(Box::new(view))
    }

    /// Whether the wrapped view is of type `V`.
    pub fn is<V: 'static>(&self) -> bool {
        self.0.is::<V>()
    }

    /// Recover the concrete view, or get the wrapper back on a type
    /// mismatch.
    pub fn downcast<V: 'static>(self) -> Result<Box<V>, AnyView> {
        self.0.downcast::<V>().map_err(AnyView)
    }

    /// Borrow the concrete view, if it is of type `V`.
    pub fn downcast_ref<V: 'static>(&self) -> Option<&V> {
        self.0.downcast_ref::<V>()
    }
}

impl fmt::Debug for AnyView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AnyView")
    }
}

// ============================================================================
// ErrorView
// ============================================================================

/// Fallback view data substituted when view creation fails.
///
/// Rendering is up to the view layer; the engine only guarantees that a
/// failed slot yields *something* to display instead of going blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorView {
    /// Human-readable description of the failure.
    pub message: String,
}

impl ErrorView {
    /// Build the fallback for a reported error.
    pub fn new(error: &FlowError) -> Self {
        Self {
            message: error.to_string(),
        }
    }
}

// ============================================================================
// ViewFactory
// ============================================================================

/// Builds views for routes. Pure; supplied by the embedder.
///
/// # Example
///
/// ```
/// use navflow::{view_factory_fn, AnyView, Route, ViewFactory};
/// use std::borrow::Cow;
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug)]
/// struct Page(&'static str);
///
/// impl Route for Page {
///     fn identifier(&self) -> Cow<'_, str> {
///         Cow::Borrowed(self.0)
///     }
/// }
///
/// let factory = view_factory_fn(|route: &Page| Some(AnyView::new(route.0)));
/// assert!(factory.build_view(&Page("home")).is_some());
/// ```
pub trait ViewFactory<R: Route>: 'static {
    /// Build the view for a route. `None` is a defined error condition
    /// ([`ViewCreationFailed`](crate::FlowError::ViewCreationFailed)).
    fn build_view(&self, route: &R) -> Option<AnyView>;

    /// The fallback view substituted when [`build_view`](Self::build_view)
    /// fails for a slot that is being displayed.
    fn error_view(&self, error: &FlowError) -> AnyView {
        AnyView::new(ErrorView::new(error))
    }
}

struct FnViewFactory<F>(F);

impl<R, F> ViewFactory<R> for FnViewFactory<F>
where
    R: Route,
    F: Fn(&R) -> Option<AnyView> + 'static,
{
    fn build_view(&self, route: &R) -> Option<AnyView> {
        (self.0)(route)
    }
}

/// Wrap a closure as a [`ViewFactory`].
pub fn view_factory_fn<R, F>(factory: F) -> Rc<dyn ViewFactory<R>>
where
    R: Route,
    F: Fn(&R) -> Option<AnyView> + 'static,
{
    Rc::new(FnViewFactory(factory))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[derive(Clone, PartialEq, Eq, Hash, Debug)]
    struct Page(&'static str);

    impl Route for Page {
        fn identifier(&self) -> Cow<'_, str> {
            Cow::Borrowed(self.0)
        }
    }

    #[test]
    fn test_any_view_downcast() {
        let view = AnyView::new("content");
        assert!(view.is::<&str>());
        assert_eq!(view.downcast::<&str>().ok().as_deref(), Some(&"content"));
    }

    #[test]
    fn test_any_view_downcast_mismatch() {
        let view = AnyView::new(42u32);
        let back = view.downcast::<String>();
        assert!(back.is_err());
    }

    #[test]
    fn test_factory_fn_declines() {
        let factory = view_factory_fn(|route: &Page| {
            if route.0 == "known" {
                Some(AnyView::new(route.0))
            } else {
                None
            }
        });

        assert!(factory.build_view(&Page("known")).is_some());
        assert!(factory.build_view(&Page("unknown")).is_none());
    }

    #[test]
    fn test_default_error_view_is_error_view_data() {
        let factory = view_factory_fn(|_route: &Page| None);
        let error = FlowError::ConfigurationError {
            message: "broken".to_string(),
        };
        let fallback = factory.error_view(&error);
        let data = fallback.downcast_ref::<ErrorView>().expect("fallback data");
        assert!(data.message.contains("broken"));
    }
}
