//! Error handling for the navigation engine
//!
//! Every failure the engine can produce is a [`FlowError`]. All of them flow
//! through a single central reporter, installed once by the embedder; when
//! no reporter is installed they go to the error log. Errors that prevent a
//! navigation are reported before any state mutation and accompanied by a
//! `false` return from `navigate`.

use crate::view::ViewSlot;
use std::fmt;
use std::ops::Range;
use std::sync::OnceLock;

// ============================================================================
// FlowError
// ============================================================================

/// Errors produced by the navigation engine.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowError {
    /// A navigation bubbled to the root of the tree without finding a
    /// handler or a flow change.
    NavigationFailed {
        /// Name of the coordinator the navigation entered at.
        coordinator: String,
        /// Identifier of the unreachable route.
        route_id: String,
        /// Concrete type of the unreachable route.
        route_type: String,
        /// What the engine was doing when it gave up.
        context: String,
    },

    /// The view factory returned nothing for a route that is on screen.
    ViewCreationFailed {
        /// Name of the coordinator whose router was asked.
        coordinator: String,
        /// Identifier of the route with no view.
        route_id: String,
        /// Concrete type of the route with no view.
        route_type: String,
        /// The presentation slot being filled.
        slot: ViewSlot,
    },

    /// A coordinator claimed a route as modal without a registered modal
    /// coordinator capable of presenting it.
    ModalCoordinatorNotConfigured {
        /// Name of the claiming coordinator.
        coordinator: String,
        /// Identifier of the claimed route.
        route_id: String,
        /// Concrete type of the claimed route.
        route_type: String,
    },

    /// `navigation_type` returned `Detour`, which is illegal: detours are
    /// presented explicitly, never through `navigate`.
    InvalidDetourNavigation {
        /// Name of the misconfigured coordinator.
        coordinator: String,
        /// Identifier of the offending route.
        route_id: String,
        /// Concrete type of the offending route.
        route_type: String,
    },

    /// Attaching a child whose subtree already contains the would-be
    /// parent.
    CircularReference {
        /// Name of the coordinator the child was being added to.
        coordinator: String,
    },

    /// Attaching a child that already has a parent.
    DuplicateChild {
        /// Name of the coordinator the child was being added to.
        coordinator: String,
        /// Name of the rejected child.
        child: String,
    },

    /// Tab switch outside the valid range.
    InvalidTabIndex {
        /// The requested index.
        index: usize,
        /// The range of valid indices.
        valid_range: Range<usize>,
    },

    /// Catch-all diagnostic for embedder configuration mistakes.
    ConfigurationError {
        /// What is misconfigured.
        message: String,
    },
}

impl FlowError {
    /// Whether this error is a routing failure (no handler found).
    pub fn is_navigation_failed(&self) -> bool {
        matches!(self, FlowError::NavigationFailed { .. })
    }

    /// Whether this error comes from a missing or declining view factory.
    pub fn is_view_creation_failed(&self) -> bool {
        matches!(self, FlowError::ViewCreationFailed { .. })
    }

    /// Whether this error flags a missing modal coordinator.
    pub fn is_modal_coordinator_not_configured(&self) -> bool {
        matches!(self, FlowError::ModalCoordinatorNotConfigured { .. })
    }

    /// Whether this error flags an illegal detour navigation type.
    pub fn is_invalid_detour_navigation(&self) -> bool {
        matches!(self, FlowError::InvalidDetourNavigation { .. })
    }

    /// Whether this error is a structural (tree-shape) rejection.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            FlowError::CircularReference { .. } | FlowError::DuplicateChild { .. }
        )
    }

    /// The coordinator the error originated in, where applicable.
    pub fn coordinator(&self) -> Option<&str> {
        match self {
            FlowError::NavigationFailed { coordinator, .. }
            | FlowError::ViewCreationFailed { coordinator, .. }
            | FlowError::ModalCoordinatorNotConfigured { coordinator, .. }
            | FlowError::InvalidDetourNavigation { coordinator, .. }
            | FlowError::CircularReference { coordinator }
            | FlowError::DuplicateChild { coordinator, .. } => Some(coordinator),
            FlowError::InvalidTabIndex { .. } | FlowError::ConfigurationError { .. } => None,
        }
    }
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowError::NavigationFailed {
                coordinator,
                route_id,
                route_type,
                context,
            } => write!(
                f,
                "navigation failed in '{coordinator}': no handler for route '{route_id}' ({route_type}): {context}"
            ),
            FlowError::ViewCreationFailed {
                coordinator,
                route_id,
                route_type,
                slot,
            } => write!(
                f,
                "view creation failed in '{coordinator}': no view for route '{route_id}' ({route_type}) in {slot} slot"
            ),
            FlowError::ModalCoordinatorNotConfigured {
                coordinator,
                route_id,
                route_type,
            } => write!(
                f,
                "'{coordinator}' claims route '{route_id}' ({route_type}) as modal but has no capable modal coordinator"
            ),
            FlowError::InvalidDetourNavigation {
                coordinator,
                route_id,
                route_type,
            } => write!(
                f,
                "'{coordinator}' returned the detour navigation type for route '{route_id}' ({route_type}); detours must be presented explicitly"
            ),
            FlowError::CircularReference { coordinator } => write!(
                f,
                "adding this child to '{coordinator}' would create a cycle"
            ),
            FlowError::DuplicateChild { coordinator, child } => write!(
                f,
                "cannot add '{child}' to '{coordinator}': it already has a parent"
            ),
            FlowError::InvalidTabIndex { index, valid_range } => write!(
                f,
                "tab index {index} outside valid range {}..{}",
                valid_range.start, valid_range.end
            ),
            FlowError::ConfigurationError { message } => {
                write!(f, "configuration error: {message}")
            }
        }
    }
}

impl std::error::Error for FlowError {}

// ============================================================================
// Central reporter
// ============================================================================

static REPORTER: OnceLock<Box<dyn Fn(&FlowError) + Send + Sync>> = OnceLock::new();

/// Install the process-wide error reporter.
///
/// Settable once; returns `false` if a reporter was already installed.
/// Until a reporter is installed, errors go to the error log.
///
/// # Example
///
/// ```
/// navflow::set_error_reporter(|error| {
///     eprintln!("navigation error: {error}");
/// });
/// ```
pub fn set_error_reporter<F>(reporter: F) -> bool
where
    F: Fn(&FlowError) + Send + Sync + 'static,
{
    REPORTER.set(Box::new(reporter)).is_ok()
}

/// Dispatch an error to the embedder's reporter, or to the error log when
/// none is installed.
pub(crate) fn report(error: &FlowError) {
    match REPORTER.get() {
        Some(reporter) => reporter(error),
        None => {
            crate::error_log!("{}", error);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared capture plumbing for unit tests.
    //!
    //! The reporter is process-wide and settable once, so tests install a
    //! single reporter that fans out into a thread-local sink; each test
    //! thread then observes only its own errors.

    use super::*;
    use std::cell::RefCell;

    thread_local! {
        static CAPTURED: RefCell<Vec<FlowError>> = const { RefCell::new(Vec::new()) };
    }

    pub fn install_capture() {
        set_error_reporter(|error| {
            CAPTURED.with(|captured| captured.borrow_mut().push(error.clone()));
        });
        take_captured();
    }

    pub fn take_captured() -> Vec<FlowError> {
        CAPTURED.with(|captured| captured.borrow_mut().drain(..).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_navigation_failed() {
        let error = FlowError::NavigationFailed {
            coordinator: "app".to_string(),
            route_id: "settings".to_string(),
            route_type: "AppRoute".to_string(),
            context: "bubbled to root".to_string(),
        };
        let text = error.to_string();
        assert!(text.contains("app"));
        assert!(text.contains("settings"));
        assert!(text.contains("bubbled to root"));
    }

    #[test]
    fn test_display_invalid_tab_index() {
        let error = FlowError::InvalidTabIndex {
            index: 5,
            valid_range: 0..3,
        };
        assert_eq!(error.to_string(), "tab index 5 outside valid range 0..3");
    }

    #[test]
    fn test_predicates() {
        let error = FlowError::ModalCoordinatorNotConfigured {
            coordinator: "app".to_string(),
            route_id: "sheet".to_string(),
            route_type: "AppRoute".to_string(),
        };
        assert!(error.is_modal_coordinator_not_configured());
        assert!(!error.is_navigation_failed());
        assert!(!error.is_structural());
        assert_eq!(error.coordinator(), Some("app"));
    }

    #[test]
    fn test_reporter_captures() {
        testing::install_capture();

        report(&FlowError::ConfigurationError {
            message: "probe".to_string(),
        });

        let captured = testing::take_captured();
        assert_eq!(captured.len(), 1);
        assert_eq!(
            captured[0],
            FlowError::ConfigurationError {
                message: "probe".to_string()
            }
        );
    }
}
