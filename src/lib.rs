//! # navflow
//!
//! A reactive, coordinator-based navigation engine for hierarchical UIs,
//! with support for:
//!
//! - **Two-phase navigation** - A side-effect-free validation pass that
//!   accepts or rejects every request before any state mutates
//! - **Hierarchical delegation** - Requests recurse across parents,
//!   children, modals, detours, and tabs until a handler is found
//! - **Smart navigation** - Navigating to a route already on screen pops
//!   back to it instead of pushing duplicates
//! - **Deep-link path building** - Declarative prerequisite stacks built
//!   automatically when deep-linking from an empty stack
//! - **Modal detents** - Sheet sizing published as data for the view layer
//! - **Flow orchestration** - Atomic replacement of whole flows
//! - **Central error reporting** - Every failure funnels through one
//!   embedder-installed reporter
//!
//! # Quick start
//!
//! ```
//! use navflow::{Coordinator, CoordinatorDelegate, Route};
//! use std::borrow::Cow;
//! use std::rc::Rc;
//!
//! #[derive(Clone, PartialEq, Eq, Hash, Debug)]
//! enum AppRoute {
//!     Home,
//!     Detail,
//! }
//!
//! impl Route for AppRoute {
//!     fn identifier(&self) -> Cow<'_, str> {
//!         Cow::Borrowed(match self {
//!             AppRoute::Home => "home",
//!             AppRoute::Detail => "detail",
//!         })
//!     }
//! }
//!
//! struct AppDelegate;
//!
//! impl CoordinatorDelegate<AppRoute> for AppDelegate {
//!     fn can_handle(&self, _route: &AppRoute) -> bool {
//!         true
//!     }
//! }
//!
//! let app = Coordinator::new("app", AppRoute::Home, Rc::new(AppDelegate));
//! assert!(app.navigate(AppRoute::Detail));
//! assert_eq!(app.state().stack(), &[AppRoute::Detail]);
//! ```
//!
//! # Threading
//!
//! The engine is single-threaded and cooperative: every operation runs
//! synchronously on the caller's thread, and observers are notified in
//! mutation order within the same call chain. A `navigate` issued while
//! another navigation is running (from an observer, for example) is
//! deferred and replayed after the current one returns.
//!
//! # Feature flags
//!
//! - `log` (default) - Uses the standard `log` crate for logging
//! - `tracing` - Uses the `tracing` crate for structured logging (mutually
//!   exclusive with `log`)

#![doc(html_root_url = "https://docs.rs/navflow/0.1.0")]
// Lints are configured in Cargo.toml [lints] section

// Logging abstraction
pub mod logging;

// Core data model
pub mod detent;
pub mod route;
pub mod state;
pub mod view;

// State ownership and publication
pub mod router;

// Error handling
pub mod error;

// The coordinator tree and navigate algorithm
pub mod coordinator;
pub mod flow;
pub mod tabs;

// Presentation contexts and back actions
pub mod presentation;

// Re-export main types for convenient access
pub use coordinator::{AnyCoordinator, Coordinator, CoordinatorDelegate, CoordinatorId};
pub use detent::{Detent, ModalDetentConfiguration};
pub use error::{set_error_reporter, FlowError};
pub use flow::FlowOrchestrator;
pub use presentation::{BackAction, PresentationContext};
pub use route::{AnyRoute, Route};
pub use router::{Router, RouterObserver};
pub use state::NavigationState;
pub use tabs::{TabCoordinator, TabItem};
pub use view::{view_factory_fn, AnyView, ErrorView, ViewFactory, ViewSlot};

/// How a route is brought on screen.
///
/// A coordinator answers this for every route it claims via
/// [`CoordinatorDelegate::navigation_type`]. [`Detour`](Self::Detour) is
/// never a valid answer there (detours are presented explicitly through
/// [`Coordinator::present_detour`]) and exists so the engine can reject
/// the misconfiguration with
/// [`InvalidDetourNavigation`](FlowError::InvalidDetourNavigation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationType {
    /// Push onto the navigation stack.
    Push,
    /// Replace the top of the stack (or push when the stack is empty).
    Replace,
    /// Present as a modal via a registered modal coordinator.
    Modal,
    /// Switch to the tab at this index.
    TabSwitch(usize),
    /// Illegal from `navigation_type`; detours are presented explicitly.
    Detour,
}

impl NavigationType {
    /// Whether this type stays within the linear stack (push or replace).
    ///
    /// Only linear entries are allowed in deep-link navigation paths.
    pub fn is_linear(&self) -> bool {
        matches!(self, NavigationType::Push | NavigationType::Replace)
    }
}
