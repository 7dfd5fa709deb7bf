//! Flow orchestration
//!
//! A [`FlowOrchestrator`] sits at the root of the tree and owns at most one
//! active flow coordinator at a time, swapping whole flows atomically
//! (login → main, main → onboarding, and so on). It handles no routes
//! itself; it is the point where bubbled navigations terminate and its
//! delegate's flow-change hook decides whether to swap flows.

use crate::coordinator::{AnyCoordinator, Coordinator, CoordinatorDelegate};
use crate::error::FlowError;
use crate::route::Route;
use crate::router::Router;
use crate::{debug_log, info_log};
use std::cell::RefCell;
use std::rc::Rc;

/// Root coordinator that swaps entire flows.
///
/// # Example
///
/// ```ignore
/// let orchestrator = Rc::new(FlowOrchestrator::new("app", AppRoute::Launch, delegate.clone()));
/// // Inside the delegate's `handle_flow_change`:
/// orchestrator.transition_to_flow(main_flow.as_any_coordinator(), AppRoute::Main)?;
/// ```
pub struct FlowOrchestrator<R: Route> {
    core: Rc<Coordinator<R>>,
    current_flow: RefCell<Option<Rc<dyn AnyCoordinator>>>,
}

impl<R: Route> FlowOrchestrator<R> {
    /// Create an orchestrator rooted at `root`.
    pub fn new(
        name: impl Into<String>,
        root: R,
        delegate: Rc<dyn CoordinatorDelegate<R>>,
    ) -> Self {
        Self {
            core: Coordinator::new(name, root, delegate),
            current_flow: RefCell::new(None),
        }
    }

    /// The underlying coordinator.
    pub fn coordinator(&self) -> &Rc<Coordinator<R>> {
        &self.core
    }

    /// This orchestrator as a type-erased coordinator handle.
    pub fn as_any_coordinator(&self) -> Rc<dyn AnyCoordinator> {
        self.core.as_any_coordinator()
    }

    /// The active flow coordinator, if one is installed.
    pub fn current_flow(&self) -> Option<Rc<dyn AnyCoordinator>> {
        self.current_flow.borrow().clone()
    }

    /// Atomically replace the active flow.
    ///
    /// Removes the previous flow as a child (clearing its parent link so
    /// it can be released once the embedder drops its handle), installs
    /// `flow`, and rewrites the root to `root`, clearing all transient
    /// state.
    pub fn transition_to_flow(
        &self,
        flow: Rc<dyn AnyCoordinator>,
        root: R,
    ) -> Result<(), FlowError> {
        let previous = self.current_flow.borrow_mut().take();
        if let Some(previous) = previous {
            debug_log!(
                "'{}': removing previous flow '{}'",
                self.core.name(),
                previous.name()
            );
            self.core.remove_child(&previous);
        }

        info_log!(
            "'{}': transitioning to flow '{}' rooted at '{}'",
            self.core.name(),
            flow.name(),
            root.identifier()
        );
        self.core.add_child(flow.clone())?;
        *self.current_flow.borrow_mut() = Some(flow);
        self.core.transition_to_new_flow(root);
        Ok(())
    }

    /// Navigate to a route. See [`Coordinator::navigate`].
    pub fn navigate(&self, route: R) -> bool {
        self.core.navigate(route)
    }

    /// This orchestrator's router.
    pub fn router(&self) -> &Router<R> {
        self.core.router()
    }
}
