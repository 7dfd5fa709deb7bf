//! Navigation state container
//!
//! [`NavigationState`] is the value a [`Router`](crate::Router) owns and
//! publishes. It is a plain container; every mutation goes through the
//! router so observers see each change exactly once.

use crate::coordinator::AnyCoordinator;
use crate::detent::ModalDetentConfiguration;
use crate::route::{AnyRoute, Route};
use std::fmt;
use std::rc::Rc;

/// The complete navigation state of one coordinator.
///
/// Equality is by value on the primitive fields, by identifier on the
/// type-erased detour slot, and by handle identity on the pushed-children
/// list. That makes snapshots directly comparable in tests and lets
/// observers cheaply detect no-op publishes.
#[derive(Clone)]
pub struct NavigationState<R: Route> {
    root: R,
    stack: Vec<R>,
    selected_tab: usize,
    presented: Option<R>,
    detour: Option<AnyRoute>,
    pushed_children: Vec<Rc<dyn AnyCoordinator>>,
    modal_detent_configuration: Option<ModalDetentConfiguration>,
}

impl<R: Route> NavigationState<R> {
    pub(crate) fn new(root: R) -> Self {
        Self {
            root,
            stack: Vec::new(),
            selected_tab: 0,
            presented: None,
            detour: None,
            pushed_children: Vec::new(),
            modal_detent_configuration: None,
        }
    }

    /// The flow root. Only rewritten by a flow transition.
    pub fn root(&self) -> &R {
        &self.root
    }

    /// Pushed routes, oldest first. The last element is visible unless a
    /// modal or detour is active.
    pub fn stack(&self) -> &[R] {
        &self.stack
    }

    /// Selected tab index. Only meaningful for tab coordinators.
    pub fn selected_tab(&self) -> usize {
        self.selected_tab
    }

    /// The modal route presented by this coordinator, if any.
    pub fn presented(&self) -> Option<&R> {
        self.presented.as_ref()
    }

    /// The route shown by an active detour rooted here, if any.
    ///
    /// Type-erased: detours may come from anywhere in the tree.
    pub fn detour(&self) -> Option<&AnyRoute> {
        self.detour.as_ref()
    }

    /// Child coordinators pushed into this coordinator's stack, in push
    /// order. The view layer flattens their routes into the parent's
    /// navigation path.
    pub fn pushed_children(&self) -> &[Rc<dyn AnyCoordinator>] {
        &self.pushed_children
    }

    /// Detent configuration of the presented modal, if any.
    pub fn modal_detent_configuration(&self) -> Option<&ModalDetentConfiguration> {
        self.modal_detent_configuration.as_ref()
    }

    /// The route currently on screen for this coordinator: the presented
    /// modal, else the top of the stack, else the root.
    pub fn current_route(&self) -> &R {
        self.presented
            .as_ref()
            .or_else(|| self.stack.last())
            .unwrap_or(&self.root)
    }

    /// Root plus stack, in display order. This is what the view layer
    /// flattens when this coordinator is pushed into a parent's stack.
    pub fn all_routes(&self) -> Vec<R> {
        let mut routes = Vec::with_capacity(self.stack.len() + 1);
        routes.push(self.root.clone());
        routes.extend(self.stack.iter().cloned());
        routes
    }

    // ------------------------------------------------------------------
    // Mutators, router-internal
    // ------------------------------------------------------------------

    pub(crate) fn push(&mut self, route: R) {
        self.stack.push(route);
    }

    pub(crate) fn pop(&mut self) -> Option<R> {
        self.stack.pop()
    }

    /// Truncate the stack to the first occurrence of `route`, inclusive.
    /// Returns false when the route is not on the stack.
    pub(crate) fn pop_to(&mut self, route: &R) -> bool {
        match self.stack.iter().position(|r| r == route) {
            Some(index) => {
                self.stack.truncate(index + 1);
                true
            }
            None => false,
        }
    }

    pub(crate) fn pop_to_root(&mut self) {
        self.stack.clear();
    }

    pub(crate) fn replace(&mut self, route: R) {
        match self.stack.last_mut() {
            Some(last) => *last = route,
            None => self.stack.push(route),
        }
    }

    pub(crate) fn present(&mut self, route: R, config: Option<ModalDetentConfiguration>) {
        self.presented = Some(route);
        self.modal_detent_configuration = config;
    }

    pub(crate) fn dismiss_modal(&mut self) -> bool {
        let was_presented = self.presented.is_some();
        self.presented = None;
        self.modal_detent_configuration = None;
        was_presented
    }

    pub(crate) fn present_detour(&mut self, route: AnyRoute) {
        self.detour = Some(route);
    }

    pub(crate) fn dismiss_detour(&mut self) -> bool {
        self.detour.take().is_some()
    }

    pub(crate) fn push_child(&mut self, child: Rc<dyn AnyCoordinator>) {
        self.pushed_children.push(child);
    }

    pub(crate) fn pop_child(&mut self) -> Option<Rc<dyn AnyCoordinator>> {
        self.pushed_children.pop()
    }

    pub(crate) fn remove_child(&mut self, id: crate::coordinator::CoordinatorId) -> bool {
        match self.pushed_children.iter().position(|c| c.id() == id) {
            Some(index) => {
                self.pushed_children.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn take_pushed_children(&mut self) -> Vec<Rc<dyn AnyCoordinator>> {
        std::mem::take(&mut self.pushed_children)
    }

    pub(crate) fn select_tab(&mut self, index: usize) {
        self.selected_tab = index;
    }

    pub(crate) fn set_root(&mut self, root: R) {
        self.root = root;
        self.stack.clear();
        self.presented = None;
        self.detour = None;
        self.pushed_children.clear();
        self.modal_detent_configuration = None;
    }

    pub(crate) fn ensure_modal_detent_configuration(&mut self) -> &mut ModalDetentConfiguration {
        self.modal_detent_configuration
            .get_or_insert_with(ModalDetentConfiguration::default)
    }

    pub(crate) fn has_presented(&self) -> bool {
        self.presented.is_some()
    }
}

impl<R: Route> PartialEq for NavigationState<R> {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
            && self.stack == other.stack
            && self.selected_tab == other.selected_tab
            && self.presented == other.presented
            && self.detour.as_ref().map(AnyRoute::identifier)
                == other.detour.as_ref().map(AnyRoute::identifier)
            && self.pushed_children.len() == other.pushed_children.len()
            && self
                .pushed_children
                .iter()
                .zip(other.pushed_children.iter())
                .all(|(a, b)| a.id() == b.id())
            && self.modal_detent_configuration == other.modal_detent_configuration
    }
}

impl<R: Route> fmt::Debug for NavigationState<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationState")
            .field("root", &self.root)
            .field("stack", &self.stack)
            .field("selected_tab", &self.selected_tab)
            .field("presented", &self.presented)
            .field("detour", &self.detour)
            .field(
                "pushed_children",
                &self
                    .pushed_children
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect::<Vec<_>>(),
            )
            .field("modal_detent_configuration", &self.modal_detent_configuration)
            .finish()
    }
}
