//! Coordinators and the two-phase navigate algorithm
//!
//! A [`Coordinator`] is a node in the navigation tree. It owns a
//! [`Router`], a permanent list of child coordinators, a registry of modal
//! coordinators, and at most one active modal and one active detour.
//! Behavior is configured through a [`CoordinatorDelegate`]; the engine
//! owns the algorithm.
//!
//! `navigate` runs in two strictly separated phases. The validation pass
//! walks the reachable subtree without side effects and either accepts the
//! request or rejects it with a [`FlowError`]; only an accepted request
//! enters the execution pass, which re-walks the same decision tree and
//! mutates routers. A failed navigation therefore leaves every router in
//! the tree untouched.
//!
//! Reentrant navigation (a `navigate` issued from a state observer or a
//! flow-change hook while another navigation is running) is deferred and
//! replayed as a fresh top-level navigation once the current one returns.

use crate::detent::{Detent, ModalDetentConfiguration};
use crate::error::{report, FlowError};
use crate::presentation::PresentationContext;
use crate::route::{AnyRoute, Route};
use crate::router::Router;
use crate::tabs::TabItem;
use crate::view::ViewSlot;
use crate::NavigationType;
use crate::{debug_log, trace_log, warn_log};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// CoordinatorId
// ============================================================================

/// Process-unique identity of a coordinator.
///
/// Used for caller tracking during delegation and for handle comparison in
/// published state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinatorId(u64);

impl CoordinatorId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

// ============================================================================
// CoordinatorDelegate
// ============================================================================

/// Embedder-supplied behavior of a coordinator.
///
/// Every method has a default, so a delegate only describes what its
/// coordinator actually does. `can_handle` is a pure query: it may be
/// called many times per navigation, including during validation, and must
/// not mutate anything.
///
/// # Example
///
/// ```
/// use navflow::{CoordinatorDelegate, NavigationType, Route};
/// use std::borrow::Cow;
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug)]
/// enum SettingsRoute {
///     Overview,
///     Account,
/// }
///
/// impl Route for SettingsRoute {
///     fn identifier(&self) -> Cow<'_, str> {
///         Cow::Borrowed(match self {
///             SettingsRoute::Overview => "overview",
///             SettingsRoute::Account => "account",
///         })
///     }
/// }
///
/// struct SettingsDelegate;
///
/// impl CoordinatorDelegate<SettingsRoute> for SettingsDelegate {
///     fn can_handle(&self, _route: &SettingsRoute) -> bool {
///         true
///     }
/// }
/// ```
pub trait CoordinatorDelegate<R: Route>: 'static {
    /// Whether this coordinator handles `route` itself. Pure; must not
    /// mutate. Default: `false`.
    fn can_handle(&self, _route: &R) -> bool {
        false
    }

    /// How a claimed route is brought on screen. Default: push.
    ///
    /// Returning [`NavigationType::Modal`] without a capable registered
    /// modal coordinator is a configuration error, caught during
    /// validation. Returning [`NavigationType::Detour`] is always an
    /// error: detours are presented explicitly.
    fn navigation_type(&self, _route: &R) -> NavigationType {
        NavigationType::Push
    }

    /// Declarative prerequisites for deep-linking into `route`.
    ///
    /// When the stack is empty at execution time, the entries are pushed or
    /// replaced in order before the target itself is handled. Entries must
    /// all have linear navigation types (push or replace). Default: none.
    fn navigation_path(&self, _route: &R) -> Option<Vec<R>> {
        None
    }

    /// Detent configuration for a route this coordinator presents
    /// modally. Default: none (the view layer falls back to a large
    /// sheet).
    fn modal_detent_configuration(&self, _route: &R) -> Option<ModalDetentConfiguration> {
        None
    }

    /// Whether a bubble that reached this (root) coordinator can be
    /// answered with a flow change. Pure counterpart of
    /// [`handle_flow_change`](Self::handle_flow_change). Default: `false`.
    fn can_handle_flow_change(&self, _route: &AnyRoute) -> bool {
        false
    }

    /// Perform the flow change for `route`, typically by swapping flows on
    /// a [`FlowOrchestrator`](crate::FlowOrchestrator). Called only during
    /// execution, after `can_handle_flow_change` accepted the route during
    /// validation. Default: `false`.
    fn handle_flow_change(&self, _route: &AnyRoute) -> bool {
        false
    }

    /// Whether this coordinator should clean its transient state before
    /// bubbling `route` to its parent. Default: `false`.
    fn should_clean_state_for_bubbling(&self, _route: &AnyRoute) -> bool {
        false
    }

    /// Whether an active modal that did not handle `route` should be
    /// dismissed before navigation continues past it. Default: `true`.
    fn should_dismiss_modal_for(&self, _route: &AnyRoute) -> bool {
        true
    }

    /// Detour counterpart of
    /// [`should_dismiss_modal_for`](Self::should_dismiss_modal_for).
    /// Default: `true`.
    fn should_dismiss_detour_for(&self, _route: &AnyRoute) -> bool {
        true
    }

    /// Visual metadata when this coordinator is a tab child. Default:
    /// none.
    fn tab_item(&self) -> Option<TabItem> {
        None
    }
}

// ============================================================================
// AnyCoordinator
// ============================================================================

mod sealed {
    pub trait Sealed {}
}

impl<R: Route> sealed::Sealed for Coordinator<R> {}

/// Type-erased coordinator handle.
///
/// The tree is heterogeneous in route type, so parents hold their children
/// (and modal and detour coordinators) through this trait. Implemented only
/// by [`Coordinator`]; the methods taking a `caller` are the engine's
/// delegation plumbing.
pub trait AnyCoordinator: sealed::Sealed {
    /// Process-unique identity.
    fn id(&self) -> CoordinatorId;

    /// Diagnostic name, carried into error payloads.
    fn name(&self) -> &str;

    /// The current parent, if any.
    fn parent(&self) -> Option<Rc<dyn AnyCoordinator>>;

    /// How this coordinator is currently presented.
    fn presentation_context(&self) -> PresentationContext;

    /// The router's root route, type-erased.
    fn root_route(&self) -> AnyRoute;

    /// The route currently on screen for this coordinator, type-erased.
    fn current_route(&self) -> AnyRoute;

    /// Whether this coordinator handles `route` itself.
    fn can_handle_route(&self, route: &AnyRoute) -> bool;

    /// Transitive capability: this coordinator or any owned descendant
    /// (child, registered modal coordinator, active modal, active detour)
    /// handles `route`. Siblings are not consulted.
    fn can_navigate_to(&self, route: &AnyRoute) -> bool;

    /// Whether this coordinator could be the content of a modal presenting
    /// `route`: the route is its root, already on its stack, or handled by
    /// it with a linear navigation type.
    fn can_present_modally(&self, route: &AnyRoute) -> bool;

    /// The navigation type this coordinator would use for `route`. Routes
    /// of a foreign type default to push, mirroring the delegate default.
    fn navigation_type_for(&self, route: &AnyRoute) -> NavigationType;

    /// Type-erased top-level navigation entry.
    fn navigate_route(&self, route: AnyRoute) -> bool;

    /// Whether a back affordance applies: the presentation context shows a
    /// back button or the stack is non-empty.
    fn can_navigate_back(&self) -> bool;

    /// Context-aware back action: pops the stack, or asks the parent to
    /// dismiss this coordinator's modal or detour presentation.
    fn pop(&self);

    /// Dismiss this coordinator's active modal, clearing the modal's
    /// parent link.
    fn dismiss_modal(&self);

    /// Dismiss this coordinator's active detour, clearing the detour's
    /// parent link.
    fn dismiss_detour(&self);

    /// Clear stack, modal, and detour, recursively through children.
    fn reset_to_clean_state(&self);

    /// Tab metadata from the delegate, if this coordinator is a tab
    /// child.
    fn tab_item(&self) -> Option<TabItem>;

    /// Engine plumbing: rewire the parent link.
    fn set_parent(&self, parent: Option<Weak<dyn AnyCoordinator>>);

    /// Engine plumbing: retag the presentation context.
    fn set_presentation_context(&self, context: PresentationContext);

    /// Engine plumbing: whether `id` is this coordinator or an owned
    /// descendant. Used for cycle rejection.
    fn contains(&self, id: CoordinatorId) -> bool;

    /// Engine plumbing: validation pass. No side effects.
    fn validate_route(
        &self,
        route: &AnyRoute,
        caller: Option<CoordinatorId>,
    ) -> Result<(), FlowError>;

    /// Engine plumbing: execution pass. Only entered for plans the
    /// validation pass accepted.
    fn execute_route(&self, route: &AnyRoute, caller: Option<CoordinatorId>) -> bool;

    /// Engine plumbing: state cleanup before bubbling.
    fn clean_state_for_bubbling(&self);
}

// ============================================================================
// Reentrancy deferral
// ============================================================================

struct DeferredNavigation {
    coordinator: Weak<dyn AnyCoordinator>,
    route: AnyRoute,
}

thread_local! {
    static NAVIGATION_IN_PROGRESS: Cell<bool> = const { Cell::new(false) };
    static DEFERRED_NAVIGATIONS: RefCell<Vec<DeferredNavigation>> =
        const { RefCell::new(Vec::new()) };
}

struct NavigationGuard;

impl NavigationGuard {
    fn begin() -> Self {
        NAVIGATION_IN_PROGRESS.with(|flag| flag.set(true));
        Self
    }
}

impl Drop for NavigationGuard {
    fn drop(&mut self) {
        NAVIGATION_IN_PROGRESS.with(|flag| flag.set(false));
    }
}

fn drain_deferred_navigations() {
    loop {
        let next = DEFERRED_NAVIGATIONS.with(|queue| {
            let mut queue = queue.borrow_mut();
            if queue.is_empty() {
                None
            } else {
                Some(queue.remove(0))
            }
        });
        let Some(deferred) = next else { break };
        if let Some(coordinator) = deferred.coordinator.upgrade() {
            coordinator.navigate_route(deferred.route);
        }
    }
}

// ============================================================================
// Coordinator
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoordinatorMode {
    Standard,
    Tab,
}

/// A node in the navigation tree.
///
/// Created with [`Coordinator::new`] (or through
/// [`TabCoordinator`](crate::TabCoordinator) /
/// [`FlowOrchestrator`](crate::FlowOrchestrator)); always lives behind an
/// `Rc`. Parent links are weak, child links are strong, so dropping a
/// subtree's last external handle releases it once its parent removes it.
pub struct Coordinator<R: Route> {
    id: CoordinatorId,
    name: String,
    mode: CoordinatorMode,
    delegate: Rc<dyn CoordinatorDelegate<R>>,
    router: Router<R>,
    children: RefCell<Vec<Rc<dyn AnyCoordinator>>>,
    modal_coordinators: RefCell<Vec<Rc<dyn AnyCoordinator>>>,
    current_modal: RefCell<Option<Rc<dyn AnyCoordinator>>>,
    detour_coordinator: RefCell<Option<Rc<dyn AnyCoordinator>>>,
    parent: RefCell<Option<Weak<dyn AnyCoordinator>>>,
    context: Cell<PresentationContext>,
    weak_self: Weak<Coordinator<R>>,
}

impl<R: Route> Coordinator<R> {
    /// Create a coordinator rooted at `root`.
    pub fn new(
        name: impl Into<String>,
        root: R,
        delegate: Rc<dyn CoordinatorDelegate<R>>,
    ) -> Rc<Self> {
        Self::with_mode(name, root, delegate, CoordinatorMode::Standard)
    }

    pub(crate) fn with_mode(
        name: impl Into<String>,
        root: R,
        delegate: Rc<dyn CoordinatorDelegate<R>>,
        mode: CoordinatorMode,
    ) -> Rc<Self> {
        let name = name.into();
        Rc::new_cyclic(|weak_self| Self {
            id: CoordinatorId::next(),
            name: name.clone(),
            mode,
            delegate,
            router: Router::new(name, root),
            children: RefCell::new(Vec::new()),
            modal_coordinators: RefCell::new(Vec::new()),
            current_modal: RefCell::new(None),
            detour_coordinator: RefCell::new(None),
            parent: RefCell::new(None),
            context: Cell::new(PresentationContext::Root),
            weak_self: weak_self.clone(),
        })
    }

    /// This coordinator's router.
    pub fn router(&self) -> &Router<R> {
        &self.router
    }

    /// Snapshot of this coordinator's navigation state.
    pub fn state(&self) -> crate::NavigationState<R> {
        self.router.state()
    }

    /// Diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process-unique identity.
    pub fn id(&self) -> CoordinatorId {
        self.id
    }

    /// How this coordinator is currently presented.
    pub fn presentation_context(&self) -> PresentationContext {
        self.context.get()
    }

    /// The current parent, if any.
    pub fn parent(&self) -> Option<Rc<dyn AnyCoordinator>> {
        self.parent_handle()
    }

    /// The permanent children, in insertion order.
    pub fn children(&self) -> Vec<Rc<dyn AnyCoordinator>> {
        self.children.borrow().clone()
    }

    /// The registered modal coordinators, in registration order.
    pub fn modal_coordinators(&self) -> Vec<Rc<dyn AnyCoordinator>> {
        self.modal_coordinators.borrow().clone()
    }

    /// The active modal coordinator, if a modal is presented.
    pub fn current_modal_coordinator(&self) -> Option<Rc<dyn AnyCoordinator>> {
        self.current_modal.borrow().clone()
    }

    /// The active detour coordinator, if a detour is presented.
    pub fn detour_coordinator(&self) -> Option<Rc<dyn AnyCoordinator>> {
        self.detour_coordinator.borrow().clone()
    }

    /// This coordinator as a type-erased handle.
    pub fn as_any_coordinator(&self) -> Rc<dyn AnyCoordinator> {
        // The weak self-reference is set by `new_cyclic` and stays
        // upgradable for as long as `&self` can exist.
        match self.weak_self.upgrade() {
            Some(rc) => rc,
            None => unreachable!("coordinator accessed during construction"),
        }
    }

    fn weak_dyn(&self) -> Weak<dyn AnyCoordinator> {
        self.weak_self.clone()
    }

    fn parent_handle(&self) -> Option<Rc<dyn AnyCoordinator>> {
        self.parent.borrow().as_ref().and_then(Weak::upgrade)
    }

    // ------------------------------------------------------------------
    // Tree maintenance
    // ------------------------------------------------------------------

    /// Add a permanent child.
    ///
    /// Rejects children that already have a parent
    /// ([`FlowError::DuplicateChild`]) and children whose subtree contains
    /// this coordinator ([`FlowError::CircularReference`]); rejection
    /// mutates nothing.
    pub fn add_child(&self, child: Rc<dyn AnyCoordinator>) -> Result<(), FlowError> {
        let already_known = self
            .children
            .borrow()
            .iter()
            .any(|existing| existing.id() == child.id());
        if child.parent().is_some() || already_known {
            let error = FlowError::DuplicateChild {
                coordinator: self.name.clone(),
                child: child.name().to_string(),
            };
            report(&error);
            return Err(error);
        }
        if child.id() == self.id || child.contains(self.id) {
            let error = FlowError::CircularReference {
                coordinator: self.name.clone(),
            };
            report(&error);
            return Err(error);
        }

        child.set_parent(Some(self.weak_dyn()));
        if self.mode == CoordinatorMode::Tab {
            child.set_presentation_context(PresentationContext::Tab);
        }
        self.children.borrow_mut().push(child);
        Ok(())
    }

    /// Remove a child, clearing its parent link. Returns whether the child
    /// was present.
    pub fn remove_child(&self, child: &Rc<dyn AnyCoordinator>) -> bool {
        let removed = {
            let mut children = self.children.borrow_mut();
            match children.iter().position(|c| c.id() == child.id()) {
                Some(index) => {
                    children.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            child.set_parent(None);
            child.set_presentation_context(PresentationContext::Root);
            self.router.remove_pushed_child(child.id());
        }
        removed
    }

    /// Register a modal coordinator. Registration is permanent; activation
    /// happens when a modal navigation selects it.
    pub fn add_modal_coordinator(&self, coordinator: Rc<dyn AnyCoordinator>) {
        if coordinator.id() == self.id || coordinator.contains(self.id) {
            report(&FlowError::CircularReference {
                coordinator: self.name.clone(),
            });
            return;
        }
        let mut registry = self.modal_coordinators.borrow_mut();
        if registry.iter().any(|mc| mc.id() == coordinator.id()) {
            return;
        }
        registry.push(coordinator);
    }

    /// Remove a modal coordinator from the registry, dismissing it first
    /// if it is active. Returns whether it was registered.
    pub fn remove_modal_coordinator(&self, coordinator: &Rc<dyn AnyCoordinator>) -> bool {
        let is_active = self
            .current_modal
            .borrow()
            .as_ref()
            .is_some_and(|active| active.id() == coordinator.id());
        if is_active {
            self.dismiss_modal();
        }
        let mut registry = self.modal_coordinators.borrow_mut();
        match registry.iter().position(|mc| mc.id() == coordinator.id()) {
            Some(index) => {
                registry.remove(index);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Presentation
    // ------------------------------------------------------------------

    /// Explicitly present a modal coordinator, bypassing route-type
    /// matching. `presenting` is the route published in this router's
    /// modal slot.
    ///
    /// This is the only way to present a modal coordinator whose route
    /// type differs from this coordinator's; `navigate` never selects
    /// one.
    pub fn present_modal_coordinator(
        &self,
        coordinator: Rc<dyn AnyCoordinator>,
        presenting: R,
        config: Option<ModalDetentConfiguration>,
    ) {
        self.activate_modal(&coordinator);
        self.router.present(presenting, config);
    }

    /// Present a detour coordinator on top of the current state.
    ///
    /// The underlying state is left untouched; dismissing the detour
    /// restores the exact prior picture. The presented route may be of any
    /// route type.
    pub fn present_detour<D: Route>(&self, coordinator: Rc<dyn AnyCoordinator>, presenting: D) {
        self.present_detour_route(coordinator, AnyRoute::new(presenting));
    }

    /// Type-erased variant of [`present_detour`](Self::present_detour).
    pub fn present_detour_route(&self, coordinator: Rc<dyn AnyCoordinator>, presenting: AnyRoute) {
        self.dismiss_detour();
        coordinator.set_parent(Some(self.weak_dyn()));
        coordinator.set_presentation_context(PresentationContext::Detour);
        *self.detour_coordinator.borrow_mut() = Some(coordinator);
        self.router.present_detour(presenting);
    }

    /// Dismiss the active modal, if any, clearing its parent link.
    pub fn dismiss_modal(&self) {
        let modal = self.current_modal.borrow_mut().take();
        if let Some(modal) = modal {
            debug_log!("'{}': dismissing modal '{}'", self.name, modal.name());
            modal.set_parent(None);
            modal.set_presentation_context(PresentationContext::Root);
        }
        self.router.dismiss_modal();
    }

    /// Dismiss the active detour, if any, clearing its parent link.
    pub fn dismiss_detour(&self) {
        let detour = self.detour_coordinator.borrow_mut().take();
        if let Some(detour) = detour {
            debug_log!("'{}': dismissing detour '{}'", self.name, detour.name());
            detour.set_parent(None);
            detour.set_presentation_context(PresentationContext::Root);
        }
        self.router.dismiss_detour();
    }

    /// Context-aware back action.
    ///
    /// Pops the stack when non-empty; otherwise asks the parent to dismiss
    /// this coordinator's modal or detour presentation; otherwise a
    /// no-op.
    pub fn pop(&self) {
        if !self.router.state().stack().is_empty() {
            self.router.pop();
            return;
        }
        match self.context.get() {
            PresentationContext::Modal => {
                if let Some(parent) = self.parent_handle() {
                    parent.dismiss_modal();
                }
            }
            PresentationContext::Detour => {
                if let Some(parent) = self.parent_handle() {
                    parent.dismiss_detour();
                }
            }
            _ => {}
        }
    }

    /// Whether a back affordance applies right now.
    pub fn can_navigate_back(&self) -> bool {
        self.context.get().should_show_back_button() || !self.router.state().stack().is_empty()
    }

    /// Clear stack, modal, and detour, recursively through children.
    pub fn reset_to_clean_state(&self) {
        self.dismiss_modal();
        self.dismiss_detour();
        self.router.pop_to_root();
        for pushed in self.router.take_pushed_children() {
            pushed.set_presentation_context(PresentationContext::Root);
        }
        let children = self.children.borrow().clone();
        for child in children {
            child.reset_to_clean_state();
        }
    }

    /// Rewrite the router root for a flow transition, clearing all
    /// transient state.
    pub fn transition_to_new_flow(&self, root: R) {
        debug_log!(
            "'{}': flow transition to root '{}'",
            self.name,
            root.identifier()
        );
        self.dismiss_modal();
        self.dismiss_detour();
        for pushed in self.router.take_pushed_children() {
            pushed.set_presentation_context(PresentationContext::Root);
        }
        self.router.set_root(root);
    }

    fn clean_state_for_bubbling_impl(&self) {
        self.dismiss_modal();
        if self.mode == CoordinatorMode::Tab {
            let children = self.children.borrow().clone();
            for child in children {
                child.reset_to_clean_state();
            }
        }
    }

    // ------------------------------------------------------------------
    // Modal measurement plumbing (reported by the view layer)
    // ------------------------------------------------------------------

    /// Record the measured ideal content height of the presented modal.
    /// No-op without an active modal.
    pub fn update_modal_ideal_height(&self, height: f32) {
        self.router.update_modal_ideal_height(height);
    }

    /// Record the measured minimum content height of the presented modal.
    /// No-op without an active modal.
    pub fn update_modal_min_height(&self, height: f32) {
        self.router.update_modal_min_height(height);
    }

    /// Record a user-driven detent change of the presented modal. No-op
    /// without an active modal.
    pub fn update_modal_selected_detent(&self, detent: Detent) {
        self.router.update_modal_selected_detent(detent);
    }

    // ------------------------------------------------------------------
    // Navigation entry
    // ------------------------------------------------------------------

    /// Navigate to a route.
    ///
    /// Runs the validation pass from this coordinator across the reachable
    /// tree; on success, runs the execution pass along the validated path
    /// and returns `true`. On failure, reports the error through the
    /// central reporter and returns `false` with every router untouched.
    pub fn navigate(&self, route: R) -> bool {
        self.run_navigation(AnyRoute::new(route))
    }

    fn run_navigation(&self, route: AnyRoute) -> bool {
        if NAVIGATION_IN_PROGRESS.with(Cell::get) {
            debug_log!(
                "'{}': deferring navigation to '{}' until the current one returns",
                self.name,
                route
            );
            DEFERRED_NAVIGATIONS.with(|queue| {
                queue.borrow_mut().push(DeferredNavigation {
                    coordinator: self.weak_dyn(),
                    route,
                });
            });
            return true;
        }

        let guard = NavigationGuard::begin();
        let result = match self.validate_route_impl(&route, None) {
            Ok(()) => self.execute_route_impl(&route, None),
            Err(error) => {
                report(&error);
                false
            }
        };
        drop(guard);
        drain_deferred_navigations();
        result
    }

    // ------------------------------------------------------------------
    // Phase 1: validation (no side effects)
    // ------------------------------------------------------------------

    fn validate_route_impl(
        &self,
        route: &AnyRoute,
        caller: Option<CoordinatorId>,
    ) -> Result<(), FlowError> {
        trace_log!("'{}': validating '{}'", self.name, route);

        // Smart navigation: already there, on the stack, or the root.
        if let Some(typed) = route.downcast_ref::<R>() {
            let state = self.router.state();
            if self.is_already_at(typed, &state)
                || state.stack().contains(typed)
                || state.root() == typed
            {
                return Ok(());
            }
        }

        // Active modal and detour. Failures are ignored: execution
        // dismisses the presentation and continues past it.
        for target in self.active_presentations() {
            if self.should_skip_presented(&target, caller) {
                continue;
            }
            if target.validate_route(route, Some(self.id)).is_ok() {
                return Ok(());
            }
        }

        // Direct handling.
        if let Some(typed) = route.downcast_ref::<R>() {
            if self.delegate.can_handle(typed) {
                self.validate_path_entries(typed)?;
                return match self.delegate.navigation_type(typed) {
                    NavigationType::Push | NavigationType::Replace => Ok(()),
                    NavigationType::TabSwitch(index) => self.check_tab_index(index),
                    NavigationType::Modal => {
                        if self.modal_presentation_target(route).is_some() {
                            Ok(())
                        } else {
                            Err(FlowError::ModalCoordinatorNotConfigured {
                                coordinator: self.name.clone(),
                                route_id: route.identifier().to_string(),
                                route_type: route.route_type().to_string(),
                            })
                        }
                    }
                    NavigationType::Detour => Err(FlowError::InvalidDetourNavigation {
                        coordinator: self.name.clone(),
                        route_id: route.identifier().to_string(),
                        route_type: route.route_type().to_string(),
                    }),
                };
            }
        }

        // Children, then registered modal coordinators.
        if let Some(outcome) = self.validate_delegation(route, caller) {
            return outcome;
        }

        // Bubble to the parent, or terminate at the root.
        self.validate_bubble(route, caller)
    }

    fn validate_delegation(
        &self,
        route: &AnyRoute,
        caller: Option<CoordinatorId>,
    ) -> Option<Result<(), FlowError>> {
        if self.mode == CoordinatorMode::Tab {
            return self.validate_tab_delegation(route, caller);
        }

        let children = self.children.borrow().clone();
        for child in children {
            if Some(child.id()) == caller || !self.is_parent_of(&child) {
                continue;
            }
            if !child.can_navigate_to(route) {
                continue;
            }
            if let Err(error) = self.validate_delegation_path(route, &child) {
                return Some(Err(error));
            }
            if child.validate_route(route, Some(self.id)).is_ok() {
                return Some(Ok(()));
            }
        }

        self.validate_modal_registry_delegation(route, caller)
    }

    fn validate_tab_delegation(
        &self,
        route: &AnyRoute,
        caller: Option<CoordinatorId>,
    ) -> Option<Result<(), FlowError>> {
        let children = self.children.borrow().clone();
        let selected = self.router.state().selected_tab();
        for index in tab_order(children.len(), selected) {
            let child = &children[index];
            if Some(child.id()) == caller || !self.is_parent_of(child) {
                continue;
            }
            if !child.can_navigate_to(route) {
                continue;
            }
            if child.validate_route(route, Some(self.id)).is_ok() {
                return Some(Ok(()));
            }
        }
        self.validate_modal_registry_delegation(route, caller)
    }

    fn validate_modal_registry_delegation(
        &self,
        route: &AnyRoute,
        caller: Option<CoordinatorId>,
    ) -> Option<Result<(), FlowError>> {
        let current_id = self.current_modal.borrow().as_ref().map(|m| m.id());
        let registry = self.modal_coordinators.borrow().clone();
        for candidate in registry {
            if Some(candidate.id()) == caller || Some(candidate.id()) == current_id {
                continue;
            }
            // Only same-route-type modal coordinators are selectable
            // through navigate; cross-type ones need the explicit API.
            if !candidate.root_route().is::<R>() {
                continue;
            }
            if !candidate.can_navigate_to(route) {
                continue;
            }
            if let Some(typed) = route.downcast_ref::<R>() {
                if let Err(error) = self.validate_path_entries(typed) {
                    return Some(Err(error));
                }
            }
            if candidate.validate_route(route, Some(self.id)).is_ok() {
                return Some(Ok(()));
            }
        }
        None
    }

    fn validate_bubble(
        &self,
        route: &AnyRoute,
        caller: Option<CoordinatorId>,
    ) -> Result<(), FlowError> {
        match self.parent_handle() {
            Some(parent) => {
                if Some(parent.id()) == caller {
                    // Never bubble back to the coordinator that delegated
                    // here; it continues its own search on failure.
                    Err(self.navigation_failed(route, "no handler below the presenting coordinator"))
                } else {
                    parent.validate_route(route, Some(self.id))
                }
            }
            None => {
                if self.delegate.can_handle_flow_change(route) {
                    Ok(())
                } else {
                    Err(self.navigation_failed(
                        route,
                        "reached the root with no handler and no flow change",
                    ))
                }
            }
        }
    }

    /// Path entries are only checked when execution would build them: a
    /// declared non-empty path over an empty stack.
    fn validate_path_entries(&self, target: &R) -> Result<(), FlowError> {
        let Some(path) = self.delegate.navigation_path(target) else {
            return Ok(());
        };
        if path.is_empty() || !self.router.state().stack().is_empty() {
            return Ok(());
        }
        for entry in &path {
            let nav = self.delegate.navigation_type(entry);
            if !nav.is_linear() {
                return Err(FlowError::ConfigurationError {
                    message: format!(
                        "navigation path for '{}' contains '{}' with non-linear navigation type {:?}",
                        target.identifier(),
                        entry.identifier(),
                        nav
                    ),
                });
            }
        }
        Ok(())
    }

    fn validate_delegation_path(
        &self,
        route: &AnyRoute,
        child: &Rc<dyn AnyCoordinator>,
    ) -> Result<(), FlowError> {
        if child.navigation_type_for(route) != NavigationType::Push {
            return Ok(());
        }
        match route.downcast_ref::<R>() {
            Some(typed) => self.validate_path_entries(typed),
            None => Ok(()),
        }
    }

    fn check_tab_index(&self, index: usize) -> Result<(), FlowError> {
        let count = self.children.borrow().len();
        if index < count {
            Ok(())
        } else {
            Err(FlowError::InvalidTabIndex {
                index,
                valid_range: 0..count,
            })
        }
    }

    // ------------------------------------------------------------------
    // Phase 2: execution (mutations)
    // ------------------------------------------------------------------

    fn execute_route_impl(&self, route: &AnyRoute, caller: Option<CoordinatorId>) -> bool {
        trace_log!("'{}': executing '{}'", self.name, route);

        // Smart navigation.
        if let Some(typed) = route.downcast_ref::<R>() {
            let state = self.router.state();
            if self.is_already_at(typed, &state) {
                debug_log!("'{}': already at '{}'", self.name, route);
                self.tear_out_pushed_caller(caller);
                return true;
            }
            if state.stack().contains(typed) {
                self.router.pop_to(typed);
                self.tear_out_pushed_caller(caller);
                return true;
            }
            if state.root() == typed {
                if !state.stack().is_empty() {
                    self.router.pop_to_root();
                }
                self.tear_out_pushed_caller(caller);
                return true;
            }
        }

        // Active modal: delegate into it, or dismiss it and continue.
        let modal = self.current_modal.borrow().clone();
        if let Some(modal) = modal {
            if !self.should_skip_presented(&modal, caller) {
                let handled = modal.validate_route(route, Some(self.id)).is_ok()
                    && modal.execute_route(route, Some(self.id));
                if handled && self.current_modal.borrow().is_some() {
                    return true;
                }
                if self.delegate.should_dismiss_modal_for(route) || !handled {
                    self.dismiss_modal();
                }
            }
        }

        // Active detour, symmetric to the modal step.
        let detour = self.detour_coordinator.borrow().clone();
        if let Some(detour) = detour {
            if !self.should_skip_presented(&detour, caller) {
                let handled = detour.validate_route(route, Some(self.id)).is_ok()
                    && detour.execute_route(route, Some(self.id));
                if handled && self.detour_coordinator.borrow().is_some() {
                    return true;
                }
                if self.delegate.should_dismiss_detour_for(route) || !handled {
                    self.dismiss_detour();
                }
            }
        }

        // Direct handling.
        if let Some(typed) = route.downcast_ref::<R>() {
            if self.delegate.can_handle(typed) {
                return self.execute_direct(typed, route);
            }
        }

        // Children, then registered modal coordinators.
        if let Some(result) = self.execute_delegation(route, caller) {
            return result;
        }

        // Bubble to the parent, or terminate at the root.
        self.execute_bubble(route, caller)
    }

    fn execute_direct(&self, typed: &R, route: &AnyRoute) -> bool {
        if let Some(path) = self.delegate.navigation_path(typed) {
            if !path.is_empty() && self.router.state().stack().is_empty() {
                if !self.build_path(&path) {
                    return false;
                }
                if path.contains(typed) {
                    // The path already reached the target.
                    return true;
                }
            }
        }

        match self.delegate.navigation_type(typed) {
            NavigationType::Push => {
                self.router.push(typed.clone());
                true
            }
            NavigationType::Replace => {
                self.router.replace(typed.clone());
                true
            }
            NavigationType::TabSwitch(index) => {
                if let Err(error) = self.check_tab_index(index) {
                    warn_log!("'{}': {}", self.name, error);
                    report(&error);
                    return false;
                }
                self.router.select_tab(index);
                true
            }
            NavigationType::Modal => self.execute_modal_presentation(typed, route),
            NavigationType::Detour => {
                // Validation rejects this; kept for the defensive branch.
                let error = FlowError::InvalidDetourNavigation {
                    coordinator: self.name.clone(),
                    route_id: route.identifier().to_string(),
                    route_type: route.route_type().to_string(),
                };
                warn_log!("'{}': {}", self.name, error);
                report(&error);
                false
            }
        }
    }

    fn execute_modal_presentation(&self, typed: &R, route: &AnyRoute) -> bool {
        let Some(target) = self.modal_presentation_target(route) else {
            // Validation rejects this; kept for the defensive branch.
            let error = FlowError::ModalCoordinatorNotConfigured {
                coordinator: self.name.clone(),
                route_id: route.identifier().to_string(),
                route_type: route.route_type().to_string(),
            };
            warn_log!("'{}': {}", self.name, error);
            report(&error);
            return false;
        };

        self.activate_modal(&target);
        self.router.present(
            typed.clone(),
            self.delegate.modal_detent_configuration(typed),
        );
        target.execute_route(route, Some(self.id))
    }

    fn execute_delegation(&self, route: &AnyRoute, caller: Option<CoordinatorId>) -> Option<bool> {
        if self.mode == CoordinatorMode::Tab {
            return self.execute_tab_delegation(route, caller);
        }

        let children = self.children.borrow().clone();
        for child in children {
            if Some(child.id()) == caller || !self.is_parent_of(&child) {
                continue;
            }
            if !child.can_navigate_to(route) {
                continue;
            }
            // Re-check the side-effect-free pass so execution stays on the
            // path validation accepted.
            if child.validate_route(route, Some(self.id)).is_err() {
                continue;
            }
            return Some(self.execute_child_delegation(&child, route));
        }

        self.execute_modal_registry_delegation(route, caller)
    }

    fn execute_child_delegation(&self, child: &Rc<dyn AnyCoordinator>, route: &AnyRoute) -> bool {
        match child.navigation_type_for(route) {
            NavigationType::Push => {
                if let Some(typed) = route.downcast_ref::<R>() {
                    if self.router.state().stack().is_empty() {
                        if let Some(path) = self.delegate.navigation_path(typed) {
                            if !path.is_empty() && !self.build_path(&path) {
                                return false;
                            }
                        }
                    }
                }
                debug_log!(
                    "'{}': pushing child coordinator '{}' for '{}'",
                    self.name,
                    child.name(),
                    route
                );
                // Observable ordering: push child, set parent, set
                // context, delegate.
                self.router.push_child(child.clone());
                child.set_parent(Some(self.weak_dyn()));
                child.set_presentation_context(PresentationContext::Pushed);
                child.execute_route(route, Some(self.id))
            }
            // Modal, replace, and tab switches happen inside the child.
            _ => child.execute_route(route, Some(self.id)),
        }
    }

    fn execute_tab_delegation(
        &self,
        route: &AnyRoute,
        caller: Option<CoordinatorId>,
    ) -> Option<bool> {
        let children = self.children.borrow().clone();
        let selected = self.router.state().selected_tab();
        for index in tab_order(children.len(), selected) {
            let child = &children[index];
            if Some(child.id()) == caller || !self.is_parent_of(child) {
                continue;
            }
            if !child.can_navigate_to(route) {
                continue;
            }
            if child.validate_route(route, Some(self.id)).is_err() {
                continue;
            }
            if index != selected {
                debug_log!(
                    "'{}': switching to tab {} for '{}'",
                    self.name,
                    index,
                    route
                );
                self.router.select_tab(index);
            }
            return Some(child.execute_route(route, Some(self.id)));
        }
        self.execute_modal_registry_delegation(route, caller)
    }

    fn execute_modal_registry_delegation(
        &self,
        route: &AnyRoute,
        caller: Option<CoordinatorId>,
    ) -> Option<bool> {
        let current_id = self.current_modal.borrow().as_ref().map(|m| m.id());
        let registry = self.modal_coordinators.borrow().clone();
        for candidate in registry {
            if Some(candidate.id()) == caller || Some(candidate.id()) == current_id {
                continue;
            }
            let Some(presented) = candidate.root_route().downcast_ref::<R>().cloned() else {
                continue;
            };
            if !candidate.can_navigate_to(route) {
                continue;
            }
            if candidate.validate_route(route, Some(self.id)).is_err() {
                continue;
            }
            if let Some(typed) = route.downcast_ref::<R>() {
                if self.router.state().stack().is_empty() {
                    if let Some(path) = self.delegate.navigation_path(typed) {
                        if !path.is_empty() && !self.build_path(&path) {
                            return Some(false);
                        }
                    }
                }
            }
            debug_log!(
                "'{}': presenting modal coordinator '{}' to reach '{}'",
                self.name,
                candidate.name(),
                route
            );
            self.activate_modal(&candidate);
            self.router.present(
                presented.clone(),
                self.delegate.modal_detent_configuration(&presented),
            );
            return Some(candidate.execute_route(route, Some(self.id)));
        }
        None
    }

    fn execute_bubble(&self, route: &AnyRoute, caller: Option<CoordinatorId>) -> bool {
        match self.parent_handle() {
            Some(parent) => {
                if Some(parent.id()) == caller {
                    trace_log!(
                        "'{}': not bubbling '{}' back to its delegating parent",
                        self.name,
                        route
                    );
                    return false;
                }
                if self.delegate.should_clean_state_for_bubbling(route) {
                    self.clean_state_for_bubbling_impl();
                }
                parent.execute_route(route, Some(self.id))
            }
            None => {
                if self.delegate.handle_flow_change(route) {
                    debug_log!("'{}': flow change handled '{}'", self.name, route);
                    true
                } else {
                    // Validation accepted this plan via
                    // `can_handle_flow_change`; an inconsistent delegate
                    // lands here.
                    let error = self.navigation_failed(
                        route,
                        "reached the root with no handler and no flow change",
                    );
                    report(&error);
                    false
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------

    fn is_already_at(&self, typed: &R, state: &crate::NavigationState<R>) -> bool {
        match self.delegate.navigation_type(typed) {
            NavigationType::TabSwitch(index) => state.selected_tab() == index,
            NavigationType::Modal => state.presented() == Some(typed),
            NavigationType::Detour => state
                .detour()
                .is_some_and(|detour| detour.identifier() == typed.identifier()),
            NavigationType::Push | NavigationType::Replace => state.current_route() == typed,
        }
    }

    fn active_presentations(&self) -> Vec<Rc<dyn AnyCoordinator>> {
        let mut targets = Vec::with_capacity(2);
        if let Some(modal) = self.current_modal.borrow().clone() {
            targets.push(modal);
        }
        if let Some(detour) = self.detour_coordinator.borrow().clone() {
            targets.push(detour);
        }
        targets
    }

    fn should_skip_presented(
        &self,
        target: &Rc<dyn AnyCoordinator>,
        caller: Option<CoordinatorId>,
    ) -> bool {
        let Some(caller) = caller else {
            return false;
        };
        caller == target.id() || self.is_child(caller)
    }

    fn is_child(&self, id: CoordinatorId) -> bool {
        self.children.borrow().iter().any(|child| child.id() == id)
    }

    fn is_parent_of(&self, child: &Rc<dyn AnyCoordinator>) -> bool {
        child
            .parent()
            .is_some_and(|parent| parent.id() == self.id)
    }

    /// First registered modal coordinator able to serve as the content of
    /// a modal presenting `route`; the active modal is preferred when
    /// capable.
    fn modal_presentation_target(&self, route: &AnyRoute) -> Option<Rc<dyn AnyCoordinator>> {
        if let Some(current) = self.current_modal.borrow().clone() {
            if current.can_present_modally(route) {
                return Some(current);
            }
        }
        self.modal_coordinators
            .borrow()
            .iter()
            .find(|candidate| candidate.can_present_modally(route))
            .cloned()
    }

    fn activate_modal(&self, target: &Rc<dyn AnyCoordinator>) {
        let previous = self.current_modal.borrow().clone();
        if let Some(previous) = previous {
            if previous.id() != target.id() {
                previous.set_parent(None);
                previous.set_presentation_context(PresentationContext::Root);
            }
        }
        *self.current_modal.borrow_mut() = Some(target.clone());
        target.set_parent(Some(self.weak_dyn()));
        target.set_presentation_context(PresentationContext::Modal);
    }

    fn build_path(&self, path: &[R]) -> bool {
        for entry in path {
            match self.delegate.navigation_type(entry) {
                NavigationType::Push => self.router.push(entry.clone()),
                NavigationType::Replace => self.router.replace(entry.clone()),
                other => {
                    // Validation rejects this; kept for the defensive
                    // branch.
                    let error = FlowError::ConfigurationError {
                        message: format!(
                            "navigation path entry '{}' has non-linear navigation type {:?}",
                            entry.identifier(),
                            other
                        ),
                    };
                    warn_log!("'{}': {}", self.name, error);
                    report(&error);
                    return false;
                }
            }
        }
        true
    }

    /// Smart navigation triggered from a pushed child tears the child out
    /// of the flattened stack.
    fn tear_out_pushed_caller(&self, caller: Option<CoordinatorId>) {
        let Some(caller) = caller else { return };
        let caller_is_pushed = self
            .router
            .state()
            .pushed_children()
            .iter()
            .any(|pushed| pushed.id() == caller);
        if caller_is_pushed {
            if let Some(child) = self.router.pop_child() {
                child.set_presentation_context(PresentationContext::Root);
            }
        }
    }

    fn navigation_failed(&self, route: &AnyRoute, context: &str) -> FlowError {
        FlowError::NavigationFailed {
            coordinator: self.name.clone(),
            route_id: route.identifier().to_string(),
            route_type: route.route_type().to_string(),
            context: context.to_string(),
        }
    }

    pub(crate) fn select_tab_checked(&self, index: usize) -> Result<(), FlowError> {
        if let Err(error) = self.check_tab_index(index) {
            report(&error);
            return Err(error);
        }
        self.router.select_tab(index);
        Ok(())
    }

    /// Build the view for a route in the given slot, through this
    /// coordinator's router and factory.
    pub fn view(&self, route: &R, slot: ViewSlot) -> crate::AnyView {
        self.router.view(route, slot)
    }
}

fn tab_order(count: usize, selected: usize) -> Vec<usize> {
    let mut order = Vec::with_capacity(count);
    if selected < count {
        order.push(selected);
    }
    order.extend((0..count).filter(|index| *index != selected));
    order
}

// ============================================================================
// AnyCoordinator for Coordinator
// ============================================================================

impl<R: Route> AnyCoordinator for Coordinator<R> {
    fn id(&self) -> CoordinatorId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parent(&self) -> Option<Rc<dyn AnyCoordinator>> {
        self.parent_handle()
    }

    fn presentation_context(&self) -> PresentationContext {
        self.context.get()
    }

    fn root_route(&self) -> AnyRoute {
        AnyRoute::new(self.router.state().root().clone())
    }

    fn current_route(&self) -> AnyRoute {
        AnyRoute::new(self.router.state().current_route().clone())
    }

    fn can_handle_route(&self, route: &AnyRoute) -> bool {
        route
            .downcast_ref::<R>()
            .is_some_and(|typed| self.delegate.can_handle(typed))
    }

    fn can_navigate_to(&self, route: &AnyRoute) -> bool {
        if self.can_handle_route(route) {
            return true;
        }
        if self
            .children
            .borrow()
            .iter()
            .any(|child| child.can_navigate_to(route))
        {
            return true;
        }
        if self
            .modal_coordinators
            .borrow()
            .iter()
            .any(|candidate| candidate.can_navigate_to(route))
        {
            return true;
        }
        if self
            .current_modal
            .borrow()
            .as_ref()
            .is_some_and(|modal| modal.can_navigate_to(route))
        {
            return true;
        }
        self.detour_coordinator
            .borrow()
            .as_ref()
            .is_some_and(|detour| detour.can_navigate_to(route))
    }

    fn can_present_modally(&self, route: &AnyRoute) -> bool {
        let Some(typed) = route.downcast_ref::<R>() else {
            return false;
        };
        let state = self.router.state();
        if state.root() == typed || state.stack().contains(typed) {
            return true;
        }
        self.delegate.can_handle(typed) && self.delegate.navigation_type(typed).is_linear()
    }

    fn navigation_type_for(&self, route: &AnyRoute) -> NavigationType {
        route
            .downcast_ref::<R>()
            .map_or(NavigationType::Push, |typed| {
                self.delegate.navigation_type(typed)
            })
    }

    fn navigate_route(&self, route: AnyRoute) -> bool {
        self.run_navigation(route)
    }

    fn can_navigate_back(&self) -> bool {
        Coordinator::can_navigate_back(self)
    }

    fn pop(&self) {
        Coordinator::pop(self);
    }

    fn dismiss_modal(&self) {
        Coordinator::dismiss_modal(self);
    }

    fn dismiss_detour(&self) {
        Coordinator::dismiss_detour(self);
    }

    fn reset_to_clean_state(&self) {
        Coordinator::reset_to_clean_state(self);
    }

    fn tab_item(&self) -> Option<TabItem> {
        self.delegate.tab_item()
    }

    fn set_parent(&self, parent: Option<Weak<dyn AnyCoordinator>>) {
        *self.parent.borrow_mut() = parent;
    }

    fn set_presentation_context(&self, context: PresentationContext) {
        self.context.set(context);
    }

    fn contains(&self, id: CoordinatorId) -> bool {
        if self.id == id {
            return true;
        }
        if self
            .children
            .borrow()
            .iter()
            .any(|child| child.contains(id))
        {
            return true;
        }
        if self
            .modal_coordinators
            .borrow()
            .iter()
            .any(|candidate| candidate.contains(id))
        {
            return true;
        }
        self.detour_coordinator
            .borrow()
            .as_ref()
            .is_some_and(|detour| detour.contains(id))
    }

    fn validate_route(
        &self,
        route: &AnyRoute,
        caller: Option<CoordinatorId>,
    ) -> Result<(), FlowError> {
        self.validate_route_impl(route, caller)
    }

    fn execute_route(&self, route: &AnyRoute, caller: Option<CoordinatorId>) -> bool {
        self.execute_route_impl(route, caller)
    }

    fn clean_state_for_bubbling(&self) {
        self.clean_state_for_bubbling_impl();
    }
}

// ============================================================================
// Tests
// ============================================================================
