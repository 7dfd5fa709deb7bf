//! Router: the sole mutator of navigation state
//!
//! Each coordinator owns exactly one [`Router`]. The router holds the
//! [`NavigationState`], applies mutations on the engine's behalf, and
//! publishes every change synchronously to its observers, in mutation
//! order. Mutators that would not change anything publish nothing, so an
//! idempotent navigation is observable as zero notifications.
//!
//! The mutating surface is engine-internal; embedders get read-only state
//! access, the observer stream, and factory-based view building.

use crate::coordinator::{AnyCoordinator, CoordinatorId};
use crate::detent::{Detent, ModalDetentConfiguration};
use crate::error::{report, FlowError};
use crate::route::{AnyRoute, Route};
use crate::state::NavigationState;
use crate::view::{AnyView, ErrorView, ViewFactory, ViewSlot};
use crate::{debug_log, trace_log};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Receives state snapshots after every mutation.
///
/// Observers are held weakly and pruned once dropped, so the view layer can
/// subscribe without lifetime ceremony.
pub trait RouterObserver<R: Route> {
    /// Called synchronously after each state change, in mutation order.
    ///
    /// A single `navigate` call may produce several notifications (a path
    /// build followed by a modal presentation, for example); observers must
    /// not assume composite transitions are atomic.
    fn navigation_state_changed(&self, state: &NavigationState<R>);
}

/// Owns and publishes one coordinator's [`NavigationState`].
pub struct Router<R: Route> {
    coordinator_name: String,
    state: RefCell<NavigationState<R>>,
    factory: RefCell<Option<Rc<dyn ViewFactory<R>>>>,
    observers: RefCell<Vec<Weak<dyn RouterObserver<R>>>>,
}

impl<R: Route> Router<R> {
    pub(crate) fn new(coordinator_name: impl Into<String>, root: R) -> Self {
        Self {
            coordinator_name: coordinator_name.into(),
            state: RefCell::new(NavigationState::new(root)),
            factory: RefCell::new(None),
            observers: RefCell::new(Vec::new()),
        }
    }

    /// Snapshot of the current navigation state.
    pub fn state(&self) -> NavigationState<R> {
        self.state.borrow().clone()
    }

    /// Root plus stack, in display order.
    ///
    /// This is the sequence the view layer flattens into a parent's
    /// navigation path when this router's coordinator is pushed.
    pub fn all_routes(&self) -> Vec<R> {
        self.state.borrow().all_routes()
    }

    /// Install the view factory for this router.
    pub fn set_view_factory(&self, factory: Rc<dyn ViewFactory<R>>) {
        *self.factory.borrow_mut() = Some(factory);
    }

    /// Subscribe to state changes.
    ///
    /// The observer is held weakly; drop the `Rc` to unsubscribe.
    pub fn subscribe(&self, observer: Weak<dyn RouterObserver<R>>) {
        self.observers.borrow_mut().push(observer);
    }

    /// Build the view for a route in the given slot.
    ///
    /// A missing factory, or a factory that declines the route, reports
    /// [`FlowError::ViewCreationFailed`] and yields the factory's fallback
    /// error view (an [`ErrorView`] by default) so the slot never blanks.
    pub fn view(&self, route: &R, slot: ViewSlot) -> AnyView {
        let factory = self.factory.borrow().clone();
        if let Some(factory) = &factory {
            if let Some(view) = factory.build_view(route) {
                return view;
            }
        }

        let error = FlowError::ViewCreationFailed {
            coordinator: self.coordinator_name.clone(),
            route_id: route.identifier().into_owned(),
            route_type: std::any::type_name::<R>().to_string(),
            slot,
        };
        report(&error);

        match factory {
            Some(factory) => factory.error_view(&error),
            None => AnyView::new(ErrorView::new(&error)),
        }
    }

    // ------------------------------------------------------------------
    // Mutators (engine-internal)
    // ------------------------------------------------------------------

    pub(crate) fn push(&self, route: R) {
        trace_log!(
            "router '{}': push '{}'",
            self.coordinator_name,
            route.identifier()
        );
        self.state.borrow_mut().push(route);
        self.publish();
    }

    pub(crate) fn pop(&self) {
        let popped = self.state.borrow_mut().pop();
        if let Some(route) = popped {
            trace_log!(
                "router '{}': pop '{}'",
                self.coordinator_name,
                route.identifier()
            );
            self.publish();
        }
    }

    /// Truncate the stack to the first occurrence of `route`, inclusive.
    /// One notification for the whole truncation.
    pub(crate) fn pop_to(&self, route: &R) {
        let changed = {
            let mut state = self.state.borrow_mut();
            let before = state.stack().len();
            state.pop_to(route) && state.stack().len() != before
        };
        if changed {
            debug_log!(
                "router '{}': popped to '{}'",
                self.coordinator_name,
                route.identifier()
            );
            self.publish();
        }
    }

    pub(crate) fn pop_to_root(&self) {
        let changed = {
            let mut state = self.state.borrow_mut();
            let had_stack = !state.stack().is_empty();
            state.pop_to_root();
            had_stack
        };
        if changed {
            debug_log!("router '{}': popped to root", self.coordinator_name);
            self.publish();
        }
    }

    pub(crate) fn replace(&self, route: R) {
        trace_log!(
            "router '{}': replace top with '{}'",
            self.coordinator_name,
            route.identifier()
        );
        self.state.borrow_mut().replace(route);
        self.publish();
    }

    pub(crate) fn present(&self, route: R, config: Option<ModalDetentConfiguration>) {
        debug_log!(
            "router '{}': present modal '{}'",
            self.coordinator_name,
            route.identifier()
        );
        self.state.borrow_mut().present(route, config);
        self.publish();
    }

    pub(crate) fn dismiss_modal(&self) {
        let was_presented = self.state.borrow_mut().dismiss_modal();
        if was_presented {
            debug_log!("router '{}': dismissed modal", self.coordinator_name);
            self.publish();
        }
    }

    pub(crate) fn present_detour(&self, route: AnyRoute) {
        debug_log!(
            "router '{}': present detour '{}'",
            self.coordinator_name,
            route.identifier()
        );
        self.state.borrow_mut().present_detour(route);
        self.publish();
    }

    pub(crate) fn dismiss_detour(&self) {
        let was_presented = self.state.borrow_mut().dismiss_detour();
        if was_presented {
            debug_log!("router '{}': dismissed detour", self.coordinator_name);
            self.publish();
        }
    }

    pub(crate) fn push_child(&self, child: Rc<dyn AnyCoordinator>) {
        trace_log!(
            "router '{}': push child coordinator '{}'",
            self.coordinator_name,
            child.name()
        );
        self.state.borrow_mut().push_child(child);
        self.publish();
    }

    pub(crate) fn pop_child(&self) -> Option<Rc<dyn AnyCoordinator>> {
        let popped = self.state.borrow_mut().pop_child();
        if popped.is_some() {
            self.publish();
        }
        popped
    }

    pub(crate) fn remove_pushed_child(&self, id: CoordinatorId) {
        let removed = self.state.borrow_mut().remove_child(id);
        if removed {
            self.publish();
        }
    }

    pub(crate) fn take_pushed_children(&self) -> Vec<Rc<dyn AnyCoordinator>> {
        let taken = self.state.borrow_mut().take_pushed_children();
        if !taken.is_empty() {
            self.publish();
        }
        taken
    }

    pub(crate) fn select_tab(&self, index: usize) {
        let changed = {
            let mut state = self.state.borrow_mut();
            let changed = state.selected_tab() != index;
            state.select_tab(index);
            changed
        };
        if changed {
            debug_log!(
                "router '{}': selected tab {}",
                self.coordinator_name,
                index
            );
            self.publish();
        }
    }

    pub(crate) fn set_root(&self, root: R) {
        debug_log!(
            "router '{}': new root '{}'",
            self.coordinator_name,
            root.identifier()
        );
        self.state.borrow_mut().set_root(root);
        self.publish();
    }

    pub(crate) fn update_modal_ideal_height(&self, height: f32) {
        let updated = {
            let mut state = self.state.borrow_mut();
            if state.has_presented() {
                state.ensure_modal_detent_configuration().set_ideal_height(height);
                true
            } else {
                false
            }
        };
        if updated {
            self.publish();
        }
    }

    pub(crate) fn update_modal_min_height(&self, height: f32) {
        let updated = {
            let mut state = self.state.borrow_mut();
            if state.has_presented() {
                state.ensure_modal_detent_configuration().set_min_height(height);
                true
            } else {
                false
            }
        };
        if updated {
            self.publish();
        }
    }

    pub(crate) fn update_modal_selected_detent(&self, detent: Detent) {
        let updated = {
            let mut state = self.state.borrow_mut();
            if state.has_presented() {
                state
                    .ensure_modal_detent_configuration()
                    .set_selected(detent);
                true
            } else {
                false
            }
        };
        if updated {
            self.publish();
        }
    }

    fn publish(&self) {
        let snapshot = self.state.borrow().clone();
        let observers: Vec<Rc<dyn RouterObserver<R>>> = {
            let mut observers = self.observers.borrow_mut();
            observers.retain(|weak| weak.strong_count() > 0);
            observers.iter().filter_map(Weak::upgrade).collect()
        };
        for observer in observers {
            observer.navigation_state_changed(&snapshot);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::testing;
    use std::borrow::Cow;
    use std::cell::Cell;

    #[derive(Clone, PartialEq, Eq, Hash, Debug)]
    struct Page(&'static str);

    impl Route for Page {
        fn identifier(&self) -> Cow<'_, str> {
            Cow::Borrowed(self.0)
        }
    }

    struct CountingObserver {
        notifications: Cell<usize>,
    }

    impl CountingObserver {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                notifications: Cell::new(0),
            })
        }
    }

    impl RouterObserver<Page> for CountingObserver {
        fn navigation_state_changed(&self, _state: &NavigationState<Page>) {
            self.notifications.set(self.notifications.get() + 1);
        }
    }

    fn observed_router() -> (Router<Page>, Rc<CountingObserver>) {
        let router = Router::new("test", Page("home"));
        let observer = CountingObserver::new();
        router.subscribe(Rc::downgrade(&observer) as Weak<dyn RouterObserver<Page>>);
        (router, observer)
    }

    #[test]
    fn test_push_and_pop_publish() {
        let (router, observer) = observed_router();

        router.push(Page("a"));
        router.push(Page("b"));
        assert_eq!(observer.notifications.get(), 2);
        assert_eq!(router.state().stack(), &[Page("a"), Page("b")]);

        router.pop();
        assert_eq!(observer.notifications.get(), 3);
        assert_eq!(router.state().stack(), &[Page("a")]);
    }

    #[test]
    fn test_pop_on_empty_stack_publishes_nothing() {
        let (router, observer) = observed_router();
        router.pop();
        assert_eq!(observer.notifications.get(), 0);
    }

    #[test]
    fn test_pop_to_is_one_notification() {
        let (router, observer) = observed_router();
        router.push(Page("a"));
        router.push(Page("b"));
        router.push(Page("c"));
        let before = observer.notifications.get();

        router.pop_to(&Page("a"));

        assert_eq!(observer.notifications.get(), before + 1);
        assert_eq!(router.state().stack(), &[Page("a")]);
    }

    #[test]
    fn test_pop_to_top_is_noop() {
        let (router, observer) = observed_router();
        router.push(Page("a"));
        let before = observer.notifications.get();

        router.pop_to(&Page("a"));

        assert_eq!(observer.notifications.get(), before);
    }

    #[test]
    fn test_dismiss_modal_only_publishes_when_presented() {
        let (router, observer) = observed_router();

        router.dismiss_modal();
        assert_eq!(observer.notifications.get(), 0);

        router.present(Page("sheet"), None);
        router.dismiss_modal();
        assert_eq!(observer.notifications.get(), 2);
        assert_eq!(router.state().presented(), None);
    }

    #[test]
    fn test_select_tab_noop_when_unchanged() {
        let (router, observer) = observed_router();

        router.select_tab(0);
        assert_eq!(observer.notifications.get(), 0);

        router.select_tab(1);
        assert_eq!(observer.notifications.get(), 1);
        assert_eq!(router.state().selected_tab(), 1);
    }

    #[test]
    fn test_set_root_clears_and_publishes_once() {
        let (router, observer) = observed_router();
        router.push(Page("a"));
        router.present(Page("sheet"), Some(ModalDetentConfiguration::default()));
        let before = observer.notifications.get();

        router.set_root(Page("onboarding"));

        assert_eq!(observer.notifications.get(), before + 1);
        let state = router.state();
        assert_eq!(state.root(), &Page("onboarding"));
        assert!(state.stack().is_empty());
        assert_eq!(state.presented(), None);
    }

    #[test]
    fn test_modal_updates_require_active_modal() {
        let (router, observer) = observed_router();

        router.update_modal_ideal_height(200.0);
        router.update_modal_min_height(80.0);
        router.update_modal_selected_detent(Detent::Medium);
        assert_eq!(observer.notifications.get(), 0);

        router.present(Page("sheet"), None);
        router.update_modal_ideal_height(200.0);
        router.update_modal_selected_detent(Detent::Medium);

        let state = router.state();
        let config = state.modal_detent_configuration().expect("config created");
        assert_eq!(config.ideal_height(), Some(200.0));
        assert_eq!(config.selected(), Some(Detent::Medium));
    }

    #[test]
    fn test_dropped_observer_is_pruned() {
        let router = Router::new("test", Page("home"));
        let observer = CountingObserver::new();
        router.subscribe(Rc::downgrade(&observer) as Weak<dyn RouterObserver<Page>>);
        drop(observer);

        // Must not panic or notify a dead observer.
        router.push(Page("a"));
        assert!(router.observers.borrow().is_empty());
    }

    #[test]
    fn test_view_fallback_reports_missing_factory() {
        testing::install_capture();
        let router: Router<Page> = Router::new("test", Page("home"));

        let view = router.view(&Page("home"), ViewSlot::Root);

        let errors = testing::take_captured();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_view_creation_failed());
        assert!(view.is::<ErrorView>());
    }

    #[test]
    fn test_view_fallback_when_factory_declines() {
        testing::install_capture();
        let router: Router<Page> = Router::new("test", Page("home"));
        router.set_view_factory(crate::view::view_factory_fn(|route: &Page| {
            if route.0 == "home" {
                Some(AnyView::new(route.0))
            } else {
                None
            }
        }));

        assert!(router.view(&Page("home"), ViewSlot::Root).is::<&str>());
        assert!(testing::take_captured().is_empty());

        let fallback = router.view(&Page("mystery"), ViewSlot::Pushed);
        assert!(fallback.is::<ErrorView>());
        let errors = testing::take_captured();
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            FlowError::ViewCreationFailed { slot, route_id, .. } => {
                assert_eq!(*slot, ViewSlot::Pushed);
                assert_eq!(route_id, "mystery");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

