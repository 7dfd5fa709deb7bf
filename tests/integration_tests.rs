//! End-to-end tests for the navigation engine
//!
//! Builds coordinator trees through the public API only and drives them the
//! way an embedder would: typed navigation entries, observer subscriptions,
//! detour presentation, flow transitions, and the central error reporter.

use navflow::{
    AnyRoute, BackAction, Coordinator, CoordinatorDelegate, Detent, FlowError,
    ModalDetentConfiguration, NavigationState, NavigationType, PresentationContext, Route,
    RouterObserver, TabCoordinator, TabItem,
};
use proptest::prelude::*;
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

// ============================================================================
// Harness
// ============================================================================

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct Name(String);

impl Route for Name {
    fn identifier(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.0)
    }
}

fn r(id: &str) -> Name {
    Name(id.to_string())
}

/// Table-driven delegate configured per scenario.
#[derive(Default)]
struct Table {
    handled: HashSet<String>,
    types: HashMap<String, NavigationType>,
    paths: HashMap<String, Vec<Name>>,
    detents: HashMap<String, ModalDetentConfiguration>,
    tab_item: Option<TabItem>,
}

impl Table {
    fn handling(ids: &[&str]) -> Self {
        Self {
            handled: ids.iter().map(|id| id.to_string()).collect(),
            ..Self::default()
        }
    }

    fn typed(mut self, id: &str, nav: NavigationType) -> Self {
        self.types.insert(id.to_string(), nav);
        self
    }

    fn path(mut self, id: &str, entries: &[&str]) -> Self {
        self.paths
            .insert(id.to_string(), entries.iter().map(|e| r(e)).collect());
        self
    }

    fn detent(mut self, id: &str, config: ModalDetentConfiguration) -> Self {
        self.detents.insert(id.to_string(), config);
        self
    }

    fn tab(mut self, label: &str) -> Self {
        self.tab_item = Some(TabItem::new(label, "icon"));
        self
    }
}

impl CoordinatorDelegate<Name> for Table {
    fn can_handle(&self, route: &Name) -> bool {
        self.handled.contains(&route.0)
    }

    fn navigation_type(&self, route: &Name) -> NavigationType {
        self.types
            .get(&route.0)
            .copied()
            .unwrap_or(NavigationType::Push)
    }

    fn navigation_path(&self, route: &Name) -> Option<Vec<Name>> {
        self.paths.get(&route.0).cloned()
    }

    fn modal_detent_configuration(&self, route: &Name) -> Option<ModalDetentConfiguration> {
        self.detents.get(&route.0).cloned()
    }

    fn tab_item(&self) -> Option<TabItem> {
        self.tab_item.clone()
    }
}

fn coordinator(name: &str, root: &str, table: Table) -> Rc<Coordinator<Name>> {
    Coordinator::new(name, r(root), Rc::new(table))
}

// The reporter is process-wide and settable once; every test installs the
// same fan-out into a thread-local sink and reads its own thread's slice.
thread_local! {
    static ERRORS: RefCell<Vec<FlowError>> = const { RefCell::new(Vec::new()) };
}

fn install_capture() {
    navflow::set_error_reporter(|error| {
        ERRORS.with(|errors| errors.borrow_mut().push(error.clone()));
    });
    take_errors();
}

fn take_errors() -> Vec<FlowError> {
    ERRORS.with(|errors| errors.borrow_mut().drain(..).collect())
}

struct Counter {
    notifications: Cell<usize>,
}

impl Counter {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            notifications: Cell::new(0),
        })
    }

    fn count(&self) -> usize {
        self.notifications.get()
    }
}

impl RouterObserver<Name> for Counter {
    fn navigation_state_changed(&self, _state: &NavigationState<Name>) {
        self.notifications.set(self.notifications.get() + 1);
    }
}

fn observe(target: &Rc<Coordinator<Name>>) -> Rc<Counter> {
    let counter = Counter::new();
    target
        .router()
        .subscribe(Rc::downgrade(&counter) as Weak<dyn RouterObserver<Name>>);
    counter
}

// ============================================================================
// Scenario: smart pop-to-existing
// ============================================================================

#[test]
fn test_smart_pop_to_existing() {
    install_capture();
    let app = coordinator("app", "home", Table::handling(&["a", "b", "c"]));
    app.navigate(r("a"));
    app.navigate(r("b"));
    app.navigate(r("c"));
    let counter = observe(&app);

    assert!(app.navigate(r("a")));

    assert_eq!(app.state().stack(), &[r("a")]);
    assert_eq!(app.state().current_route(), &r("a"));
    // The truncation is atomic: one notification for the whole pop.
    assert_eq!(counter.count(), 1);
    assert!(take_errors().is_empty());
}

// ============================================================================
// Scenario: deep-link path build into a modal
// ============================================================================

#[test]
fn test_deep_link_path_build_into_modal() {
    install_capture();
    let table = Table::handling(&["level1", "level2", "level3", "level3Modal"])
        .typed("level3Modal", NavigationType::Modal)
        .path("level3Modal", &["level1", "level2", "level3"])
        .detent(
            "level3Modal",
            ModalDetentConfiguration::new([Detent::Medium, Detent::Large]),
        );
    let parent = coordinator("parent", "home", table);
    let modal = coordinator("modal", "level3Modal", Table::default());
    parent.add_modal_coordinator(modal.as_any_coordinator());

    assert!(parent.navigate(r("level3Modal")));

    let state = parent.state();
    assert_eq!(state.stack(), &[r("level1"), r("level2"), r("level3")]);
    assert_eq!(state.presented(), Some(&r("level3Modal")));
    assert_eq!(
        state
            .modal_detent_configuration()
            .map(|config| config.detents().to_vec()),
        Some(vec![Detent::Medium, Detent::Large])
    );
    assert_eq!(
        parent.current_modal_coordinator().map(|m| m.id()),
        Some(modal.id())
    );
    assert_eq!(modal.presentation_context(), PresentationContext::Modal);
    assert!(take_errors().is_empty());
}

// ============================================================================
// Scenario: cross-tab auto-switch
// ============================================================================

#[test]
fn test_cross_tab_auto_switch() {
    install_capture();
    let bar = TabCoordinator::new("bar", r("tabs"), Rc::new(Table::default()));
    let tab_a = coordinator("tab-a", "a-root", Table::handling(&["a-feed"]).tab("A"));
    let tab_b = coordinator("tab-b", "b-root", Table::handling(&["x"]).tab("B"));
    bar.add_tab(tab_a.as_any_coordinator()).expect("add tab a");
    bar.add_tab(tab_b.as_any_coordinator()).expect("add tab b");
    assert_eq!(bar.selected_tab(), 0);

    assert!(bar.navigate(r("x")));

    assert_eq!(bar.selected_tab(), 1);
    assert_eq!(tab_b.state().stack(), &[r("x")]);
    assert!(tab_a.state().stack().is_empty());
    assert!(take_errors().is_empty());
}

// ============================================================================
// Scenario: modal coordinator not configured
// ============================================================================

#[test]
fn test_modal_coordinator_not_configured() {
    install_capture();
    let parent = coordinator(
        "parent",
        "home",
        Table::handling(&["settings"]).typed("settings", NavigationType::Modal),
    );
    let child = coordinator("child", "child-root", Table::handling(&["leaf"]));
    parent.add_child(child.as_any_coordinator()).expect("add child");
    let parent_before = parent.state();
    let child_before = child.state();

    assert!(!parent.navigate(r("settings")));

    assert_eq!(parent.state(), parent_before);
    assert_eq!(child.state(), child_before);
    let errors = take_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_modal_coordinator_not_configured());
}

// ============================================================================
// Scenario: detour preserves underlying state
// ============================================================================

#[test]
fn test_detour_preserves_underlying_state() {
    install_capture();
    let root = coordinator("root", "home", Table::default());
    let bar = TabCoordinator::new("bar", r("tabs"), Rc::new(Table::default()));
    root.add_child(bar.as_any_coordinator()).expect("add bar");
    let tabs: Vec<_> = (0..3)
        .map(|index| {
            let name = format!("tab-{index}");
            let handled: Vec<String> = ["enterCode", "loading", "failure"]
                .iter()
                .map(|step| format!("{step}-{index}"))
                .collect();
            let handled_refs: Vec<&str> = handled.iter().map(String::as_str).collect();
            let tab = coordinator(
                &name,
                &format!("root-{index}"),
                Table::handling(&handled_refs).tab(&name),
            );
            bar.add_tab(tab.as_any_coordinator()).expect("add tab");
            tab
        })
        .collect();
    bar.select_tab(2).expect("select tab 2");
    bar.navigate(r("enterCode-2"));
    bar.navigate(r("loading-2"));
    bar.navigate(r("failure-2"));
    assert_eq!(
        tabs[2].state().stack(),
        &[r("enterCode-2"), r("loading-2"), r("failure-2")]
    );

    let root_before = root.state();
    let bar_before = bar.coordinator().state();
    let tab_before = tabs[2].state();

    let overlay = coordinator("overlay", "profile", Table::default());
    root.present_detour(overlay.as_any_coordinator(), r("profile"));

    assert_eq!(
        root.state().detour().map(AnyRoute::identifier),
        Some("profile")
    );
    assert_eq!(tabs[2].state(), tab_before);
    assert_eq!(bar.coordinator().state(), bar_before);
    assert_eq!(root.state().current_route(), root_before.current_route());
    assert_eq!(overlay.presentation_context(), PresentationContext::Detour);

    root.dismiss_detour();

    assert_eq!(root.state(), root_before);
    assert_eq!(bar.coordinator().state(), bar_before);
    assert_eq!(tabs[2].state(), tab_before);
    assert!(overlay.parent().is_none());
    assert!(take_errors().is_empty());
}

// ============================================================================
// Scenario: nested-modal ownership boundary
// ============================================================================

fn nested_modal_tree(parent_claims_nested: bool) -> (Rc<Coordinator<Name>>, Rc<Coordinator<Name>>, Rc<Coordinator<Name>>) {
    let mut claims = vec!["modal"];
    if parent_claims_nested {
        claims.push("nestedModal");
    }
    let mut parent_table = Table::handling(&claims).typed("modal", NavigationType::Modal);
    if parent_claims_nested {
        parent_table = parent_table.typed("nestedModal", NavigationType::Modal);
    }
    let parent = coordinator("parent", "home", parent_table);

    let modal = coordinator(
        "modal",
        "modal",
        Table::handling(&["nestedModal"]).typed("nestedModal", NavigationType::Modal),
    );
    let nested = coordinator("nested", "nestedModal", Table::default());
    modal.add_modal_coordinator(nested.as_any_coordinator());
    parent.add_modal_coordinator(modal.as_any_coordinator());

    (parent, modal, nested)
}

#[test]
fn test_nested_modal_reached_through_delegation() {
    install_capture();
    let (parent, modal, nested) = nested_modal_tree(false);

    assert!(parent.navigate(r("nestedModal")));

    // Two sheet-like presentations are active.
    assert_eq!(parent.state().presented(), Some(&r("modal")));
    assert_eq!(
        parent.current_modal_coordinator().map(|m| m.id()),
        Some(modal.id())
    );
    assert_eq!(modal.state().presented(), Some(&r("nestedModal")));
    assert_eq!(
        modal.current_modal_coordinator().map(|m| m.id()),
        Some(nested.id())
    );
    assert_eq!(nested.presentation_context(), PresentationContext::Modal);
    assert!(take_errors().is_empty());
}

#[test]
fn test_nested_modal_erroneous_claim_is_rejected() {
    install_capture();
    let (parent, modal, _nested) = nested_modal_tree(true);
    let parent_before = parent.state();
    let modal_before = modal.state();

    assert!(!parent.navigate(r("nestedModal")));

    assert_eq!(parent.state(), parent_before);
    assert_eq!(modal.state(), modal_before);
    let errors = take_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_modal_coordinator_not_configured());
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn test_idempotent_navigation_produces_no_notifications() {
    install_capture();
    let parent = coordinator("parent", "home", Table::handling(&["a"]));
    let child = coordinator("child", "child-root", Table::handling(&["x"]));
    parent.add_child(child.as_any_coordinator()).expect("add child");
    parent.navigate(r("a"));

    let parent_counter = observe(&parent);
    let child_counter = observe(&child);

    assert!(parent.navigate(r("a")));
    assert_eq!(parent_counter.count(), 0);
    assert_eq!(child_counter.count(), 0);
}

#[test]
fn test_back_round_trip() {
    let app = coordinator("app", "home", Table::handling(&["r1", "r2"]));
    app.navigate(r("r1"));
    let after_first = app.state();

    app.navigate(r("r2"));
    app.pop();

    assert_eq!(app.state(), after_first);
}

#[test]
fn test_no_coordinator_has_two_parents() {
    install_capture();
    let first = coordinator("first", "home", Table::default());
    let second = coordinator("second", "home", Table::default());
    let shared = coordinator("shared", "shared-root", Table::handling(&["x"]));

    first.add_child(shared.as_any_coordinator()).expect("add child");
    let result = second.add_child(shared.as_any_coordinator());

    assert!(matches!(result, Err(FlowError::DuplicateChild { .. })));
    assert!(second.children().is_empty());
    assert_eq!(shared.parent().map(|p| p.id()), Some(first.id()));
    take_errors();
}

#[test]
fn test_cycle_rejection_mutates_nothing() {
    install_capture();
    let parent = coordinator("parent", "home", Table::default());
    let child = coordinator("child", "child-root", Table::default());
    parent.add_child(child.as_any_coordinator()).expect("add child");
    let parent_before = parent.state();
    let child_before = child.state();

    let result = child.add_child(parent.as_any_coordinator());

    assert!(matches!(result, Err(FlowError::CircularReference { .. })));
    assert_eq!(parent.state(), parent_before);
    assert_eq!(child.state(), child_before);
    assert!(child.children().is_empty());
    take_errors();
}

#[test]
fn test_back_action_routes_by_context() {
    let parent = coordinator(
        "parent",
        "home",
        Table::handling(&["sheet"]).typed("sheet", NavigationType::Modal),
    );
    let modal = coordinator("modal", "sheet", Table::handling(&["inner"]));
    parent.add_modal_coordinator(modal.as_any_coordinator());
    parent.navigate(r("sheet"));
    parent.navigate(r("inner"));

    let back = BackAction::new(&modal.as_any_coordinator());
    assert!(back.is_available());

    // First back pops the modal's own stack.
    back.invoke();
    assert!(modal.state().stack().is_empty());
    assert!(parent.state().presented().is_some());

    // Second back dismisses the modal through the parent.
    assert!(back.is_available());
    back.invoke();
    assert_eq!(parent.state().presented(), None);
    assert!(!back.is_available());
}

#[test]
fn test_flattening_surface() {
    let parent = coordinator("parent", "home", Table::handling(&["landing"]));
    let child = coordinator("child", "child-root", Table::handling(&["x", "y"]));
    parent.add_child(child.as_any_coordinator()).expect("add child");
    parent.navigate(r("landing"));
    parent.navigate(r("x"));
    child.navigate(r("y"));

    // The view layer flattens the parent's own routes plus each pushed
    // child's routes, in order.
    assert_eq!(parent.router().all_routes(), vec![r("home"), r("landing")]);
    let state = parent.state();
    assert_eq!(state.pushed_children().len(), 1);
    let pushed = &state.pushed_children()[0];
    assert_eq!(pushed.id(), child.id());
    assert_eq!(
        child.router().all_routes(),
        vec![r("child-root"), r("x"), r("y")]
    );
}

// ============================================================================
// Property-based coverage
// ============================================================================

/// Tree used by the property tests: a parent handling a couple of routes, a
/// pushable child, and a registered modal coordinator.
struct PropTree {
    parent: Rc<Coordinator<Name>>,
    child: Rc<Coordinator<Name>>,
    modal: Rc<Coordinator<Name>>,
}

fn prop_tree() -> PropTree {
    let parent = coordinator(
        "parent",
        "home",
        Table::handling(&["a", "b", "sheet"]).typed("sheet", NavigationType::Modal),
    );
    let child = coordinator("child", "child-root", Table::handling(&["c"]));
    let modal = coordinator("modal", "sheet", Table::handling(&["sheet-inner"]));
    parent.add_child(child.as_any_coordinator()).expect("add child");
    parent.add_modal_coordinator(modal.as_any_coordinator());
    PropTree {
        parent,
        child,
        modal,
    }
}

impl PropTree {
    fn snapshot(&self) -> Vec<NavigationState<Name>> {
        vec![
            self.parent.state(),
            self.child.state(),
            self.modal.state(),
        ]
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        ..ProptestConfig::default()
    })]

    /// Capability queries never mutate, and a failed navigation leaves
    /// every router byte-for-byte identical.
    #[test]
    fn test_navigation_atomicity(ids in prop::collection::vec("[a-f]|sheet|sheet-inner|home|child-root", 1..20)) {
        install_capture();
        let tree = prop_tree();

        for id in ids {
            let route = r(&id);
            let before = tree.snapshot();

            // Pure queries must not move anything.
            let erased = AnyRoute::new(route.clone());
            tree.parent.as_any_coordinator().can_navigate_to(&erased);
            tree.child.as_any_coordinator().can_navigate_to(&erased);
            prop_assert_eq!(&tree.snapshot(), &before);

            let moved = tree.parent.navigate(route);
            if !moved {
                prop_assert_eq!(&tree.snapshot(), &before);
            }
        }
        take_errors();
    }

    /// A flow orchestrator holds exactly one active flow at a time, and
    /// every displaced flow loses its parent link.
    #[test]
    fn test_single_active_flow(sequence in prop::collection::vec(0usize..3, 1..12)) {
        use navflow::FlowOrchestrator;

        let orchestrator = FlowOrchestrator::new("app", r("launch"), Rc::new(Table::default()));
        let flows: Vec<Rc<Coordinator<Name>>> = (0..3)
            .map(|index| coordinator(&format!("flow-{index}"), "flow-root", Table::default()))
            .collect();

        for index in sequence {
            let already_active = orchestrator
                .current_flow()
                .is_some_and(|flow| flow.id() == flows[index].id());
            let result = orchestrator.transition_to_flow(
                flows[index].as_any_coordinator(),
                r(&format!("flow-{index}-root")),
            );
            prop_assert!(result.is_ok() || already_active);

            prop_assert_eq!(orchestrator.coordinator().children().len(), 1);
            for (other, flow) in flows.iter().enumerate() {
                if other == index {
                    prop_assert_eq!(
                        flow.parent().map(|p| p.id()),
                        Some(orchestrator.coordinator().id())
                    );
                } else {
                    prop_assert!(flow.parent().is_none());
                }
            }
        }
    }
}
