//! Tab coordinator
//!
//! A [`TabCoordinator`] owns its children as tabs. When a route it cannot
//! handle arrives, it tries the currently selected tab first, then the
//! remaining tabs, switching the selection to whichever tab can reach the
//! route. When no tab can, the request bubbles straight to the parent.

use crate::coordinator::{
    AnyCoordinator, Coordinator, CoordinatorDelegate, CoordinatorMode,
};
use crate::error::{report, FlowError};
use crate::route::Route;
use crate::router::Router;
use std::rc::Rc;

/// Visual metadata for a tab child: a label and an icon name the view
/// layer resolves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TabItem {
    /// Tab label text.
    pub label: String,
    /// Icon identifier, resolved by the view layer.
    pub icon: String,
}

impl TabItem {
    /// Create a tab item.
    pub fn new(label: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            icon: icon.into(),
        }
    }
}

/// A coordinator whose children are tabs.
///
/// Cheap to clone; all clones share the same underlying coordinator.
///
/// # Example
///
/// ```ignore
/// let tabs = TabCoordinator::new("main", AppRoute::Tabs, Rc::new(MainTabsDelegate));
/// tabs.add_tab(home.as_any_coordinator())?;
/// tabs.add_tab(search.as_any_coordinator())?;
/// tabs.select_tab(1)?;
/// ```
#[derive(Clone)]
pub struct TabCoordinator<R: Route> {
    core: Rc<Coordinator<R>>,
}

impl<R: Route> TabCoordinator<R> {
    /// Create a tab coordinator rooted at `root`.
    pub fn new(
        name: impl Into<String>,
        root: R,
        delegate: Rc<dyn CoordinatorDelegate<R>>,
    ) -> Self {
        Self {
            core: Coordinator::with_mode(name, root, delegate, CoordinatorMode::Tab),
        }
    }

    /// The underlying coordinator, for tree wiring and navigation.
    pub fn coordinator(&self) -> &Rc<Coordinator<R>> {
        &self.core
    }

    /// This coordinator as a type-erased handle.
    pub fn as_any_coordinator(&self) -> Rc<dyn AnyCoordinator> {
        self.core.as_any_coordinator()
    }

    /// Add a tab child.
    ///
    /// The child's presentation context becomes
    /// [`Tab`](crate::PresentationContext::Tab). A tab child without a
    /// `tab_item` is accepted but reported as a
    /// [`ConfigurationError`](FlowError::ConfigurationError) diagnostic.
    pub fn add_tab(&self, child: Rc<dyn AnyCoordinator>) -> Result<(), FlowError> {
        if child.tab_item().is_none() {
            report(&FlowError::ConfigurationError {
                message: format!(
                    "tab child '{}' of '{}' did not supply a tab item",
                    child.name(),
                    self.core.name()
                ),
            });
        }
        self.core.add_child(child)
    }

    /// Remove a tab child.
    pub fn remove_tab(&self, child: &Rc<dyn AnyCoordinator>) -> bool {
        self.core.remove_child(child)
    }

    /// Select a tab by index.
    ///
    /// Reports and returns [`FlowError::InvalidTabIndex`] when the index is
    /// outside `0..tab_count`.
    pub fn select_tab(&self, index: usize) -> Result<(), FlowError> {
        self.core.select_tab_checked(index)
    }

    /// Index of the currently selected tab.
    pub fn selected_tab(&self) -> usize {
        self.core.state().selected_tab()
    }

    /// Number of tabs.
    pub fn tab_count(&self) -> usize {
        self.core.children().len()
    }

    /// Per-tab metadata, in tab order. Entries are `None` for tabs whose
    /// delegate supplies no item.
    pub fn tab_items(&self) -> Vec<Option<TabItem>> {
        self.core
            .children()
            .iter()
            .map(|child| child.tab_item())
            .collect()
    }

    /// Navigate to a route. See [`Coordinator::navigate`].
    pub fn navigate(&self, route: R) -> bool {
        self.core.navigate(route)
    }

    /// This coordinator's router.
    pub fn router(&self) -> &Router<R> {
        self.core.router()
    }
}
