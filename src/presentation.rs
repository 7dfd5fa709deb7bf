//! Presentation contexts and back-action plumbing
//!
//! Every coordinator is tagged with how it was brought on screen. The
//! context drives back-button visibility and makes a single back action do
//! the right thing (pop the stack, dismiss the presenting modal, or
//! dismiss the presenting detour) without the view layer knowing which.

use crate::coordinator::AnyCoordinator;
use std::rc::{Rc, Weak};

/// How a coordinator was brought into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresentationContext {
    /// Standalone, at the root of its slot.
    #[default]
    Root,
    /// A tab of a tab coordinator.
    Tab,
    /// Pushed into a parent's navigation stack.
    Pushed,
    /// Presented as a parent's modal.
    Modal,
    /// Presented as a parent's detour overlay.
    Detour,
}

impl PresentationContext {
    /// Whether this context implies a back affordance of its own.
    pub fn should_show_back_button(&self) -> bool {
        matches!(
            self,
            PresentationContext::Pushed | PresentationContext::Modal | PresentationContext::Detour
        )
    }
}

/// A cloneable back action for custom back-button UI.
///
/// Holds the coordinator weakly and routes to its context-aware `pop`:
/// stack pop, modal dismissal, or detour dismissal, depending on how the
/// coordinator is presented. Invoking after the coordinator is gone is a
/// no-op.
#[derive(Clone)]
pub struct BackAction {
    coordinator: Weak<dyn AnyCoordinator>,
}

impl BackAction {
    /// Build a back action for a coordinator.
    pub fn new(coordinator: &Rc<dyn AnyCoordinator>) -> Self {
        Self {
            coordinator: Rc::downgrade(coordinator),
        }
    }

    /// Whether going back would do anything right now.
    ///
    /// True when the coordinator's presentation context shows a back
    /// button, or when its stack is non-empty.
    pub fn is_available(&self) -> bool {
        self.coordinator
            .upgrade()
            .is_some_and(|coordinator| coordinator.can_navigate_back())
    }

    /// Perform the context-appropriate back navigation.
    pub fn invoke(&self) {
        if let Some(coordinator) = self.coordinator.upgrade() {
            coordinator.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_button_visibility() {
        assert!(!PresentationContext::Root.should_show_back_button());
        assert!(!PresentationContext::Tab.should_show_back_button());
        assert!(PresentationContext::Pushed.should_show_back_button());
        assert!(PresentationContext::Modal.should_show_back_button());
        assert!(PresentationContext::Detour.should_show_back_button());
    }
}
