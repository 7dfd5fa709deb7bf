//! Modal detent configuration
//!
//! Detents describe the resting heights a modal sheet may occupy. The engine
//! stores and publishes this configuration as data; actual sheet rendering is
//! the view layer's job. The view layer reports measured content heights and
//! user-driven detent changes back through the owning coordinator's
//! `update_modal_*` methods.

/// A resting height for a presented modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Detent {
    /// Compact sheet sized to its content's minimum height.
    Small,
    /// Roughly half the container.
    Medium,
    /// Nearly full-height sheet.
    Large,
    /// Taller than large, short of covering the container.
    ExtraLarge,
    /// Edge-to-edge cover instead of a sheet.
    Fullscreen,
    /// Sized from the measured ideal height reported by the view layer.
    Custom,
}

/// Detent configuration attached to a presented modal.
///
/// Holds the set of allowed detents, the currently selected one, and the
/// content measurements the view layer reports for [`Detent::Small`] and
/// [`Detent::Custom`] sizing. Heights are in the embedder's logical units.
///
/// # Example
///
/// ```
/// use navflow::{Detent, ModalDetentConfiguration};
///
/// let config = ModalDetentConfiguration::new([Detent::Medium, Detent::Large])
///     .with_selected(Detent::Medium);
///
/// assert_eq!(config.selected(), Some(Detent::Medium));
/// assert!(!config.should_use_full_screen_cover());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ModalDetentConfiguration {
    detents: Vec<Detent>,
    selected: Option<Detent>,
    min_height: Option<f32>,
    ideal_height: Option<f32>,
}

impl ModalDetentConfiguration {
    /// Create a configuration allowing the given detents.
    pub fn new(detents: impl Into<Vec<Detent>>) -> Self {
        Self {
            detents: detents.into(),
            selected: None,
            min_height: None,
            ideal_height: None,
        }
    }

    /// Set the initially selected detent.
    #[must_use]
    pub fn with_selected(mut self, detent: Detent) -> Self {
        self.selected = Some(detent);
        self
    }

    /// Allowed detents, in declaration order.
    pub fn detents(&self) -> &[Detent] {
        &self.detents
    }

    /// Currently selected detent, if any.
    pub fn selected(&self) -> Option<Detent> {
        self.selected
    }

    /// Measured minimum content height, if the view layer reported one.
    pub fn min_height(&self) -> Option<f32> {
        self.min_height
    }

    /// Measured ideal content height, if the view layer reported one.
    pub fn ideal_height(&self) -> Option<f32> {
        self.ideal_height
    }

    /// Whether the modal should render as a full-screen cover.
    ///
    /// True exactly when fullscreen is the only allowed detent.
    pub fn should_use_full_screen_cover(&self) -> bool {
        self.detents.len() == 1 && self.detents[0] == Detent::Fullscreen
    }

    pub(crate) fn set_selected(&mut self, detent: Detent) {
        self.selected = Some(detent);
    }

    pub(crate) fn set_min_height(&mut self, height: f32) {
        self.min_height = Some(height);
    }

    pub(crate) fn set_ideal_height(&mut self, height: f32) {
        self.ideal_height = Some(height);
    }
}

impl Default for ModalDetentConfiguration {
    /// A plain large sheet, the fallback when a coordinator supplies no
    /// configuration for a presented route.
    fn default() -> Self {
        Self::new([Detent::Large])
    }
}
