//! Logging abstraction layer
//!
//! The engine logs every navigation decision (delegation, smart navigation,
//! dismissal, bubbling) through the macros below, which forward to either
//! the `log` crate (default feature `log`) or the `tracing` crate (feature
//! `tracing`). Choose one feature at compile time; they are mutually
//! exclusive. All records carry the `navflow` target so embedders can
//! filter engine output without touching their own logging configuration.
//!
//! # Usage
//!
//! ```ignore
//! use navflow::{trace_log, debug_log};
//!
//! trace_log!("validating route '{}'", route.identifier());
//! debug_log!("dismissing modal before continuing");
//! ```

/// Trace-level logging
///
/// Per-step detail of the validation and execution passes.
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!(target: "navflow", $($arg)*);
        #[cfg(feature = "log")]
        ::log::trace!(target: "navflow", $($arg)*);
    };
}

/// Debug-level logging
///
/// State mutations and delegation outcomes.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!(target: "navflow", $($arg)*);
        #[cfg(feature = "log")]
        ::log::debug!(target: "navflow", $($arg)*);
    };
}

/// Info-level logging
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::info!(target: "navflow", $($arg)*);
        #[cfg(feature = "log")]
        ::log::info!(target: "navflow", $($arg)*);
    };
}

/// Warn-level logging
///
/// Defensive branches that validation should have made unreachable.
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::warn!(target: "navflow", $($arg)*);
        #[cfg(feature = "log")]
        ::log::warn!(target: "navflow", $($arg)*);
    };
}

/// Error-level logging
///
/// Also the sink for reported [`FlowError`](crate::FlowError) values when no
/// central reporter has been installed.
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::error!(target: "navflow", $($arg)*);
        #[cfg(feature = "log")]
        ::log::error!(target: "navflow", $($arg)*);
    };
}
