//! Busiest network interface detection.
//!
//! Exposes the detector, the host statistics providers and the
//! configuration layer used by the `ifpick` binary.

pub mod config;
pub mod detector;
pub mod stats;

pub use detector::BusiestInterfaceDetector;
pub use ifpick_shared::{Selection, SelectionReason};
