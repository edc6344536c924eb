//! Core types and the projection model for locating decoded markers.
//!
//! A marker decoder (out of scope for this crate) reports a payload and the
//! polygon of the marker in pixel space. This crate turns such a
//! [`Detection`] into a real-world [`Location`] using a pinhole model driven
//! by an explicit, immutable [`CalibrationParameters`] value:
//!
//! - [`compute_location`] projects a single detection,
//! - [`LocationExtractor`] projects every detection of one image and skips
//!   (and counts) the ones with unusable geometry.
//!
//! The crate is purely numeric. It does not load images and keeps no
//! process-wide state.
//!
//! ```
//! use marker_locator_core::{CalibrationParameters, Detection, LocationExtractor};
//! use nalgebra::Point2;
//!
//! let params = CalibrationParameters::new(0.775, 1.0, 7.93).unwrap();
//! let detection = Detection::new(
//!     "dock-3",
//!     vec![Point2::new(1800.0, 1000.0), Point2::new(2000.0, 1000.0)],
//!     4000.0,
//! );
//!
//! let extraction = LocationExtractor::new(params).process(&[detection]);
//! let location = extraction.locations.get("dock-3").unwrap();
//! assert!((location.forward_distance - 122.915).abs() < 1e-9);
//! ```

mod detection;
mod extract;
mod location;
mod logger;
mod params;
mod projection;
pub mod synthetic;

pub use detection::Detection;
pub use extract::{Extraction, LocationExtractor};
pub use location::{Location, LocationSet};
pub use params::{CalibrationParameters, ParameterError};
pub use projection::{compute_location, InvalidDetection};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
