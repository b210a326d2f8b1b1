//! # EntiMap Testkit
//!
//! Test utilities for EntiMap.
//!
//! This crate provides:
//! - Entity fixtures covering the common mapping shapes
//! - Property-based test generators using proptest
//! - A mapping harness that checks round trips through a store
//! - Test logging setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entimap_testkit::prelude::*;
//!
//! #[test]
//! fn person_survives_the_store() {
//!     let mut harness = MappingHarness::new();
//!     let mut person = sample_person();
//!     harness.put_and_verify(&mut person);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod harness;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::harness::*;
}

pub use fixtures::*;
pub use generators::*;
pub use harness::*;
