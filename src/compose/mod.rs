// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The composition under construction and its analysis.
//!
//! [`Composition`] is the mutable buffer the search driver fills in lead by
//! lead; it keeps the running changes-of-method and length tallies, finds
//! admissible rotations, proves truth and totals music. [`OutputComp`] is
//! the immutable snapshot taken when a composition is emitted.

pub mod composition;
pub mod output;

pub use composition::{Composition, Lead};
pub use output::OutputComp;
