//! Post-processing of shooting-and-bouncing-ray (SBR) bounce trees.
//!
//! A [`bundle::RayBundle`] holds one tree of bounces per traced ray. The
//! passes in this crate run strictly downstream:
//!
//! - [`augment`]: one-time enrichment (source bounce, parent links,
//!   cumulative distance, depth and leaf bookkeeping)
//! - [`filter`]: track, branch and bounce level selection into a
//!   [`filter::FilterMask`]
//! - [`field`]: scalar colour values from complex field samples
//! - [`render`]: coloured line segments, points and offset footprints

pub mod augment;
pub mod bounce;
pub mod bounds;
pub mod bundle;
pub mod error;
pub mod field;
pub mod filter;
pub mod output;
pub mod palette;
pub mod postprocess;
pub mod render;
pub mod settings;
pub mod stats;
pub mod track;
