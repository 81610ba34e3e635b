//! Report output modules.

pub mod generator;

pub use generator::*;
