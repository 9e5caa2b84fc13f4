//! Report compilation: raw records to normalized rows, elective filtering,
//! and the table shape shared by every output format.

pub mod filter;
pub mod format;
pub mod model;
pub mod naming;
pub mod normalize;
pub mod shape;
