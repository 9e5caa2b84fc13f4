pub mod core;
pub mod exports;
pub mod reports;
