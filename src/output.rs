//! Human-facing output of count results.

pub mod age;
pub mod table;
