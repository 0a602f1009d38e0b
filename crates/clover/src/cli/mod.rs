//! Command implementations for the `clover` binary.

pub mod config;
pub mod process;
