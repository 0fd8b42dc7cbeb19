//! End-to-end tests for sheetkv-xlsx.
//!
//! Each test builds the exact package it needs in memory with [`Fixture`],
//! opens it as an [`XlsxDocument`](sheetkv_xlsx::XlsxDocument) and asserts on
//! the cell facts, display values and the XML written back on save.

mod common;
mod reading;
mod updating;

// Re-export common utilities for submodules
pub use common::*;
