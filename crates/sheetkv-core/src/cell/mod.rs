//! Cell-related types
//!
//! This module contains:
//! - [`CellAddress`] - A cell's location (e.g., "B12")
//! - [`CellRange`] - A vertical range of cells (e.g., "A2:A10")
//! - [`CellFact`] - The primitive facts an adapter reports for one cell

mod address;
mod fact;

pub use address::{expand, CellAddress, CellRange, CellRangeIterator};
pub use fact::{CellFact, CellInput, CellKind};
