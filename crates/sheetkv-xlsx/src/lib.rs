//! # sheetkv-xlsx
//!
//! XLSX (Office Open XML) adapter for sheetkv.
//!
//! [`XlsxDocument`] loads a package into memory and exposes its cells as
//! [`CellFact`](sheetkv_core::CellFact)s through
//! [`CellFactSource`](sheetkv_core::CellFactSource). Opened for writing, it
//! also implements [`CellFactSink`](sheetkv_core::CellFactSink): updated
//! cells are patched into the original worksheet XML, cached formula
//! results are dropped and the workbook is flagged for full recalculation.

mod document;
pub mod error;
mod reader;
mod styles;
mod writer;

pub use document::{OpenMode, XlsxDocument};
pub use error::{XlsxError, XlsxResult};
