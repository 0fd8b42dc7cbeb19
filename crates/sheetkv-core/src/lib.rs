//! # sheetkv-core
//!
//! Core of the sheetkv extraction engine.
//!
//! This crate knows nothing about file formats. It provides:
//! - [`CellAddress`] and [`CellRange`] - A1 addresses and vertical ranges
//! - [`NumberFormatter`] - display text for numbers, percentages, currency and dates
//! - [`ValueResolver`] - turns a [`CellFact`] into display text and formula
//! - [`SectionExtractor`] - reads configured key/value sections into a [`SectionMap`]
//! - [`CellFactSource`] / [`CellFactSink`] - the seam every document adapter implements
//! - [`MemoryWorkbook`] - an in-memory adapter
//!
//! ## Example
//!
//! ```rust
//! use sheetkv_core::{CellFact, MemoryWorkbook, SectionConfig, SectionExtractor, SheetId};
//!
//! let mut workbook = MemoryWorkbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//! sheet.set("A2", CellFact::text("Rate")).unwrap();
//! sheet.set("B2", CellFact::number(0.045).with_format(10)).unwrap();
//!
//! let extractor = SectionExtractor::new(vec![SectionConfig::new("Loan", "A2:A2", "B2:B2")]).unwrap();
//! let sections = extractor.extract(&workbook, SheetId(0)).unwrap();
//!
//! let rate = &sections.get("Loan").unwrap()[0];
//! assert_eq!(rate.key, "Rate");
//! assert_eq!(rate.value.as_deref(), Some("4.50%"));
//! ```

pub mod cell;
pub mod error;
pub mod memory;
pub mod number_format;
pub mod resolve;
pub mod section;
pub mod source;

// Re-exports for convenience
pub use cell::{expand, CellAddress, CellFact, CellInput, CellKind, CellRange};
pub use error::{Error, Result};
pub use memory::{MemorySheet, MemoryWorkbook};
pub use number_format::{DateSystem, NumberFormatter};
pub use resolve::{ResolvedValue, ValueResolver};
pub use section::{KeyValueEntry, SectionConfig, SectionExtractor, SectionMap};
pub use source::{CellFactSink, CellFactSource, SheetId, SheetRef};
