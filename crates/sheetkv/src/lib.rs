//! # sheetkv
//!
//! Extract configured key/value sections from spreadsheets.
//!
//! A *section* pairs a vertical range of key cells with a parallel range of
//! value cells. For every non-blank key, sheetkv reports the value the way a
//! spreadsheet application displays it (percentages, currency, dates) along
//! with the formula behind it, if any.
//!
//! ## Features
//!
//! - Read XLSX files (Office Open XML) without a spreadsheet engine
//! - Section configuration in the `ExcelSections` settings layout
//! - Write cell values back; saved files recalculate when next opened
//! - Any other backing document via [`CellFactSource`]
//!
//! ## Example
//!
//! ```no_run
//! use sheetkv::prelude::*;
//!
//! let config = ExtractionConfig::from_json(r#"{
//!     "ExcelSections": { "Loan": { "KeyRange": "A2:A4", "ValueRange": "B2:B4" } }
//! }"#)?;
//!
//! let sections = sheetkv::read_sections("loan.xlsx", &config)?;
//! for entry in sections.get("Loan").unwrap_or_default() {
//!     println!("{} = {:?}", entry.key, entry.value);
//! }
//! # Ok::<(), sheetkv::Error>(())
//! ```

use std::path::Path;

use log::info;

pub mod config;
pub mod prelude;

pub use config::{CellUpdate, ExtractionConfig};

// Re-export core types
pub use sheetkv_core::{
    expand, CellAddress, CellFact, CellFactSink, CellFactSource, CellInput, CellKind, CellRange,
    DateSystem, Error, KeyValueEntry, MemorySheet, MemoryWorkbook, NumberFormatter, ResolvedValue,
    Result, SectionConfig, SectionExtractor, SectionMap, SheetId, SheetRef, ValueResolver,
};

// Re-export XLSX types
pub use sheetkv_xlsx::{OpenMode, XlsxDocument, XlsxError};

/// Extract every configured section from an XLSX file
pub fn read_sections<P: AsRef<Path>>(path: P, config: &ExtractionConfig) -> Result<SectionMap> {
    let path = path.as_ref();
    let doc = XlsxDocument::open_read(path)?;
    let sections = config.extract(&doc)?;
    info!(
        "extracted {} section(s) from {}",
        sections.len(),
        path.display()
    );
    Ok(sections)
}

/// Display text and formula of one cell
pub fn read_cell<P: AsRef<Path>>(
    path: P,
    sheet: &SheetRef,
    cell: &str,
    formatter: NumberFormatter,
) -> Result<ResolvedValue> {
    let doc = XlsxDocument::open_read(path)?;
    let sheet = doc.resolve_sheet(sheet)?;
    let address = CellAddress::parse(cell)?;
    ValueResolver::new(formatter).resolve(&doc, sheet, address)
}

/// Names of all sheets in workbook order
pub fn sheet_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    Ok(XlsxDocument::open_read(path)?.sheet_names())
}

/// Apply update requests and save
///
/// The result is written to `output`, or back to `path` when `output` is
/// `None`. Nothing is written if any request fails.
pub fn apply_updates<P: AsRef<Path>>(
    path: P,
    output: Option<&Path>,
    updates: &[CellUpdate],
) -> Result<()> {
    let path = path.as_ref();
    let mut doc = XlsxDocument::open_write(path)?;
    apply_to(&mut doc, updates)?;

    match output {
        Some(output) => {
            doc.save_as(output)?;
            info!("applied {} update(s) to {}", updates.len(), output.display());
        }
        None => {
            doc.save()?;
            info!("applied {} update(s) to {}", updates.len(), path.display());
        }
    }
    Ok(())
}

/// Apply update requests to any writable document without saving
pub fn apply_to<D: CellFactSink + ?Sized>(doc: &mut D, updates: &[CellUpdate]) -> Result<()> {
    for update in updates {
        let sheet = doc.resolve_sheet(&update.sheet_ref()?)?;
        let address = CellAddress::parse(&update.cell)?;
        doc.set_cell_value(sheet, address, update.value.clone())?;
    }
    Ok(())
}
