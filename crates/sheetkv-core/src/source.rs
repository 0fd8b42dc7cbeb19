//! Document adapter traits
//!
//! The extraction engine only ever talks to a document through
//! [`CellFactSource`]; writing goes through [`CellFactSink`]. Each backing
//! technology provides its own implementation.

use std::fmt;
use std::str::FromStr;

use crate::cell::{CellAddress, CellFact, CellInput};
use crate::error::{Error, Result};

/// How a caller names a sheet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SheetRef {
    /// 0-based position in the workbook
    Index(usize),
    /// Sheet name, matched case-insensitively; all-digit text that names
    /// no sheet falls back to the 0-based index
    Name(String),
}

impl Default for SheetRef {
    fn default() -> Self {
        SheetRef::Index(0)
    }
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetRef::Index(i) => write!(f, "#{}", i),
            SheetRef::Name(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for SheetRef {
    type Err = Error;

    /// Text always names a sheet; see [`SheetRef::Name`] for digits
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::SheetNotFound("empty sheet name".into()));
        }
        Ok(SheetRef::Name(s.to_string()))
    }
}

impl From<usize> for SheetRef {
    fn from(i: usize) -> Self {
        SheetRef::Index(i)
    }
}

impl From<&str> for SheetRef {
    fn from(name: &str) -> Self {
        SheetRef::Name(name.to_string())
    }
}

/// A resolved sheet handle; only meaningful for the source that issued it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SheetId(pub usize);

/// Read access to the primitive facts of a document
pub trait CellFactSource {
    /// Sheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Resolve a sheet reference, failing with [`Error::SheetNotFound`]
    fn resolve_sheet(&self, sheet: &SheetRef) -> Result<SheetId> {
        let names = self.sheet_names();
        let index = match sheet {
            SheetRef::Index(i) => Some(*i).filter(|i| *i < names.len()),
            SheetRef::Name(name) => names
                .iter()
                .position(|n| n.eq_ignore_ascii_case(name))
                .or_else(|| name.parse::<usize>().ok().filter(|i| *i < names.len())),
        };
        index
            .map(SheetId)
            .ok_or_else(|| Error::SheetNotFound(sheet.to_string()))
    }

    /// Facts for one cell; a cell that does not exist is [`CellFact::empty`]
    fn cell_fact(&self, sheet: SheetId, address: CellAddress) -> Result<CellFact>;

    /// Text of a shared string, failing with [`Error::IndexOutOfRange`]
    fn shared_string(&self, index: usize) -> Result<String>;

    /// Whether serial dates count from 1904 instead of 1900
    fn uses_1904_dates(&self) -> bool {
        false
    }
}

/// Write access used by the update flow
pub trait CellFactSink: CellFactSource {
    /// Overwrite one cell with a literal value
    fn set_cell_value(&mut self, sheet: SheetId, address: CellAddress, value: CellInput)
        -> Result<()>;

    /// Persist all changes; a subsequent open must recalculate formulas
    fn save(&mut self) -> Result<()>;
}
