//! In-memory document adapter
//!
//! Holds cell facts directly. Useful when facts come from somewhere other
//! than a file, and as the reference adapter in tests.

use std::collections::HashMap;

use crate::cell::{CellAddress, CellFact, CellInput};
use crate::error::{Error, Result};
use crate::source::{CellFactSink, CellFactSource, SheetId};

/// A named sheet of cell facts
#[derive(Debug, Clone, Default)]
pub struct MemorySheet {
    name: String,
    cells: HashMap<CellAddress, CellFact>,
}

impl MemorySheet {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the fact at an A1-style address
    pub fn set(&mut self, address: &str, fact: CellFact) -> Result<&mut Self> {
        let addr = CellAddress::parse(address)?;
        self.cells.insert(addr, fact);
        Ok(self)
    }

    /// Set the fact at a parsed address
    pub fn set_at(&mut self, address: CellAddress, fact: CellFact) {
        self.cells.insert(address, fact);
    }

    pub fn get(&self, address: CellAddress) -> Option<&CellFact> {
        self.cells.get(&address)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// A workbook whose facts live in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<MemorySheet>,
    shared_strings: Vec<String>,
    date1904: bool,
    recalc_requested: bool,
}

impl MemoryWorkbook {
    /// Create a workbook with one sheet named "Sheet1"
    pub fn new() -> Self {
        Self::with_sheets(["Sheet1"])
    }

    /// Create a workbook with the given sheet names
    pub fn with_sheets<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sheets: names.into_iter().map(MemorySheet::new).collect(),
            ..Self::default()
        }
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn worksheet(&self, index: usize) -> Option<&MemorySheet> {
        self.sheets.get(index)
    }

    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut MemorySheet> {
        self.sheets.get_mut(index)
    }

    pub fn worksheet_by_name_mut(&mut self, name: &str) -> Option<&mut MemorySheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Append a shared string and return its index
    pub fn add_shared_string<S: Into<String>>(&mut self, text: S) -> usize {
        self.shared_strings.push(text.into());
        self.shared_strings.len() - 1
    }

    pub fn set_1904_dates(&mut self, date1904: bool) {
        self.date1904 = date1904;
    }

    /// Whether `save` has asked for a full recalculation
    pub fn recalc_requested(&self) -> bool {
        self.recalc_requested
    }

    fn sheet(&self, sheet: SheetId) -> Result<&MemorySheet> {
        self.sheets
            .get(sheet.0)
            .ok_or_else(|| Error::SheetNotFound(format!("#{}", sheet.0)))
    }
}

impl CellFactSource for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn cell_fact(&self, sheet: SheetId, address: CellAddress) -> Result<CellFact> {
        Ok(self
            .sheet(sheet)?
            .get(address)
            .cloned()
            .unwrap_or_else(CellFact::empty))
    }

    fn shared_string(&self, index: usize) -> Result<String> {
        self.shared_strings
            .get(index)
            .cloned()
            .ok_or(Error::IndexOutOfRange {
                index,
                len: self.shared_strings.len(),
            })
    }

    fn uses_1904_dates(&self) -> bool {
        self.date1904
    }
}

impl CellFactSink for MemoryWorkbook {
    fn set_cell_value(
        &mut self,
        sheet: SheetId,
        address: CellAddress,
        value: CellInput,
    ) -> Result<()> {
        let target = self
            .sheets
            .get_mut(sheet.0)
            .ok_or_else(|| Error::SheetNotFound(format!("#{}", sheet.0)))?;

        // Keep the cell's number format
        let mut fact = value.to_fact();
        if let Some(previous) = target.cells.get(&address) {
            fact.number_format_id = previous.number_format_id;
            fact.is_date_formatted = previous.is_date_formatted;
        }
        target.cells.insert(address, fact);
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        for sheet in &mut self.sheets {
            for fact in sheet.cells.values_mut() {
                if fact.formula_text.is_some() {
                    fact.raw_value.clear();
                    fact.result_kind = None;
                }
            }
        }
        self.recalc_requested = true;
        Ok(())
    }
}
