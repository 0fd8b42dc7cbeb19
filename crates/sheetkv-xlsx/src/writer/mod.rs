//! XLSX writer
//!
//! Saving never regenerates the package. Worksheets are streamed through a
//! patcher that swaps in updated cells and drops cached formula results;
//! every other part is written back as it was read.

mod recalc;

use std::collections::BTreeMap;
use std::io::{Seek, Write};

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::XlsxResult;
use crate::reader::row_index;
use sheetkv_core::{CellAddress, CellInput};

pub(crate) use recalc::{force_full_recalc, CONTENT_TYPES_PART, WORKBOOK_PART, WORKBOOK_RELS_PART};

/// Pending cell values of one worksheet
pub(crate) type SheetUpdates = BTreeMap<CellAddress, CellInput>;

/// Write parts into a new zip archive, content types first
pub(crate) fn write_package<W: Write + Seek>(
    parts: &BTreeMap<String, Vec<u8>>,
    writer: W,
) -> XlsxResult<()> {
    let mut zip = zip::ZipWriter::new(writer);
    let options = zip::write::SimpleFileOptions::default();

    let content_types = parts.get_key_value(CONTENT_TYPES_PART);
    let rest = parts
        .iter()
        .filter(|(name, _)| name.as_str() != CONTENT_TYPES_PART);

    for (name, data) in content_types.into_iter().chain(rest) {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(data)?;
    }

    zip.finish()?;
    Ok(())
}

/// Rewrite a worksheet with `updates` applied and formula caches removed
///
/// Updated cells keep their style index. Cells and rows that do not exist
/// yet are inserted in row/column order.
pub(crate) fn patch_worksheet(xml: &[u8], updates: &SheetUpdates) -> XlsxResult<Vec<u8>> {
    let mut pending: BTreeMap<u32, BTreeMap<u32, &CellInput>> = BTreeMap::new();
    for (addr, input) in updates {
        pending.entry(addr.row).or_default().insert(addr.col, input);
    }

    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 256));
    let mut patch = SheetPatch {
        pending,
        prefix: String::new(),
        row_cells: None,
        current_row: None,
        last_col: None,
    };

    let mut buf = Vec::new();
    let mut in_sheet_data = false;
    let mut in_cell = false;
    let mut cell_has_formula = false;
    let mut skip_cell = false;
    let mut skip_value = false;

    loop {
        let event = reader.read_event_into(&mut buf)?;

        if skip_cell {
            if matches!(&event, Event::End(e) if e.local_name().as_ref() == b"c") {
                skip_cell = false;
            }
            buf.clear();
            continue;
        }
        if skip_value {
            if matches!(&event, Event::End(e) if e.local_name().as_ref() == b"v") {
                skip_value = false;
            }
            buf.clear();
            continue;
        }

        match event {
            Event::Start(ref e) if e.local_name().as_ref() == b"sheetData" => {
                in_sheet_data = true;
                patch.prefix = prefix_of(e.name().as_ref());
                writer.write_event(Event::Start(e.to_owned()))?;
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"sheetData" => {
                patch.prefix = prefix_of(e.name().as_ref());
                if patch.pending.is_empty() {
                    writer.write_event(Event::Empty(e.to_owned()))?;
                } else {
                    writer.write_event(Event::Start(e.to_owned()))?;
                    patch.flush_rows_before(&mut writer, None)?;
                    writer.write_event(Event::End(BytesEnd::new(patch.name("sheetData"))))?;
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"sheetData" => {
                patch.flush_rows_before(&mut writer, None)?;
                in_sheet_data = false;
                writer.write_event(Event::End(e.to_owned()))?;
            }

            Event::Start(ref e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                let row = row_index(e, patch.current_row);
                patch.flush_rows_before(&mut writer, Some(row))?;
                patch.current_row = Some(row);
                patch.last_col = None;
                patch.row_cells = patch.pending.remove(&row);
                if patch.row_cells.is_some() {
                    writer.write_event(Event::Start(without_spans(e)))?;
                } else {
                    writer.write_event(Event::Start(e.to_owned()))?;
                }
            }
            Event::Empty(ref e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                let row = row_index(e, patch.current_row);
                patch.flush_rows_before(&mut writer, Some(row))?;
                patch.current_row = Some(row);
                match patch.pending.remove(&row) {
                    Some(cells) => {
                        writer.write_event(Event::Start(without_spans(e)))?;
                        patch.write_cells(&mut writer, row, &cells)?;
                        writer.write_event(Event::End(BytesEnd::new(patch.name("row"))))?;
                    }
                    None => writer.write_event(Event::Empty(e.to_owned()))?,
                }
            }
            Event::End(ref e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                patch.flush_row_cells_before(&mut writer, None)?;
                patch.row_cells = None;
                writer.write_event(Event::End(e.to_owned()))?;
            }

            Event::Start(ref e) | Event::Empty(ref e)
                if in_sheet_data && e.local_name().as_ref() == b"c" =>
            {
                let is_start = matches!(event, Event::Start(_));
                let addr = patch.cell_address(e);
                if let Some(addr) = addr {
                    patch.last_col = Some(addr.col);
                    patch.flush_row_cells_before(&mut writer, Some(addr.col))?;
                }

                match addr.and_then(|a| patch.take_update(a).map(|input| (a, input))) {
                    Some((addr, input)) => {
                        patch.write_cell(&mut writer, addr, input, style_attr(e))?;
                        skip_cell = is_start;
                    }
                    None => {
                        in_cell = is_start;
                        cell_has_formula = false;
                        writer.write_event(event.into_owned())?;
                    }
                }
            }
            Event::Start(ref e) | Event::Empty(ref e)
                if in_cell && e.local_name().as_ref() == b"f" =>
            {
                cell_has_formula = true;
                writer.write_event(event.into_owned())?;
            }
            Event::Start(ref e) if cell_has_formula && e.local_name().as_ref() == b"v" => {
                skip_value = true;
            }
            Event::Empty(ref e) if cell_has_formula && e.local_name().as_ref() == b"v" => {}
            Event::End(ref e) if in_cell && e.local_name().as_ref() == b"c" => {
                in_cell = false;
                cell_has_formula = false;
                writer.write_event(Event::End(e.to_owned()))?;
            }

            Event::Eof => break,
            other => writer.write_event(other.into_owned())?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

/// Streaming state for updates not yet written
struct SheetPatch<'a> {
    /// Rows not reached yet, by row index
    pending: BTreeMap<u32, BTreeMap<u32, &'a CellInput>>,
    /// Namespace prefix of sheetData, with the colon
    prefix: String,
    /// Updates of the row being copied
    row_cells: Option<BTreeMap<u32, &'a CellInput>>,
    current_row: Option<u32>,
    last_col: Option<u32>,
}

impl<'a> SheetPatch<'a> {
    fn name(&self, local: &str) -> String {
        format!("{}{}", self.prefix, local)
    }

    /// Address of a `<c>`; cells without `r` follow the previous cell
    fn cell_address(&self, e: &BytesStart<'_>) -> Option<CellAddress> {
        let reference = e
            .attributes()
            .flatten()
            .find(|attr| attr.key.as_ref() == b"r")
            .and_then(|attr| attr.unescape_value().ok().map(|s| s.to_string()));

        match reference {
            Some(r) => CellAddress::parse(&r).ok(),
            None => Some(CellAddress::new(
                self.current_row.unwrap_or(0),
                self.last_col.map_or(0, |c| c + 1),
            )),
        }
    }

    fn take_update(&mut self, addr: CellAddress) -> Option<&'a CellInput> {
        if self.current_row != Some(addr.row) {
            return None;
        }
        self.row_cells.as_mut()?.remove(&addr.col)
    }

    /// Write whole new rows for pending rows above `row` (all when `None`)
    fn flush_rows_before<W: Write>(&mut self, writer: &mut Writer<W>, row: Option<u32>) -> XlsxResult<()> {
        let keep = match row {
            Some(row) => self.pending.split_off(&row),
            None => BTreeMap::new(),
        };
        let flushed = std::mem::replace(&mut self.pending, keep);

        for (row, cells) in flushed {
            let mut start = BytesStart::new(self.name("row"));
            start.push_attribute(("r", (row as u64 + 1).to_string().as_str()));
            writer.write_event(Event::Start(start))?;
            self.write_cells(writer, row, &cells)?;
            writer.write_event(Event::End(BytesEnd::new(self.name("row"))))?;
        }
        Ok(())
    }

    /// Write new cells of the current row left of `col` (all when `None`)
    fn flush_row_cells_before<W: Write>(&mut self, writer: &mut Writer<W>, col: Option<u32>) -> XlsxResult<()> {
        let (Some(row), Some(cells)) = (self.current_row, self.row_cells.as_mut()) else {
            return Ok(());
        };
        let keep = match col {
            Some(col) => cells.split_off(&col),
            None => BTreeMap::new(),
        };
        let flushed = std::mem::replace(cells, keep);
        self.write_cells(writer, row, &flushed)
    }

    fn write_cells<W: Write>(
        &self,
        writer: &mut Writer<W>,
        row: u32,
        cells: &BTreeMap<u32, &CellInput>,
    ) -> XlsxResult<()> {
        for (&col, input) in cells {
            self.write_cell(writer, CellAddress::new(row, col), input, None)?;
        }
        Ok(())
    }

    fn write_cell<W: Write>(
        &self,
        writer: &mut Writer<W>,
        addr: CellAddress,
        input: &CellInput,
        style: Option<String>,
    ) -> XlsxResult<()> {
        let mut start = BytesStart::new(self.name("c"));
        start.push_attribute(("r", addr.to_a1_string().as_str()));
        if let Some(style) = style.as_deref() {
            start.push_attribute(("s", style));
        }

        match input {
            CellInput::Number(n) => {
                writer.write_event(Event::Start(start))?;
                self.write_value(writer, &n.to_string())?;
            }
            CellInput::Boolean(b) => {
                start.push_attribute(("t", "b"));
                writer.write_event(Event::Start(start))?;
                self.write_value(writer, if *b { "1" } else { "0" })?;
            }
            CellInput::Text(text) => {
                start.push_attribute(("t", "inlineStr"));
                writer.write_event(Event::Start(start))?;
                writer.write_event(Event::Start(BytesStart::new(self.name("is"))))?;
                let mut t = BytesStart::new(self.name("t"));
                t.push_attribute(("xml:space", "preserve"));
                writer.write_event(Event::Start(t))?;
                writer.write_event(Event::Text(BytesText::new(text)))?;
                writer.write_event(Event::End(BytesEnd::new(self.name("t"))))?;
                writer.write_event(Event::End(BytesEnd::new(self.name("is"))))?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new(self.name("c"))))?;
        Ok(())
    }

    fn write_value<W: Write>(&self, writer: &mut Writer<W>, value: &str) -> XlsxResult<()> {
        writer.write_event(Event::Start(BytesStart::new(self.name("v"))))?;
        writer.write_event(Event::Text(BytesText::new(value)))?;
        writer.write_event(Event::End(BytesEnd::new(self.name("v"))))?;
        Ok(())
    }
}

/// `x:` for `x:sheetData`, empty without a prefix
fn prefix_of(qname: &[u8]) -> String {
    match qname.iter().position(|&b| b == b':') {
        Some(colon) => format!("{}:", String::from_utf8_lossy(&qname[..colon])),
        None => String::new(),
    }
}

/// Copy of a `<row>` start tag without `spans`, which no longer holds once
/// cells are added
fn without_spans(e: &BytesStart<'_>) -> BytesStart<'static> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut row = BytesStart::new(name);
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() != b"spans" {
            row.push_attribute((attr.key.as_ref(), attr.value.as_ref()));
        }
    }
    row
}

fn style_attr(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"s")
        .and_then(|attr| attr.unescape_value().ok().map(|s| s.to_string()))
}
