//! XLSX part readers
//!
//! Each function parses one package part that has already been loaded into
//! memory.

use std::collections::HashMap;

use log::warn;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::StyleTable;
use sheetkv_core::{CellAddress, CellFact, CellKind};

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// Excel uses this format to encode special characters in XML:
/// - `_x000d_` = CR (carriage return)
/// - `_x000a_` = LF (line feed)
/// - `_x0009_` = Tab
/// - `_x005f_` = Underscore (escaped underscore)
pub(crate) fn decode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '_' {
            result.push(c);
            continue;
        }

        // Check if this looks like _xHHHH_
        if chars.peek() != Some(&'x') {
            result.push('_');
            continue;
        }
        chars.next(); // consume 'x'

        let mut hex_chars = String::new();
        while hex_chars.len() < 4 {
            match chars.peek() {
                Some(&ch) if ch.is_ascii_hexdigit() => {
                    hex_chars.push(ch);
                    chars.next();
                }
                _ => break,
            }
        }

        let decoded = if hex_chars.len() == 4 && chars.peek() == Some(&'_') {
            u32::from_str_radix(&hex_chars, 16)
                .ok()
                .and_then(char::from_u32)
        } else {
            None
        };

        match decoded {
            Some(ch) => {
                chars.next(); // consume closing '_'
                result.push(ch);
            }
            None => {
                // Not a valid escape sequence, output what we consumed
                result.push_str("_x");
                result.push_str(&hex_chars);
            }
        }
    }

    result
}

/// Sheet entries and settings from xl/workbook.xml
#[derive(Debug, Default)]
pub(crate) struct WorkbookInfo {
    /// (name, relationship id) in workbook order
    pub sheets: Vec<(String, String)>,
    pub date1904: bool,
}

pub(crate) fn read_workbook_xml(xml: &[u8]) -> XlsxResult<WorkbookInfo> {
    let mut xml_reader = Reader::from_reader(xml);
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut info = WorkbookInfo::default();

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sheet" => {
                    let mut name = None;
                    let mut r_id = None;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"name" => name = attr.unescape_value().ok().map(|s| s.to_string()),
                            b"r:id" => r_id = attr.unescape_value().ok().map(|s| s.to_string()),
                            _ => {}
                        }
                    }

                    if let (Some(name), Some(r_id)) = (name, r_id) {
                        info.sheets.push((name, r_id));
                    }
                }
                b"workbookPr" => {
                    info.date1904 = bool_attr(&e, b"date1904").unwrap_or(false);
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(info)
}

/// Worksheet relationships of xl/_rels/workbook.xml.rels, id to part name
pub(crate) fn read_workbook_rels(xml: &[u8]) -> XlsxResult<HashMap<String, String>> {
    let mut xml_reader = Reader::from_reader(xml);
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut rels = HashMap::new();

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                let mut rel_type = None;

                for attr in e.attributes().flatten() {
                    let value = attr.unescape_value().ok().map(|s| s.to_string());
                    match attr.key.as_ref() {
                        b"Id" => id = value,
                        b"Target" => target = value,
                        b"Type" => rel_type = value,
                        _ => {}
                    }
                }

                if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                    if rel_type.ends_with("/worksheet") {
                        rels.insert(id, resolve_target(&target));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// Part name of a relationship target relative to the xl/ folder
fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else if let Some(parent) = target.strip_prefix("../") {
        parent.to_string()
    } else {
        format!("xl/{}", target.trim_start_matches("./"))
    }
}

/// Read the shared strings table; rich text runs are concatenated
pub(crate) fn read_shared_strings(xml: &[u8]) -> XlsxResult<Vec<String>> {
    let mut xml_reader = Reader::from_reader(xml);
    xml_reader.trim_text(false);

    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current_string = String::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut in_phonetic = false;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current_string.clear();
                }
                b"rPh" => in_phonetic = true,
                b"t" if in_si && !in_phonetic => in_t = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(decode_excel_escapes(&current_string));
                    current_string.clear();
                    in_si = false;
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_t => {
                current_string.push_str(&e.unescape()?);
            }
            Ok(Event::CData(e)) if in_t => {
                current_string.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Raw contents of one `<c>` element
#[derive(Debug, Default)]
struct RawCell {
    address: Option<CellAddress>,
    cell_type: Option<String>,
    style: Option<u32>,
    value: Option<String>,
    formula: Option<String>,
    inline: Option<String>,
}

impl RawCell {
    fn into_fact(self, styles: &StyleTable) -> CellFact {
        let cell_type = self.cell_type.as_deref();

        let mut fact = match (self.formula, self.value, self.inline) {
            (Some(formula), value, _) => {
                CellFact::formula(formula, value.map(|v| literal_fact(cell_type, &v)))
            }
            (None, _, Some(text)) if cell_type == Some("inlineStr") => {
                CellFact::text(decode_excel_escapes(&text))
            }
            (None, Some(value), _) => literal_fact(cell_type, &value),
            _ => CellFact::empty(),
        };

        match styles.format(self.style) {
            Some(format) => {
                fact.number_format_id = Some(format.num_fmt_id);
                fact.is_date_formatted = format.is_date;
            }
            None if self.style.is_some() => {
                warn!(
                    "cell {:?} references style {:?} but styles.xml has {} cell formats",
                    self.address.map(|a| a.to_a1_string()),
                    self.style,
                    styles.len()
                );
            }
            None => {}
        }

        fact
    }
}

/// Fact for a stored value, typed by the cell's `t` attribute
fn literal_fact(cell_type: Option<&str>, value: &str) -> CellFact {
    match cell_type {
        Some("s") => CellFact::raw(CellKind::SharedStringRef, value.trim()),
        Some("b") => CellFact::raw(CellKind::Boolean, value.trim()),
        Some("e") => CellFact::error(value),
        Some("str") | Some("inlineStr") => CellFact::text(decode_excel_escapes(value)),
        None | Some("n") => CellFact::raw_number(value.trim()),
        // ISO 8601 dates ("d") and anything unknown stay text
        Some(_) => CellFact::text(value),
    }
}

/// Read every cell of a worksheet's sheetData
pub(crate) fn read_worksheet(
    xml: &[u8],
    styles: &StyleTable,
) -> XlsxResult<HashMap<CellAddress, CellFact>> {
    let mut xml_reader = Reader::from_reader(xml);
    xml_reader.trim_text(false);

    let mut buf = Vec::new();
    let mut cells = HashMap::new();

    // Position of the last row/cell, for elements without an `r` attribute
    let mut current_row: Option<u32> = None;
    let mut last_col: Option<u32> = None;

    let mut current: Option<RawCell> = None;
    let mut in_value = false;
    let mut in_formula = false;
    let mut in_inline_str = false;
    let mut in_inline_text = false;
    let mut in_phonetic = false;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = Some(row_index(&e, current_row));
                    last_col = None;
                }
                b"c" => {
                    let cell = start_cell(&e, current_row, last_col);
                    if let Some(addr) = cell.address {
                        last_col = Some(addr.col);
                    }
                    current = Some(cell);
                }
                b"v" if current.is_some() => in_value = true,
                b"f" => {
                    if let Some(cell) = current.as_mut() {
                        cell.formula = Some(String::new());
                        in_formula = true;
                    }
                }
                b"is" if current.is_some() => {
                    in_inline_str = true;
                    if let Some(cell) = current.as_mut() {
                        cell.inline = Some(String::new());
                    }
                }
                b"rPh" => in_phonetic = true,
                b"t" if in_inline_str && !in_phonetic => in_inline_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = Some(row_index(&e, current_row));
                    last_col = None;
                }
                b"c" => {
                    let cell = start_cell(&e, current_row, last_col);
                    if let Some(addr) = cell.address {
                        last_col = Some(addr.col);
                        cells.insert(addr, cell.into_fact(styles));
                    }
                }
                // Dependent cell of a shared formula
                b"f" => {
                    if let Some(cell) = current.as_mut() {
                        cell.formula = Some(String::new());
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let Some(target) = text_target(&mut current, in_value, in_formula, in_inline_text) {
                    target.get_or_insert_with(String::new).push_str(&e.unescape()?);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(target) = text_target(&mut current, in_value, in_formula, in_inline_text) {
                    target
                        .get_or_insert_with(String::new)
                        .push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"c" => {
                    if let Some(cell) = current.take() {
                        if let Some(addr) = cell.address {
                            cells.insert(addr, cell.into_fact(styles));
                        }
                    }
                    in_value = false;
                    in_formula = false;
                    in_inline_str = false;
                    in_inline_text = false;
                }
                b"v" => in_value = false,
                b"f" => in_formula = false,
                b"is" => in_inline_str = false,
                b"rPh" => in_phonetic = false,
                b"t" => in_inline_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(cells)
}

/// Field of the open cell that character data belongs to
fn text_target(
    current: &mut Option<RawCell>,
    in_value: bool,
    in_formula: bool,
    in_inline_text: bool,
) -> Option<&mut Option<String>> {
    let cell = current.as_mut()?;
    if in_value {
        Some(&mut cell.value)
    } else if in_formula {
        Some(&mut cell.formula)
    } else if in_inline_text {
        Some(&mut cell.inline)
    } else {
        None
    }
}

/// 0-based index of a `<row>`, following the previous row when `r` is absent
pub(crate) fn row_index(e: &BytesStart<'_>, previous: Option<u32>) -> u32 {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"r")
        .and_then(|attr| attr.unescape_value().ok().and_then(|s| s.parse::<u32>().ok()))
        .map(|r| r.saturating_sub(1))
        .unwrap_or_else(|| previous.map_or(0, |r| r + 1))
}

fn start_cell(e: &BytesStart<'_>, current_row: Option<u32>, last_col: Option<u32>) -> RawCell {
    let mut cell = RawCell::default();
    let mut reference = None;

    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"r" => reference = attr.unescape_value().ok().map(|s| s.to_string()),
            b"t" => cell.cell_type = attr.unescape_value().ok().map(|s| s.to_string()),
            b"s" => cell.style = attr.unescape_value().ok().and_then(|s| s.parse().ok()),
            _ => {}
        }
    }

    cell.address = match reference {
        Some(r) => match CellAddress::parse(&r) {
            Ok(addr) => Some(addr),
            Err(err) => {
                warn!("skipping cell with invalid reference '{}': {}", r, err);
                None
            }
        },
        None => Some(CellAddress::new(
            current_row.unwrap_or(0),
            last_col.map_or(0, |c| c + 1),
        )),
    };

    cell
}

/// Read a boolean attribute (`1`/`true`/`0`/`false`)
pub(crate) fn bool_attr(e: &BytesStart<'_>, key: &[u8]) -> Option<bool> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| {
            attr.unescape_value()
                .ok()
                .map(|v| v.as_ref() == "1" || v.eq_ignore_ascii_case("true"))
        })
}
