//! Number format table from styles.xml
//!
//! Only what display formatting needs is read: the custom `numFmts` codes
//! and the `numFmtId` of every `cellXfs` entry. Cell `s` attributes index
//! into the latter.

use std::collections::HashMap;
use std::io::{BufReader, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use sheetkv_core::number_format::{is_builtin_date_format, is_date_format_code};

/// Number format of one `cellXfs` entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct CellFormat {
    pub num_fmt_id: u32,
    pub is_date: bool,
}

/// Resolve formats of the cell style table
#[derive(Debug, Clone, Default)]
pub(crate) struct StyleTable {
    formats: Vec<CellFormat>,
}

impl StyleTable {
    /// Format for a cell's `s` attribute; a missing attribute means xf 0
    pub(crate) fn format(&self, style_idx: Option<u32>) -> Option<CellFormat> {
        self.formats.get(style_idx.unwrap_or(0) as usize).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.formats.len()
    }
}

pub(crate) fn read_styles_xml<R: Read>(reader: R) -> XlsxResult<StyleTable> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();

    let mut numfmts: HashMap<u32, String> = HashMap::new();
    let mut xf_ids: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"cellXfs" => in_cell_xfs = true,
                // xf with alignment/protection children
                b"xf" if in_cell_xfs => xf_ids.push(num_fmt_id(&e)),
                b"numFmt" => read_num_fmt(&e, &mut numfmts),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"numFmt" => read_num_fmt(&e, &mut numfmts),
                b"xf" if in_cell_xfs => xf_ids.push(num_fmt_id(&e)),
                _ => {}
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    let formats = xf_ids
        .into_iter()
        .map(|id| CellFormat {
            num_fmt_id: id,
            is_date: match numfmts.get(&id) {
                Some(code) => is_date_format_code(code),
                None => is_builtin_date_format(id),
            },
        })
        .collect();

    Ok(StyleTable { formats })
}

fn num_fmt_id(e: &BytesStart<'_>) -> u32 {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"numFmtId")
        .and_then(|attr| attr.unescape_value().ok().and_then(|s| s.parse().ok()))
        .unwrap_or(0)
}

fn read_num_fmt(e: &BytesStart<'_>, numfmts: &mut HashMap<u32, String>) {
    let mut id = None;
    let mut code = None;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"numFmtId" => id = attr.unescape_value().ok().and_then(|s| s.parse().ok()),
            b"formatCode" => code = attr.unescape_value().ok().map(|s| s.to_string()),
            _ => {}
        }
    }
    if let (Some(id), Some(code)) = (id, code) {
        numfmts.insert(id, code);
    }
}
