//! Recalculation metadata
//!
//! After cells change, every cached formula result in the package may be
//! stale. The calculation chain is dropped and the workbook is flagged so
//! the next application to open it recalculates everything.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::XlsxResult;

pub(crate) const WORKBOOK_PART: &str = "xl/workbook.xml";
pub(crate) const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const CALC_CHAIN_PART: &str = "xl/calcChain.xml";
const CALC_CHAIN_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain";

/// Workbook children that must come after `calcPr`
const AFTER_CALC_PR: &[&[u8]] = &[
    b"oleSize",
    b"customWorkbookViews",
    b"pivotCaches",
    b"smartTagPr",
    b"smartTagTypes",
    b"webPublishing",
    b"fileRecoveryPr",
    b"webPublishObjects",
    b"extLst",
];

/// Flag the workbook for full recalculation and drop the calc chain
pub(crate) fn force_full_recalc(parts: &mut BTreeMap<String, Vec<u8>>) -> XlsxResult<()> {
    if let Some(workbook_xml) = parts.get(WORKBOOK_PART) {
        let updated = workbook_xml_force_full_calc(workbook_xml)?;
        parts.insert(WORKBOOK_PART.to_string(), updated);
    }

    parts.remove(CALC_CHAIN_PART);

    if let Some(rels_xml) = parts.get(WORKBOOK_RELS_PART) {
        let updated = workbook_rels_remove_calc_chain(rels_xml)?;
        parts.insert(WORKBOOK_RELS_PART.to_string(), updated);
    }

    if let Some(content_types_xml) = parts.get(CONTENT_TYPES_PART) {
        let updated = content_types_remove_calc_chain(content_types_xml)?;
        parts.insert(CONTENT_TYPES_PART.to_string(), updated);
    }

    Ok(())
}

/// Set `fullCalcOnLoad` and `forceFullCalc` on `calcPr`, inserting the
/// element at its schema position when the workbook has none
pub(crate) fn workbook_xml_force_full_calc(workbook_xml: &[u8]) -> XlsxResult<Vec<u8>> {
    let mut reader = Reader::from_reader(workbook_xml);
    reader.trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(workbook_xml.len() + 64));

    let mut buf = Vec::new();
    let mut saw_calc_pr = false;
    // 1 while directly inside <workbook>
    let mut depth = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Empty(ref e) if e.local_name().as_ref() == b"calcPr" => {
                saw_calc_pr = true;
                writer.write_event(Event::Empty(patched_calc_pr(e)))?;
            }
            Event::Start(ref e) if e.local_name().as_ref() == b"calcPr" => {
                saw_calc_pr = true;
                depth += 1;
                writer.write_event(Event::Start(patched_calc_pr(e)))?;
            }
            Event::Start(ref e) | Event::Empty(ref e)
                if depth == 1
                    && !saw_calc_pr
                    && AFTER_CALC_PR.contains(&e.local_name().as_ref()) =>
            {
                saw_calc_pr = true;
                writer.write_event(Event::Empty(new_calc_pr(e.name().as_ref())))?;
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
                writer.write_event(event.into_owned())?;
            }
            Event::Start(ref e) => {
                depth += 1;
                writer.write_event(Event::Start(e.to_owned()))?;
            }
            Event::End(ref e) => {
                if depth == 1 && !saw_calc_pr {
                    saw_calc_pr = true;
                    writer.write_event(Event::Empty(new_calc_pr(e.name().as_ref())))?;
                }
                depth = depth.saturating_sub(1);
                writer.write_event(Event::End(e.to_owned()))?;
            }
            Event::Eof => break,
            other => writer.write_event(other.into_owned())?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

/// `calcPr` carrying the namespace prefix of a sibling element
fn new_calc_pr(sibling: &[u8]) -> BytesStart<'static> {
    let name = match sibling.iter().position(|&b| b == b':') {
        Some(colon) => format!("{}:calcPr", String::from_utf8_lossy(&sibling[..colon])),
        None => "calcPr".to_string(),
    };
    let mut calc_pr = BytesStart::new(name);
    calc_pr.push_attribute(("fullCalcOnLoad", "1"));
    calc_pr.push_attribute(("forceFullCalc", "1"));
    calc_pr
}

fn patched_calc_pr(e: &BytesStart<'_>) -> BytesStart<'static> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut calc_pr = BytesStart::new(name);
    for attr in e.attributes().flatten() {
        if matches!(attr.key.as_ref(), b"fullCalcOnLoad" | b"forceFullCalc") {
            continue;
        }
        calc_pr.push_attribute((attr.key.as_ref(), attr.value.as_ref()));
    }
    calc_pr.push_attribute(("fullCalcOnLoad", "1"));
    calc_pr.push_attribute(("forceFullCalc", "1"));
    calc_pr
}

pub(crate) fn workbook_rels_remove_calc_chain(rels_xml: &[u8]) -> XlsxResult<Vec<u8>> {
    remove_elements(rels_xml, b"Relationship", |e| {
        let mut is_calc_chain = false;
        for attr in e.attributes().flatten() {
            let value = attr.unescape_value()?;
            match attr.key.as_ref() {
                b"Type" if value == CALC_CHAIN_REL_TYPE => is_calc_chain = true,
                b"Target" if value.ends_with("calcChain.xml") => is_calc_chain = true,
                _ => {}
            }
        }
        Ok(is_calc_chain)
    })
}

pub(crate) fn content_types_remove_calc_chain(ct_xml: &[u8]) -> XlsxResult<Vec<u8>> {
    remove_elements(ct_xml, b"Override", |e| {
        for attr in e.attributes().flatten() {
            if attr.key.as_ref() == b"PartName" {
                return Ok(attr.unescape_value()?.ends_with("calcChain.xml"));
            }
        }
        Ok(false)
    })
}

/// Copy XML, dropping every `name` element the predicate selects
fn remove_elements<F>(xml: &[u8], name: &[u8], mut remove: F) -> XlsxResult<Vec<u8>>
where
    F: FnMut(&BytesStart<'_>) -> XlsxResult<bool>,
{
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    let mut buf = Vec::new();
    let mut skipping = false;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) if e.local_name().as_ref() == name => {
                if remove(e)? {
                    skipping = true;
                } else {
                    writer.write_event(Event::Start(e.to_owned()))?;
                }
            }
            Event::Empty(ref e) if e.local_name().as_ref() == name => {
                if !remove(e)? {
                    writer.write_event(Event::Empty(e.to_owned()))?;
                }
            }
            Event::End(ref e) if skipping && e.local_name().as_ref() == name => {
                skipping = false;
            }
            _ if skipping => {}
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}
