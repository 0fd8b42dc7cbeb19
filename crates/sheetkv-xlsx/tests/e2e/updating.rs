//! Writing values back and saving

use std::io::Cursor;

use pretty_assertions::assert_eq;
use sheetkv_core::{
    CellAddress, CellFactSink, CellFactSource, CellInput, CellKind, Error, SheetId, ValueResolver,
};
use sheetkv_xlsx::{XlsxDocument, XlsxError};

use crate::common::{loan_fixture, part_names, read_part, temp_dir};

fn addr(s: &str) -> CellAddress {
    CellAddress::parse(s).unwrap()
}

#[test]
fn test_update_and_reopen() {
    let dir = temp_dir();
    let input = loan_fixture().calc_chain().write_to(dir.path(), "loan.xlsx");
    let output = dir.path().join("updated.xlsx");

    let mut doc = XlsxDocument::open_write(&input).unwrap();
    doc.set_value(SheetId(0), addr("B2"), CellInput::Number(300000.0)).unwrap();
    doc.set_value(SheetId(0), addr("C7"), CellInput::Text("note".into())).unwrap();
    assert!(doc.has_pending_updates());

    // Facts reflect the update before saving, keeping the cell's format
    let resolver = ValueResolver::default();
    assert_eq!(
        resolver.resolve_display(&doc, SheetId(0), addr("B2")).unwrap(),
        "$300,000.00"
    );

    doc.save_as(&output).unwrap();
    assert!(!doc.has_pending_updates());

    let reopened = XlsxDocument::open_read(&output).unwrap();
    assert_eq!(
        resolver.resolve_display(&reopened, SheetId(0), addr("B2")).unwrap(),
        "$300,000.00"
    );
    assert_eq!(
        resolver.resolve_display(&reopened, SheetId(0), addr("C7")).unwrap(),
        "note"
    );
    // Untouched cells survive
    assert_eq!(
        resolver.resolve_display(&reopened, SheetId(0), addr("A5")).unwrap(),
        "Monthly Payment"
    );

    // The input is untouched
    let original = XlsxDocument::open_read(&input).unwrap();
    assert_eq!(original.cell_fact(SheetId(0), addr("B2")).unwrap().raw_value, "250000");
}

#[test]
fn test_saved_package_forces_recalculation() {
    let mut doc = XlsxDocument::from_reader(Cursor::new(loan_fixture().calc_chain().build())).unwrap();
    doc.set_value(SheetId(0), addr("B4"), CellInput::Number(15.0)).unwrap();

    let mut out = Cursor::new(Vec::new());
    doc.write_to(&mut out).unwrap();
    let bytes = out.into_inner();

    let workbook = read_part(&bytes, "xl/workbook.xml").unwrap();
    assert!(workbook.contains(r#"<calcPr calcId="191029" fullCalcOnLoad="1" forceFullCalc="1"/>"#));

    assert!(!part_names(&bytes).iter().any(|n| n == "xl/calcChain.xml"));
    assert!(!read_part(&bytes, "xl/_rels/workbook.xml.rels").unwrap().contains("calcChain"));
    assert!(!read_part(&bytes, "[Content_Types].xml").unwrap().contains("calcChain"));
    assert_eq!(part_names(&bytes)[0], "[Content_Types].xml");

    // The stale payment is gone; the formula remains
    let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml").unwrap();
    assert!(sheet.contains("<f>ROUND(B2*(B3/12)/(1-(1+B3/12)^(-B4*12)),2)</f>"));
    assert!(!sheet.contains("1266.71"));
    assert!(sheet.contains(r#"<c r="B4"><v>15</v></c>"#));

    let payment = doc.cell_fact(SheetId(0), addr("B5")).unwrap();
    assert_eq!(payment.kind, CellKind::Formula);
    assert_eq!(payment.raw_value, "");
    assert_eq!(
        ValueResolver::default()
            .resolve_display(&doc, SheetId(0), addr("B5"))
            .unwrap(),
        ""
    );
}

#[test]
fn test_unrelated_parts_copied() {
    let fixture = loan_fixture().part("docProps/app.xml", b"<Properties>kept</Properties>");
    let mut doc = XlsxDocument::from_reader(Cursor::new(fixture.build())).unwrap();
    doc.set_value(SheetId(0), addr("A1"), CellInput::Boolean(false)).unwrap();

    let mut out = Cursor::new(Vec::new());
    doc.write_to(&mut out).unwrap();
    let bytes = out.into_inner();

    assert_eq!(
        read_part(&bytes, "docProps/app.xml").unwrap(),
        "<Properties>kept</Properties>"
    );
    assert_eq!(
        read_part(&bytes, "xl/sharedStrings.xml"),
        read_part(&fixture.build(), "xl/sharedStrings.xml")
    );
}

#[test]
fn test_save_in_place_through_sink() {
    let dir = temp_dir();
    let path = loan_fixture().write_to(dir.path(), "loan.xlsx");

    let mut doc = XlsxDocument::open_write(&path).unwrap();
    let sink: &mut dyn CellFactSink = &mut doc;
    sink.set_cell_value(SheetId(0), addr("B3"), CellInput::Number(0.05)).unwrap();
    sink.save().unwrap();

    let reopened = XlsxDocument::open_read(&path).unwrap();
    assert_eq!(
        ValueResolver::default()
            .resolve_display(&reopened, SheetId(0), addr("B3"))
            .unwrap(),
        "5.00%"
    );
}

#[test]
fn test_read_only_document() {
    let dir = temp_dir();
    let path = loan_fixture().write_to(dir.path(), "loan.xlsx");
    let mut doc = XlsxDocument::open_read(&path).unwrap();

    assert!(matches!(
        doc.set_value(SheetId(0), addr("B2"), CellInput::Number(1.0)),
        Err(XlsxError::ReadOnly)
    ));
    assert!(matches!(doc.save(), Err(XlsxError::ReadOnly)));

    let copy = dir.path().join("copy.xlsx");
    assert!(matches!(doc.save_as(&copy), Err(XlsxError::ReadOnly)));
    assert!(!copy.exists());

    let sink: &mut dyn CellFactSink = &mut doc;
    assert!(matches!(
        sink.set_cell_value(SheetId(0), addr("B2"), CellInput::Number(1.0)),
        Err(Error::ReadOnly)
    ));
}

#[test]
fn test_failed_save_keeps_existing_file() {
    let dir = temp_dir();
    // Unbalanced content types only fail once the package is rewritten
    let path = loan_fixture()
        .content_types_xml(r#"<Types><Default Extension="xml" ContentType="application/xml"></Types>"#)
        .write_to(dir.path(), "loan.xlsx");
    let before = std::fs::read(&path).unwrap();

    let mut doc = XlsxDocument::open_write(&path).unwrap();
    doc.set_value(SheetId(0), addr("B2"), CellInput::Number(1.0)).unwrap();

    assert!(doc.save().is_err());
    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert!(doc.has_pending_updates());

    let copy = dir.path().join("copy.xlsx");
    assert!(doc.save_as(&copy).is_err());
    assert!(!copy.exists());

    // No temporary files left behind
    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("loan.xlsx")]);
}

#[test]
fn test_in_memory_document_has_no_path() {
    let mut doc = XlsxDocument::from_reader(Cursor::new(loan_fixture().build())).unwrap();
    doc.set_value(SheetId(0), addr("B2"), CellInput::Number(1.0)).unwrap();
    assert!(matches!(doc.save(), Err(XlsxError::ReadOnly)));
}

#[test]
fn test_unknown_sheet() {
    let mut doc = XlsxDocument::from_reader(Cursor::new(loan_fixture().build())).unwrap();
    let err = doc
        .set_value(SheetId(3), addr("A1"), CellInput::Number(1.0))
        .unwrap_err();
    assert!(matches!(err, XlsxError::Core(Error::SheetNotFound(_))));
}
