//! Opening packages and reading cell facts

use std::io::Cursor;

use pretty_assertions::assert_eq;
use sheetkv_core::{
    CellAddress, CellFactSource, CellKind, Error, SheetId, SheetRef, ValueResolver,
};
use sheetkv_xlsx::{OpenMode, XlsxDocument, XlsxError};

use crate::common::{loan_fixture, temp_dir, Fixture};

fn addr(s: &str) -> CellAddress {
    CellAddress::parse(s).unwrap()
}

fn open(fixture: &Fixture) -> XlsxDocument {
    XlsxDocument::from_reader(Cursor::new(fixture.build())).unwrap()
}

#[test]
fn test_open_from_path() {
    let dir = temp_dir();
    let path = loan_fixture().write_to(dir.path(), "loan.xlsx");

    let doc = XlsxDocument::open_read(&path).unwrap();
    assert_eq!(doc.mode(), OpenMode::Read);
    assert_eq!(doc.path(), Some(path.as_path()));
    assert_eq!(doc.sheet_names(), vec!["Inputs".to_string()]);
    assert!(!doc.has_pending_updates());
}

#[test]
fn test_sheet_lookup() {
    let doc = open(
        &Fixture::new()
            .sheet("Summary", "")
            .sheet("Inputs", r#"<row r="1"><c r="A1"><v>1</v></c></row>"#),
    );
    assert_eq!(doc.sheet_count(), 2);
    assert_eq!(doc.resolve_sheet(&SheetRef::Index(1)).unwrap(), SheetId(1));
    assert_eq!(
        doc.resolve_sheet(&SheetRef::Name("inputs".into())).unwrap(),
        SheetId(1)
    );
    assert!(matches!(
        doc.resolve_sheet(&SheetRef::Name("Missing".into())),
        Err(Error::SheetNotFound(_))
    ));
}

#[test]
fn test_cell_facts() {
    let doc = open(&loan_fixture());
    let sheet = SheetId(0);

    let label = doc.cell_fact(sheet, addr("A2")).unwrap();
    assert_eq!(label.kind, CellKind::SharedStringRef);
    assert_eq!(label.raw_value, "0");

    let principal = doc.cell_fact(sheet, addr("B2")).unwrap();
    assert_eq!(principal.kind, CellKind::Number);
    assert_eq!(principal.raw_value, "250000");
    assert_eq!(principal.number_format_id, Some(42));
    assert!(!principal.is_date_formatted);

    let payment = doc.cell_fact(sheet, addr("B5")).unwrap();
    assert_eq!(payment.kind, CellKind::Formula);
    assert_eq!(
        payment.formula_text.as_deref(),
        Some("ROUND(B2*(B3/12)/(1-(1+B3/12)^(-B4*12)),2)")
    );
    assert_eq!(payment.raw_value, "1266.71");
    assert_eq!(payment.result_kind, Some(CellKind::Number));

    let title = doc.cell_fact(sheet, addr("A1")).unwrap();
    assert_eq!(title.kind, CellKind::Text);
    assert_eq!(title.raw_value, "Loan");

    assert!(doc.cell_fact(sheet, addr("Z100")).unwrap().is_empty());
    assert_eq!(doc.shared_string(3).unwrap(), "Monthly Payment");
    assert!(matches!(
        doc.shared_string(4),
        Err(Error::IndexOutOfRange { index: 4, len: 4 })
    ));
}

#[test]
fn test_display_values() {
    let doc = open(&loan_fixture());
    let resolver = ValueResolver::default();
    let display = |cell: &str| resolver.resolve_display(&doc, SheetId(0), addr(cell)).unwrap();

    assert_eq!(display("A2"), "Principal");
    assert_eq!(display("B2"), "$250,000.00");
    assert_eq!(display("B3"), "4.50%");
    assert_eq!(display("B4"), "30");
    assert_eq!(display("B5"), "$1,266.71");

    let payment = resolver.resolve(&doc, SheetId(0), addr("B5")).unwrap();
    assert_eq!(payment.formula, "ROUND(B2*(B3/12)/(1-(1+B3/12)^(-B4*12)),2)");
}

#[test]
fn test_booleans_errors_and_escapes() {
    let doc = open(&Fixture::new().sheet(
        "S",
        concat!(
            r#"<row r="1">"#,
            r#"<c r="A1" t="b"><v>1</v></c>"#,
            r#"<c r="B1" t="e"><v>#N/A</v></c>"#,
            r#"<c r="C1" t="str"><f>"a"&amp;"b"</f><v>ab</v></c>"#,
            r#"<c r="D1" t="inlineStr"><is><t>line_x000A_break</t></is></c>"#,
            r#"</row>"#,
        ),
    ));
    let resolver = ValueResolver::default();
    let display = |cell: &str| resolver.resolve_display(&doc, SheetId(0), addr(cell)).unwrap();

    assert_eq!(display("A1"), "True");
    assert_eq!(display("B1"), "#ERROR:#N/A");
    assert_eq!(display("C1"), "ab");
    assert_eq!(display("D1"), "line\nbreak");
}

#[test]
fn test_date_formats() {
    let fixture = Fixture::new()
        .num_fmt(165, "dd/mm/yyyy")
        .cell_xfs(&[0, 14, 165])
        .sheet(
            "Dates",
            r#"<row r="1"><c r="A1" s="1"><v>45292</v></c><c r="B1" s="2"><v>45292</v></c><c r="C1"><v>45292</v></c></row>"#,
        );
    let doc = open(&fixture);
    let resolver = ValueResolver::default();
    let display = |cell: &str| resolver.resolve_display(&doc, SheetId(0), addr(cell)).unwrap();

    assert!(doc.cell_fact(SheetId(0), addr("B1")).unwrap().is_date_formatted);
    assert_eq!(display("A1"), "2024-01-01");
    assert_eq!(display("B1"), "2024-01-01");
    assert_eq!(display("C1"), "45292");
}

#[test]
fn test_1904_date_system() {
    let fixture = Fixture::new()
        .date1904()
        .cell_xfs(&[0, 14])
        .sheet("Dates", r#"<row r="1"><c r="A1" s="1"><v>45292</v></c></row>"#);
    let doc = open(&fixture);
    assert!(doc.uses_1904_dates());
    assert_eq!(
        ValueResolver::default()
            .resolve_display(&doc, SheetId(0), addr("A1"))
            .unwrap(),
        "2028-01-02"
    );
}

#[test]
fn test_missing_file() {
    let dir = temp_dir();
    let path = dir.path().join("nope.xlsx");
    let err = XlsxDocument::open_read(&path).unwrap_err();
    assert!(matches!(err, XlsxError::NotFound(ref p) if *p == path));
    assert!(matches!(Error::from(err), Error::DocumentNotFound(_)));
}

#[test]
fn test_not_a_package() {
    let dir = temp_dir();
    let path = dir.path().join("plain.xlsx");
    std::fs::write(&path, b"Principal,250000\n").unwrap();

    let err = XlsxDocument::open_read(&path).unwrap_err();
    assert!(matches!(err, XlsxError::InvalidFormat(_)));
    assert!(matches!(Error::from(err), Error::DocumentFormat(_)));
}

#[test]
fn test_missing_worksheet_part() {
    // Relationship points at a part that is not in the archive
    let mut bytes = Vec::new();
    {
        use std::io::Write;
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut bytes));
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(b"<Types/>").unwrap();
        zip.start_file("xl/workbook.xml", options).unwrap();
        zip.write_all(br#"<workbook xmlns:r="r"><sheets><sheet name="A" sheetId="1" r:id="rId1"/></sheets></workbook>"#).unwrap();
        zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
        zip.write_all(br#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#).unwrap();
        zip.finish().unwrap();
    }

    let err = XlsxDocument::from_reader(Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, XlsxError::MissingPart(ref part) if part == "xl/worksheets/sheet1.xml"));
}
