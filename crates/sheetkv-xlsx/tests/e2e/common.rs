//! Common utilities for E2E tests.

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Builder for a minimal but complete XLSX package.
///
/// Worksheets take the inner XML of `<sheetData>` so each test spells out
/// exactly the cells it cares about.
#[derive(Debug, Default, Clone)]
pub struct Fixture {
    sheets: Vec<(String, String)>,
    shared_strings: Vec<String>,
    num_fmts: Vec<(u32, String)>,
    cell_xfs: Vec<u32>,
    date1904: bool,
    calc_chain: bool,
    content_types_override: Option<String>,
    extra_parts: Vec<(String, Vec<u8>)>,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a worksheet with the given `<sheetData>` contents
    pub fn sheet(mut self, name: &str, sheet_data: &str) -> Self {
        self.sheets.push((name.to_string(), sheet_data.to_string()));
        self
    }

    /// Set the shared string table
    pub fn shared_strings(mut self, strings: &[&str]) -> Self {
        self.shared_strings = strings.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add a custom number format
    pub fn num_fmt(mut self, id: u32, code: &str) -> Self {
        self.num_fmts.push((id, code.to_string()));
        self
    }

    /// Set the `numFmtId` of each cellXfs entry; index 0 is the default style
    pub fn cell_xfs(mut self, num_fmt_ids: &[u32]) -> Self {
        self.cell_xfs = num_fmt_ids.to_vec();
        self
    }

    pub fn date1904(mut self) -> Self {
        self.date1904 = true;
        self
    }

    /// Include xl/calcChain.xml with its relationship and content type
    pub fn calc_chain(mut self) -> Self {
        self.calc_chain = true;
        self
    }

    /// Replace the generated [Content_Types].xml
    pub fn content_types_xml(mut self, xml: &str) -> Self {
        self.content_types_override = Some(xml.to_string());
        self
    }

    /// Add an arbitrary part copied verbatim
    pub fn part(mut self, name: &str, data: &[u8]) -> Self {
        self.extra_parts.push((name.to_string(), data.to_vec()));
        self
    }

    /// Build the package bytes
    pub fn build(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();

            let mut add = |name: &str, data: &[u8]| {
                zip.start_file(name, options).unwrap();
                zip.write_all(data).unwrap();
            };

            let content_types = self
                .content_types_override
                .clone()
                .unwrap_or_else(|| self.content_types());
            add("[Content_Types].xml", content_types.as_bytes());
            add("_rels/.rels", ROOT_RELS.as_bytes());
            add("xl/workbook.xml", self.workbook_xml().as_bytes());
            add("xl/_rels/workbook.xml.rels", self.workbook_rels().as_bytes());
            add("xl/styles.xml", self.styles_xml().as_bytes());
            if !self.shared_strings.is_empty() {
                add("xl/sharedStrings.xml", self.shared_strings_xml().as_bytes());
            }
            for (i, (_, data)) in self.sheets.iter().enumerate() {
                let xml = format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheetData>{data}</sheetData></worksheet>"#
                );
                add(&format!("xl/worksheets/sheet{}.xml", i + 1), xml.as_bytes());
            }
            if self.calc_chain {
                add(
                    "xl/calcChain.xml",
                    format!(r#"<calcChain xmlns="{MAIN_NS}"><c r="B3" i="1"/></calcChain>"#).as_bytes(),
                );
            }
            for (name, data) in &self.extra_parts {
                add(name, data);
            }

            zip.finish().unwrap();
        }
        buf
    }

    /// Write the package into `dir` and return its path
    pub fn write_to(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }

    fn content_types(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
        );
        for i in 1..=self.sheets.len() {
            xml.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            ));
        }
        if !self.shared_strings.is_empty() {
            xml.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
        }
        if self.calc_chain {
            xml.push_str(r#"<Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/>"#);
        }
        xml.push_str("</Types>");
        xml
    }

    fn workbook_xml(&self) -> String {
        let pr = if self.date1904 {
            r#"<workbookPr date1904="1"/>"#
        } else {
            "<workbookPr/>"
        };
        let sheets: String = self
            .sheets
            .iter()
            .enumerate()
            .map(|(i, (name, _))| {
                format!(
                    r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                    escape(name),
                    i + 1,
                    i + 1
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}">{pr}<sheets>{sheets}</sheets><calcPr calcId="191029"/></workbook>"#
        )
    }

    fn workbook_rels(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for i in 1..=self.sheets.len() {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{i}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{i}.xml"/>"#
            ));
        }
        xml.push_str(&format!(
            r#"<Relationship Id="rIdStyles" Type="{REL_NS}/styles" Target="styles.xml"/>"#
        ));
        if !self.shared_strings.is_empty() {
            xml.push_str(&format!(
                r#"<Relationship Id="rIdStrings" Type="{REL_NS}/sharedStrings" Target="sharedStrings.xml"/>"#
            ));
        }
        if self.calc_chain {
            xml.push_str(&format!(
                r#"<Relationship Id="rIdCalc" Type="{REL_NS}/calcChain" Target="calcChain.xml"/>"#
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }

    fn styles_xml(&self) -> String {
        let num_fmts: String = self
            .num_fmts
            .iter()
            .map(|(id, code)| format!(r#"<numFmt numFmtId="{}" formatCode="{}"/>"#, id, escape(code)))
            .collect();
        let xfs = if self.cell_xfs.is_empty() {
            vec![0]
        } else {
            self.cell_xfs.clone()
        };
        let cell_xfs: String = xfs
            .iter()
            .map(|id| format!(r#"<xf numFmtId="{id}" fontId="0" fillId="0" borderId="0" xfId="0"/>"#))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="{MAIN_NS}"><numFmts count="{}">{num_fmts}</numFmts><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="1"><fill><patternFill patternType="none"/></fill></fills><borders count="1"><border/></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="{}">{cell_xfs}</cellXfs></styleSheet>"#,
            self.num_fmts.len(),
            xfs.len()
        )
    }

    fn shared_strings_xml(&self) -> String {
        let items: String = self
            .shared_strings
            .iter()
            .map(|s| format!(r#"<si><t xml:space="preserve">{}</t></si>"#, escape(s)))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="{MAIN_NS}" count="{n}" uniqueCount="{n}">{items}</sst>"#,
            n = self.shared_strings.len()
        )
    }
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Temporary directory for files written by a test
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Read one part of a package as text
#[allow(dead_code)]
pub fn read_part(package: &[u8], name: &str) -> Option<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(package)).unwrap();
    let mut file = archive.by_name(name).ok()?;
    let mut text = String::new();
    file.read_to_string(&mut text).unwrap();
    Some(text)
}

/// Names of all parts in a package
#[allow(dead_code)]
pub fn part_names(package: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(package)).unwrap();
    archive.file_names().map(str::to_string).collect()
}

/// The loan calculator used across tests: inputs in A2:B4, a derived
/// payment in A5:B5 and a label-only row in A6.
pub fn loan_fixture() -> Fixture {
    Fixture::new()
        .shared_strings(&["Principal", "Interest Rate", "Term (years)", "Monthly Payment"])
        .num_fmt(164, r#"0.00" %""#)
        .cell_xfs(&[0, 42, 10, 164, 4])
        .sheet(
            "Inputs",
            concat!(
                r#"<row r="1"><c r="A1" t="inlineStr"><is><t>Loan</t></is></c></row>"#,
                r#"<row r="2"><c r="A2" t="s"><v>0</v></c><c r="B2" s="1"><v>250000</v></c></row>"#,
                r#"<row r="3"><c r="A3" t="s"><v>1</v></c><c r="B3" s="2"><v>0.045</v></c></row>"#,
                r#"<row r="4"><c r="A4" t="s"><v>2</v></c><c r="B4"><v>30</v></c></row>"#,
                r#"<row r="5"><c r="A5" t="s"><v>3</v></c><c r="B5" s="4"><f>ROUND(B2*(B3/12)/(1-(1+B3/12)^(-B4*12)),2)</f><v>1266.71</v></c></row>"#,
                r#"<row r="6"><c r="B6"><v>99</v></c></row>"#,
            ),
        )
}
