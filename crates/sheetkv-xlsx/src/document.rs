//! XLSX documents as cell fact sources

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::error::{XlsxError, XlsxResult};
use crate::reader::{read_shared_strings, read_workbook_rels, read_workbook_xml, read_worksheet};
use crate::styles::{read_styles_xml, StyleTable};
use crate::writer::{
    force_full_recalc, patch_worksheet, write_package, SheetUpdates, CONTENT_TYPES_PART,
    WORKBOOK_PART, WORKBOOK_RELS_PART,
};
use sheetkv_core::{CellAddress, CellFact, CellFactSink, CellFactSource, CellInput, SheetId};

const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const STYLES_PART: &str = "xl/styles.xml";

/// How a document was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Reads only; updates and saving fail with `ReadOnly`
    Read,
    /// Updates are allowed and can be saved
    Write,
}

#[derive(Debug)]
struct Sheet {
    name: String,
    part: String,
    cells: HashMap<CellAddress, CellFact>,
}

/// An XLSX package loaded into memory
///
/// ```no_run
/// use sheetkv_core::{CellFactSource, SheetRef};
/// use sheetkv_xlsx::XlsxDocument;
///
/// let doc = XlsxDocument::open_read("loan.xlsx")?;
/// let sheet = doc.resolve_sheet(&SheetRef::Name("Inputs".into()))?;
/// let fact = doc.cell_fact(sheet, "B2".parse()?)?;
/// println!("{:?}", fact);
/// # Ok::<(), sheetkv_core::Error>(())
/// ```
#[derive(Debug)]
pub struct XlsxDocument {
    path: Option<PathBuf>,
    mode: OpenMode,
    parts: BTreeMap<String, Vec<u8>>,
    sheets: Vec<Sheet>,
    shared_strings: Vec<String>,
    date1904: bool,
    updates: Vec<SheetUpdates>,
}

impl XlsxDocument {
    /// Open a file for reading
    pub fn open_read<P: AsRef<Path>>(path: P) -> XlsxResult<Self> {
        Self::open(path.as_ref(), OpenMode::Read)
    }

    /// Open a file for updating; `save` writes back to the same path
    pub fn open_write<P: AsRef<Path>>(path: P) -> XlsxResult<Self> {
        Self::open(path.as_ref(), OpenMode::Write)
    }

    fn open(path: &Path, mode: OpenMode) -> XlsxResult<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => XlsxError::NotFound(path.to_path_buf()),
            _ => XlsxError::Io(e),
        })?;
        debug!("opening {} ({:?})", path.display(), mode);

        let mut doc = Self::load(file, mode)?;
        doc.path = Some(path.to_path_buf());
        Ok(doc)
    }

    /// Read a package from any seekable reader
    ///
    /// The document can be updated and written with [`save_as`] or
    /// [`write_to`]; it has no path for [`save`].
    ///
    /// [`save_as`]: XlsxDocument::save_as
    /// [`write_to`]: XlsxDocument::write_to
    /// [`save`]: XlsxDocument::save
    pub fn from_reader<R: Read + Seek>(reader: R) -> XlsxResult<Self> {
        Self::load(reader, OpenMode::Write)
    }

    fn load<R: Read + Seek>(reader: R, mode: OpenMode) -> XlsxResult<Self> {
        let parts = read_parts(reader)?;

        if !parts.contains_key(CONTENT_TYPES_PART) {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let workbook_xml = parts
            .get(WORKBOOK_PART)
            .ok_or_else(|| XlsxError::MissingPart(WORKBOOK_PART.into()))?;
        let info = read_workbook_xml(workbook_xml)?;

        let rels = match parts.get(WORKBOOK_RELS_PART) {
            Some(xml) => read_workbook_rels(xml)?,
            None => return Err(XlsxError::MissingPart(WORKBOOK_RELS_PART.into())),
        };

        let shared_strings = match parts.get(SHARED_STRINGS_PART) {
            Some(xml) => read_shared_strings(xml)?,
            None => Vec::new(),
        };

        let styles = match parts.get(STYLES_PART) {
            Some(xml) => read_styles_xml(xml.as_slice())?,
            None => StyleTable::default(),
        };

        let mut sheets = Vec::with_capacity(info.sheets.len());
        for (name, r_id) in info.sheets {
            let Some(part) = rels.get(&r_id) else {
                warn!("sheet '{}' has no worksheet relationship {}; skipped", name, r_id);
                continue;
            };
            let xml = parts
                .get(part)
                .ok_or_else(|| XlsxError::MissingPart(part.clone()))?;
            let cells = read_worksheet(xml, &styles)?;
            debug!("sheet '{}' ({}): {} cells", name, part, cells.len());
            sheets.push(Sheet {
                name,
                part: part.clone(),
                cells,
            });
        }

        let updates = vec![SheetUpdates::new(); sheets.len()];
        Ok(Self {
            path: None,
            mode,
            parts,
            sheets,
            shared_strings,
            date1904: info.date1904,
            updates,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Whether there are updates not yet written
    pub fn has_pending_updates(&self) -> bool {
        self.updates.iter().any(|u| !u.is_empty())
    }

    /// Record a new value for one cell
    ///
    /// The in-memory facts reflect the update immediately; the package
    /// changes on the next save.
    pub fn set_value(&mut self, sheet: SheetId, address: CellAddress, value: CellInput) -> XlsxResult<()> {
        if self.mode == OpenMode::Read {
            return Err(XlsxError::ReadOnly);
        }
        let target = self
            .sheets
            .get_mut(sheet.0)
            .ok_or_else(|| sheetkv_core::Error::SheetNotFound(format!("#{}", sheet.0)))?;

        let mut fact = value.to_fact();
        if let Some(previous) = target.cells.get(&address) {
            fact.number_format_id = previous.number_format_id;
            fact.is_date_formatted = previous.is_date_formatted;
        }
        target.cells.insert(address, fact);

        debug!("set {}!{} = {}", target.name, address, value);
        self.updates[sheet.0].insert(address, value);
        Ok(())
    }

    /// Write the package back to the path it was opened from
    pub fn save(&mut self) -> XlsxResult<()> {
        if self.mode == OpenMode::Read {
            return Err(XlsxError::ReadOnly);
        }
        let path = self.path.clone().ok_or(XlsxError::ReadOnly)?;
        self.save_as(path)
    }

    /// Write the package to a new path
    ///
    /// The package is written to a temporary file next to `path` and moved
    /// into place, so a failed save leaves any existing file untouched.
    pub fn save_as<P: AsRef<Path>>(&mut self, path: P) -> XlsxResult<()> {
        if self.mode == OpenMode::Read {
            return Err(XlsxError::ReadOnly);
        }
        let path = path.as_ref();
        let parts = self.patched_parts()?;

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)?;
        if let Ok(existing) = std::fs::metadata(path) {
            temp.as_file().set_permissions(existing.permissions())?;
        }
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            write_package(&parts, &mut writer)?;
            writer.flush()?;
        }
        temp.persist(path).map_err(|e| XlsxError::Io(e.error))?;

        self.commit(parts);
        debug!("saved {}", path.display());
        Ok(())
    }

    /// Write the package with pending updates applied
    ///
    /// Cached formula results are dropped and the workbook is flagged for
    /// full recalculation on load.
    pub fn write_to<W: Write + Seek>(&mut self, writer: W) -> XlsxResult<()> {
        if self.mode == OpenMode::Read {
            return Err(XlsxError::ReadOnly);
        }
        let parts = self.patched_parts()?;
        write_package(&parts, writer)?;
        self.commit(parts);
        Ok(())
    }

    /// All parts as they will be saved; the document itself is unchanged
    fn patched_parts(&self) -> XlsxResult<BTreeMap<String, Vec<u8>>> {
        let mut parts = self.parts.clone();
        for (sheet, updates) in self.sheets.iter().zip(&self.updates) {
            if let Some(xml) = parts.get(&sheet.part) {
                let patched = patch_worksheet(xml, updates)?;
                parts.insert(sheet.part.clone(), patched);
            }
        }
        force_full_recalc(&mut parts)?;
        Ok(parts)
    }

    /// Adopt a written package as the current state
    fn commit(&mut self, parts: BTreeMap<String, Vec<u8>>) {
        self.parts = parts;
        for updates in &mut self.updates {
            updates.clear();
        }
        for sheet in &mut self.sheets {
            for fact in sheet.cells.values_mut() {
                if fact.formula_text.is_some() {
                    fact.raw_value.clear();
                    fact.result_kind = None;
                }
            }
        }
    }

    fn sheet(&self, sheet: SheetId) -> sheetkv_core::Result<&Sheet> {
        self.sheets
            .get(sheet.0)
            .ok_or_else(|| sheetkv_core::Error::SheetNotFound(format!("#{}", sheet.0)))
    }
}

/// Load every file of the archive into memory
fn read_parts<R: Read + Seek>(reader: R) -> XlsxResult<BTreeMap<String, Vec<u8>>> {
    let mut archive = zip::ZipArchive::new(reader)
        .map_err(|e| XlsxError::InvalidFormat(format!("not a zip archive: {}", e)))?;

    let mut parts = BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        parts.insert(file.name().to_string(), data);
    }
    Ok(parts)
}

impl CellFactSource for XlsxDocument {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn cell_fact(&self, sheet: SheetId, address: CellAddress) -> sheetkv_core::Result<CellFact> {
        Ok(self
            .sheet(sheet)?
            .cells
            .get(&address)
            .cloned()
            .unwrap_or_else(CellFact::empty))
    }

    fn shared_string(&self, index: usize) -> sheetkv_core::Result<String> {
        self.shared_strings
            .get(index)
            .cloned()
            .ok_or(sheetkv_core::Error::IndexOutOfRange {
                index,
                len: self.shared_strings.len(),
            })
    }

    fn uses_1904_dates(&self) -> bool {
        self.date1904
    }
}

impl CellFactSink for XlsxDocument {
    fn set_cell_value(
        &mut self,
        sheet: SheetId,
        address: CellAddress,
        value: CellInput,
    ) -> sheetkv_core::Result<()> {
        Ok(self.set_value(sheet, address, value)?)
    }

    fn save(&mut self) -> sheetkv_core::Result<()> {
        Ok(XlsxDocument::save(self)?)
    }
}
