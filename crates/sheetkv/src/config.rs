//! Extraction settings and update requests
//!
//! Settings use the layout of an application settings file:
//!
//! ```json
//! {
//!   "ExcelSections": {
//!     "Loan": { "KeyRange": "A2:A4", "ValueRange": "B2:B4" }
//!   },
//!   "Sheet": "Inputs",
//!   "CurrencySymbol": "$"
//! }
//! ```
//!
//! Only `ExcelSections` is required. Unknown keys are ignored so a whole
//! application settings file can be passed in.

use std::fs;
use std::path::Path;

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

use sheetkv_core::{
    CellFactSource, CellInput, Error, NumberFormatter, Result, SectionConfig, SectionExtractor,
    SectionMap, SheetRef,
};

/// Which sheet to read and which sections to pull from it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionConfig {
    /// Sheet to read; the first sheet when unset
    pub sheet: Option<SheetRef>,
    /// Symbol for currency formats; `$` when unset
    pub currency_symbol: Option<String>,
    /// Sections in output order
    pub sections: Vec<SectionConfig>,
}

#[derive(Deserialize)]
struct Settings {
    #[serde(rename = "ExcelSections")]
    sections: Option<Map<String, Value>>,
    #[serde(rename = "Sheet", default)]
    sheet: Option<Value>,
    #[serde(rename = "CurrencySymbol", default)]
    currency_symbol: Option<String>,
}

#[derive(Deserialize)]
struct RangePair {
    #[serde(rename = "KeyRange")]
    key_range: Option<String>,
    #[serde(rename = "ValueRange")]
    value_range: Option<String>,
}

impl ExtractionConfig {
    pub fn new(sections: Vec<SectionConfig>) -> Self {
        Self {
            sections,
            ..Default::default()
        }
    }

    pub fn with_sheet<S: Into<SheetRef>>(mut self, sheet: S) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    pub fn with_currency_symbol<S: Into<String>>(mut self, symbol: S) -> Self {
        self.currency_symbol = Some(symbol.into());
        self
    }

    /// Parse settings JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;

        let raw_sections = settings
            .sections
            .ok_or_else(|| Error::InvalidConfig("missing \"ExcelSections\"".into()))?;

        let mut sections = Vec::with_capacity(raw_sections.len());
        for (name, value) in raw_sections {
            let pair: RangePair = serde_json::from_value(value)
                .map_err(|e| Error::InvalidConfig(format!("section '{}': {}", name, e)))?;
            let key_range = pair
                .key_range
                .ok_or_else(|| Error::InvalidConfig(format!("section '{}' has no KeyRange", name)))?;
            let value_range = pair.value_range.ok_or_else(|| {
                Error::InvalidConfig(format!("section '{}' has no ValueRange", name))
            })?;
            sections.push(SectionConfig::new(name, key_range, value_range));
        }

        let sheet = match settings.sheet {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.parse()?),
            Some(Value::Number(n)) => match n.as_u64() {
                Some(i) => Some(SheetRef::Index(i as usize)),
                None => return Err(Error::InvalidConfig(format!("invalid sheet index {}", n))),
            },
            Some(other) => {
                return Err(Error::InvalidConfig(format!("invalid sheet {}", other)));
            }
        };

        Ok(Self {
            sheet,
            currency_symbol: settings.currency_symbol,
            sections,
        })
    }

    /// Read settings from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    pub fn formatter(&self) -> NumberFormatter {
        match &self.currency_symbol {
            Some(symbol) => NumberFormatter::new().with_currency_symbol(symbol.clone()),
            None => NumberFormatter::new(),
        }
    }

    /// Build the extractor for these sections
    pub fn extractor(&self) -> Result<SectionExtractor> {
        Ok(SectionExtractor::new(self.sections.clone())?.with_formatter(self.formatter()))
    }

    /// Run every section against the configured sheet of `source`
    pub fn extract<S: CellFactSource + ?Sized>(&self, source: &S) -> Result<SectionMap> {
        let sheet = source.resolve_sheet(&self.sheet.clone().unwrap_or_default())?;
        self.extractor()?.extract(source, sheet)
    }
}

/// One cell to overwrite
///
/// Deserialised from `{"sheet": "Inputs", "cell": "B2", "value": "300000"}`.
/// String values are inferred like typed input; JSON numbers and booleans
/// are taken as they are.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CellUpdate {
    /// Sheet name or 0-based index; the first sheet when absent
    #[serde(default)]
    pub sheet: Option<String>,
    pub cell: String,
    #[serde(deserialize_with = "cell_input")]
    pub value: CellInput,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UpdateList {
    Many(Vec<CellUpdate>),
    One(CellUpdate),
}

impl CellUpdate {
    pub fn new<S: Into<String>>(sheet: Option<&str>, cell: S, value: CellInput) -> Self {
        Self {
            sheet: sheet.map(str::to_string),
            cell: cell.into(),
            value,
        }
    }

    pub fn sheet_ref(&self) -> Result<SheetRef> {
        match &self.sheet {
            Some(sheet) => sheet.parse(),
            None => Ok(SheetRef::default()),
        }
    }

    /// Parse a JSON array of requests (a single object is also accepted)
    pub fn load_list(json: &str) -> Result<Vec<CellUpdate>> {
        let list: UpdateList =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Ok(match list {
            UpdateList::Many(updates) => updates,
            UpdateList::One(update) => vec![update],
        })
    }
}

fn cell_input<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<CellInput, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(CellInput::infer(&s)),
        Value::Bool(b) => Ok(CellInput::Boolean(b)),
        Value::Number(n) => n
            .as_f64()
            .map(CellInput::Number)
            .ok_or_else(|| de::Error::custom(format!("number {} out of range", n))),
        Value::Null => Ok(CellInput::Text(String::new())),
        other => Err(de::Error::custom(format!("unsupported cell value {}", other))),
    }
}
