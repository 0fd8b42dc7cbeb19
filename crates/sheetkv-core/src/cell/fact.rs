//! Cell facts as reported by a backing document

use std::fmt;

/// Storage type of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// No value stored
    Empty,
    /// Literal text
    Text,
    /// Numeric value (dates are numbers with a date format)
    Number,
    /// TRUE/FALSE
    Boolean,
    /// Formula; the cached result is typed by [`CellFact::result_kind`]
    Formula,
    /// Index into the document's shared string table
    SharedStringRef,
    /// Error value such as `#DIV/0!`
    Error,
}

/// Primitive facts about one cell, supplied by a [`CellFactSource`]
///
/// Facts are read-only snapshots; nothing in the core keeps them around
/// after a value has been resolved.
///
/// [`CellFactSource`]: crate::CellFactSource
#[derive(Debug, Clone, PartialEq)]
pub struct CellFact {
    /// Storage type
    pub kind: CellKind,
    /// Stored text; for formulas, the cached result
    pub raw_value: String,
    /// Formula text without the leading `=`
    pub formula_text: Option<String>,
    /// Type of the cached result of a formula; `None` when not evaluated
    pub result_kind: Option<CellKind>,
    /// Number format id from the cell's style
    pub number_format_id: Option<u32>,
    /// Whether the cell's number format renders dates
    pub is_date_formatted: bool,
}

impl CellFact {
    fn with_kind(kind: CellKind, raw_value: String) -> Self {
        Self {
            kind,
            raw_value,
            formula_text: None,
            result_kind: None,
            number_format_id: None,
            is_date_formatted: false,
        }
    }

    /// Fact of the given kind with the stored text as-is
    pub fn raw<S: Into<String>>(kind: CellKind, raw_value: S) -> Self {
        Self::with_kind(kind, raw_value.into())
    }

    /// Fact for a cell that does not exist or holds nothing
    pub fn empty() -> Self {
        Self::with_kind(CellKind::Empty, String::new())
    }

    /// Literal text
    pub fn text<S: Into<String>>(value: S) -> Self {
        Self::with_kind(CellKind::Text, value.into())
    }

    /// Number, stored in its textual form
    pub fn number(value: f64) -> Self {
        Self::with_kind(CellKind::Number, value.to_string())
    }

    /// Number stored exactly as given
    pub fn raw_number<S: Into<String>>(raw: S) -> Self {
        Self::with_kind(CellKind::Number, raw.into())
    }

    /// Boolean, stored as `1`/`0`
    pub fn boolean(value: bool) -> Self {
        Self::with_kind(CellKind::Boolean, if value { "1" } else { "0" }.to_string())
    }

    /// Error value, e.g. `#N/A`
    pub fn error<S: Into<String>>(code: S) -> Self {
        Self::with_kind(CellKind::Error, code.into())
    }

    /// Reference into the shared string table
    pub fn shared_string(index: usize) -> Self {
        Self::with_kind(CellKind::SharedStringRef, index.to_string())
    }

    /// Formula with an optional cached result
    pub fn formula<S: Into<String>>(text: S, cached: Option<CellFact>) -> Self {
        let text = text.into();
        let text = text.strip_prefix('=').map(str::to_string).unwrap_or(text);
        let (raw_value, result_kind) = match cached {
            Some(result) => (result.raw_value, Some(result.kind)),
            None => (String::new(), None),
        };
        Self {
            kind: CellKind::Formula,
            raw_value,
            formula_text: Some(text),
            result_kind,
            number_format_id: None,
            is_date_formatted: false,
        }
    }

    /// Set the number format id
    pub fn with_format(mut self, number_format_id: u32) -> Self {
        self.number_format_id = Some(number_format_id);
        self
    }

    /// Mark the cell as date formatted
    pub fn with_date_format(mut self, number_format_id: u32) -> Self {
        self.number_format_id = Some(number_format_id);
        self.is_date_formatted = true;
        self
    }

    /// The fact describing a formula's cached result, if there is one
    pub fn cached_result(&self) -> Option<CellFact> {
        let kind = self.result_kind?;
        Some(Self {
            kind,
            raw_value: self.raw_value.clone(),
            formula_text: None,
            result_kind: None,
            number_format_id: self.number_format_id,
            is_date_formatted: self.is_date_formatted,
        })
    }

    /// Whether the fact holds nothing
    pub fn is_empty(&self) -> bool {
        self.kind == CellKind::Empty
    }
}

impl Default for CellFact {
    fn default() -> Self {
        Self::empty()
    }
}

/// A value written by the update path
#[derive(Debug, Clone, PartialEq)]
pub enum CellInput {
    Number(f64),
    Boolean(bool),
    Text(String),
}

impl CellInput {
    /// Interpret request text: numbers stay numbers, TRUE/FALSE become
    /// booleans, everything else is literal text
    pub fn infer(text: &str) -> Self {
        let trimmed = text.trim();
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return CellInput::Number(n);
            }
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return CellInput::Boolean(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CellInput::Boolean(false);
        }
        CellInput::Text(text.to_string())
    }

    /// The fact a cell holds after this input is written
    pub fn to_fact(&self) -> CellFact {
        match self {
            CellInput::Number(n) => CellFact::number(*n),
            CellInput::Boolean(b) => CellFact::boolean(*b),
            CellInput::Text(s) => CellFact::text(s.clone()),
        }
    }
}

impl fmt::Display for CellInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellInput::Number(n) => write!(f, "{}", n),
            CellInput::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellInput::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for CellInput {
    fn from(n: f64) -> Self {
        CellInput::Number(n)
    }
}

impl From<bool> for CellInput {
    fn from(b: bool) -> Self {
        CellInput::Boolean(b)
    }
}

impl From<&str> for CellInput {
    fn from(s: &str) -> Self {
        CellInput::Text(s.to_string())
    }
}

impl From<String> for CellInput {
    fn from(s: String) -> Self {
        CellInput::Text(s)
    }
}
