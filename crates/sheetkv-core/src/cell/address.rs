//! Cell address and range types

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A cell address (e.g., "A1", "B12")
///
/// Column letters form a bijective base-26 numeral (A=1 .. Z=26, AA=27, ...),
/// so there is no zero digit. Both coordinates are stored 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ...)
    pub col: u32,
}

impl CellAddress {
    /// Create a new cell address from 0-based indices
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse a cell address from A1-style notation
    ///
    /// # Examples
    /// ```
    /// use sheetkv_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("B12").unwrap();
    /// assert_eq!(addr.row, 11);
    /// assert_eq!(addr.col, 1);
    ///
    /// assert!(CellAddress::parse("B0").is_err());
    /// assert!(CellAddress::parse("12B").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::MalformedAddress("empty address".into()));
        }

        let split = s
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(s.len());
        let (letters, digits) = s.split_at(split);

        if letters.is_empty() {
            return Err(Error::MalformedAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }
        if digits.is_empty() {
            return Err(Error::MalformedAddress(format!("no row number in '{}'", s)));
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::MalformedAddress(format!(
                "expected letters followed by digits in '{}'",
                s
            )));
        }

        let col = Self::letters_to_column(letters)?;

        let row: u32 = digits
            .parse()
            .map_err(|_| Error::MalformedAddress(format!("invalid row number in '{}'", s)))?;

        // Rows are 1-based in text, 0-based internally
        if row == 0 {
            return Err(Error::MalformedAddress(format!(
                "row number must be >= 1 in '{}'",
                s
            )));
        }

        Ok(Self { row: row - 1, col })
    }

    /// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
    pub fn column_to_letters(col: u32) -> String {
        let mut result = String::new();
        let mut n = col as u64 + 1; // 1-based for calculation

        while n > 0 {
            n -= 1;
            let c = ((n % 26) as u8 + b'A') as char;
            result.insert(0, c);
            n /= 26;
        }

        result
    }

    /// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
    pub fn letters_to_column(letters: &str) -> Result<u32> {
        if letters.is_empty() {
            return Err(Error::MalformedAddress("empty column letters".into()));
        }

        let mut col: u64 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::MalformedAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u64 - 'A' as u64 + 1);
            if col > u32::MAX as u64 + 1 {
                return Err(Error::MalformedAddress(format!(
                    "column '{}' is too large",
                    letters
                )));
            }
        }

        Ok((col - 1) as u32)
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        format!("{}{}", Self::column_to_letters(self.col), self.row as u64 + 1)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A single-column range of cells (e.g., "A2:A10")
///
/// The range is kept exactly as written: a start row below the end row is
/// not swapped, it simply covers no cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    /// First address as written
    pub start: CellAddress,
    /// Last address as written
    pub end: CellAddress,
}

impl CellRange {
    /// Create a vertical range; both ends must share a column
    pub fn new(start: CellAddress, end: CellAddress) -> Result<Self> {
        if start.col != end.col {
            return Err(Error::UnsupportedRange(format!("{}:{}", start, end)));
        }
        Ok(Self { start, end })
    }

    /// Parse a range from A2:A10 notation
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        let [start, end] = parts.as_slice() else {
            return Err(Error::MalformedRange(format!(
                "expected exactly two addresses separated by ':' in '{}'",
                s
            )));
        };

        let start = CellAddress::parse(start)?;
        let end = CellAddress::parse(end)?;

        if start.col != end.col {
            return Err(Error::UnsupportedRange(s.trim().to_string()));
        }

        Ok(Self { start, end })
    }

    /// Number of cells covered (0 when the range runs upwards)
    pub fn len(&self) -> usize {
        if self.start.row > self.end.row {
            0
        } else {
            (self.end.row - self.start.row) as usize + 1
        }
    }

    /// Whether the range covers no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the covered addresses, top to bottom
    pub fn cells(&self) -> CellRangeIterator {
        CellRangeIterator {
            col: self.start.col,
            next_row: self.start.row as u64,
            end_row: self.end.row as u64,
        }
    }

    /// Format as A2:A10 string
    pub fn to_a1_string(&self) -> String {
        format!("{}:{}", self.start, self.end)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Iterator over cells in a vertical range
pub struct CellRangeIterator {
    col: u32,
    next_row: u64,
    end_row: u64,
}

impl Iterator for CellRangeIterator {
    type Item = CellAddress;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_row > self.end_row {
            return None;
        }
        let addr = CellAddress::new(self.next_row as u32, self.col);
        self.next_row += 1;
        Some(addr)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end_row + 1).saturating_sub(self.next_row) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CellRangeIterator {}

/// Expand range text into the ordered list of addresses it covers
pub fn expand(range: &str) -> Result<Vec<CellAddress>> {
    Ok(CellRange::parse(range)?.cells().collect())
}
