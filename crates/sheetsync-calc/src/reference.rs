//! A1-style cell and range references
//!
//! Provides [`CellRef`], [`RangeRef`] and [`Reference`], the strongly-typed
//! addresses used by edits, reads and the simulation request validator.
//!
//! Accepted syntax is deliberately strict: upper-case column letters followed
//! by a 1-based row number (`A1`, `XFD1048576`). A range is two cell
//! references joined by `:`, naming opposite corners in either order.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Number of rows in a worksheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Number of columns in a worksheet
pub const MAX_COLUMNS: u32 = 16_384;

/// Reference parsing error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    /// Text is not a valid cell or range reference
    #[error("\"{0}\" reference cannot be parsed")]
    Malformed(String),
}

impl ReferenceError {
    /// The text that failed to parse
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Malformed(text) => text,
        }
    }
}

/// Single cell address (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    /// Row number, `1..=MAX_ROWS`
    pub row: u32,
    /// Column number, `1..=MAX_COLUMNS`
    pub column: u32,
}

impl CellRef {
    /// Create a cell reference, checking worksheet bounds
    #[inline]
    #[must_use]
    pub fn new(row: u32, column: u32) -> Option<Self> {
        if (1..=MAX_ROWS).contains(&row) && (1..=MAX_COLUMNS).contains(&column) {
            Some(Self { row, column })
        } else {
            None
        }
    }

    /// Parse an `A1` reference
    ///
    /// # Errors
    /// Returns [`ReferenceError::Malformed`] for anything other than
    /// upper-case column letters followed by an in-bounds row number.
    pub fn parse(text: &str) -> Result<Self, ReferenceError> {
        let malformed = || ReferenceError::Malformed(text.to_string());

        let split = text
            .find(|c: char| !c.is_ascii_uppercase())
            .ok_or_else(malformed)?;
        let (letters, digits) = text.split_at(split);

        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let column = name_to_column(letters).ok_or_else(malformed)?;
        let row = digits.parse::<u32>().map_err(|_| malformed())?;

        Self::new(row, column).ok_or_else(malformed)
    }
}

impl Display for CellRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_to_name(self.column), self.row)
    }
}

impl FromStr for CellRef {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Rectangular range of cells, inclusive on both corners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeRef {
    /// Top-left corner
    pub start: CellRef,
    /// Bottom-right corner
    pub end: CellRef,
}

impl RangeRef {
    /// Create the range spanned by two opposite corners, in any order
    #[inline]
    #[must_use]
    pub fn new(a: CellRef, b: CellRef) -> Self {
        Self {
            start: CellRef {
                row: a.row.min(b.row),
                column: a.column.min(b.column),
            },
            end: CellRef {
                row: a.row.max(b.row),
                column: a.column.max(b.column),
            },
        }
    }

    /// Parse an `A1:B2` reference
    ///
    /// Corners may come in any order: `B2:A1` and `A2:B1` both cover `A1:B2`.
    ///
    /// # Errors
    /// Returns [`ReferenceError::Malformed`] if either corner fails to parse
    /// or there is not exactly one `:`.
    pub fn parse(text: &str) -> Result<Self, ReferenceError> {
        let malformed = || ReferenceError::Malformed(text.to_string());

        let (start, end) = text.split_once(':').ok_or_else(malformed)?;
        let start = CellRef::parse(start).map_err(|_| malformed())?;
        let end = CellRef::parse(end).map_err(|_| malformed())?;

        Ok(Self::new(start, end))
    }

    /// Number of rows covered
    #[inline]
    #[must_use]
    pub fn rows(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Number of columns covered
    #[inline]
    #[must_use]
    pub fn columns(&self) -> u32 {
        self.end.column - self.start.column + 1
    }

    /// Total number of cells covered
    #[inline]
    #[must_use]
    pub fn cell_count(&self) -> u64 {
        u64::from(self.rows()) * u64::from(self.columns())
    }

    /// Iterate rows of cells, top to bottom, each row left to right
    pub fn row_major(&self) -> impl Iterator<Item = Vec<CellRef>> + '_ {
        (self.start.row..=self.end.row).map(move |row| {
            (self.start.column..=self.end.column)
                .map(|column| CellRef { row, column })
                .collect()
        })
    }

    /// Check whether a cell lies inside the range
    #[inline]
    #[must_use]
    pub fn contains(&self, cell: CellRef) -> bool {
        (self.start.row..=self.end.row).contains(&cell.row)
            && (self.start.column..=self.end.column).contains(&cell.column)
    }
}

impl Display for RangeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Either a single cell or a range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    /// Single cell (`A1`)
    Cell(CellRef),
    /// Range (`A1:B2`)
    Range(RangeRef),
}

impl Reference {
    /// Parse a reference; text containing `:` is treated as a range
    ///
    /// # Errors
    /// Returns [`ReferenceError::Malformed`] if the text is not a valid
    /// cell or range reference.
    pub fn parse(text: &str) -> Result<Self, ReferenceError> {
        if text.contains(':') {
            RangeRef::parse(text).map(Self::Range)
        } else {
            CellRef::parse(text).map(Self::Cell)
        }
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell(cell) => cell.fmt(f),
            Self::Range(range) => range.fmt(f),
        }
    }
}

/// Convert a 1-based column number to its letters (`1` → `A`, `28` → `AB`)
#[must_use]
pub fn column_to_name(mut column: u32) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(b'A' + rem as u8);
        column = (column - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Convert column letters to a 1-based number (`A` → `1`, `AB` → `28`)
///
/// Returns `None` for empty input, non upper-case letters, or columns past
/// [`MAX_COLUMNS`].
#[must_use]
pub fn name_to_column(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut column: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_uppercase() {
            return None;
        }
        column = column * 26 + u32::from(b - b'A' + 1);
    }
    (column <= MAX_COLUMNS).then_some(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_cell() {
        assert_eq!(CellRef::parse("A1").unwrap(), CellRef { row: 1, column: 1 });
        assert_eq!(CellRef::parse("AB12").unwrap(), CellRef { row: 12, column: 28 });
        assert_eq!(
            CellRef::parse("XFD1048576").unwrap(),
            CellRef { row: MAX_ROWS, column: MAX_COLUMNS }
        );
    }

    #[test]
    fn parse_cell_rejects_garbage() {
        for text in ["", "A", "1", "A0", "a1", "A1B", "A-1", "XFE1", "A1048577", "Sheet1!A1", " A1"] {
            let err = CellRef::parse(text).unwrap_err();
            assert_eq!(err.to_string(), format!("\"{text}\" reference cannot be parsed"));
        }
    }

    #[test]
    fn parse_range() {
        let range = RangeRef::parse("A1:B3").unwrap();
        assert_eq!(range.rows(), 3);
        assert_eq!(range.columns(), 2);
        assert_eq!(range.cell_count(), 6);
        assert_eq!(range.to_string(), "A1:B3");
    }

    #[test]
    fn parse_range_normalizes_reversed_corners() {
        let range = RangeRef::parse("G20:B20").unwrap();
        assert_eq!(range.start, CellRef { row: 20, column: 2 });
        assert_eq!(range.end, CellRef { row: 20, column: 7 });

        let range = RangeRef::parse("ZZ2:ZZ1").unwrap();
        assert_eq!(range.start, CellRef { row: 1, column: 702 });
        assert_eq!(range.end, CellRef { row: 2, column: 702 });

        let range = RangeRef::parse("A2:B1").unwrap();
        assert_eq!(range, RangeRef::parse("A1:B2").unwrap());
        assert_eq!(range.to_string(), "A1:B2");
    }

    #[test]
    fn parse_range_rejects_partial() {
        for text in ["A1:", ":B2", "A1:B", "A:B1", "1:2", "A1:B2:C3", "Sheet1!A1:B2"] {
            assert!(RangeRef::parse(text).is_err(), "{text}");
        }
    }

    #[test]
    fn reference_picks_range_on_colon() {
        assert!(matches!(Reference::parse("C3").unwrap(), Reference::Cell(_)));
        assert!(matches!(Reference::parse("A1:C3").unwrap(), Reference::Range(_)));
        assert_eq!(
            Reference::parse("A1:").unwrap_err().text(),
            "A1:"
        );
    }

    #[test]
    fn row_major_order() {
        let range = RangeRef::parse("A1:B2").unwrap();
        let cells: Vec<String> = range
            .row_major()
            .flatten()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(cells, vec!["A1", "B1", "A2", "B2"]);
    }

    #[test]
    fn column_names() {
        assert_eq!(column_to_name(1), "A");
        assert_eq!(column_to_name(26), "Z");
        assert_eq!(column_to_name(27), "AA");
        assert_eq!(column_to_name(MAX_COLUMNS), "XFD");
        assert_eq!(name_to_column("XFD"), Some(MAX_COLUMNS));
        assert_eq!(name_to_column("XFE"), None);
    }

    proptest! {
        #[test]
        fn prop_cell_display_parses_back(row in 1u32..=MAX_ROWS, column in 1u32..=MAX_COLUMNS) {
            let cell = CellRef::new(row, column).unwrap();
            prop_assert_eq!(CellRef::parse(&cell.to_string()).unwrap(), cell);
        }
    }
}
