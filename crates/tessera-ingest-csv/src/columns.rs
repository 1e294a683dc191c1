//! Spreadsheet-style column labels.
//!
//! Mapper definitions reference columns the way an operator sees them in a
//! spreadsheet (`A`, `Z`, `AD`, `IQ`, ...), not by numeric index. Labels are
//! a base-26 numeral system with digits 1–26: there is no zero digit, which
//! is why `Z` (25) is followed by `AA` (26) rather than `BA`.

use crate::error::IngestError;

/// Convert a column label into a zero-based column index.
///
/// Case-insensitive. Empty or non-alphabetic input is rejected.
pub fn column_index(label: &str) -> Result<usize, IngestError> {
    if label.is_empty() {
        return Err(IngestError::InvalidColumnLabel(label.to_string()));
    }
    let mut index: usize = 0;
    for c in label.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(IngestError::InvalidColumnLabel(label.to_string()));
        }
        let digit = (c.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
        index = index
            .checked_mul(26)
            .and_then(|i| i.checked_add(digit))
            .ok_or_else(|| IngestError::InvalidColumnLabel(label.to_string()))?;
    }
    Ok(index - 1)
}
