//! Conversions between A1-style references and 0-based indexes.

/// A single cell addressed by sheet name and 1-based row and column numbers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellRef {
    pub sheet: String,
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(sheet: &str, row: usize, col: usize) -> Self {
        CellRef {
            sheet: sheet.to_owned(),
            row,
            col,
        }
    }
}

/// Converts a 0-based column index to letters: 0 → A, 25 → Z, 26 → AA.
pub(crate) fn col_to_letters(col: usize) -> String {
    let mut col = col + 1;
    let mut letters = Vec::new();
    while col > 0 {
        col -= 1;
        letters.push((b'A' + (col % 26) as u8) as char);
        col /= 26;
    }
    letters.iter().rev().collect()
}

/// Converts 0-based indexes to a reference such as `C5`.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", col_to_letters(col), row + 1)
}

pub(crate) fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    letters
        .to_ascii_uppercase()
        .bytes()
        .map(|byte| (byte - b'A') as usize + 1)
        .reduce(|index, digit| index * 26 + digit)
        .map(|col| col - 1)
}

pub(crate) fn row_to_index(number: &str) -> Option<usize> {
    number
        .parse::<usize>()
        .ok()
        .filter(|row| *row > 0)
        .map(|row| row - 1)
}

/// Parses `B3` or `$B$3` into 0-based `(row, col)`.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    Some((row_to_index(digits)?, col_to_index(letters)?))
}

/// Parses a single-cell address in the form `<sheet><separator><cell>`.
///
/// The sheet may be quoted (`'Base Config'!$C$5`) and may carry a leading `$`
/// as ODS writes it (`$'Base Config'.$C$5`). Ranges spanning several cells
/// yield `None`.
pub(crate) fn parse_cell_address(address: &str, separator: char) -> Option<CellRef> {
    let address = address.trim().trim_start_matches('=');
    let split = address.rfind(separator)?;
    let (sheet, cell) = (&address[..split], &address[split + 1..]);
    if cell.contains(':') {
        return None;
    }
    let sheet = sheet.trim_start_matches('$');
    let sheet = sheet
        .strip_prefix('\'')
        .and_then(|quoted| quoted.strip_suffix('\''))
        .map(|quoted| quoted.replace("''", "'"))
        .unwrap_or_else(|| sheet.to_owned());
    let (row, col) = reference_to_index(cell)?;
    Some(CellRef::new(&sheet, row + 1, col + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_round_trip_through_indexes() {
        assert_eq!(col_to_letters(0), "A");
        assert_eq!(col_to_letters(25), "Z");
        assert_eq!(col_to_letters(26), "AA");
        assert_eq!(col_to_letters(52), "BA");
        assert_eq!(col_to_index("A"), Some(0));
        assert_eq!(col_to_index("ba"), Some(52));
        assert_eq!(col_to_index(""), None);
    }

    #[test]
    fn references_convert_both_ways() {
        assert_eq!(index_to_reference(4, 2), "C5");
        assert_eq!(reference_to_index("C5"), Some((4, 2)));
        assert_eq!(reference_to_index("$C$5"), Some((4, 2)));
        assert_eq!(reference_to_index("C0"), None);
        assert_eq!(reference_to_index("5"), None);
    }

    #[test]
    fn cell_addresses_accept_quoted_sheet_names() {
        assert_eq!(
            parse_cell_address("'Base Config'!$C$5", '!'),
            Some(CellRef::new("Base Config", 5, 3))
        );
        assert_eq!(
            parse_cell_address("Status!B2", '!'),
            Some(CellRef::new("Status", 2, 2))
        );
        assert_eq!(
            parse_cell_address("$'Base Config'.$C$7", '.'),
            Some(CellRef::new("Base Config", 7, 3))
        );
        assert_eq!(parse_cell_address("'Base Config'!$C$5:$C$6", '!'), None);
    }
}
