use std::collections::BTreeMap;

use super::SeatId;

/// Rows are lettered `A..=Z`; anything past `Z` is not addressable.
pub const MAX_ROWS: u8 = 26;

/// Letter for a zero-based row index (`0 -> 'A'`).
pub fn row_letter(index: u8) -> char {
    char::from(b'A' + index.min(MAX_ROWS - 1))
}

/// Enumerates the seats of one section, row by row.
///
/// Columns run `start_column .. start_column + cols`. With `reversed` the
/// numbering inside a row is mirrored, so the rightmost position carries
/// `start_column`. A row listed in `sparse_rows` only emits the listed
/// columns, in the row's natural order. Columns that would not fit in a
/// `u16` are skipped.
pub fn generate_seats(
    rows: u8,
    cols: u16,
    start_column: u16,
    sparse_rows: &BTreeMap<String, Vec<u16>>,
    reversed: bool,
) -> Vec<SeatId> {
    let rows = rows.min(MAX_ROWS);
    let mut seats = Vec::with_capacity(usize::from(rows) * usize::from(cols));

    for r in 0..rows {
        let letter = row_letter(r);
        let allowed = sparse_rows.get(&letter.to_string());

        for c in 0..cols {
            let offset = if reversed { cols - 1 - c } else { c };
            let Some(column) = start_column.checked_add(offset) else {
                continue;
            };

            if let Some(allowed) = allowed {
                if !allowed.contains(&column) {
                    continue;
                }
            }

            seats.push(SeatId::new(letter, column));
        }
    }

    seats
}
