use crate::grid::Position;

// No 'O' column.
const COLUMN_LETTERS: [char; 15] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'P',
];

/// Letter for a column, or the decimal index past the end of the table.
pub fn column_label(col: usize) -> String {
    COLUMN_LETTERS
        .get(col)
        .map(|c| c.to_string())
        .unwrap_or_else(|| col.to_string())
}

/// Human-readable spot name sent with history entries, e.g. `B3`.
pub fn position_label(pos: Position) -> String {
    format!("{}{}", column_label(pos.col), pos.row)
}
