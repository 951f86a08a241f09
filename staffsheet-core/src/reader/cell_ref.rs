//! A1-style cell reference helpers shared by templates and diagnostics

/// Parse a cell reference like "A1" into (row, col) as 1-based indices
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let cell_ref = cell_ref.trim().trim_start_matches('$');
    let letters: String = cell_ref
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let digits = cell_ref[letters.len()..].trim_start_matches('$');

    let col = parse_column(&letters)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let row = digits.parse::<u32>().ok()?;
    if row == 0 {
        return None;
    }

    Some((row, col))
}

/// Parse a column reference like "A" or "AB" into a 1-based column number
pub fn parse_column(letters: &str) -> Option<u32> {
    let letters = letters.trim().trim_start_matches('$');
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut col = 0u32;
    for ch in letters.chars() {
        col = col
            .checked_mul(26)?
            .checked_add(ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }
    Some(col)
}

/// Convert a 1-based column number to letters (1 -> A, 27 -> AA)
pub fn column_letters(mut col: u32) -> String {
    let mut result = String::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        result.insert(0, (b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    result
}
