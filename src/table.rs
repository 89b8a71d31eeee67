//! Line handling shared by the `#Day,...` data files.

/// Numbered, trimmed, non-empty lines. A leading byte-order mark is dropped so
/// the header still starts with `#`.
pub(crate) fn lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.strip_prefix('\u{feff}')
        .unwrap_or(text)
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

/// Location or camp names from a `#Day,<name>...` header.
pub(crate) fn header(line: &str) -> Option<Vec<String>> {
    if !line.starts_with('#') {
        return None;
    }
    Some(
        line.split(',')
            .skip(1)
            .map(|name| name.trim().to_string())
            .collect(),
    )
}

/// Splits a data row into trimmed cells. Blank cells past `width` are dropped;
/// a non-blank one is an error carrying the number of cells found.
pub(crate) fn cells(line: &str, width: usize) -> Result<Vec<&str>, usize> {
    let mut cells: Vec<&str> = line.split(',').map(str::trim).collect();
    if cells.len() > width {
        if cells[width..].iter().any(|cell| !cell.is_empty()) {
            return Err(cells.len());
        }
        cells.truncate(width);
    }
    Ok(cells)
}
