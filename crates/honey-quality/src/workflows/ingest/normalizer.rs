use super::mapping::canonical_column;

/// Lowercased snake_case header with BOM/zero-width noise removed and known aliases applied.
pub(crate) fn normalize_header(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let snake = cleaned
        .trim()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_lowercase();

    match canonical_column(&snake) {
        Some(canonical) => canonical.to_string(),
        None => snake,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bom_and_snake_cases() {
        assert_eq!(normalize_header("\u{feff}Batch ID"), "batch_id");
        assert_eq!(normalize_header("  Lab-Id "), "lab_id");
        assert_eq!(normalize_header("Moisture"), "moisture");
    }

    #[test]
    fn applies_aliases() {
        assert_eq!(normalize_header("HMF"), "h_m_f");
        assert_eq!(normalize_header("Diastase"), "diastase_activity");
        assert_eq!(normalize_header("pH"), "ph");
    }
}
