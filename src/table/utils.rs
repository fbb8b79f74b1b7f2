use arrow::datatypes::DataType;

/// Trim whitespace, a leading BOM, and outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim_start_matches('\u{feff}').trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Coerce a cell to a number the way the source statistics are written:
/// thousands separators are accepted, `-` and blanks are missing,
/// anything else that does not parse is missing too.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = clean_str(raw);
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    let digits: String = cleaned.chars().filter(|c| *c != ',').collect();
    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Render a number back into a cell. Integral values drop the fraction so
/// counts survive a Parquet round trip unchanged.
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

/// Infer an Arrow dtype for a whole column of cells: Float64 when every
/// non-empty cell is numeric and at least one is present, Utf8 otherwise.
pub fn infer_column_dtype<'a, I>(cells: I) -> DataType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen_value = false;
    for cell in cells {
        let cleaned = clean_str(cell);
        if cleaned.is_empty() {
            continue;
        }
        // `-` alone is a textual placeholder; keep it as text so it round-trips
        if cleaned == "-" || cleaned.contains(',') || parse_number(&cleaned).is_none() {
            return DataType::Utf8;
        }
        seen_value = true;
    }
    if seen_value {
        DataType::Float64
    } else {
        DataType::Utf8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_str_strips_quotes_and_bom() {
        assert_eq!(clean_str("  \"전체\" "), "전체");
        assert_eq!(clean_str("\u{feff}시도별"), "시도별");
        assert_eq!(clean_str("\""), "\"");
    }

    #[test]
    fn parse_number_handles_separators_and_placeholders() {
        assert_eq!(parse_number("1,234"), Some(1234.0));
        assert_eq!(parse_number(" 4.5 "), Some(4.5));
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("-3"), Some(-3.0));
    }

    #[test]
    fn format_number_keeps_counts_integral() {
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(4.5), "4.5");
        assert_eq!(format_number(-2.0), "-2");
    }

    #[test]
    fn infer_column_dtype_needs_every_cell_numeric() {
        assert_eq!(infer_column_dtype(["1", "", "2.5"]), DataType::Float64);
        assert_eq!(infer_column_dtype(["1", "x"]), DataType::Utf8);
        assert_eq!(infer_column_dtype(["", ""]), DataType::Utf8);
        assert_eq!(infer_column_dtype(["1,000"]), DataType::Utf8);
    }
}
