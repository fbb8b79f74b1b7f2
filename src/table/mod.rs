pub mod parquet;
pub mod utils;

use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use std::{fs::File, io::Read, path::Path};
use tracing::{debug, instrument};

use self::utils::{clean_str, parse_number};

/// A sheet as it was exported: every row, header rows included, as text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Width of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell at (`row`, `col`), empty when the row is short.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Read a CSV without interpreting any row as a header.
    #[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        Self::from_csv_reader(file).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("CSV parse error at record {}", idx))?;
            rows.push(record.iter().map(clean_str).collect());
        }
        debug!(rows = rows.len(), "read raw table");
        Ok(Self { rows })
    }

    /// Drop the first `n` rows and treat the next one as the header.
    pub fn into_table(self, title_rows: usize) -> Result<Table> {
        let mut rows = self.rows.into_iter().skip(title_rows);
        let columns = rows
            .next()
            .ok_or_else(|| anyhow!("no header row after {} title rows", title_rows))?;
        let width = columns.len();
        let rows = rows
            .filter(|r| r.iter().any(|c| !c.is_empty()))
            .map(|mut r| {
                r.resize(width, String::new());
                r
            })
            .collect();
        Table::new(columns, rows)
    }
}

/// A table with one header row whose first column is the category key.
/// Cells stay textual; numeric access coerces on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Every row must be exactly as wide as the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if columns.is_empty() {
            return Err(anyhow!("table has no columns"));
        }
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(anyhow!(
                "row {} has {} cells, header has {}",
                idx,
                row.len(),
                columns.len()
            ));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Name of the category key column.
    pub fn key_column(&self) -> &str {
        &self.columns[0]
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Category keys in row order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r[0].as_str())
    }

    /// Raw text of one column.
    pub fn text_column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// One column coerced to numbers; unparsable cells become `None`.
    pub fn numeric_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| parse_number(&r[idx])).collect())
    }

    /// Numeric value of `column` on the first row whose key equals `key`.
    pub fn value(&self, key: &str, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.rows
            .iter()
            .find(|r| r[0] == key)
            .and_then(|r| parse_number(&r[idx]))
    }

    /// A copy keeping only the rows for which `keep` holds.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[String]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// A copy without rows whose key is `key` or empty (e.g. the `전체` total row).
    pub fn without_key(&self, key: &str) -> Table {
        self.filter_rows(|r| !r[0].is_empty() && r[0] != key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> Table {
        Table::new(
            vec!["구분".into(), "2020_취업자 (명)".into()],
            vec![
                vec!["전체".into(), "1,000".into()],
                vec!["남".into(), "600".into()],
                vec!["여".into(), "-".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn raw_table_reads_ragged_rows() -> Result<()> {
        let csv = "\u{feff},2020,\n구분,취업자 (명)\n전체,100,5.0\n";
        let raw = RawTable::from_csv_reader(Cursor::new(csv))?;
        assert_eq!(raw.rows.len(), 3);
        assert_eq!(raw.width(), 3);
        assert_eq!(raw.cell(0, 0), "");
        assert_eq!(raw.cell(1, 2), "");
        assert_eq!(raw.cell(2, 2), "5.0");
        Ok(())
    }

    #[test]
    fn into_table_skips_title_rows_and_pads() -> Result<()> {
        let raw = RawTable::new(vec![
            vec!["title".into()],
            vec!["a".into(), "b".into()],
            vec!["x".into()],
            vec!["".into(), "".into()],
        ]);
        let table = raw.into_table(1)?;
        assert_eq!(table.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(table.rows(), &[vec!["x".to_string(), String::new()]]);
        Ok(())
    }

    #[test]
    fn numeric_access_coerces() {
        let t = sample();
        assert_eq!(
            t.numeric_column("2020_취업자 (명)").unwrap(),
            vec![Some(1000.0), Some(600.0), None]
        );
        assert_eq!(t.value("남", "2020_취업자 (명)"), Some(600.0));
        assert_eq!(t.value("없음", "2020_취업자 (명)"), None);
        assert!(t.numeric_column("missing").is_none());
    }

    #[test]
    fn without_key_drops_total_row() {
        let t = sample().without_key("전체");
        assert_eq!(t.keys().collect::<Vec<_>>(), vec!["남", "여"]);
    }

    #[test]
    fn new_rejects_ragged_rows() {
        assert!(Table::new(vec!["a".into()], vec![vec![]]).is_err());
        assert!(Table::new(vec![], vec![]).is_err());
    }
}
