//! Two-row-header sheets → `<period>_<metric>` tables.
//!
//! The statistics portal exports each survey as a sheet whose first row holds
//! the period (only on the first column of each period's span) and whose
//! second row holds the metric. Normalising flattens both rows into one.

use anyhow::{anyhow, Context, Result};
use glob::glob;
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{error, info, instrument, warn};

use crate::table::{parquet::write_table, RawTable, Table};

/// Output file prefix; the loader strips it to form the table key.
pub const PROCESSED_PREFIX: &str = "processed_";

/// Label used when a header cell carries no metric.
const UNKNOWN: &str = "Unknown";

/// Flatten the two header rows of `raw` into one and keep rows 2.. as data.
pub fn normalize(raw: &RawTable) -> Result<Table> {
    if raw.rows.len() < 2 {
        return Err(anyhow!(
            "expected two header rows, found {} rows",
            raw.rows.len()
        ));
    }
    // data rows never widen the table; only the header rows define columns
    let width = raw.rows[..2].iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return Err(anyhow!("sheet has no columns"));
    }

    let mut columns = Vec::with_capacity(width);
    let mut current_period = String::new();
    for col in 0..width {
        let period = raw.cell(0, col).trim();
        let metric = raw.cell(1, col).trim();
        let metric = if metric.is_empty() { UNKNOWN } else { metric };

        if col == 0 {
            columns.push(metric.to_string());
            continue;
        }
        if !period.is_empty() {
            current_period = period.to_string();
        }
        columns.push(format!("{}_{}", current_period, metric));
    }

    let mut rows = Vec::with_capacity(raw.rows.len() - 2);
    for (idx, row) in raw.rows.iter().enumerate().skip(2) {
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        if row.len() > width {
            warn!(row = idx, cells = row.len(), width, "row wider than header, truncating");
        }
        let mut cells: Vec<String> = row.iter().take(width).cloned().collect();
        cells.resize(width, String::new());
        rows.push(cells);
    }

    Table::new(columns, rows)
}

/// Outcome of a directory run: files written and files that failed.
#[derive(Debug, Default)]
pub struct PreprocessReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl PreprocessReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// `<output_dir>/processed_<stem>.parquet` for an input file.
pub fn output_path_for(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("unusable file name {}", input.display()))?;
    Ok(output_dir.join(format!("{}{}.parquet", PROCESSED_PREFIX, stem)))
}

/// Normalise one CSV and persist it.
#[instrument(level = "info", skip(input, output_dir), fields(file = %input.display()))]
pub fn preprocess_file(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let raw = RawTable::from_csv_path(input)?;
    let table = normalize(&raw).with_context(|| format!("normalising {}", input.display()))?;
    let out = output_path_for(input, output_dir)?;
    write_table(&table, &out)?;
    info!(
        rows = table.num_rows(),
        columns = table.columns().len(),
        out = %out.display(),
        "processed"
    );
    Ok(out)
}

/// Input files in `input_dir` named `<prefix>*.csv`, sorted.
pub fn discover_inputs(input_dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Err(anyhow!("input directory {} not found", input_dir.display()));
    }
    let pattern = format!("{}/{}*.csv", glob::Pattern::escape(&input_dir.to_string_lossy()), prefix);
    let mut inputs: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("Failed to read glob pattern '{}'", pattern))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    inputs.sort();
    Ok(inputs)
}

/// Normalise every matching file. A failing file is logged and reported;
/// the remaining files are still processed.
#[instrument(level = "info", skip(input_dir, output_dir), fields(input = %input_dir.display(), output = %output_dir.display()))]
pub fn preprocess_dir(input_dir: &Path, output_dir: &Path, prefix: &str) -> Result<PreprocessReport> {
    let start = Instant::now();
    let inputs = discover_inputs(input_dir, prefix)?;
    if inputs.is_empty() {
        warn!(prefix, "no input files matched");
        return Ok(PreprocessReport::default());
    }
    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    let results: Vec<(PathBuf, Result<PathBuf>)> = inputs
        .into_par_iter()
        .map(|input| {
            let res = preprocess_file(&input, output_dir);
            (input, res)
        })
        .collect();

    let mut report = PreprocessReport::default();
    for (input, res) in results {
        match res {
            Ok(out) => report.written.push(out),
            Err(e) => {
                error!(file = %input.display(), error = %format!("{:#}", e), "preprocessing failed");
                report.failed.push((input, format!("{:#}", e)));
            }
        }
    }

    info!(
        written = report.written.len(),
        failed = report.failed.len(),
        elapsed = ?start.elapsed(),
        "preprocessing finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parquet::read_table;
    use std::fs;
    use tempfile::tempdir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,welfarestats::preprocess=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn normalize_carries_period_forward() -> Result<()> {
        let raw = RawTable::new(vec![
            strings(&["", "2020", "", "2021", ""]),
            strings(&["구분", "취업자 (명)", "실업률 (%)", "취업자 (명)", "실업률 (%)"]),
            strings(&["전체", "100", "5.0", "110", "4.5"]),
        ]);
        let table = normalize(&raw)?;
        assert_eq!(
            table.columns(),
            &strings(&[
                "구분",
                "2020_취업자 (명)",
                "2020_실업률 (%)",
                "2021_취업자 (명)",
                "2021_실업률 (%)"
            ])
        );
        assert_eq!(table.rows(), &[strings(&["전체", "100", "5.0", "110", "4.5"])]);
        Ok(())
    }

    #[test]
    fn half_year_periods_and_missing_metrics() -> Result<()> {
        let raw = RawTable::new(vec![
            strings(&["", "2023.1/2", "", "2023.2/2"]),
            strings(&["연령", "고용률 (%)", "", "고용률 (%)"]),
            strings(&["15~29세", "30.1", "x", "31.2"]),
        ]);
        let table = normalize(&raw)?;
        assert_eq!(
            table.columns(),
            &strings(&["연령", "2023.1/2_고용률 (%)", "2023.1/2_Unknown", "2023.2/2_고용률 (%)"])
        );
        Ok(())
    }

    #[test]
    fn metric_before_any_period_keeps_empty_prefix() -> Result<()> {
        let raw = RawTable::new(vec![
            strings(&["", "", "2008"]),
            strings(&["학력", "고용률 (%)", "고용률 (%)"]),
            strings(&["대졸", "60", "61"]),
        ]);
        let table = normalize(&raw)?;
        assert_eq!(
            table.columns(),
            &strings(&["학력", "_고용률 (%)", "2008_고용률 (%)"])
        );
        Ok(())
    }

    #[test]
    fn ragged_and_blank_rows() -> Result<()> {
        let raw = RawTable::new(vec![
            strings(&["", "2020"]),
            strings(&["구분", "취업자 (명)"]),
            strings(&["전체"]),
            strings(&["", ""]),
            strings(&["남", "1", "extra"]),
        ]);
        let table = normalize(&raw)?;
        assert_eq!(
            table.rows(),
            &[strings(&["전체", ""]), strings(&["남", "1"])]
        );
        Ok(())
    }

    #[test]
    fn long_data_rows_do_not_add_columns() -> Result<()> {
        init_test_logging();
        let raw = RawTable::new(vec![
            strings(&["", "2021"]),
            strings(&["권역", "취업자 (명)"]),
            strings(&["수도권", "60", "61", "62"]),
        ]);
        let table = normalize(&raw)?;
        assert_eq!(table.columns(), &strings(&["권역", "2021_취업자 (명)"]));
        assert_eq!(table.rows(), &[strings(&["수도권", "60"])]);
        Ok(())
    }

    #[test]
    fn too_few_rows_is_an_error() {
        let raw = RawTable::new(vec![strings(&["", "2020"])]);
        assert!(normalize(&raw).is_err());
        assert!(normalize(&RawTable::default()).is_err());
    }

    #[test]
    fn preprocess_dir_tolerates_bad_files() -> Result<()> {
        init_test_logging();
        let input = tempdir()?;
        let output = tempdir()?;
        fs::write(
            input.path().join("disable_age.csv"),
            ",2020,\n구분,취업자 (명),실업률 (%)\n전체,100,5.0\n",
        )?;
        // one header row only
        fs::write(input.path().join("disable_broken.csv"), ",2020\n")?;
        // not matching the prefix
        fs::write(input.path().join("other.csv"), ",2020\n구분,x\n")?;

        let report = preprocess_dir(input.path(), output.path(), "disable")?;
        assert_eq!(report.written.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].0.ends_with("disable_broken.csv"));
        assert!(!report.is_clean());

        let written = output.path().join("processed_disable_age.parquet");
        assert_eq!(report.written[0], written);
        let table = read_table(&written)?;
        assert_eq!(table.value("전체", "2020_취업자 (명)"), Some(100.0));
        assert_eq!(table.value("전체", "2020_실업률 (%)"), Some(5.0));
        Ok(())
    }

    #[test]
    fn missing_input_dir_is_an_error() {
        let out = tempdir().unwrap();
        assert!(preprocess_dir(Path::new("/no/such/dir"), out.path(), "disable").is_err());
    }
}
