// 💾 File I/O - password lists in, records and reports out

use crate::analysis::Report;
use crate::record::PasswordRecord;
use crate::transform::RawPassword;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Load raw passwords
///
/// `.csv` files need a `password` column and may carry an `entropy` column;
/// anything else is read as one password per line, blank lines skipped.
pub fn load_passwords(path: &Path) -> Result<Vec<RawPassword>> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let passwords = if is_csv {
        let mut rdr = csv::Reader::from_path(path).context("Failed to open password CSV")?;
        let mut passwords = Vec::new();
        for result in rdr.deserialize() {
            let raw: RawPassword = result.context("Failed to deserialize password row")?;
            passwords.push(raw);
        }
        passwords
    } else {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read password list: {:?}", path))?;
        content
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(RawPassword::from)
            .collect()
    };

    info!(path = %path.display(), passwords = passwords.len(), "loaded passwords");
    Ok(passwords)
}

pub fn save_records(path: &Path, records: &[PasswordRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records).context("Failed to serialize records")?;
    fs::write(path, json).with_context(|| format!("Failed to write records: {:?}", path))?;

    info!(path = %path.display(), records = records.len(), "saved records");
    Ok(())
}

pub fn load_records(path: &Path) -> Result<Vec<PasswordRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read records: {:?}", path))?;

    serde_json::from_str(&content).context("Failed to parse records JSON")
}

pub fn write_report_csv(path: &Path, report: &Report) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create report CSV: {:?}", path))?;

    wtr.write_record(Report::header())?;
    for row in report.rows() {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
