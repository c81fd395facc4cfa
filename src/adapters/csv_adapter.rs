//! CSV measurement record adapter.
//!
//! Each record source `<name>` is a file `<dir>/<name>.csv` with the header
//! `start_date,value,unit,canonical_unit`. The unit columns may be empty.

use crate::domain::config_validation::parse_date;
use crate::domain::decimal::Decimal;
use crate::domain::error::ImpactError;
use crate::domain::measurement::ExternalValue;
use crate::domain::unit::CompoundUnit;
use crate::ports::record_port::RecordPort;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", name))
    }

    pub fn list_sources(&self) -> Result<Vec<String>, ImpactError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| ImpactError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ImpactError::Data {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            if let Some(stem) = name.to_string_lossy().strip_suffix(".csv") {
                names.push(stem.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}

fn optional_unit(column: Option<&str>, line: u64) -> Result<Option<CompoundUnit>, ImpactError> {
    match column.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse().map(Some).map_err(|reason| ImpactError::Data {
            reason: format!("line {}: {}", line, reason),
        }),
    }
}

impl RecordPort for CsvAdapter {
    fn fetch_records(&self, name: &str) -> Result<Vec<ExternalValue>, ImpactError> {
        let path = self.csv_path(name);
        let content = fs::read_to_string(&path).map_err(|e| ImpactError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut records = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| ImpactError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;
            let line = record.position().map_or(0, |p| p.line());

            let date_str = record.get(0).ok_or_else(|| ImpactError::Data {
                reason: format!("line {}: missing start_date column", line),
            })?;
            let start_date = parse_date(date_str).ok_or_else(|| ImpactError::Data {
                reason: format!("line {}: invalid start_date {:?}", line, date_str),
            })?;

            let value = record
                .get(1)
                .ok_or_else(|| ImpactError::Data {
                    reason: format!("line {}: missing value column", line),
                })?
                .trim();

            let mut external = if Decimal::parse(value).is_ok() {
                ExternalValue::decimal(name, value, start_date)
            } else {
                ExternalValue::text(name, value, start_date)
            };
            external.unit = optional_unit(record.get(2), line)?;
            external.canonical_unit = optional_unit(record.get(3), line)?;
            records.push(external);
        }

        records.sort_by_key(|r| r.start_date);
        tracing::debug!(source = name, records = records.len(), "loaded records");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let energy = "start_date,value,unit,canonical_unit\n\
            2010-01-03,2,kWh,MJ\n\
            2010-01-01,1,kWh,MJ\n\
            2010-01-04T12:00:00Z,0.5,kWh,\n";
        fs::write(path.join("energy.csv"), energy).unwrap();
        fs::write(
            path.join("fuel.csv"),
            "start_date,value,unit,canonical_unit\n2010-01-01,diesel,,\n",
        )
        .unwrap();
        fs::write(path.join("notes.txt"), "ignored").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_records_sorted_by_start_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let records = adapter.fetch_records("energy").unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0].start_date,
            Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(records[0].value, "1");
        assert_eq!(records[0].label, "energy");
        assert!(records[0].is_decimal());
        assert_eq!(records[0].unit, Some(CompoundUnit::simple("kWh")));
        assert!(records[0].is_convertible());
        assert_eq!(
            records[2].start_date,
            Utc.with_ymd_and_hms(2010, 1, 4, 12, 0, 0).unwrap()
        );
        assert!(!records[2].is_convertible());
    }

    #[test]
    fn non_numeric_values_are_text() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let records = adapter.fetch_records("fuel").unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].is_decimal());
        assert_eq!(records[0].usable_value(), "diesel");
        assert_eq!(records[0].unit, None);
    }

    #[test]
    fn missing_file_is_data_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(matches!(
            adapter.fetch_records("missing"),
            Err(ImpactError::Data { .. })
        ));
    }

    #[test]
    fn invalid_date_is_data_error() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("bad.csv"),
            "start_date,value,unit,canonical_unit\n01/02/2010,1,,\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);
        assert!(matches!(
            adapter.fetch_records("bad"),
            Err(ImpactError::Data { .. })
        ));
    }

    #[test]
    fn malformed_unit_is_data_error() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("bad.csv"),
            "start_date,value,unit,canonical_unit\n2010-01-01,1,kg/,\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);
        assert!(matches!(
            adapter.fetch_records("bad"),
            Err(ImpactError::Data { .. })
        ));
    }

    #[test]
    fn list_sources_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(adapter.list_sources().unwrap(), vec!["energy", "fuel"]);
    }
}
