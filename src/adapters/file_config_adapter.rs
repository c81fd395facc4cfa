//! INI file configuration adapter.
//!
//! Keys and sections are case-sensitive so unit symbols such as `MJ` and `mJ`
//! in the `[units]` section stay distinct.

use crate::domain::error::ImpactError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ImpactError> {
        let path = path.as_ref();
        let mut config = Ini::new_cs();
        config.load(path).map_err(|reason| ImpactError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, ImpactError> {
        let mut config = Ini::new_cs();
        config
            .read(content.to_string())
            .map_err(|reason| ImpactError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_section(&self, section: &str) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .config
            .get_map_ref()
            .get(section)
            .map(|keys| {
                keys.iter()
                    .filter_map(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone())))
                    .collect()
            })
            .unwrap_or_default();
        entries.sort();
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[engine]
max_operations = 500000

[window]
start_date = 2010-01-02
end_date = 2010-01-05

[data]
dir = /var/lib/impact
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("window", "start_date"),
            Some("2010-01-02".to_string())
        );
        assert_eq!(
            adapter.get_string("data", "dir"),
            Some("/var/lib/impact".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[engine]\nmax_operations = 100\n").unwrap();
        assert_eq!(adapter.get_string("engine", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let adapter = FileConfigAdapter::from_string("[units]\nMJ -> kWh = 0.2777\nmJ -> J = 0.001\n")
            .unwrap();
        assert_eq!(adapter.get_string("units", "MJ -> kWh"), Some("0.2777".into()));
        assert_eq!(adapter.get_string("units", "mJ -> J"), Some("0.001".into()));
        assert_eq!(adapter.get_string("units", "mj -> j"), None);
    }

    #[test]
    fn get_section_lists_entries_in_key_order() {
        let adapter = FileConfigAdapter::from_string(
            "[units]\nkWh -> MJ = 3.6\ng -> kg = 0.001\nt -> kg = 1000\n",
        )
        .unwrap();
        assert_eq!(
            adapter.get_section("units"),
            vec![
                ("g -> kg".to_string(), "0.001".to_string()),
                ("kWh -> MJ".to_string(), "3.6".to_string()),
                ("t -> kg".to_string(), "1000".to_string()),
            ]
        );
        assert!(adapter.get_section("missing").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[data]\ndir = /path/to/records\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "dir"),
            Some("/path/to/records".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(ImpactError::ConfigParse { .. })));
    }
}
