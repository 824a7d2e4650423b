// src/config.rs

// --- Imports ---
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::extractors::heading::DEFAULT_HEADING_PREFIXES;
use crate::extractors::rows::{ColumnMap, ColumnRule};
use crate::extractors::table::StrategyKind;
use crate::utils::AppError;

// --- Data Structures ---
/// Extraction settings. Every key is optional in the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Line prefixes that identify a ministry/agency heading.
    pub heading_prefixes: Vec<String>,
    /// Ordered header-label rules for the four table columns.
    pub columns: Vec<ColumnRule>,
    /// Table strategies, in the order they are tried.
    pub strategies: Vec<StrategyKind>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            heading_prefixes: DEFAULT_HEADING_PREFIXES.iter().map(|p| p.to_string()).collect(),
            columns: ColumnMap::default().rules().to_vec(),
            strategies: vec![StrategyKind::Lattice, StrategyKind::Stream],
        }
    }
}

impl ExtractionConfig {
    /// Reads and validates a JSON settings file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        tracing::debug!("Loading settings from {}", path.display());
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.heading_prefixes.iter().all(|p| p.is_empty()) {
            return Err(AppError::Config("heading_prefixes must contain a non-empty prefix".to_string()));
        }
        if self.strategies.is_empty() {
            return Err(AppError::Config("strategies must not be empty".to_string()));
        }
        let uncovered = self.column_map().uncovered();
        if !uncovered.is_empty() {
            return Err(AppError::Config(format!("no column rule for {:?}", uncovered)));
        }
        Ok(())
    }

    pub fn column_map(&self) -> ColumnMap {
        ColumnMap::new(self.columns.clone())
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::rows::SemanticColumn;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_settings(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_is_valid() {
        let config = ExtractionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.heading_prefixes.len(), 19);
        assert_eq!(config.strategies, vec![StrategyKind::Lattice, StrategyKind::Stream]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_settings(r#"{ "strategies": ["stream"] }"#);
        let config = ExtractionConfig::load(file.path()).unwrap();

        assert_eq!(config.strategies, vec![StrategyKind::Stream]);
        assert_eq!(config.columns, ExtractionConfig::default().columns);
    }

    #[test]
    fn test_full_file() {
        let file = write_settings(
            r#"{
                "heading_prefixes": ["CONSORCIO"],
                "columns": [
                    {"column": "directorate", "contains": "UNIDAD"},
                    {"column": "province", "contains": "PROVINCIA"},
                    {"column": "job_title", "contains": "PUESTO"},
                    {"column": "specific", "contains": "ESPECÍFICO"},
                    {"column": "specific", "contains": "ESPECIFICO"}
                ],
                "strategies": ["lattice"]
            }"#,
        );
        let config = ExtractionConfig::load(file.path()).unwrap();

        assert_eq!(config.heading_prefixes, vec!["CONSORCIO".to_string()]);
        assert_eq!(config.columns.len(), 5);
        assert_eq!(config.columns[0].column, SemanticColumn::Directorate);
        assert_eq!(config.strategies, vec![StrategyKind::Lattice]);
    }

    #[test]
    fn test_invalid_settings_are_config_errors() {
        for json in [
            r#"{ "heading_prefixes": [] }"#,
            r#"{ "strategies": [] }"#,
            r#"{ "strategies": ["guess"] }"#,
            r#"{ "columns": [{"column": "province", "contains": "PROVINCIA"}] }"#,
            r#"{ "prefixes": ["MINISTERIO"] }"#,
            "not json",
        ] {
            let file = write_settings(json);
            let result = ExtractionConfig::load(file.path());
            assert!(matches!(result, Err(AppError::Config(_))), "accepted {}", json);
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ExtractionConfig::load("/definitely/not/here.json");
        assert!(matches!(result, Err(AppError::Io(_))));
    }
}
