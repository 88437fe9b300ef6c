//! CSV loading and saving

use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Data loader for the tabular dataset files
#[derive(Debug, Clone, Default)]
pub struct DataLoader {
    /// Columns always read as `Float64`, whatever the inferred type
    float_columns: Vec<String>,
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `columns` to `Float64` instead of inferring their type from the first rows
    pub fn with_float_columns(mut self, columns: &[&str]) -> Self {
        self.float_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Load a CSV file with a header row
    ///
    /// Pinned columns absent from the file are left for schema validation to report.
    pub fn load_csv(&self, path: impl AsRef<Path>) -> PolarsResult<DataFrame> {
        let path = path.as_ref();
        let overrides = self.schema_overrides(path)?;

        CsvReadOptions::default()
            .with_has_header(true)
            .with_schema_overwrite(overrides)
            .into_reader_with_file_handle(File::open(path)?)
            .finish()
    }

    fn schema_overrides(&self, path: &Path) -> PolarsResult<Option<SchemaRef>> {
        if self.float_columns.is_empty() {
            return Ok(None);
        }
        let header = CsvReadOptions::default()
            .with_has_header(true)
            .with_n_rows(Some(1))
            .into_reader_with_file_handle(File::open(path)?)
            .finish()?;

        let schema: Schema = header
            .get_column_names()
            .into_iter()
            .filter(|name| self.float_columns.iter().any(|c| c == name.as_str()))
            .map(|name| (name.clone(), DataType::Float64))
            .collect();
        Ok((!schema.is_empty()).then(|| Arc::new(schema)))
    }
}

/// Save DataFrames to disk
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV with a header row, creating parent directories as needed
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> PolarsResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;

        CsvWriter::new(&mut file).include_header(true).finish(df)
    }
}
