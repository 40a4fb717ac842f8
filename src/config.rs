//! YAML pipeline configuration for the `run` command.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::{
    cli::parse_delimiter,
    columns::TextColumn,
    events::EventWindow,
    io_utils::CsvSource,
    pipeline::{DEFAULT_CITY, ReconcileOptions},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EtlConfig {
    pub raw_reservations: PathBuf,
    pub competitors: PathBuf,
    #[serde(default)]
    pub events: Option<PathBuf>,
    pub snapshot: PathBuf,
    pub tables_dir: PathBuf,
    #[serde(default = "default_city")]
    pub default_city: String,
    #[serde(default = "default_blank_to_null")]
    pub blank_to_null: Vec<TextColumn>,
    #[serde(default)]
    pub event_window: EventWindow,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub input_encoding: Option<String>,
}

fn default_city() -> String {
    DEFAULT_CITY.to_string()
}

fn default_blank_to_null() -> Vec<TextColumn> {
    TextColumn::DEFAULT_BLANK_TO_NULL.to_vec()
}

impl EtlConfig {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents).context("Parsing pipeline configuration")?;
        EventWindow::new(config.event_window.start, config.event_window.end)?;
        config.reconcile_options().validate()?;
        Ok(config)
    }

    /// Reads the configuration at `path`. Relative paths inside it are
    /// resolved against the directory holding the file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Reading pipeline configuration {path:?}"))?;
        let mut config = Self::from_yaml(&contents)
            .with_context(|| format!("Loading pipeline configuration {path:?}"))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.resolve_paths(base);
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.raw_reservations);
        resolve(&mut self.competitors);
        resolve(&mut self.snapshot);
        resolve(&mut self.tables_dir);
        if let Some(events) = self.events.as_mut() {
            resolve(events);
        }
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            default_city: self.default_city.clone(),
            blank_to_null: self.blank_to_null.clone(),
        }
    }

    pub fn csv_source(&self) -> Result<CsvSource> {
        let delimiter = self
            .delimiter
            .as_deref()
            .map(parse_delimiter)
            .transpose()
            .map_err(|err| anyhow!("Invalid delimiter in configuration: {err}"))?;
        Ok(CsvSource::new(delimiter, self.input_encoding.as_deref())?)
    }
}
