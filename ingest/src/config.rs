//! Configuration for the ingest service.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use dngwatch_settle_watcher::WatchConfig;

use crate::error::{IngestError, Result};

/// File name of the dedup index inside the data directory.
pub const INDEX_FILE_NAME: &str = "indexdb.db";

/// Configuration for the ingest service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory holding the dedup index.
    pub data_dir: PathBuf,

    /// Directory converted files are written to.
    pub dest_dir: PathBuf,

    /// Extensions to convert (case-insensitive, with or without a leading dot).
    pub extensions: Vec<String>,

    /// External conversion command.
    pub converter: ConverterConfig,

    /// Extension given to converted files. `None` keeps the source name.
    pub output_extension: Option<String>,

    /// Watch scope and timing. Its roots are the source directories.
    pub watch: WatchConfig,
}

impl IngestConfig {
    /// Create a config with defaults for everything but the directories.
    pub fn new(
        data_dir: impl Into<PathBuf>,
        source_dirs: impl IntoIterator<Item = PathBuf>,
        dest_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            dest_dir: dest_dir.into(),
            extensions: Vec::new(),
            converter: ConverterConfig::default(),
            output_extension: Some("dng".to_string()),
            watch: WatchConfig::new(source_dirs),
        }
    }

    /// Add an allowed extension.
    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.extensions.push(ext.into());
        self
    }

    /// Set the converter.
    pub fn with_converter(mut self, converter: ConverterConfig) -> Self {
        self.converter = converter;
        self
    }

    /// Set the output extension.
    pub fn with_output_extension(mut self, ext: Option<String>) -> Self {
        self.output_extension = ext;
        self
    }

    /// Set the watch configuration, keeping the current source directories.
    pub fn with_watch(mut self, watch: WatchConfig) -> Self {
        let roots = std::mem::take(&mut self.watch.roots);
        self.watch = WatchConfig { roots, ..watch };
        self
    }

    /// Source directories being watched.
    pub fn source_dirs(&self) -> &[PathBuf] {
        &self.watch.roots
    }

    /// Path to the dedup index.
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(INDEX_FILE_NAME)
    }

    /// Check the config before starting.
    pub fn validate(&self) -> Result<()> {
        if self.converter.program.trim().is_empty() {
            return Err(IngestError::Config("converter program is empty".to_string()));
        }
        if self
            .source_dirs()
            .iter()
            .any(|dir| same_dir(dir, &self.dest_dir))
        {
            return Err(IngestError::Config(format!(
                "destination {} is also a source directory",
                self.dest_dir.display()
            )));
        }
        self.watch.validate()?;
        Ok(())
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// External conversion command.
///
/// `{source}` and `{dest}` in `args` are replaced with the file paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Program to run.
    pub program: String,

    /// Argument template.
    pub args: Vec<String>,
}

impl ConverterConfig {
    /// Create a converter config.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self::new("dnglab", ["-d", "-v", "convert", "{source}", "{dest}"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_ingest_config_defaults() {
        let config = IngestConfig::new("/var/lib/dngwatch", [PathBuf::from("/in")], "/out")
            .with_extension("CR3");

        assert_eq!(config.index_path(), Path::new("/var/lib/dngwatch/indexdb.db"));
        assert_eq!(config.source_dirs(), &[PathBuf::from("/in")]);
        assert_eq!(config.converter.program, "dnglab");
        assert_eq!(config.output_extension.as_deref(), Some("dng"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_watch_keeps_sources() {
        let config = IngestConfig::new("/d", [PathBuf::from("/in")], "/out").with_watch(
            WatchConfig::default().with_quiescence_period(Duration::from_secs(30)),
        );

        assert_eq!(config.source_dirs(), &[PathBuf::from("/in")]);
        assert_eq!(config.watch.quiescence_period, Duration::from_secs(30));
    }

    #[test]
    fn test_dest_inside_sources_is_rejected() {
        let config = IngestConfig::new("/d", [PathBuf::from("/in")], "/in");
        assert!(matches!(config.validate(), Err(IngestError::Config(_))));

        let config = IngestConfig::new("/d", [PathBuf::from("/in")], "/out")
            .with_converter(ConverterConfig::new(" ", Vec::<String>::new()));
        assert!(config.validate().is_err());
    }
}
