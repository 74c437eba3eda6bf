//! Command line and environment configuration for the `dngwatch` binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use dngwatch_settle_watcher::WatchConfig;

use crate::config::{ConverterConfig, IngestConfig};

/// Convert raw files to DNG once they finish copying into a watched directory.
#[derive(Debug, Parser)]
#[command(name = "dngwatch", version, about)]
pub struct Cli {
    /// Directory holding the dedup index.
    #[arg(long, env = "DATA_DIR")]
    pub data_dir: PathBuf,

    /// Directories to watch (comma separated in the environment).
    #[arg(long = "source-dir", env = "SOURCE_DIR", value_delimiter = ',', required = true)]
    pub source_dirs: Vec<PathBuf>,

    /// Directory converted files are written to.
    #[arg(long, env = "DEST_DIR")]
    pub dest_dir: PathBuf,

    /// File extensions to convert, e.g. `CR3,NEF`.
    #[arg(long = "ext", env = "FILE_EXTS", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Conversion program.
    #[arg(long, env = "CONVERTER", default_value = "dnglab")]
    pub converter: String,

    /// Converter argument template; `{source}` and `{dest}` are substituted.
    /// Defaults to `-d -v convert {source} {dest}`.
    #[arg(
        long = "converter-arg",
        env = "CONVERTER_ARGS",
        value_delimiter = ' ',
        allow_hyphen_values = true
    )]
    pub converter_args: Vec<String>,

    /// Extension for converted files; empty keeps the source name.
    #[arg(long, env = "OUTPUT_EXT", default_value = "dng")]
    pub output_ext: String,

    /// Seconds a file must stay untouched before it is converted.
    #[arg(long, env = "QUIESCENCE_SECS", default_value_t = 15)]
    pub quiescence_secs: u64,

    /// Seconds between settle passes.
    #[arg(long, env = "POLL_SECS", default_value_t = 15)]
    pub poll_secs: u64,

    /// Do not watch subdirectories for live changes.
    #[arg(long)]
    pub non_recursive: bool,
}

impl Cli {
    /// Build the service configuration.
    pub fn into_config(self) -> IngestConfig {
        let converter = if self.converter_args.is_empty() {
            ConverterConfig {
                program: self.converter,
                ..ConverterConfig::default()
            }
        } else {
            ConverterConfig::new(self.converter, self.converter_args)
        };

        let mut watch = WatchConfig::default()
            .with_quiescence_period(Duration::from_secs(self.quiescence_secs))
            .with_poll_interval(Duration::from_secs(self.poll_secs));
        if self.non_recursive {
            watch = watch.non_recursive();
        }

        let output_extension = Some(self.output_ext).filter(|ext| !ext.trim().is_empty());

        IngestConfig {
            extensions: self.extensions,
            converter,
            output_extension,
            ..IngestConfig::new(self.data_dir, self.source_dirs, self.dest_dir)
        }
        .with_watch(watch)
    }
}
