//! Runs the external conversion command and streams its output into the log.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::ConverterConfig;
use crate::error::{IngestError, Result};

/// Summary of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Lines the converter wrote to stdout.
    pub stdout_lines: usize,

    /// Lines the converter wrote to stderr.
    pub stderr_lines: usize,

    /// Wall time of the conversion.
    pub duration: Duration,
}

/// Wrapper around the external conversion program.
#[derive(Debug, Clone)]
pub struct Converter {
    config: ConverterConfig,
}

impl Converter {
    /// Create a converter.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Program being run.
    pub fn program(&self) -> &str {
        &self.config.program
    }

    /// Arguments for converting `source` into `dest`.
    pub fn command_args(&self, source: &Path, dest: &Path) -> Vec<OsString> {
        self.config
            .args
            .iter()
            .map(|arg| expand_arg(arg, source, dest))
            .collect()
    }

    /// Convert `source` into `dest`, logging the converter's output line by line.
    pub async fn convert(&self, source: &Path, dest: &Path) -> Result<ConversionReport> {
        let label = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let start = Instant::now();

        let mut child = Command::new(&self.config.program)
            .args(self.command_args(source, dest))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| IngestError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        info!("{label} | {} convert begins", self.config.program);

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (stdout_lines, stderr_lines) = tokio::join!(
            log_lines(stdout, &label, false),
            log_lines(stderr, &label, true),
        );
        let status = child.wait().await?;

        if !status.success() {
            return Err(IngestError::ConvertFailed {
                program: self.config.program.clone(),
                status: status.to_string(),
            });
        }

        let report = ConversionReport {
            stdout_lines,
            stderr_lines,
            duration: start.elapsed(),
        };
        info!(
            "{label} | {} convert finished in {:?}",
            self.config.program, report.duration
        );
        Ok(report)
    }
}

fn expand_arg(arg: &str, source: &Path, dest: &Path) -> OsString {
    match arg {
        "{source}" => source.as_os_str().to_owned(),
        "{dest}" => dest.as_os_str().to_owned(),
        _ => arg
            .replace("{source}", &source.to_string_lossy())
            .replace("{dest}", &dest.to_string_lossy())
            .into(),
    }
}

/// Log every line of converter output, returning the number of lines.
///
/// Lines are decoded lossily. A read error stops logging but never fails the
/// conversion; the exit status alone decides that.
async fn log_lines<R>(reader: Option<R>, label: &str, is_stderr: bool) -> usize
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return 0;
    };

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut count = 0;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("{label} | stopped reading converter output: {e}");
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        if is_stderr {
            warn!("{label} | {line}");
        } else {
            info!("{label} | {line}");
        }
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_args_expand_paths() {
        let converter = Converter::new(ConverterConfig::default());
        let args = converter.command_args(
            Path::new("/in/IMG_1234.CR3"),
            Path::new("/out/IMG_1234.dng"),
        );

        assert_eq!(converter.program(), "dnglab");
        assert_eq!(
            args,
            vec![
                OsString::from("-d"),
                OsString::from("-v"),
                OsString::from("convert"),
                OsString::from("/in/IMG_1234.CR3"),
                OsString::from("/out/IMG_1234.dng"),
            ]
        );
    }

    #[test]
    fn test_embedded_placeholders() {
        let converter =
            Converter::new(ConverterConfig::new("tool", ["--in={source}", "--out={dest}"]));
        let args = converter.command_args(Path::new("/a"), Path::new("/b"));

        assert_eq!(args, vec![OsString::from("--in=/a"), OsString::from("--out=/b")]);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let converter = Converter::new(ConverterConfig::new(
            "dngwatch-no-such-program",
            ["{source}"],
        ));
        let result = converter.convert(Path::new("/in/a.cr3"), Path::new("/out/a.dng")).await;

        assert!(matches!(result, Err(IngestError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_is_counted() {
        let converter = Converter::new(ConverterConfig::new(
            "sh",
            ["-c", "echo converting {source}; echo done; echo warn >&2"],
        ));
        let report = converter
            .convert(Path::new("/in/a.cr3"), Path::new("/out/a.dng"))
            .await
            .unwrap();

        assert_eq!(report.stdout_lines, 2);
        assert_eq!(report.stderr_lines, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_output_does_not_fail_conversion() {
        let converter = Converter::new(ConverterConfig::new(
            "sh",
            ["-c", "printf 'Processing caf\\351.CR3\\n'; echo done; exit 0"],
        ));
        let report = converter
            .convert(Path::new("/in/a.cr3"), Path::new("/out/a.dng"))
            .await
            .unwrap();

        assert_eq!(report.stdout_lines, 2);
        assert_eq!(report.stderr_lines, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let converter = Converter::new(ConverterConfig::new("sh", ["-c", "exit 3"]));
        let result = converter.convert(Path::new("/in/a.cr3"), Path::new("/out/a.dng")).await;

        assert!(matches!(result, Err(IngestError::ConvertFailed { .. })));
    }
}
