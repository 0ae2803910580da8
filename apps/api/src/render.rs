//! Document rendering: LaTeX source in, PDF bytes out.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

const JOB_NAME: &str = "document";
/// Trailing compiler output kept in error messages.
const LOG_TAIL_CHARS: usize = 2000;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("renderer timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("renderer exited with {status}: {log}")]
    Failed { status: String, log: String },

    #[error("renderer produced no output")]
    MissingOutput,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, source: &str) -> Result<Bytes, RenderError>;
}

/// Runs `pdflatex` (or a compatible program) in a scratch directory.
#[derive(Debug, Clone)]
pub struct PdfLatexRenderer {
    program: PathBuf,
    timeout: Duration,
}

impl PdfLatexRenderer {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl DocumentRenderer for PdfLatexRenderer {
    async fn render(&self, source: &str) -> Result<Bytes, RenderError> {
        let workdir = tempfile::tempdir()?;
        let tex_path = workdir.path().join(format!("{JOB_NAME}.tex"));
        tokio::fs::write(&tex_path, source).await?;

        let child = Command::new(&self.program)
            .arg("-interaction=nonstopmode")
            .arg("-halt-on-error")
            .arg(format!("-output-directory={}", workdir.path().display()))
            .arg(&tex_path)
            .current_dir(workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RenderError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| RenderError::Timeout(self.timeout))??;

        if !output.status.success() {
            let log = log_tail(&output.stdout, &output.stderr);
            warn!("{} failed: {}", self.program.display(), output.status);
            return Err(RenderError::Failed {
                status: output.status.to_string(),
                log,
            });
        }

        let pdf_path = workdir.path().join(format!("{JOB_NAME}.pdf"));
        let pdf = match tokio::fs::read(&pdf_path).await {
            Ok(pdf) if !pdf.is_empty() => pdf,
            Ok(_) => return Err(RenderError::MissingOutput),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RenderError::MissingOutput)
            }
            Err(e) => return Err(e.into()),
        };

        debug!("Rendered {} bytes of PDF", pdf.len());
        Ok(Bytes::from(pdf))
    }
}

fn log_tail(stdout: &[u8], stderr: &[u8]) -> String {
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(stdout),
        String::from_utf8_lossy(stderr)
    );
    let text = text.trim();
    let skip = text.chars().count().saturating_sub(LOG_TAIL_CHARS);
    text.chars().skip(skip).collect()
}
