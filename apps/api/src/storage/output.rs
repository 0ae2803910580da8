use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

/// One run's directory under the output root: `<company>_<job_title>`,
/// suffixed `_1`, `_2`, ... when the name is taken.
#[derive(Debug, Clone)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    pub async fn create(root: &Path, company_name: &str, job_title: &str) -> Result<Self> {
        tokio::fs::create_dir_all(root)
            .await
            .with_context(|| format!("Failed to create output root {}", root.display()))?;

        let base = directory_name(company_name, job_title);
        let mut counter = 0u32;
        loop {
            let name = if counter == 0 {
                base.clone()
            } else {
                format!("{base}_{counter}")
            };
            let path = root.join(&name);
            match tokio::fs::create_dir(&path).await {
                Ok(()) => {
                    info!("Created output directory {}", path.display());
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to create {}", path.display()))
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, file_name: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.path.join(file_name);
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Spaces become `_`; anything but alphanumerics, `_` and `-` is dropped.
pub fn directory_name(company_name: &str, job_title: &str) -> String {
    let name: String = format!("{}_{}", company_name.trim(), job_title.trim())
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if name.trim_matches('_').is_empty() {
        "untitled".to_string()
    } else {
        name
    }
}
