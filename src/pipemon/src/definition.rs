use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Pipeline definition file handed to the responder at startup.
///
/// The document must be valid JSON. Its content is never interpreted; it is forwarded to
/// observers as a compact JSON string with object keys in their original order.
#[derive(Debug, Clone)]
pub struct PipelineDefinition {
    path: PathBuf,
    blob: String,
}

impl PipelineDefinition {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read pipeline definition {:?}", path))?;
        let document: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse pipeline definition {:?}", path))?;

        Ok(Self {
            path: path.to_path_buf(),
            blob: document.to_string(),
        })
    }

    /// The name observers know this pipeline by: the definition path as given.
    pub fn instance_name(&self) -> String {
        self.path.display().to_string()
    }

    pub fn blob(&self) -> &str {
        &self.blob
    }
}
