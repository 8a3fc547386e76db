use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::pdf::PageSize;
use crate::pipeline::{ArchiveRequest, ConversionJob, InputSelection};

const BYTES_PER_MIB: u64 = 1024 * 1024;

// Serde default functions
fn default_output_name() -> String {
    "output.pdf".to_string()
}

const fn default_max_size_mb() -> u64 {
    10
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Output document file name (".pdf" is appended if missing)
    #[serde(default = "default_output_name")]
    pub output_name: String,

    /// Output directory (defaults to the current directory)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Rewrite the document when it is larger than this many MiB
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,

    /// Wrap the document in a ZIP archive
    #[serde(default)]
    pub archive: bool,

    /// Name of the document inside the archive (defaults to the document's file name)
    #[serde(default)]
    pub archive_name: Option<String>,

    /// Target page size
    #[serde(default)]
    pub page_size: PageSize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_name: default_output_name(),
            output_dir: None,
            max_size_mb: default_max_size_mb(),
            archive: false,
            archive_name: None,
            page_size: PageSize::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML, e.g. to show the effective configuration
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigLoad(format!("Failed to serialize config: {e}")))
    }

    /// Load from default locations (~/.config/img2pdf/config.toml, ./img2pdf.toml)
    pub fn load() -> Self {
        // Try user config
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("img2pdf").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // Try local config
        let local_config = PathBuf::from("img2pdf.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./img2pdf.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./img2pdf.toml: {}", e);
                }
            }
        }

        // Return defaults
        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Check field values that serde cannot
    pub fn validate(&self) -> Result<()> {
        let name = self.output_name.trim();
        if name.is_empty() {
            return Err(Error::ConfigInvalid {
                field: "output_name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if Path::new(name).file_name().is_none_or(|f| f != name) {
            return Err(Error::ConfigInvalid {
                field: "output_name".to_string(),
                reason: format!("'{name}' is not a plain file name, use output_dir for directories"),
            });
        }
        if self.archive_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(Error::ConfigInvalid {
                field: "archive_name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Full path of the output document
    pub fn document_path(&self) -> PathBuf {
        let name = self.output_name.trim();
        let file_name = if Path::new(name)
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        {
            name.to_string()
        } else {
            format!("{name}.pdf")
        };

        self.output_dir
            .as_deref()
            .unwrap_or_else(|| Path::new("."))
            .join(file_name)
    }

    /// Size threshold in bytes
    pub const fn size_threshold(&self) -> u64 {
        self.max_size_mb.saturating_mul(BYTES_PER_MIB)
    }

    /// Build the job for one run over `inputs`
    pub fn job(&self, inputs: InputSelection) -> Result<ConversionJob> {
        self.validate()?;

        let document = self.document_path();
        let mut job = ConversionJob::new(inputs, &document)
            .with_page_size(self.page_size)
            .with_size_threshold(self.size_threshold());

        if self.archive {
            let mut request = ArchiveRequest::for_document(&document);
            if let Some(name) = &self.archive_name {
                request.entry_name = name.trim().to_string();
            }
            job = job.with_archive(request);
        }

        Ok(job)
    }
}
