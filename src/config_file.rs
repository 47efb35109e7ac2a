//! Loading engine options from a JSON configuration file.
//!
//! The file has the same shape as [`EngineOptions`]:
//!
//! ```json
//! { "settings": { "views": "site/views", "layout": "main", "cache": true } }
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::settings::EngineOptions;

impl EngineOptions {
    /// Load options from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let options: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(options)
    }

    /// Save options to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if let Some(layout) = &self.settings.layout {
            if layout.trim().is_empty() {
                anyhow::bail!("Layout name must not be empty");
            }
        }

        let views = self.settings.views.as_ref().or(self.settings.folder.as_ref());
        if let Some(views) = views {
            if views.as_os_str().is_empty() {
                anyhow::bail!("Views directory must not be empty");
            }
        }

        Ok(())
    }
}
