use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

use crate::settings::EngineOptions;

/// viewengine - render EJS-style views wrapped in a layout
#[derive(Parser, Debug)]
#[command(name = "viewengine")]
#[command(about = "Render EJS-style view templates wrapped in a layout")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file: { "settings": { "views", "layout", "cache" } }
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Views directory (overrides the configuration file)
    #[arg(long, global = true)]
    pub views: Option<PathBuf>,

    /// Layout template name (overrides the configuration file)
    #[arg(long, global = true)]
    pub layout: Option<String>,

    /// Keep compiled templates without re-reading their files
    #[arg(long, global = true)]
    pub cache: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a view and print it to stdout
    Render {
        /// Template name, resolved against the views directory
        name: String,

        /// JSON file with the data to render with
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Inline JSON data
        #[arg(long, conflicts_with = "data")]
        json: Option<String>,

        /// Skip the layout and print the view alone
        #[arg(long)]
        bare: bool,
    },
    /// Compile templates and report syntax errors
    Check {
        /// Template names to compile
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Print the effective settings as JSON
    Settings,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Options from the configuration file with command line overrides applied
    pub fn engine_options(&self) -> Result<EngineOptions> {
        let mut options = match &self.config {
            Some(path) => EngineOptions::load_from_file(path)?,
            None => EngineOptions::new(),
        };
        if let Some(views) = &self.views {
            options = options.views(views.clone());
        }
        if let Some(layout) = &self.layout {
            options = options.layout(layout.clone());
        }
        if self.cache {
            options = options.cache(true);
        }
        options.validate()?;
        Ok(options)
    }
}

/// Data for `render` from `--data FILE` or `--json TEXT`; empty mapping otherwise
pub fn load_data(data: Option<&PathBuf>, json: Option<&str>) -> Result<Value> {
    if let Some(path) = data {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read data from {:?}", path))?;
        return serde_json::from_str(&content).context("Failed to parse data JSON");
    }
    if let Some(json) = json {
        return serde_json::from_str(json).context("Failed to parse inline data JSON");
    }
    Ok(Value::Object(Default::default()))
}
