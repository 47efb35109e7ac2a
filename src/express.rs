//! Host framework adapter.
//!
//! Web frameworks that register template engines by file extension expect a
//! single function `(path, data) -> rendered string`. [`express`] is that
//! function: it renders through one process-wide engine created on first use.

use std::sync::{Mutex, OnceLock};

use serde_json::Value;

use crate::engine::ViewEngine;
use crate::error::{Result, ViewError};
use crate::settings::EngineOptions;

/// Views directory of the shared engine; frameworks pass absolute paths
const DEFAULT_ENGINE_VIEWS: &str = ".";

static DEFAULT_ENGINE: OnceLock<Mutex<ViewEngine>> = OnceLock::new();

/// The shared engine behind [`express`], created on first access.
pub fn default_engine() -> &'static Mutex<ViewEngine> {
    DEFAULT_ENGINE.get_or_init(|| {
        tracing::debug!("Creating shared default view engine");
        Mutex::new(ViewEngine::new(
            EngineOptions::new().views(DEFAULT_ENGINE_VIEWS),
        ))
    })
}

/// Render `path` with `data` through the shared engine.
pub fn express(path: &str, data: &Value) -> Result<String> {
    let mut engine = default_engine()
        .lock()
        .map_err(|_| ViewError::state("default view engine lock poisoned"))?;
    engine.include(path, data)
}
