//! Compatibility layer for the older engine API.
//!
//! Older callers constructed a `TemplateEngine` with positional
//! `(folder, layout)` arguments and called the views directory setting
//! `folder`. Those shapes keep working through the adapters below, which
//! forward to [`ViewEngine`] and log a deprecation warning the first time each
//! distinct message is produced in the process.

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;

use crate::engine::ViewEngine;
use crate::error::Result;
use crate::settings::{EngineOptions, Settings};

pub const LEGACY_CONSTRUCTOR: &str =
    "ViewEngine::legacy(folder, layout) is deprecated, use ViewEngine::new(EngineOptions) instead";

pub const TEMPLATE_ENGINE: &str =
    "TemplateEngine is deprecated, use ViewEngine instead";

pub const FOLDER_SETTING: &str =
    "the `folder` setting is deprecated, use `views` instead";

/// Messages already logged by [`warn_once`], for the life of the process
static WARNED: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

fn warned() -> &'static Mutex<HashSet<String>> {
    WARNED.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Log `message` as a warning unless it was already logged.
///
/// Returns whether the warning was emitted by this call.
pub fn warn_once(message: &str) -> bool {
    // A poisoned set is still a valid set of strings
    let mut seen = warned().lock().unwrap_or_else(|e| e.into_inner());
    if seen.contains(message) {
        return false;
    }
    seen.insert(message.to_string());
    tracing::warn!("{}", message);
    true
}

/// Whether `message` has been logged by [`warn_once`]
pub fn has_warned(message: &str) -> bool {
    warned()
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .contains(message)
}

fn legacy_options(folder: Option<&str>, layout: Option<&str>) -> EngineOptions {
    let mut options = EngineOptions::new();
    if let Some(folder) = folder.filter(|f| !f.is_empty()) {
        options = options.views(folder);
    }
    if let Some(layout) = layout.filter(|l| !l.is_empty()) {
        options = options.layout(layout);
    }
    options
}

impl ViewEngine {
    /// Positional constructor kept for older callers.
    ///
    /// Equivalent to `ViewEngine::new(EngineOptions::new().views(folder).layout(layout))`;
    /// missing or empty arguments keep their defaults.
    pub fn legacy(folder: Option<&str>, layout: Option<&str>) -> Self {
        warn_once(LEGACY_CONSTRUCTOR);
        Self::new(legacy_options(folder, layout))
    }
}

/// The engine type older callers used; every method forwards to [`ViewEngine`].
#[derive(Debug)]
pub struct TemplateEngine {
    inner: ViewEngine,
}

impl TemplateEngine {
    pub fn new(folder: Option<&str>, layout: Option<&str>) -> Self {
        warn_once(TEMPLATE_ENGINE);
        Self {
            inner: ViewEngine::new(legacy_options(folder, layout)),
        }
    }

    pub fn include(&mut self, path: &str, data: &Value) -> Result<String> {
        self.inner.include(path, data)
    }

    pub fn render(&mut self, path: &str, data: &Value) -> Result<String> {
        self.inner.render(path, data)
    }

    pub fn script(&self, src: &str) -> String {
        self.inner.script(src)
    }

    pub fn link(&self, href: &str, rel: Option<&str>) -> String {
        self.inner.link(href, rel)
    }

    /// Chaining setter taking a setting name, as the old API did
    pub fn set(&mut self, name: &str, value: Value) -> Result<&mut Self> {
        self.inner.set_named(name, value)?;
        Ok(self)
    }

    pub fn settings(&self) -> &Settings {
        self.inner.settings()
    }

    /// Unwrap into the current engine type
    pub fn into_inner(self) -> ViewEngine {
        self.inner
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new(None, None)
    }
}
