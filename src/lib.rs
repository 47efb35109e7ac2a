//! viewengine library
//!
//! Resolves template names against a views directory, compiles EJS-style
//! templates on first use, caches them by resolved path and renders pages
//! wrapped in a layout template.

pub mod cli;
pub mod config_file;
pub mod deprecate;
pub mod engine;
pub mod error;
pub mod express;
pub mod settings;
pub mod template;

// Re-export main types for convenience
pub use deprecate::{TemplateEngine, warn_once};
pub use engine::{DEFAULT_EXTENSION, MAX_INCLUDE_DEPTH, ViewEngine};
pub use error::{CompileError, RenderError, Result, ViewError};
pub use express::express;
pub use settings::{EngineOptions, Setting, SettingKey, Settings, SettingsPatch};
pub use template::{Template, TemplateHost, compile};
