//! Engine settings.
//!
//! The engine recognizes exactly three settings: `layout`, `views` and
//! `cache`. Inside the crate they are a closed enum ([`SettingKey`]) so that
//! `get`/`set` are exhaustive; free-form names coming from callers are parsed
//! at the boundary by [`SettingKey::from_name`], which rejects anything else.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::deprecate;
use crate::error::{Result, ViewError};

/// Default layout template name
pub const DEFAULT_LAYOUT: &str = "layout";

/// Default views directory
pub const DEFAULT_VIEWS: &str = "views";

/// Name of a recognized setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum SettingKey {
    /// Template rendered around every `render` result
    Layout,
    /// Directory template names are resolved against
    Views,
    /// When true, compiled templates are never re-validated against disk
    Cache,
}

impl SettingKey {
    /// Parse a setting name, accepting the deprecated `folder` alias of `views`.
    pub fn from_name(name: &str) -> Result<Self> {
        if name == "folder" {
            deprecate::warn_once(deprecate::FOLDER_SETTING);
            return Ok(Self::Views);
        }
        name.parse().map_err(|_| ViewError::invalid_setting(name))
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A setting together with its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    Layout(String),
    Views(PathBuf),
    Cache(bool),
}

impl Setting {
    pub fn key(&self) -> SettingKey {
        match self {
            Self::Layout(_) => SettingKey::Layout,
            Self::Views(_) => SettingKey::Views,
            Self::Cache(_) => SettingKey::Cache,
        }
    }

    /// Build a setting from a JSON value, checking the value type.
    pub fn from_json(key: SettingKey, value: Value) -> Result<Self> {
        match (key, value) {
            (SettingKey::Layout, Value::String(layout)) => Ok(Self::Layout(layout)),
            (SettingKey::Views, Value::String(views)) => Ok(Self::Views(PathBuf::from(views))),
            (SettingKey::Cache, Value::Bool(cache)) => Ok(Self::Cache(cache)),
            (key, _) => Err(ViewError::InvalidSettingValue {
                key: key.to_string(),
                expected: match key {
                    SettingKey::Layout | SettingKey::Views => "a string",
                    SettingKey::Cache => "a boolean",
                },
            }),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Layout(layout) => Value::String(layout.clone()),
            Self::Views(views) => Value::String(views.to_string_lossy().into_owned()),
            Self::Cache(cache) => Value::Bool(*cache),
        }
    }
}

/// Current settings of one engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub layout: String,
    pub views: PathBuf,
    pub cache: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            layout: DEFAULT_LAYOUT.to_string(),
            views: PathBuf::from(DEFAULT_VIEWS),
            cache: false,
        }
    }
}

impl Settings {
    pub fn get(&self, key: SettingKey) -> Setting {
        match key {
            SettingKey::Layout => Setting::Layout(self.layout.clone()),
            SettingKey::Views => Setting::Views(self.views.clone()),
            SettingKey::Cache => Setting::Cache(self.cache),
        }
    }

    pub fn set(&mut self, setting: Setting) {
        match setting {
            Setting::Layout(layout) => self.layout = layout,
            Setting::Views(views) => self.views = views,
            Setting::Cache(cache) => self.cache = cache,
        }
    }

    /// Overwrite the fields present in `patch`, keeping the rest.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(folder) = patch.folder {
            deprecate::warn_once(deprecate::FOLDER_SETTING);
            if patch.views.is_none() {
                self.views = folder;
            }
        }
        if let Some(layout) = patch.layout {
            self.layout = layout;
        }
        if let Some(views) = patch.views {
            self.views = views;
        }
        if let Some(cache) = patch.cache {
            self.cache = cache;
        }
    }
}

/// Partial settings supplied at construction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<PathBuf>,
    /// Deprecated alias of `views`
    #[serde(default, skip_serializing)]
    pub folder: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<bool>,
}

/// Options accepted by [`ViewEngine::new`](crate::ViewEngine::new)
///
/// Mirrors the `{ "settings": { ... } }` object form, so it can be built in
/// code or deserialized from a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineOptions {
    #[serde(default)]
    pub settings: SettingsPatch,
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.settings.layout = Some(layout.into());
        self
    }

    pub fn views(mut self, views: impl Into<PathBuf>) -> Self {
        self.settings.views = Some(views.into());
        self
    }

    pub fn cache(mut self, cache: bool) -> Self {
        self.settings.cache = Some(cache);
        self
    }

    /// Settings these options produce when applied over the defaults
    pub fn to_settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.apply(self.settings.clone());
        settings
    }
}
