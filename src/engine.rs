//! The view engine: resolve → compile-or-reuse → render → wrap in layout.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{RenderError, Result, ViewError};
use crate::settings::{EngineOptions, Setting, SettingKey, Settings};
use crate::template::{self, Template, TemplateHost};

/// Extension appended to template names that have none
pub const DEFAULT_EXTENSION: &str = "tmpl";

/// Nested `include` calls allowed before rendering fails
pub const MAX_INCLUDE_DEPTH: usize = 64;

/// Resolves, compiles, caches and renders templates from a views directory.
///
/// ```no_run
/// use serde_json::json;
/// use viewengine::{EngineOptions, ViewEngine};
///
/// let mut engine = ViewEngine::new(EngineOptions::new().views("views"));
/// let page = engine.render("feed", &json!({ "posts": [] }))?;
/// # Ok::<(), viewengine::ViewError>(())
/// ```
#[derive(Debug, Default)]
pub struct ViewEngine {
    settings: Settings,
    /// Compiled templates keyed by resolved absolute path
    cache: HashMap<PathBuf, Arc<Template>>,
    depth: usize,
}

impl ViewEngine {
    /// Create an engine with `options` merged over the default settings.
    pub fn new(options: EngineOptions) -> Self {
        Self {
            settings: options.to_settings(),
            cache: HashMap::new(),
            depth: 0,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Render template `path` with `data`.
    ///
    /// `path` gets the default extension when it has none and is resolved
    /// against the views directory. The compiled template is cached by the
    /// resolved path; with the `cache` setting off, every call re-reads the
    /// file and recompiles only if its text changed.
    pub fn include(&mut self, path: &str, data: &Value) -> Result<String> {
        let resolved = self.resolve(path)?;
        let template = self.load(&resolved)?;

        if self.depth >= MAX_INCLUDE_DEPTH {
            return Err(ViewError::IncludeDepth {
                limit: MAX_INCLUDE_DEPTH,
            });
        }
        self.depth += 1;
        let rendered = template.render(data, self);
        self.depth -= 1;
        rendered
    }

    /// Render `path`, then the layout template with the result as `content`
    /// and the original data as `data`.
    pub fn render(&mut self, path: &str, data: &Value) -> Result<String> {
        let data = if data.is_null() {
            Value::Object(Map::new())
        } else {
            data.clone()
        };
        let content = self.include(path, &data)?;

        let mut wrapper = Map::new();
        wrapper.insert("content".to_string(), Value::String(content));
        wrapper.insert("data".to_string(), data);

        let layout = self.settings.layout.clone();
        self.include(&layout, &Value::Object(wrapper))
    }

    /// Change a setting. Returns the engine for chaining.
    pub fn set(&mut self, setting: Setting) -> &mut Self {
        debug!("Setting {} = {}", setting.key(), setting.to_json());
        self.settings.set(setting);
        self
    }

    pub fn get(&self, key: SettingKey) -> Setting {
        self.settings.get(key)
    }

    /// Change a setting by name; unknown names fail and leave settings untouched.
    pub fn set_named(&mut self, name: &str, value: Value) -> Result<&mut Self> {
        let setting = Setting::from_json(SettingKey::from_name(name)?, value)?;
        Ok(self.set(setting))
    }

    /// Read a setting by name as JSON.
    pub fn get_named(&self, name: &str) -> Result<Value> {
        Ok(self.get(SettingKey::from_name(name)?).to_json())
    }

    /// `<script>` tag for `src`. The input is not escaped.
    pub fn script(&self, src: &str) -> String {
        format!("<script src=\"{}\"></script>", src)
    }

    /// `<link>` tag for `href`, `rel` defaulting to `stylesheet`. Inputs are not escaped.
    pub fn link(&self, href: &str, rel: Option<&str>) -> String {
        format!(
            "<link rel=\"{}\" href=\"{}\" />",
            rel.unwrap_or("stylesheet"),
            href
        )
    }

    /// Absolute path a template name resolves to.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let file = if Path::new(path).extension().is_none() {
            format!("{}.{}", path, DEFAULT_EXTENSION)
        } else {
            path.to_string()
        };
        Ok(resolve_path(&self.settings.views, Path::new(&file))?)
    }

    /// Compile template `path` without rendering it, going through the cache.
    pub fn compile(&mut self, path: &str) -> Result<Arc<Template>> {
        let resolved = self.resolve(path)?;
        self.load(&resolved)
    }

    /// Compiled template cached for a template name, if any
    pub fn cached_template(&self, path: &str) -> Option<Arc<Template>> {
        let resolved = self.resolve(path).ok()?;
        self.cache.get(&resolved).cloned()
    }

    pub fn is_cached(&self, path: &str) -> bool {
        self.cached_template(path).is_some()
    }

    /// Number of compiled templates held
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop every compiled template
    pub fn clear_cache(&mut self) {
        debug!("Clearing {} cached template(s)", self.cache.len());
        self.cache.clear();
    }

    /// Compile `path`, or reuse its cache entry when still valid.
    fn load(&mut self, path: &Path) -> Result<Arc<Template>> {
        let Some(cached) = self.cache.get(path).cloned() else {
            debug!("Compiling template {:?}", path);
            return self.compile_into_cache(path, fs::read_to_string(path)?);
        };

        if self.settings.cache {
            debug!("Reusing cached template {:?}", path);
            return Ok(cached);
        }

        let source = fs::read_to_string(path)?;
        if cached.source() == source {
            debug!("Template {:?} unchanged, reusing cached copy", path);
            Ok(cached)
        } else {
            debug!("Template {:?} changed on disk, recompiling", path);
            self.compile_into_cache(path, source)
        }
    }

    fn compile_into_cache(&mut self, path: &Path, source: String) -> Result<Arc<Template>> {
        let template = Arc::new(template::compile(source)?);
        self.cache.insert(path.to_path_buf(), Arc::clone(&template));
        Ok(template)
    }
}

/// Helpers callable from template bodies, also as `this.NAME(...)`
impl TemplateHost for ViewEngine {
    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        match name {
            "include" => {
                let path = string_arg("include", args, 0)?;
                let data = args.get(1).cloned().unwrap_or(Value::Null);
                Ok(Value::String(self.include(&path, &data)?))
            }
            "script" => {
                let src = string_arg("script", args, 0)?;
                Ok(Value::String(self.script(&src)))
            }
            "link" => {
                let href = string_arg("link", args, 0)?;
                let rel = match args.get(1) {
                    None | Some(Value::Null) => None,
                    Some(_) => Some(string_arg("link", args, 1)?),
                };
                Ok(Value::String(self.link(&href, rel.as_deref())))
            }
            _ => Err(RenderError::UnknownFunction {
                name: name.to_string(),
            }
            .into()),
        }
    }
}

fn string_arg(function: &'static str, args: &[Value], index: usize) -> Result<String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        other => Err(RenderError::InvalidArgument {
            function,
            reason: format!(
                "argument {} must be a string, got {}",
                index + 1,
                other.map(crate::template::type_name).unwrap_or("nothing")
            ),
        }
        .into()),
    }
}

/// `base.join(path)` made absolute against the working directory, with `.`
/// and `..` removed lexically. An absolute `path` ignores `base`.
fn resolve_path(base: &Path, path: &Path) -> io::Result<PathBuf> {
    let joined = base.join(path);
    let absolute = if joined.is_absolute() {
        joined
    } else {
        std::env::current_dir()?.join(joined)
    };

    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    Ok(resolved)
}
