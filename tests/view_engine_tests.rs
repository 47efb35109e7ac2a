//! Tests for the ViewEngine pipeline
//!
//! These tests verify, against views on disk:
//! - Default extension and path resolution
//! - Compile cache reuse and staleness detection
//! - Content-then-layout rendering
//! - Settings get/set contract
//! - HTML helpers and the legacy API shape

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;
use viewengine::deprecate::{self, LEGACY_CONSTRUCTOR};
use viewengine::{EngineOptions, Setting, SettingKey, ViewEngine, ViewError};

fn views() -> TempDir {
    let dir = TempDir::new().expect("temp views directory");
    write(dir.path(), "username.tmpl", "<h1><%= username %></h1>");
    write(dir.path(), "layout.tmpl", "<%- content %>");
    dir
}

fn write(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create view subdirectory");
    }
    fs::write(path, body).expect("write view");
}

fn engine(dir: &TempDir) -> ViewEngine {
    ViewEngine::new(EngineOptions::new().views(dir.path()))
}

// =============================================================================
// include
// =============================================================================

#[test]
fn test_include_escapes_interpolation() {
    let dir = views();
    let mut engine = engine(&dir);
    let content = engine
        .include("username", &json!({ "username": "<JohnSmith>" }))
        .unwrap();
    assert_eq!(content, "<h1>&lt;JohnSmith&gt;</h1>");
}

#[test]
fn test_bare_name_equals_name_with_extension() {
    let dir = views();
    let mut engine = engine(&dir);
    let data = json!({ "username": "a&b" });

    let bare = engine.include("username", &data).unwrap();
    let full = engine.include("username.tmpl", &data).unwrap();
    assert_eq!(bare, full);
    assert_eq!(engine.cache_len(), 1);
}

#[test]
fn test_explicit_extension_is_kept() {
    let dir = views();
    write(dir.path(), "page.html", "<p><%= 1 + 1 %></p>");
    let mut engine = engine(&dir);
    assert_eq!(engine.include("page.html", &json!({})).unwrap(), "<p>2</p>");
}

#[test]
fn test_missing_view_is_io_error() {
    let dir = views();
    let mut engine = engine(&dir);
    let err = engine.include("nope", &json!({})).unwrap_err();
    assert!(matches!(err, ViewError::Io(_)));
}

// =============================================================================
// Cache behaviour
// =============================================================================

#[test]
fn test_unchanged_source_is_not_recompiled() {
    let dir = views();
    let mut engine = engine(&dir);
    let data = json!({ "username": "x" });

    let first_out = engine.include("username", &data).unwrap();
    let first = engine.cached_template("username").unwrap();
    let second_out = engine.include("username", &data).unwrap();
    let second = engine.cached_template("username").unwrap();

    assert_eq!(first_out, second_out);
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_cache_off_picks_up_changes() {
    let dir = views();
    let mut engine = engine(&dir);
    let data = json!({ "username": "x" });

    assert_eq!(engine.include("username", &data).unwrap(), "<h1>x</h1>");
    let before = engine.cached_template("username").unwrap();

    write(dir.path(), "username.tmpl", "<h2><%= username %></h2>");
    assert_eq!(engine.include("username", &data).unwrap(), "<h2>x</h2>");

    let after = engine.cached_template("username").unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.source(), "<h2><%= username %></h2>");
}

#[test]
fn test_cache_on_ignores_changes() {
    let dir = views();
    let mut engine = engine(&dir);
    engine.set(Setting::Cache(true));
    let data = json!({ "username": "x" });

    assert_eq!(engine.include("username", &data).unwrap(), "<h1>x</h1>");
    write(dir.path(), "username.tmpl", "<h2><%= username %></h2>");
    assert_eq!(engine.include("username", &data).unwrap(), "<h1>x</h1>");

    // no file access at all once cached
    fs::remove_file(dir.path().join("username.tmpl")).unwrap();
    assert_eq!(engine.include("username", &data).unwrap(), "<h1>x</h1>");
}

#[test]
fn test_cache_off_reports_deleted_file() {
    let dir = views();
    let mut engine = engine(&dir);
    engine.include("username", &json!({ "username": "x" })).unwrap();

    fs::remove_file(dir.path().join("username.tmpl")).unwrap();
    assert!(matches!(
        engine.include("username", &json!({ "username": "x" })),
        Err(ViewError::Io(_))
    ));
}

#[test]
fn test_broken_edit_keeps_previous_entry() {
    let dir = views();
    let mut engine = engine(&dir);
    engine.include("username", &json!({ "username": "x" })).unwrap();

    write(dir.path(), "username.tmpl", "<h1><%= username </h1>");
    assert!(matches!(
        engine.include("username", &json!({ "username": "x" })),
        Err(ViewError::Compile(_))
    ));
    assert_eq!(
        engine.cached_template("username").unwrap().source(),
        "<h1><%= username %></h1>"
    );
}

// =============================================================================
// render
// =============================================================================

#[test]
fn test_render_wraps_in_layout_escaping_once() {
    let dir = views();
    let mut engine = engine(&dir);
    let out = engine.render("username", &json!({ "username": "<X>" })).unwrap();
    assert_eq!(out, "<h1>&lt;X&gt;</h1>");
}

#[test]
fn test_render_equals_layout_include() {
    let dir = views();
    write(
        dir.path(),
        "main.tmpl",
        "<html><%- content %><footer><%= data.username %></footer></html>",
    );
    let mut engine = engine(&dir);
    engine.set(Setting::Layout("main".into()));

    let data = json!({ "username": "Ann" });
    let rendered = engine.render("username", &data).unwrap();

    let content = engine.include("username", &data).unwrap();
    let expected = engine
        .include("main", &json!({ "content": content, "data": data }))
        .unwrap();
    assert_eq!(rendered, expected);
    assert_eq!(rendered, "<html><h1>Ann</h1><footer>Ann</footer></html>");
}

#[test]
fn test_render_with_partials() {
    let dir = views();
    write(
        dir.path(),
        "feed.tmpl",
        "<ul><% for post in posts { %><%- this.include('partials/post', { post: post }) %><% } %></ul>",
    );
    write(dir.path(), "partials/post.tmpl", "<li><%= post.title %></li>");
    let mut engine = engine(&dir);

    let out = engine
        .render("feed", &json!({ "posts": [{ "title": "One" }, { "title": "<Two>" }] }))
        .unwrap();
    assert_eq!(out, "<ul><li>One</li><li>&lt;Two&gt;</li></ul>");
}

#[test]
fn test_render_missing_layout_fails() {
    let dir = views();
    let mut engine = engine(&dir);
    engine.set(Setting::Layout("absent".into()));
    assert!(engine.render("username", &json!({ "username": "x" })).is_err());
}

// =============================================================================
// Settings
// =============================================================================

#[test]
fn test_set_get_round_trip() {
    let mut engine = ViewEngine::default();
    engine.set_named("layout", json!("foobar")).unwrap();
    engine.set_named("views", json!("foobaz")).unwrap();
    engine.set_named("cache", json!(true)).unwrap();

    assert_eq!(engine.get_named("layout").unwrap(), json!("foobar"));
    assert_eq!(engine.get_named("views").unwrap(), json!("foobaz"));
    assert_eq!(engine.get_named("cache").unwrap(), json!(true));
    assert_eq!(engine.get(SettingKey::Cache), Setting::Cache(true));
}

#[test]
fn test_unknown_setting_errors() {
    let mut engine = ViewEngine::default();
    let before = engine.settings().clone();

    let err = engine.set_named("unknown", Value::Null).unwrap_err();
    assert!(err.to_string().contains("unknown"));
    assert!(engine.get_named("unknown").is_err());
    assert_eq!(engine.settings(), &before);
}

// =============================================================================
// Helpers and legacy API
// =============================================================================

#[test]
fn test_script_and_link() {
    let engine = ViewEngine::default();
    assert_eq!(engine.script("./a.js"), "<script src=\"./a.js\"></script>");
    assert_eq!(engine.link("./a.css", None), "<link rel=\"stylesheet\" href=\"./a.css\" />");
    assert_eq!(
        engine.link("./a.json", Some("manifest")),
        "<link rel=\"manifest\" href=\"./a.json\" />"
    );
}

#[test]
fn test_legacy_construction_is_equivalent_and_warns_once() {
    let legacy = ViewEngine::legacy(Some("views"), Some("layout"));
    let legacy_again = ViewEngine::legacy(Some("views"), Some("layout"));
    let current = ViewEngine::new(EngineOptions::new().views("views").layout("layout"));

    assert_eq!(legacy.settings(), current.settings());
    assert_eq!(legacy_again.settings(), current.settings());
    assert!(deprecate::has_warned(LEGACY_CONSTRUCTOR));
    assert!(!deprecate::warn_once(LEGACY_CONSTRUCTOR));
}

#[test]
fn test_legacy_template_engine_renders() {
    let dir = views();
    write(dir.path(), "layout.tmpl", "<%- content %>\n");
    let mut engine = viewengine::TemplateEngine::new(dir.path().to_str(), None);
    let out = engine.render("username", &json!({ "username": "\"John\"" })).unwrap();
    assert_eq!(out, "<h1>&#34;John&#34;</h1>\n");
}
