//! EJS-style template compiler.
//!
//! [`compile`] turns template source into a [`Template`], which keeps the
//! source it was built from (the view engine compares it against the file on
//! disk to detect stale cache entries) and renders against a JSON data
//! mapping.
//!
//! # Tags
//!
//! ```text
//! <%= expr %>   HTML-escaped output
//! <%- expr %>   raw output
//! <%# note %>   comment
//! <% code %>    statement
//! ```
//!
//! # Statements
//!
//! ```text
//! <% if user.admin { %> ... <% } else if user { %> ... <% } else { %> ... <% } %>
//! <% for post in posts { %> ... <% } %>
//! <% for (i, post) in posts { %> ... <% } %>
//! <% let title = "Feed: " + user.name %>
//! ```
//!
//! Helper calls such as `include('partials/post', { post })` are forwarded to
//! the [`TemplateHost`] the template is rendered with, and may also be written
//! `this.include(...)`.

mod escape;
mod eval;
mod expr;
mod lexer;
mod parse;

use serde_json::Value;

use crate::error::{CompileError, RenderError, Result};

pub use escape::html_escape;
pub(crate) use eval::type_name;

/// Serves the helper functions a template body can call.
///
/// The view engine implements this so templates can `include` partials,
/// recursing back through the engine's resolve/cache pipeline.
pub trait TemplateHost {
    /// Invoke helper `name` with already evaluated arguments.
    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value>;
}

/// Host for templates rendered outside an engine; every helper call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHelpers;

impl TemplateHost for NoHelpers {
    fn call(&mut self, name: &str, _args: &[Value]) -> Result<Value> {
        Err(RenderError::UnknownFunction {
            name: name.to_string(),
        }
        .into())
    }
}

/// A compiled template together with the source it was compiled from
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    nodes: Vec<parse::Node>,
}

impl Template {
    /// Source text this template was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render with `data` as the variable scope.
    ///
    /// `null` data is treated as an empty mapping.
    pub fn render(&self, data: &Value, host: &mut dyn TemplateHost) -> Result<String> {
        let mut renderer = eval::Renderer::new(data, host);
        renderer.render(&self.nodes)?;
        Ok(renderer.finish())
    }
}

/// Compile template source.
pub fn compile(source: impl Into<String>) -> std::result::Result<Template, CompileError> {
    let source = source.into();
    let nodes = parse::parse(lexer::split(&source)?)?;
    Ok(Template { source, nodes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewError;
    use serde_json::json;

    fn render(src: &str, data: Value) -> Result<String> {
        compile(src)?.render(&data, &mut NoHelpers)
    }

    /// Records helper calls and answers `include` with a marker
    #[derive(Default)]
    struct Recorder {
        calls: Vec<(String, Vec<Value>)>,
    }

    impl TemplateHost for Recorder {
        fn call(&mut self, name: &str, args: &[Value]) -> Result<Value> {
            self.calls.push((name.to_string(), args.to_vec()));
            Ok(Value::String(format!("[{}]", name)))
        }
    }

    #[test]
    fn test_escaped_and_raw_output() {
        let data = json!({ "username": "<X>" });
        assert_eq!(render("<h1><%= username %></h1>", data.clone()).unwrap(), "<h1>&lt;X&gt;</h1>");
        assert_eq!(render("<h1><%- username %></h1>", data).unwrap(), "<h1><X></h1>");
    }

    #[test]
    fn test_source_is_kept() {
        let template = compile("hi <%= name %>").unwrap();
        assert_eq!(template.source(), "hi <%= name %>");
    }

    #[test]
    fn test_loops_and_conditions() {
        let src = "<% for (i, p) in posts { %><% if i > 0 { %>,<% } %><%= p.title %><% } %>";
        let data = json!({ "posts": [{ "title": "a" }, { "title": "b" }, { "title": "c" }] });
        assert_eq!(render(src, data).unwrap(), "a,b,c");
    }

    #[test]
    fn test_object_iteration() {
        let src = "<% for (k, v) in tags { %><%= k %>=<%= v %>;<% } %>";
        let data = json!({ "tags": { "a": 1, "b": 2 } });
        assert_eq!(render(src, data).unwrap(), "a=1;b=2;");
    }

    #[test]
    fn test_else_if_branches() {
        let src = "<% if n == 1 { %>one<% } else if n == 2 { %>two<% } else { %>many<% } %>";
        assert_eq!(render(src, json!({ "n": 1 })).unwrap(), "one");
        assert_eq!(render(src, json!({ "n": 2 })).unwrap(), "two");
        assert_eq!(render(src, json!({ "n": 7 })).unwrap(), "many");
    }

    #[test]
    fn test_let_is_block_scoped() {
        let src = "<% if true { %><% let x = 1 %><%= x %><% } %><%= x %>";
        let err = render(src, json!({})).unwrap_err();
        assert!(matches!(
            err,
            ViewError::Render(RenderError::UndefinedVariable { ref name }) if name == "x"
        ));
    }

    #[test]
    fn test_loop_variable_shadows_data() {
        let src = "<% for item in items { %><%= item %><% } %>|<%= item %>";
        let data = json!({ "item": "outer", "items": ["a", "b"] });
        assert_eq!(render(src, data).unwrap(), "ab|outer");
    }

    #[test]
    fn test_missing_property_renders_empty() {
        assert_eq!(render("[<%= user.nick %>]", json!({ "user": {} })).unwrap(), "[]");
    }

    #[test]
    fn test_null_data_is_empty_mapping() {
        assert_eq!(render("static", Value::Null).unwrap(), "static");
        assert!(render("<%= anything %>", Value::Null).is_err());
    }

    #[test]
    fn test_comments_and_text_preserved() {
        assert_eq!(render("a\n<%# skip %>\nb\n", json!({})).unwrap(), "a\n\nb\n");
    }

    #[test]
    fn test_helper_calls_reach_host() {
        let template = compile("<%- this.include('partials/post', { post: p }) %><% script('a.js') %>").unwrap();
        let mut host = Recorder::default();
        let out = template.render(&json!({ "p": 1 }), &mut host).unwrap();

        assert_eq!(out, "[include]");
        assert_eq!(host.calls.len(), 2);
        assert_eq!(host.calls[0].0, "include");
        assert_eq!(host.calls[0].1, vec![json!("partials/post"), json!({ "post": 1 })]);
        assert_eq!(host.calls[1].0, "script");
    }

    #[test]
    fn test_helpers_fail_without_host() {
        let err = render("<%= include('x') %>", json!({})).unwrap_err();
        assert!(matches!(err, ViewError::Render(RenderError::UnknownFunction { .. })));
    }

    #[test]
    fn test_compile_errors() {
        assert!(compile("<%= %>").is_err());
        assert!(compile("<% if { %><% } %>").is_err());
        assert!(compile("<%= a +").is_err());
        assert!(compile("<% for x of xs { %><% } %>").is_err());
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(render("<%= name || 'anonymous' %>", json!({ "name": "" })).unwrap(), "anonymous");
        assert_eq!(render("<%= a && b %>", json!({ "a": 1, "b": "yes" })).unwrap(), "yes");
        assert_eq!(render("<%= !a %>", json!({ "a": 0 })).unwrap(), "true");
    }
}
