//! Two-pass view renderer.
//!
//! Pass one reads the named template and substitutes `{{ name }}`
//! placeholders from the variable map. Pass two reads the layout template
//! and substitutes the same variables plus `content`, which is bound to the
//! output of pass one. A variable no template defines renders empty rather
//! than failing; templates are presentation, not validation.
//!
//! ```text
//! templates/
//! ├── layouts/main.html      «html…{{ content }}…»
//! └── users/list.html        «<ul>{{ rows }}</ul>»
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::ViewConfig;
use crate::error::Error;

/// The variable the layout pass binds the rendered view output to.
const CONTENT_VAR: &str = "content";

/// Renders templates from a directory, wrapping them in a layout.
pub struct View {
    dir: PathBuf,
    layout: Option<String>,
}

impl View {
    /// A renderer rooted at `dir` with the default `layouts/main.html` layout.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            layout: Some("layouts/main.html".to_owned()),
        }
    }

    pub fn from_config(config: &ViewConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            layout: config.layout.clone(),
        }
    }

    /// Replace the layout template (relative to the template root).
    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    /// Skip the layout pass; `render` returns the bare view output.
    pub fn without_layout(mut self) -> Self {
        self.layout = None;
        self
    }

    /// Render `template` with `vars`, then wrap it in the layout.
    pub fn render(&self, template: &str, vars: &[(&str, String)]) -> Result<String, Error> {
        let body = self.render_file(template, vars, None)?;
        match &self.layout {
            Some(layout) => self.render_file(layout, vars, Some(&body)),
            None => Ok(body),
        }
    }

    fn render_file(
        &self,
        name: &str,
        vars: &[(&str, String)],
        content: Option<&str>,
    ) -> Result<String, Error> {
        let source = fs::read_to_string(self.dir.join(name)).map_err(|source| Error::Template {
            name: name.to_owned(),
            source,
        })?;
        Ok(substitute(&source, vars, content))
    }
}

fn substitute(source: &str, vars: &[(&str, String)], content: Option<&str>) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let placeholder = PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid regex"));

    placeholder
        .replace_all(source, |caps: &regex::Captures<'_>| {
            let key = &caps[1];
            if key == CONTENT_VAR {
                if let Some(body) = content {
                    return body.to_owned();
                }
            }
            vars.iter()
                .find(|(k, _)| *k == key)
                .map_or_else(String::new, |(_, v)| v.clone())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, View) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("layouts")).unwrap();
        fs::write(
            dir.path().join("layouts/main.html"),
            "<html><title>{{ title }}</title><body>{{ content }}</body></html>",
        )
        .unwrap();
        fs::write(dir.path().join("hello.html"), "Hello, {{ name }}!").unwrap();
        let view = View::new(dir.path());
        (dir, view)
    }

    #[test]
    fn view_output_lands_in_the_layout() {
        let (_dir, view) = fixture();
        let out = view
            .render(
                "hello.html",
                &[("name", "ada".to_owned()), ("title", "greet".to_owned())],
            )
            .unwrap();
        assert_eq!(
            out,
            "<html><title>greet</title><body>Hello, ada!</body></html>"
        );
    }

    #[test]
    fn missing_variables_render_empty() {
        let (_dir, view) = fixture();
        let out = view.render("hello.html", &[]).unwrap();
        assert_eq!(out, "<html><title></title><body>Hello, !</body></html>");
    }

    #[test]
    fn without_layout_skips_the_second_pass() {
        let (_dir, view) = fixture();
        let out = view
            .without_layout()
            .render("hello.html", &[("name", "ada".to_owned())])
            .unwrap();
        assert_eq!(out, "Hello, ada!");
    }

    #[test]
    fn missing_template_is_an_error() {
        let (_dir, view) = fixture();
        let err = view.render("nope.html", &[]).unwrap_err();
        assert!(matches!(err, Error::Template { .. }));
    }

    #[test]
    fn placeholder_spacing_is_flexible() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("t.html"), "{{x}} {{  x  }}").unwrap();
        let view = View::new(dir.path()).without_layout();
        let out = view.render("t.html", &[("x", "1".to_owned())]).unwrap();
        assert_eq!(out, "1 1");
    }
}
