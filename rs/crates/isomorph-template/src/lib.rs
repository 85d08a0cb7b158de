//! isomorph-template — named template sets for both render passes
//!
//! Pages are rendered twice over: once on the server with `{{ }}` / `{% %}`
//! delimiters, and once per mount region with `[[ ]]` / `[% %]`, which the
//! server pass leaves alone. Both passes use the same engine; only the syntax
//! differs.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use minijinja::syntax::SyntaxConfig;
use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior};
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

/// File extensions picked up by [`TemplateSet::load_dir`].
pub const TEMPLATE_EXTENSIONS: &[&str] = &["html", "tmpl"];

/// Renders a named template against a data value.
pub trait TemplateEngine {
    fn render<S: Serialize + ?Sized>(&self, name: &str, data: &S) -> Result<String, TemplateError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template {name} does not parse: {source}")]
    Syntax {
        name: String,
        #[source]
        source: minijinja::Error,
    },
    #[error("template {name} failed: {source}")]
    Execution {
        name: String,
        #[source]
        source: minijinja::Error,
    },
    #[error("no template named {0}")]
    NotFound(String),
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot walk views directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Delimiter convention of a template set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    /// `{{ }}`, `{% %}`, `{# #}`; escaping follows the file extension.
    Server,
    /// `[[ ]]`, `[% %]`, `[# #]`; output is always HTML-escaped.
    Client,
}

impl Syntax {
    fn environment(self) -> Result<Environment<'static>, minijinja::Error> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        if self == Syntax::Client {
            env.set_syntax(
                SyntaxConfig::builder()
                    .block_delimiters("[%", "%]")
                    .variable_delimiters("[[", "]]")
                    .comment_delimiters("[#", "#]")
                    .build()?,
            );
            env.set_auto_escape_callback(|_| AutoEscape::Html);
            env.set_trim_blocks(true);
            env.set_lstrip_blocks(true);
        }
        Ok(env)
    }
}

/// Parsed templates, ready to render. Built once and shared read-only.
#[derive(Debug)]
pub struct TemplateSet {
    syntax: Syntax,
    env: Environment<'static>,
    sources: IndexMap<String, String>,
}

impl TemplateSet {
    pub fn new(syntax: Syntax) -> Result<Self, TemplateError> {
        let env = syntax.environment().map_err(|source| TemplateError::Syntax {
            name: String::new(),
            source,
        })?;
        Ok(Self {
            syntax,
            env,
            sources: IndexMap::new(),
        })
    }

    /// Build a set from `(name, source)` pairs, keeping their order.
    pub fn from_sources<I, N, S>(syntax: Syntax, sources: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let mut set = Self::new(syntax)?;
        for (name, source) in sources {
            set.add(name, source)?;
        }
        Ok(set)
    }

    /// Load every `.html` and `.tmpl` file under `dir`, named by its path
    /// relative to `dir` with `/` separators (`index/index.html`).
    pub fn load_dir(dir: impl AsRef<Path>, syntax: Syntax) -> Result<Self, TemplateError> {
        let dir = dir.as_ref();
        let mut set = Self::new(syntax)?;
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let ext = path.extension().and_then(|s| s.to_str()).unwrap_or_default();
            if !TEMPLATE_EXTENSIONS.contains(&ext) {
                continue;
            }
            let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let rel = path.strip_prefix(dir).unwrap_or(path);
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            set.add(name, source)?;
        }
        debug!(dir = %dir.display(), templates = set.len(), "loaded views");
        Ok(set)
    }

    /// Parse and register one template. A name already present is replaced.
    pub fn add(&mut self, name: impl Into<String>, source: impl Into<String>) -> Result<(), TemplateError> {
        let name = name.into();
        let source = source.into();
        self.env
            .add_template_owned(name.clone(), source.clone())
            .map_err(|source| TemplateError::Syntax {
                name: name.clone(),
                source,
            })?;
        self.sources.insert(name, source);
        Ok(())
    }

    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Template names in the order they were added.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// The first template added; it renders the mount region.
    pub fn entry(&self) -> Option<&str> {
        self.names().next()
    }

    /// Verbatim source of a template.
    pub fn source(&self, name: &str) -> Option<&str> {
        self.sources.get(name).map(String::as_str)
    }
}

impl TemplateEngine for TemplateSet {
    fn render<S: Serialize + ?Sized>(&self, name: &str, data: &S) -> Result<String, TemplateError> {
        let template = self.env.get_template(name).map_err(|err| match err.kind() {
            ErrorKind::TemplateNotFound => TemplateError::NotFound(name.to_string()),
            _ => TemplateError::Syntax {
                name: name.to_string(),
                source: err,
            },
        })?;
        template.render(data).map_err(|source| TemplateError::Execution {
            name: name.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Serialize)]
    struct ListState {
        items: Vec<&'static str>,
    }

    const LIST: &str = "<ul>\n[% for item in items %]\n  <li>[[ item ]]</li>\n[% endfor %]\n</ul>";

    #[test]
    fn test_client_syntax_renders() {
        let set = TemplateSet::from_sources(Syntax::Client, [("list.tmpl", LIST)]).unwrap();
        let out = set.render("list.tmpl", &ListState { items: vec!["a", "<b>"] }).unwrap();
        assert_eq!(out, "<ul>\n  <li>a</li>\n  <li>&lt;b&gt;</li>\n</ul>");
    }

    #[test]
    fn test_client_delimiters_survive_server_pass() {
        let set = TemplateSet::from_sources(
            Syntax::Server,
            [("list.tmpl", "<ul>[% for i in items %]<li>[[ i ]]</li>[% endfor %]</ul>{{ suffix }}")],
        )
        .unwrap();
        #[derive(Serialize)]
        struct Ctx {
            suffix: &'static str,
        }
        let out = set.render("list.tmpl", &Ctx { suffix: "<!-- x -->" }).unwrap();
        assert_eq!(out, "<ul>[% for i in items %]<li>[[ i ]]</li>[% endfor %]</ul><!-- x -->");
    }

    #[test]
    fn test_server_escapes_html_pages() {
        let set = TemplateSet::from_sources(Syntax::Server, [("page.html", "<p>{{ title }}</p>")]).unwrap();
        #[derive(Serialize)]
        struct Ctx {
            title: &'static str,
        }
        let out = set.render("page.html", &Ctx { title: "a & b" }).unwrap();
        assert_eq!(out, "<p>a &amp; b</p>");
    }

    #[test]
    fn test_undefined_is_an_execution_error() {
        let set = TemplateSet::from_sources(Syntax::Client, [("list.tmpl", LIST)]).unwrap();
        #[derive(Serialize)]
        struct Other {
            count: u32,
        }
        let err = set.render("list.tmpl", &Other { count: 1 }).unwrap_err();
        assert!(matches!(err, TemplateError::Execution { .. }), "{err}");
    }

    #[test]
    fn test_bad_source_is_a_syntax_error() {
        let err = TemplateSet::from_sources(Syntax::Client, [("bad.tmpl", "[% for x in %]")]).unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { ref name, .. } if name == "bad.tmpl"), "{err}");
    }

    #[test]
    fn test_unknown_template() {
        let set = TemplateSet::new(Syntax::Server).unwrap();
        let err = set.render("nope.html", &()).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(ref n) if n == "nope.html"));
    }

    #[test]
    fn test_names_keep_insertion_order() {
        let set = TemplateSet::from_sources(Syntax::Client, [("z.tmpl", "z"), ("a.tmpl", "a")]).unwrap();
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["z.tmpl", "a.tmpl"]);
        assert_eq!(set.entry(), Some("z.tmpl"));
        assert_eq!(set.source("a.tmpl"), Some("a"));
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("index")).unwrap();
        std::fs::write(dir.path().join("index/index.html"), "<html>{{ mount }}</html>").unwrap();
        std::fs::write(dir.path().join("index/index.tmpl"), LIST).unwrap();
        std::fs::write(dir.path().join("notes.md"), "not a view").unwrap();

        let set = TemplateSet::load_dir(dir.path(), Syntax::Server).unwrap();
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["index/index.html", "index/index.tmpl"]);
        assert_eq!(set.source("index/index.tmpl"), Some(LIST));
    }
}
