//! Ordered route table.
//!
//! Routes are scanned in registration order and the first full match wins;
//! there is no specificity ranking, so a broad pattern registered early
//! shadows a narrower one registered later. Patterns are plain paths with
//! two placeholder kinds:
//!
//! - `{id}`: a digit sequence (may be empty)
//! - `{slug}`: word characters plus `+` and `-` (may be empty)
//!
//! Each placeholder becomes one capture group; a match hands the captured
//! substrings to the controller as positional params, in pattern order.

use std::path::PathBuf;

use regex::Regex;

use crate::controller::Params;

/// What a matched route resolves to.
#[derive(Debug)]
pub enum RouteTarget {
    /// Instantiate `controller` from the registry and invoke `action`.
    Controller { controller: String, action: String },
    /// Return the content of a static file verbatim, no controller involved.
    File { path: PathBuf },
}

struct Route {
    pattern: String,
    regex: Regex,
    target: RouteTarget,
}

/// The application route table.
///
/// Build it once at startup; registration order is match order. Each
/// registration call returns `self` so the table chains naturally:
///
/// ```rust
/// use plinth::RouteTable;
///
/// RouteTable::new()
///     .route("/", "pages", "index")
///     .route("/users", "users", "list")
///     .route("/users/edit/{id}", "users", "edit");
/// ```
pub struct RouteTable {
    routes: Vec<Route>,
}

/// A successful match: the route's target plus the captured params.
pub struct RouteMatch<'a> {
    pub target: &'a RouteTarget,
    pub params: Params,
}

impl RouteTable {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Register a controller route. Returns `self` for chaining.
    ///
    /// # Panics
    ///
    /// Panics if the pattern does not compile. Registration happens at
    /// startup, so a bad pattern fails the process before it serves anything.
    pub fn route(self, pattern: &str, controller: &str, action: &str) -> Self {
        self.add(
            pattern,
            RouteTarget::Controller {
                controller: controller.to_owned(),
                action: action.to_owned(),
            },
        )
    }

    /// Register a static-file route. The file is read per request and its
    /// content returned verbatim.
    pub fn file(self, pattern: &str, path: impl Into<PathBuf>) -> Self {
        self.add(pattern, RouteTarget::File { path: path.into() })
    }

    fn add(mut self, pattern: &str, target: RouteTarget) -> Self {
        let regex = compile(pattern)
            .unwrap_or_else(|e| panic!("invalid route `{pattern}`: {e}"));
        self.routes.push(Route {
            pattern: pattern.to_owned(),
            regex,
            target,
        });
        self
    }

    /// Match `path` against the table, first match wins.
    ///
    /// Returns `None` when nothing across the whole table matches.
    pub fn detect(&self, path: &str) -> Option<RouteMatch<'_>> {
        for route in &self.routes {
            if let Some(caps) = route.regex.captures(path) {
                let params = Params::new(
                    caps.iter()
                        .skip(1) // group 0 is the whole match
                        .map(|c| c.map_or(String::new(), |m| m.as_str().to_owned()))
                        .collect(),
                );
                tracing::debug!(pattern = %route.pattern, %path, "route matched");
                return Some(RouteMatch {
                    target: &route.target,
                    params,
                });
            }
        }
        None
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile a route pattern to an anchored regex.
///
/// Literal chunks are escaped; `{id}` and `{slug}` become capture groups.
/// Anything else in braces is not a placeholder and matches literally.
fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    let mut src = String::with_capacity(pattern.len() + 8);
    src.push('^');

    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        let (literal, tail) = rest.split_at(open);
        src.push_str(&regex::escape(literal));
        match tail.find('}') {
            Some(close) => {
                match &tail[..=close] {
                    "{id}" => src.push_str(r"(\d*)"),
                    "{slug}" => src.push_str(r"([\w+-]*)"),
                    other => src.push_str(&regex::escape(other)),
                }
                rest = &tail[close + 1..];
            }
            None => {
                // Unbalanced brace: the remainder is literal.
                src.push_str(&regex::escape(tail));
                rest = "";
            }
        }
    }
    src.push_str(&regex::escape(rest));
    src.push('$');

    Regex::new(&src)
}
