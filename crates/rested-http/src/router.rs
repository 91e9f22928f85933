//! Route resolution.
//!
//! The mux only depends on the [`Router`] trait. [`PatternRouter`] is a small
//! implementation matching path patterns with `{name}` and `{name:regex}`
//! variables:
//!
//! ```
//! use rested_http::endpoint::Endpoint;
//! use rested_http::router::PatternRouter;
//!
//! let router = PatternRouter::new()
//!     .with_route("/people/{id:[0-9]+}", Endpoint::new())
//!     .expect("valid pattern");
//! assert_eq!(router.len(), 1);
//! ```

use std::sync::Arc;

use http::request::Parts;
use percent_encoding::percent_decode_str;
use regex::Regex;
use tracing::debug;

use crate::context::RouteVars;
use crate::endpoint::Endpoint;

/// Errors raised while registering a route.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// The pattern has unbalanced braces or an unnamed variable.
    #[error("invalid route pattern {pattern}: {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A variable's regular expression does not compile.
    #[error("invalid route regex: {0}")]
    Regex(#[from] regex::Error),
}

/// A resolved route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The endpoint bound to the route.
    pub endpoint: Arc<Endpoint>,
    /// Variables captured from the path, percent-decoded.
    pub vars: RouteVars,
}

/// Maps a request to an endpoint.
pub trait Router: Send + Sync {
    /// Resolve `request`, or `None` when nothing is registered for it.
    fn resolve(&self, request: &Parts) -> Option<RouteMatch>;
}

#[derive(Debug)]
struct Route {
    pattern: String,
    regex: Regex,
    names: Vec<String>,
    endpoint: Arc<Endpoint>,
}

/// A router matching request paths against patterns in registration order.
#[derive(Debug, Default)]
pub struct PatternRouter {
    routes: Vec<Route>,
}

impl PatternRouter {
    /// An empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `endpoint` under `pattern`.
    ///
    /// # Errors
    ///
    /// [`RouteError`] when the pattern cannot be compiled.
    pub fn add(&mut self, pattern: &str, endpoint: Endpoint) -> Result<&mut Self, RouteError> {
        let (regex, names) = compile_pattern(pattern)?;
        self.routes.push(Route {
            pattern: pattern.to_owned(),
            regex,
            names,
            endpoint: Arc::new(endpoint),
        });
        Ok(self)
    }

    /// Builder form of [`add`](Self::add).
    ///
    /// # Errors
    ///
    /// [`RouteError`] when the pattern cannot be compiled.
    pub fn with_route(mut self, pattern: &str, endpoint: Endpoint) -> Result<Self, RouteError> {
        self.add(pattern, endpoint)?;
        Ok(self)
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Router for PatternRouter {
    fn resolve(&self, request: &Parts) -> Option<RouteMatch> {
        let path = request.uri.path();
        self.routes.iter().find_map(|route| {
            let captures = route.regex.captures(path)?;
            let vars: RouteVars = route
                .names
                .iter()
                .enumerate()
                .filter_map(|(i, name)| {
                    let raw = captures.get(i + 1)?.as_str();
                    Some((name.clone(), percent_decode_str(raw).decode_utf8_lossy().into_owned()))
                })
                .collect();
            debug!(pattern = %route.pattern, path, "route matched");
            Some(RouteMatch {
                endpoint: Arc::clone(&route.endpoint),
                vars,
            })
        })
    }
}

/// Translate a route pattern into an anchored regex plus the variable names
/// in capture order.
fn compile_pattern(pattern: &str) -> Result<(Regex, Vec<String>), RouteError> {
    let invalid = |reason| RouteError::InvalidPattern {
        pattern: pattern.to_owned(),
        reason,
    };

    let mut source = String::from("^");
    let mut names = Vec::new();
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        source.push_str(&regex::escape(&rest[..open]));
        let after = &rest[open + 1..];

        // Variable bodies may contain regex quantifiers such as `{2,4}`.
        let mut depth = 1_usize;
        let mut close = None;
        for (i, c) in after.char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let close = close.ok_or_else(|| invalid("unclosed variable"))?;
        let body = &after[..close];

        let (name, expr) = body.split_once(':').unwrap_or((body, "[^/]+"));
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid("unnamed variable"));
        }
        names.push(name.to_owned());
        source.push('(');
        source.push_str(expr);
        source.push(')');

        rest = &after[close + 1..];
    }
    if rest.contains('}') {
        return Err(invalid("unbalanced braces"));
    }
    source.push_str(&regex::escape(rest));
    source.push('$');

    Ok((Regex::new(&source)?, names))
}
