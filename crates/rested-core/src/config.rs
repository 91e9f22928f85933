//! Dispatcher configuration.
//!
//! [`MuxConfig`] holds the settings shared by every request a mux serves.
//! Values can be built in code or loaded from `RESTED_*` environment
//! variables.

use serde::{Deserialize, Serialize};
use tracing::warn;
use typed_builder::TypedBuilder;

use crate::compression::DEFAULT_COMPRESSION_THRESHOLD;
use crate::cors::CorsPreset;

/// Mux configuration.
///
/// # Examples
///
/// ```
/// use rested_core::config::MuxConfig;
///
/// let config = MuxConfig::default();
/// assert!(!config.debug);
/// assert_eq!(config.compression_threshold, 860);
/// assert!(config.cors.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct MuxConfig {
    /// Expose fault details and capture stacks of recovered panics.
    #[builder(default = false)]
    pub debug: bool,

    /// Minimal encoded body length, in bytes, before compression applies.
    #[builder(default = DEFAULT_COMPRESSION_THRESHOLD)]
    pub compression_threshold: usize,

    /// CORS policy preset; `None` disables CORS handling.
    #[builder(default, setter(strip_option))]
    pub cors: Option<CorsPreset>,

    /// Headers added to every response, in order.
    #[builder(default)]
    pub headers: Vec<(String, String)>,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            debug: false,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            cors: None,
            headers: Vec::new(),
        }
    }
}

impl MuxConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `RESTED_DEBUG` | `false` |
    /// | `RESTED_COMPRESSION_THRESHOLD` | `860` |
    /// | `RESTED_CORS` (`default` or `permissive`) | unset, CORS disabled |
    /// | `RESTED_HEADERS` (`Name: value; Other: value`) | empty |
    ///
    /// Unparsable values are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("RESTED_DEBUG") {
            config.debug = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("RESTED_COMPRESSION_THRESHOLD") {
            match v.trim().parse::<usize>() {
                Ok(n) => config.compression_threshold = n,
                Err(e) => warn!(value = %v, error = %e, "ignoring RESTED_COMPRESSION_THRESHOLD"),
            }
        }
        if let Ok(v) = std::env::var("RESTED_CORS") {
            match CorsPreset::parse(&v) {
                Some(preset) => config.cors = Some(preset),
                None => warn!(value = %v, "ignoring unknown RESTED_CORS preset"),
            }
        }
        if let Ok(v) = std::env::var("RESTED_HEADERS") {
            config.headers = parse_header_list(&v);
        }

        config
    }
}

/// Parse `Name: value` pairs separated by `;`. Entries without a name are
/// skipped.
#[must_use]
pub fn parse_header_list(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|entry| {
            let (name, value) = entry.split_once(':')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_owned(), value.trim().to_owned()))
        })
        .collect()
}

/// Parse a string as a boolean, accepting `1`, `true`, `yes` and `on`
/// (case-insensitive).
fn parse_bool(value: &str) -> bool {
    let value = value.trim();
    value == "1"
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value.eq_ignore_ascii_case("on")
}
