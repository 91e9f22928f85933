//! `Accept` header parsing and content-type negotiation.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use http::HeaderMap;
use http::header::ACCEPT;

use crate::headers::header_str;

/// One media range of an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptClause {
    /// Top-level type, or `*`.
    pub media_type: String,
    /// Subtype, or `*`.
    pub subtype: String,
    /// Quality value in `[0, 1]`.
    pub quality: f32,
    /// Media-range parameters other than `q`.
    pub params: BTreeMap<String, String>,
}

impl AcceptClause {
    fn wildcard() -> Self {
        Self {
            media_type: "*".to_owned(),
            subtype: "*".to_owned(),
            quality: 1.0,
            params: BTreeMap::new(),
        }
    }

    /// Number of concrete (non-wildcard) positions: 0, 1 or 2.
    fn specificity(&self) -> u8 {
        u8::from(self.media_type != "*") + u8::from(self.subtype != "*")
    }

    fn matches(&self, media_type: &str, subtype: &str) -> bool {
        if self.media_type == "*" && self.subtype == "*" {
            return true;
        }
        self.media_type.eq_ignore_ascii_case(media_type)
            && (self.subtype == "*" || self.subtype.eq_ignore_ascii_case(subtype))
    }

    fn parse(part: &str) -> Option<Self> {
        let mut segments = part.split(';');
        let media_range = segments.next()?.trim();

        let (media_type, subtype) = match media_range.split_once('/') {
            Some((t, s)) => (t.trim(), s.trim()),
            None if media_range == "*" => ("*", "*"),
            None => return None,
        };
        if media_type.is_empty() || subtype.is_empty() || subtype.contains('/') {
            return None;
        }

        let mut clause = Self {
            media_type: media_type.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            quality: 1.0,
            params: BTreeMap::new(),
        };

        for param in segments {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key == "q" {
                clause.quality = value.trim().parse::<f32>().unwrap_or(0.0).clamp(0.0, 1.0);
            } else {
                clause
                    .params
                    .insert(key.to_owned(), value.trim().to_owned());
            }
        }

        Some(clause)
    }
}

/// A parsed `Accept` header: clauses sorted by preference.
///
/// Higher quality comes first. At equal quality a concrete type outranks a
/// type wildcard, which outranks `*/*`. Ties keep their header order.
#[derive(Debug, Clone, PartialEq)]
pub struct Accept {
    clauses: Vec<AcceptClause>,
}

impl Default for Accept {
    fn default() -> Self {
        Self {
            clauses: vec![AcceptClause::wildcard()],
        }
    }
}

impl Accept {
    /// Parse a raw `Accept` value. Unparsable segments are skipped. When no
    /// clause survives, the result is a single `*/*` clause.
    ///
    /// # Examples
    ///
    /// ```
    /// use rested_core::negotiate::Accept;
    ///
    /// let accept = Accept::parse("text/*;q=0.5, application/json");
    /// assert_eq!(accept.negotiate(&["text/plain", "application/json"]), Some("application/json"));
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut clauses: Vec<AcceptClause> = raw
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .filter_map(AcceptClause::parse)
            .collect();

        if clauses.is_empty() {
            return Self::default();
        }

        clauses.sort_by(|a, b| {
            b.quality
                .partial_cmp(&a.quality)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.specificity().cmp(&a.specificity()))
        });

        Self { clauses }
    }

    /// Parse the `Accept` header of a request, defaulting to `*/*`.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        header_str(headers, &ACCEPT).map_or_else(Self::default, Self::parse)
    }

    /// The sorted clauses.
    #[must_use]
    pub fn clauses(&self) -> &[AcceptClause] {
        &self.clauses
    }

    /// Pick the best alternative.
    ///
    /// Clauses are walked in preference order; for each clause the first
    /// alternative it matches (exactly, through a subtype wildcard, or
    /// through `*/*`) wins. Clauses with quality 0 never match. `None` means
    /// nothing is acceptable and should become a 406.
    #[must_use]
    pub fn negotiate<'a>(&self, alternatives: &[&'a str]) -> Option<&'a str> {
        let split: Vec<(&str, &str)> = alternatives
            .iter()
            .map(|alt| alt.split_once('/').unwrap_or((*alt, "")))
            .collect();

        for clause in self.clauses.iter().filter(|c| c.quality > 0.0) {
            for (i, (media_type, subtype)) in split.iter().enumerate() {
                if clause.matches(media_type, subtype) {
                    return Some(alternatives[i]);
                }
            }
        }
        None
    }
}
