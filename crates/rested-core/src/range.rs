//! Range request arithmetic.
//!
//! Parses `Range: <unit>=<from>-[<to>]`, validates it against a
//! [`Ranger`](crate::resource::Ranger) resource, clamps it to the resource
//! extent, and renders `Content-Range` values.
//!
//! Three outcomes are kept distinct:
//!
//! - a range that cannot be parsed is ignored by the dispatcher,
//! - a unit the resource does not declare means "serve the full resource",
//! - a start beyond the extent is a 416 fault carrying `Content-Range: */<total>`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Fault;
use crate::resource::Ranger;

/// Value of `to` when the request omits the upper bound.
pub const UNBOUNDED: u64 = u64::MAX;

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w+)=(\d+)-(\d+)?$").expect("range pattern is a valid regex")
});

/// Errors produced while parsing, validating or serving a range.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RangeError {
    /// The `Range` header does not follow `<unit>=<from>-[<to>]`, or
    /// `from > to`.
    #[error("malformed Range header value: {0}")]
    Malformed(String),

    /// The resource does not serve ranges in this unit. The full resource is
    /// served instead.
    #[error("unsupported range unit {0}")]
    UnsupportedUnit(String),

    /// The range starts beyond the resource extent.
    #[error("range not satisfiable: {0}")]
    NotSatisfiable(ContentRange),

    /// The resource failed while producing the slice.
    #[error(transparent)]
    Fault(#[from] Fault),
}

impl From<RangeError> for Fault {
    fn from(err: RangeError) -> Self {
        match err {
            RangeError::NotSatisfiable(content_range) => Fault::range_not_satisfiable(&content_range),
            RangeError::Fault(fault) => fault,
            other => Fault::bad_request("Invalid Range header", &other.to_string()),
        }
    }
}

/// A parsed `Range` request header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    /// The range unit, e.g. `bytes` or `resources`.
    pub unit: String,
    /// First requested unit, inclusive.
    pub from: u64,
    /// Last requested unit, inclusive. [`UNBOUNDED`] when omitted.
    pub to: u64,
}

impl Range {
    /// Parse a raw `Range` header value.
    ///
    /// # Examples
    ///
    /// ```
    /// use rested_core::range::{Range, UNBOUNDED};
    ///
    /// let r = Range::parse("resources=0-39").unwrap();
    /// assert_eq!((r.from, r.to), (0, 39));
    ///
    /// let open = Range::parse("items=39-").unwrap();
    /// assert_eq!(open.to, UNBOUNDED);
    ///
    /// assert!(Range::parse("bytes 50-100").is_err());
    /// assert!(Range::parse("bytes=100-50").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, RangeError> {
        let caps = RANGE_RE
            .captures(raw.trim())
            .ok_or_else(|| RangeError::Malformed(raw.to_owned()))?;

        let unit = caps[1].to_owned();
        let from = caps[2]
            .parse::<u64>()
            .map_err(|_| RangeError::Malformed(raw.to_owned()))?;
        let to = match caps.get(3) {
            Some(m) => {
                let to = m
                    .as_str()
                    .parse::<u64>()
                    .map_err(|_| RangeError::Malformed(raw.to_owned()))?;
                if from > to {
                    return Err(RangeError::Malformed(raw.to_owned()));
                }
                to
            }
            None => UNBOUNDED,
        };

        Ok(Self { unit, from, to })
    }

    /// Number of units covered by this range.
    #[must_use]
    pub fn unit_count(&self) -> u64 {
        self.to.saturating_sub(self.from).saturating_add(1)
    }

    /// Check that `ranger` declares this range's unit (case-insensitive).
    pub fn validate(&self, ranger: &dyn Ranger) -> Result<(), RangeError> {
        if ranger
            .units()
            .iter()
            .any(|u| u.eq_ignore_ascii_case(&self.unit))
        {
            Ok(())
        } else {
            Err(RangeError::UnsupportedUnit(self.unit.clone()))
        }
    }

    /// Clamp this range to the extent of `ranger`.
    ///
    /// Fails with [`RangeError::NotSatisfiable`] (carrying `*/<count>`) when
    /// `from` exceeds the count. Otherwise `to` is lowered to `count - 1` if
    /// it overruns.
    pub fn adjust(&mut self, ranger: &dyn Ranger) -> Result<(), RangeError> {
        let count = ranger.count();
        if self.from > count {
            return Err(RangeError::NotSatisfiable(ContentRange::unranged(count)));
        }
        self.to = self.to.min(count.saturating_sub(1));
        Ok(())
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.to == UNBOUNDED {
            write!(f, "{}={}-", self.unit, self.from)
        } else {
            write!(f, "{}={}-{}", self.unit, self.from, self.to)
        }
    }
}

/// A computed `Content-Range` response value.
///
/// `total` is always the full extent of the resource, independent of how much
/// of it the range covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRange {
    /// The served range, or `None` when only the extent is reported.
    pub range: Option<Range>,
    /// Total number of units the resource holds.
    pub total: u64,
}

impl ContentRange {
    /// A content range serving `range` out of `total` units.
    #[must_use]
    pub fn new(range: Range, total: u64) -> Self {
        Self {
            range: Some(range),
            total,
        }
    }

    /// A content range that only reports the extent (`*/<total>`).
    #[must_use]
    pub fn unranged(total: u64) -> Self {
        Self { range: None, total }
    }

    /// Whether this content range covers the whole resource, in which case
    /// no `Content-Range` header is needed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        match &self.range {
            Some(r) => r.from == 0 && r.to == self.total.saturating_sub(1),
            None => true,
        }
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total == 0 {
            return f.write_str("*/*");
        }
        match &self.range {
            None => write!(f, "*/{}", self.total),
            Some(r) => write!(f, "{} {}-{}/{}", r.unit, r.from, r.to, self.total),
        }
    }
}
