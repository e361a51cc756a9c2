//! Result ordering and the amount sort key.
//!
//! Funding amounts are free text ("最高1000萬元", "每案50萬至300萬"). The sort
//! key is the largest integer written immediately before 萬 (ten thousand);
//! text without such a number sorts as 0.

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::grant::GrantRecord;

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)萬").expect("valid amount pattern"));

/// Largest number immediately followed by 萬, in units of 萬.
///
/// Only ASCII digits count, so "1,000萬" yields 0 for the run "000". Numbers
/// too large for `u64` are ignored.
pub fn amount_key(display: &str) -> u64 {
    AMOUNT_RE
        .captures_iter(display)
        .filter_map(|c| c[1].parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort order {0:?} (expected default, amount-desc, amount-asc, deadline)")]
pub struct UnknownSortOrder(pub String);

/// How a filtered result is ordered. All orders are stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Catalog order.
    #[default]
    Default,
    AmountDesc,
    AmountAsc,
    /// Plain string comparison of the timeline text. Only chronological when
    /// every timeline is written in the same format.
    Deadline,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Default => "default",
            SortOrder::AmountDesc => "amount-desc",
            SortOrder::AmountAsc => "amount-asc",
            SortOrder::Deadline => "deadline",
        }
    }

    /// Reorder `grants` in place; equal keys keep their relative order.
    pub fn sort(self, grants: &mut [&GrantRecord]) {
        match self {
            SortOrder::Default => {}
            SortOrder::AmountDesc => {
                grants.sort_by_cached_key(|g| Reverse(amount_key(&g.amount_display)))
            }
            SortOrder::AmountAsc => grants.sort_by_cached_key(|g| amount_key(&g.amount_display)),
            SortOrder::Deadline => grants.sort_by(|a, b| a.timeline.cmp(&b.timeline)),
        }
    }
}

impl FromStr for SortOrder {
    type Err = UnknownSortOrder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "default" => Ok(SortOrder::Default),
            "amount-desc" => Ok(SortOrder::AmountDesc),
            "amount-asc" => Ok(SortOrder::AmountAsc),
            "deadline" => Ok(SortOrder::Deadline),
            other => Err(UnknownSortOrder(other.to_string())),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
