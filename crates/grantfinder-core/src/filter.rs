//! Session filter state, its change events, and the per-record predicate.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::grant::{AmountBucket, GrantRecord, OrganizerCategory, PrimaryCategory, UnknownVariant};

/// Primary-category selection: everything, or one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategorySelection {
    #[default]
    All,
    Only(PrimaryCategory),
}

impl FromStr for CategorySelection {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" | "全部" => Ok(CategorySelection::All),
            other => other.parse().map(CategorySelection::Only),
        }
    }
}

impl fmt::Display for CategorySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategorySelection::All => f.write_str("all"),
            CategorySelection::Only(c) => c.fmt(f),
        }
    }
}

/// A user interaction that changes the filter state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange {
    Search(String),
    /// Changing the category clears the sub-category.
    PrimaryCategory(CategorySelection),
    /// Selecting the active sub-category (or an empty one) clears it.
    SubCategory(String),
    ToggleCompanySize(String),
    ToggleAmountBucket(AmountBucket),
    ToggleOrganizerCategory(OrganizerCategory),
    Reset,
}

/// Current filter selections. Empty sets place no restriction on their dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub search: String,
    pub primary_category: CategorySelection,
    pub sub_category: Option<String>,
    pub company_sizes: BTreeSet<String>,
    pub amount_buckets: BTreeSet<AmountBucket>,
    pub organizer_categories: BTreeSet<OrganizerCategory>,
}

impl FilterState {
    /// Fold one change event into the state. Never fails.
    pub fn apply(&mut self, change: FilterChange) {
        match change {
            FilterChange::Search(text) => self.search = text,
            FilterChange::PrimaryCategory(selection) => {
                if selection != self.primary_category {
                    self.sub_category = None;
                }
                self.primary_category = selection;
            }
            FilterChange::SubCategory(name) => {
                if name.is_empty() || self.sub_category.as_deref() == Some(name.as_str()) {
                    self.sub_category = None;
                } else {
                    self.sub_category = Some(name);
                }
            }
            FilterChange::ToggleCompanySize(size) => toggle(&mut self.company_sizes, size),
            FilterChange::ToggleAmountBucket(bucket) => toggle(&mut self.amount_buckets, bucket),
            FilterChange::ToggleOrganizerCategory(organizer) => {
                toggle(&mut self.organizer_categories, organizer)
            }
            FilterChange::Reset => *self = FilterState::default(),
        }
    }

    /// Builder-style [`apply`](Self::apply).
    pub fn with(mut self, change: FilterChange) -> Self {
        self.apply(change);
        self
    }

    /// True when no predicate is active.
    pub fn is_default(&self) -> bool {
        self == &FilterState::default()
    }

    /// Conjunction of every active predicate.
    pub fn matches(&self, grant: &GrantRecord) -> bool {
        self.matches_search(grant)
            && self.matches_category(grant)
            && self.matches_sub_category(grant)
            && self.matches_company_size(grant)
            && (self.amount_buckets.is_empty() || self.amount_buckets.contains(&grant.amount_bucket))
            && (self.organizer_categories.is_empty()
                || self.organizer_categories.contains(&grant.organizer_category))
    }

    fn matches_search(&self, grant: &GrantRecord) -> bool {
        if self.search.is_empty() {
            return true;
        }
        grant
            .search_text()
            .to_lowercase()
            .contains(&self.search.to_lowercase())
    }

    fn matches_category(&self, grant: &GrantRecord) -> bool {
        match self.primary_category {
            CategorySelection::All => true,
            CategorySelection::Only(c) => grant.primary_category == c,
        }
    }

    fn matches_sub_category(&self, grant: &GrantRecord) -> bool {
        match self.sub_category.as_deref() {
            None | Some("") => true,
            Some(sub) => grant.sub_category == sub,
        }
    }

    fn matches_company_size(&self, grant: &GrantRecord) -> bool {
        self.company_sizes.is_empty()
            || grant
                .company_sizes
                .iter()
                .any(|s| self.company_sizes.contains(s))
    }
}

fn toggle<T: Ord>(set: &mut BTreeSet<T>, value: T) {
    if !set.remove(&value) {
        set.insert(value);
    }
}
