//! Command-line filter flags and their translation into a [`FilterState`].

use std::collections::BTreeSet;

use clap::Args;
use grantfinder_core::{
    AmountBucket, CategorySelection, FilterChange, FilterState, OrganizerCategory, SortOrder,
};

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Free-text search over name, summary and organizer
    pub query: Option<String>,

    /// Primary category (label or slug, e.g. 數位轉型 or digital-transformation)
    #[arg(long, default_value = "all")]
    pub category: CategorySelection,

    /// Sub-category, exact match
    #[arg(long)]
    pub sub: Option<String>,

    /// Company size (repeatable)
    #[arg(long = "size")]
    pub sizes: Vec<String>,

    /// Amount bucket (repeatable)
    #[arg(long = "amount")]
    pub amounts: Vec<AmountBucket>,

    /// Organizer category (repeatable)
    #[arg(long = "agency")]
    pub agencies: Vec<OrganizerCategory>,

    /// default, amount-desc, amount-asc, or deadline
    #[arg(long, default_value = "default")]
    pub sort: SortOrder,
}

impl FilterArgs {
    /// Replay the flags as filter events. Repeated values count once.
    pub fn filter_state(&self) -> FilterState {
        let mut state = FilterState::default();
        if let Some(query) = &self.query {
            state.apply(FilterChange::Search(query.clone()));
        }
        state.apply(FilterChange::PrimaryCategory(self.category));
        if let Some(sub) = &self.sub {
            state.apply(FilterChange::SubCategory(sub.clone()));
        }

        let sizes: BTreeSet<&String> = self.sizes.iter().collect();
        for size in sizes {
            state.apply(FilterChange::ToggleCompanySize(size.clone()));
        }
        let amounts: BTreeSet<AmountBucket> = self.amounts.iter().copied().collect();
        for bucket in amounts {
            state.apply(FilterChange::ToggleAmountBucket(bucket));
        }
        let agencies: BTreeSet<OrganizerCategory> = self.agencies.iter().copied().collect();
        for agency in agencies {
            state.apply(FilterChange::ToggleOrganizerCategory(agency));
        }
        state
    }
}
