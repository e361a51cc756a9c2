pub mod catalog;
pub mod filter;
pub mod grant;
pub mod query;
pub mod sort;

pub use catalog::{CategoryCount, FacetOption, FilterFacets, GrantList, SubCategoryCount};
pub use filter::{CategorySelection, FilterChange, FilterState};
pub use grant::{
    AmountBucket, GrantRecord, OrganizerCategory, PrimaryCategory, Reference, UnknownVariant,
    generate_id,
};
pub use query::apply;
pub use sort::{SortOrder, amount_key};
