//! The loaded grant collection and its derived aggregates.
//!
//! A [`GrantList`] is replaced wholesale on every refresh; construction always
//! recomputes the category tree and the filter facets. The aggregates serialize
//! to the `categories` / `filters` block shape carried by the catalog file.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::warn;

use crate::grant::{AmountBucket, GrantRecord, OrganizerCategory, PrimaryCategory};

/// Grant count for one primary category, with its sub-category breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub id: String,
    pub name: PrimaryCategory,
    pub count: usize,
    pub subcategories: Vec<SubCategoryCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubCategoryCount {
    pub id: String,
    pub name: String,
    pub count: usize,
}

/// One selectable value of a filter dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetOption {
    pub id: String,
    pub name: String,
    pub value: String,
    pub count: usize,
}

/// Distinct values observed for each multi-select filter dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterFacets {
    #[serde(rename = "companySize")]
    pub company_sizes: Vec<FacetOption>,
    #[serde(rename = "grantAmount")]
    pub amount_buckets: Vec<FacetOption>,
    #[serde(rename = "agency")]
    pub organizer_categories: Vec<FacetOption>,
}

/// `categories` block of the catalog file.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryBlock<'a> {
    pub main: &'a [CategoryCount],
}

/// The full grant collection plus aggregates derived from it.
#[derive(Debug, Clone, Default)]
pub struct GrantList {
    grants: Vec<GrantRecord>,
    categories: Vec<CategoryCount>,
    facets: FilterFacets,
}

impl GrantList {
    pub fn new(grants: Vec<GrantRecord>) -> Self {
        let duplicates = duplicate_ids(&grants);
        if !duplicates.is_empty() {
            warn!(ids = ?duplicates, "grant list contains duplicate ids");
        }
        let categories = aggregate_categories(&grants);
        let facets = aggregate_facets(&grants);
        Self {
            grants,
            categories,
            facets,
        }
    }

    pub fn grants(&self) -> &[GrantRecord] {
        &self.grants
    }

    pub fn into_grants(self) -> Vec<GrantRecord> {
        self.grants
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&GrantRecord> {
        self.grants.iter().find(|g| g.id == id)
    }

    /// Per-category counts in first-seen order.
    pub fn category_counts(&self) -> &[CategoryCount] {
        &self.categories
    }

    /// Sub-categories of one primary category, or empty if it has no grants.
    pub fn subcategories(&self, category: PrimaryCategory) -> &[SubCategoryCount] {
        self.categories
            .iter()
            .find(|c| c.name == category)
            .map(|c| c.subcategories.as_slice())
            .unwrap_or(&[])
    }

    pub fn facets(&self) -> &FilterFacets {
        &self.facets
    }

    pub fn category_block(&self) -> CategoryBlock<'_> {
        CategoryBlock {
            main: &self.categories,
        }
    }
}

impl From<Vec<GrantRecord>> for GrantList {
    fn from(grants: Vec<GrantRecord>) -> Self {
        Self::new(grants)
    }
}

/// Stable identifier for a facet value: dimension prefix plus the 32-bit
/// FNV-1a hash of the display text.
pub fn facet_id(prefix: &str, text: &str) -> String {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in text.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    format!("{prefix}-{hash:08x}")
}

fn duplicate_ids(grants: &[GrantRecord]) -> Vec<&str> {
    let mut seen = HashSet::new();
    grants
        .iter()
        .filter(|g| !seen.insert(g.id.as_str()))
        .map(|g| g.id.as_str())
        .collect()
}

fn aggregate_categories(grants: &[GrantRecord]) -> Vec<CategoryCount> {
    let mut out: Vec<CategoryCount> = Vec::new();
    let mut index: HashMap<PrimaryCategory, usize> = HashMap::new();

    for grant in grants {
        let slot = *index.entry(grant.primary_category).or_insert_with(|| {
            out.push(CategoryCount {
                id: facet_id("category", grant.primary_category.label()),
                name: grant.primary_category,
                count: 0,
                subcategories: Vec::new(),
            });
            out.len() - 1
        });
        let category = &mut out[slot];
        category.count += 1;

        if grant.sub_category.is_empty() {
            continue;
        }
        match category
            .subcategories
            .iter_mut()
            .find(|s| s.name == grant.sub_category)
        {
            Some(sub) => sub.count += 1,
            None => category.subcategories.push(SubCategoryCount {
                id: facet_id("sub", &grant.sub_category),
                name: grant.sub_category.clone(),
                count: 1,
            }),
        }
    }
    out
}

fn aggregate_facets(grants: &[GrantRecord]) -> FilterFacets {
    // Company sizes keep first-seen order.
    let mut company_sizes: Vec<FacetOption> = Vec::new();
    for size in grants.iter().flat_map(|g| g.company_sizes.iter()) {
        match company_sizes.iter_mut().find(|o| &o.value == size) {
            Some(option) => option.count += 1,
            None => company_sizes.push(FacetOption {
                id: facet_id("size", size),
                name: size.clone(),
                value: size.clone(),
                count: 1,
            }),
        }
    }

    let amount_buckets = enum_facet(
        "amount",
        AmountBucket::ALL,
        |b| (b.label(), amount_display_name(b)),
        |b| grants.iter().filter(|g| g.amount_bucket == b).count(),
    );
    let organizer_categories = enum_facet(
        "agency",
        OrganizerCategory::ALL,
        |o| (o.label(), o.label().to_string()),
        |o| grants.iter().filter(|g| g.organizer_category == o).count(),
    );

    FilterFacets {
        company_sizes,
        amount_buckets,
        organizer_categories,
    }
}

/// "小額補助 (100萬以下)"; the uncapped bucket has no range.
fn amount_display_name(bucket: AmountBucket) -> String {
    match bucket {
        AmountBucket::Unlimited => bucket.label().to_string(),
        _ => format!("{} ({})", bucket.label(), bucket.range_hint()),
    }
}

/// Facet options for a closed enum, in declaration order, skipping unseen values.
///
/// `describe` yields the wire value and the display name of a variant.
fn enum_facet<T: Copy>(
    prefix: &str,
    all: &[T],
    describe: impl Fn(T) -> (&'static str, String),
    count: impl Fn(T) -> usize,
) -> Vec<FacetOption> {
    all.iter()
        .filter_map(|&v| {
            let n = count(v);
            if n == 0 {
                return None;
            }
            let (value, name) = describe(v);
            Some(FacetOption {
                id: facet_id(prefix, value),
                name,
                value: value.to_string(),
                count: n,
            })
        })
        .collect()
}
