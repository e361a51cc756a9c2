//! Terminal rendering for grant records, listings, and aggregates.
//!
//! Detail cards group fields into sections and skip sections with nothing to
//! show. Listings print one header line plus a shortened summary per grant.

use grantfinder_core::{CategoryCount, FacetOption, FilterFacets, GrantRecord};

const MAX_LIST_ITEMS: usize = 10;
const SUMMARY_CHARS: usize = 40;

// ── Public API ──

/// Print one grant as a vertical card grouped by section.
pub fn print_grant_card(grant: &GrantRecord) {
    println!("=== {} ===", grant.name);
    println!("{}", grant.id);
    println!();

    print_section(
        "Classification",
        &[
            ("category", grant.primary_category.to_string()),
            ("sub_category", grant.sub_category.clone()),
            ("organizer_category", grant.organizer_category.to_string()),
            (
                "amount_bucket",
                format!(
                    "{} ({})",
                    grant.amount_bucket,
                    grant.amount_bucket.range_hint()
                ),
            ),
        ],
    );
    print_section(
        "Funding",
        &[
            ("amount", grant.amount_display.clone()),
            ("subsidy_ratio_cap", grant.subsidy_ratio_cap.clone()),
        ],
    );
    print_section(
        "Eligibility",
        &[
            ("applicants", joined(&grant.eligible_applicants)),
            ("company_sizes", joined(&grant.company_sizes)),
        ],
    );
    print_section(
        "Schedule",
        &[
            ("timeline", grant.timeline.clone()),
            ("organizer", grant.organizer.clone()),
        ],
    );
    print_section("Summary", &[("summary", grant.summary.clone())]);
    print_references(grant);
}

/// Print a filtered listing with a result count footer.
pub fn print_listing(grants: &[&GrantRecord], total: usize) {
    for grant in grants {
        println!(
            "{:<16} {}  [{}] {}",
            grant.id, grant.name, grant.amount_bucket, grant.organizer
        );
        if !grant.summary.is_empty() {
            println!("                 {}", truncate(&grant.summary, SUMMARY_CHARS));
        }
    }
    if !grants.is_empty() {
        println!();
    }
    println!("{} of {} grants", grants.len(), total);
}

/// Print the category tree with per-node counts.
pub fn print_category_tree(categories: &[CategoryCount]) {
    for category in categories {
        println!("{} ({})", category.name, category.count);
        for sub in &category.subcategories {
            println!("  {:<24} {}", sub.name, sub.count);
        }
    }
}

/// Print every facet dimension with option ids and counts.
pub fn print_facets(facets: &FilterFacets) {
    print_facet("companySize", &facets.company_sizes);
    print_facet("grantAmount", &facets.amount_buckets);
    print_facet("agency", &facets.organizer_categories);
}

// ── Section rendering ──

fn print_section(header: &str, fields: &[(&str, String)]) {
    if fields.iter().all(|(_, value)| value.is_empty()) {
        return;
    }

    println!("{header}");
    for (label, value) in fields {
        if value.is_empty() {
            continue;
        }
        println!("  {:<26} {}", label, value);
    }
    println!();
}

fn print_references(grant: &GrantRecord) {
    let len = grant.references.len();
    if len == 0 {
        return;
    }

    println!("References ({}):", len);
    for reference in grant.references.iter().take(MAX_LIST_ITEMS) {
        if reference.label == reference.url {
            println!("    {}", reference.url);
        } else {
            println!("    {:<20}  {}", reference.label, reference.url);
        }
    }
    if len > MAX_LIST_ITEMS {
        println!("    ... and {} more", len - MAX_LIST_ITEMS);
    }
    println!();
}

fn print_facet(header: &str, options: &[FacetOption]) {
    if options.is_empty() {
        return;
    }
    println!("{header}");
    for option in options {
        println!("  {:<20} {:<28} {}", option.id, option.name, option.count);
    }
    println!();
}

// ── Helpers ──

fn joined(items: &[String]) -> String {
    items.join(", ")
}

/// Shorten `text` to at most `max` characters, marking the cut with `...`.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
