//! The filter/sort engine: full list + filter state + sort order in, ordered
//! subset out.

use crate::catalog::GrantList;
use crate::filter::FilterState;
use crate::grant::GrantRecord;
use crate::sort::SortOrder;

/// Keep the grants that pass every active predicate, then order them.
///
/// Pure and deterministic: the same inputs always give the same output, and
/// default filters with [`SortOrder::Default`] return the input unchanged.
pub fn apply<'a>(
    grants: &'a [GrantRecord],
    filters: &FilterState,
    sort: SortOrder,
) -> Vec<&'a GrantRecord> {
    let mut matched: Vec<&GrantRecord> = grants.iter().filter(|g| filters.matches(g)).collect();
    sort.sort(&mut matched);
    matched
}

impl GrantList {
    /// [`apply`] over this list.
    pub fn query(&self, filters: &FilterState, sort: SortOrder) -> Vec<&GrantRecord> {
        apply(self.grants(), filters, sort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{CategorySelection, FilterChange};
    use crate::grant::{AmountBucket, OrganizerCategory, PrimaryCategory};

    fn catalog() -> Vec<GrantRecord> {
        let rows = [
            ("g1", "雲端服務導入", PrimaryCategory::DigitalTransformation, "雲端導入", vec!["中小企業"], "最高500萬", AmountBucket::Medium, OrganizerCategory::DigitalAffairs, "2025/06/30"),
            ("g2", "產業升級創新平台", PrimaryCategory::InnovationRnd, "產業創新", vec!["大型企業", "中小企業"], "最高5000萬", AmountBucket::ExtraLarge, OrganizerCategory::EconomicAffairs, "2025/04/15"),
            ("g3", "小型企業創新研發", PrimaryCategory::InnovationRnd, "SBIR", vec!["中小企業", "微型企業"], "最高100萬", AmountBucket::Small, OrganizerCategory::EconomicAffairs, "2025/12/31"),
            ("g4", "產業人才投資方案", PrimaryCategory::TalentTraining, "在職訓練", vec![], "補助訓練費80%", AmountBucket::Small, OrganizerCategory::Labor, "全年受理"),
            ("g5", "地方型SBIR", PrimaryCategory::InnovationRnd, "SBIR", vec!["微型企業", "新創企業"], "最高1000萬", AmountBucket::Large, OrganizerCategory::LocalGovernment, "2025/05/01"),
        ];
        rows.iter()
            .map(|(id, name, cat, sub, sizes, amount, bucket, org, timeline)| {
                let mut g = GrantRecord::draft(*id);
                g.name = name.to_string();
                g.primary_category = *cat;
                g.sub_category = sub.to_string();
                g.company_sizes = sizes.iter().map(|s| s.to_string()).collect();
                g.amount_display = amount.to_string();
                g.amount_bucket = *bucket;
                g.organizer_category = *org;
                g.timeline = timeline.to_string();
                g
            })
            .collect()
    }

    fn ids<'a>(result: &[&'a GrantRecord]) -> Vec<&'a str> {
        result.iter().map(|g| g.id.as_str()).collect()
    }

    #[test]
    fn default_filters_are_identity() {
        let grants = catalog();
        let result = apply(&grants, &FilterState::default(), SortOrder::Default);
        assert_eq!(ids(&result), vec!["g1", "g2", "g3", "g4", "g5"]);
    }

    #[test]
    fn empty_list_gives_empty_result() {
        let filters = FilterState::default().with(FilterChange::Search("SBIR".into()));
        assert!(apply(&[], &filters, SortOrder::AmountDesc).is_empty());
    }

    #[test]
    fn result_is_exactly_the_conjunction() {
        let grants = catalog();
        let filters = FilterState::default()
            .with(FilterChange::PrimaryCategory(CategorySelection::Only(
                PrimaryCategory::InnovationRnd,
            )))
            .with(FilterChange::ToggleCompanySize("微型企業".into()))
            .with(FilterChange::ToggleAmountBucket(AmountBucket::Small))
            .with(FilterChange::ToggleAmountBucket(AmountBucket::Large));

        let result = apply(&grants, &filters, SortOrder::Default);
        assert_eq!(ids(&result), vec!["g3", "g5"]);
        for g in &grants {
            let present = result.iter().any(|r| r.id == g.id);
            assert_eq!(present, filters.matches(g), "mismatch for {}", g.id);
        }
    }

    #[test]
    fn filter_then_sort() {
        let grants = catalog();
        let filters = FilterState::default()
            .with(FilterChange::ToggleOrganizerCategory(OrganizerCategory::EconomicAffairs))
            .with(FilterChange::ToggleOrganizerCategory(OrganizerCategory::LocalGovernment));
        let result = apply(&grants, &filters, SortOrder::AmountDesc);
        assert_eq!(ids(&result), vec!["g2", "g5", "g3"]);

        let result = apply(&grants, &filters, SortOrder::Deadline);
        assert_eq!(ids(&result), vec!["g2", "g5", "g3"]);
    }

    #[test]
    fn search_and_sub_category() {
        let grants = catalog();
        let filters = FilterState::default()
            .with(FilterChange::Search("sbir".into()))
            .with(FilterChange::SubCategory("SBIR".into()));
        let result = apply(&grants, &filters, SortOrder::AmountAsc);
        assert_eq!(ids(&result), vec!["g5"]);
    }

    #[test]
    fn list_query_matches_free_function() {
        let list = GrantList::new(catalog());
        let filters = FilterState::default().with(FilterChange::ToggleCompanySize("中小企業".into()));
        let via_list = ids(&list.query(&filters, SortOrder::AmountAsc))
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let grants = catalog();
        let direct = ids(&apply(&grants, &filters, SortOrder::AmountAsc))
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        assert_eq!(via_list, direct);
        assert_eq!(via_list, vec!["g3", "g1", "g2"]);
    }

    #[test]
    fn repeated_apply_is_deterministic() {
        let grants = catalog();
        let filters = FilterState::default().with(FilterChange::Search("產業".into()));
        let first = ids(&apply(&grants, &filters, SortOrder::Deadline))
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let second = ids(&apply(&grants, &filters, SortOrder::Deadline))
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        assert_eq!(first, second);
    }
}
