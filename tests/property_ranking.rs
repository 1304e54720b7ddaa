use std::collections::BTreeMap;
use std::convert::Infallible;

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use most_read::period::{resolve, PeriodError};
use most_read::ranking::rank;

fn day_strategy() -> impl Strategy<Value = NaiveDate> {
    (2000_i32..2100, 1_u32..=12, 1_u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

proptest! {
    #[test]
    fn pt_rank_is_sorted_and_deterministic(
        totals in prop::collection::btree_map(0_u64..500, 0_u64..20, 0..60),
        limit in 0_usize..30,
        offset in 0_usize..30,
    ) {
        let keep = |_| Ok::<_, Infallible>(true);
        let first = rank(totals.clone(), keep, limit, offset).unwrap();
        let second = rank(totals.clone(), keep, limit, offset).unwrap();

        prop_assert_eq!(&first, &second);
        prop_assert!(first.len() <= limit);
        for pair in first.windows(2) {
            prop_assert!(pair[0].summed_count >= pair[1].summed_count);
            if pair[0].summed_count == pair[1].summed_count {
                prop_assert!(pair[0].content_id < pair[1].content_id);
            }
        }
        for entry in &first {
            prop_assert!(entry.summed_count > 0);
            prop_assert_eq!(totals.get(&entry.content_id), Some(&entry.summed_count));
        }
    }

    #[test]
    fn pt_rank_pages_concatenate_to_full_ranking(
        totals in prop::collection::btree_map(0_u64..200, 1_u64..10, 0..40),
        page_size in 1_usize..8,
    ) {
        let keep = |id: u64| Ok::<_, Infallible>(id % 3 != 0);
        let full = rank(totals.clone(), keep, usize::MAX, 0).unwrap();

        let mut paged = Vec::new();
        let mut offset = 0;
        loop {
            let page = rank(totals.clone(), keep, page_size, offset).unwrap();
            if page.is_empty() {
                break;
            }
            offset += page.len();
            paged.extend(page);
        }
        prop_assert_eq!(paged, full);
    }

    #[test]
    fn pt_week_is_seven_days_back(today in day_strategy()) {
        let range = resolve(Some("week"), None, None, today).unwrap();
        prop_assert_eq!(range.end_day, today);
        prop_assert_eq!(range.start_day, today - Duration::days(7));
    }

    #[test]
    fn pt_keyword_ranges_nest(today in day_strategy()) {
        let week = resolve(Some("week"), None, None, today).unwrap();
        let month = resolve(Some("month"), None, None, today).unwrap();
        let year = resolve(Some("year"), None, None, today).unwrap();
        let all = resolve(None, None, None, today).unwrap();

        prop_assert!(month.start_day <= week.start_day);
        prop_assert!(year.start_day <= month.start_day);
        prop_assert!(all.start_day <= year.start_day);
        prop_assert!(all.contains(today));
    }

    #[test]
    fn pt_custom_range_order_is_enforced(a in day_strategy(), b in day_strategy()) {
        let today = NaiveDate::from_ymd_opt(2050, 1, 1).unwrap();
        let result = resolve(Some("custom"), Some(a), Some(b), today);
        if a <= b {
            let range = result.unwrap();
            prop_assert_eq!(range.start_day, a);
            prop_assert_eq!(range.end_day, b);
        } else {
            prop_assert!(matches!(result, Err(PeriodError::InvalidArgument(_))));
        }
    }
}

#[test]
fn rank_of_empty_totals_is_empty() {
    let ranked = rank(BTreeMap::new(), |_| Ok::<_, Infallible>(true), 10, 0).unwrap();
    assert!(ranked.is_empty());
}
