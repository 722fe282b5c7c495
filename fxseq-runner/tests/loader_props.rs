//! Property tests for input parsing and column naming.

use chrono::NaiveDate;
use proptest::prelude::*;

use fxseq_runner::data_loader::parse_timestamp;
use fxseq_runner::pipeline::source_prefix;

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (1990i32..2040, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

proptest! {
    #[test]
    fn iso_and_banxico_dates_agree(date in arb_date()) {
        let iso = parse_timestamp(&date.format("%Y-%m-%d").to_string());
        let banxico = parse_timestamp(&date.format("%d/%m/%Y").to_string());
        prop_assert_eq!(iso, date.and_hms_opt(0, 0, 0));
        prop_assert_eq!(iso, banxico);
    }

    #[test]
    fn datetime_layouts_agree(date in arb_date(), h in 0u32..24, m in 0u32..60, s in 0u32..60) {
        let ts = date.and_hms_opt(h, m, s).unwrap();
        prop_assert_eq!(parse_timestamp(&ts.format("%Y-%m-%d %H:%M:%S").to_string()), Some(ts));
        prop_assert_eq!(parse_timestamp(&ts.format("%Y-%m-%dT%H:%M:%S").to_string()), Some(ts));
    }

    #[test]
    fn prefix_is_a_safe_identifier(name in "[A-Za-z0-9.\\-^ ]{1,16}") {
        let prefix = source_prefix(&name);
        prop_assert_eq!(prefix.chars().count(), name.chars().count());
        prop_assert!(prefix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
    }
}
