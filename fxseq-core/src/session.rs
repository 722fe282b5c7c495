//! Mexican equity session calendar features.
//!
//! `is_mexico_market_hours`: 08:30–15:00 local, inclusive.
//! `is_high_impact_period`: the first and last hour of that session
//! (08:30–09:30 or 14:00–15:00, inclusive).
//!
//! Both depend only on the row's own timestamp. Daily rows stamped at
//! midnight fall outside the session.

use chrono::{NaiveDateTime, NaiveTime};

use crate::frame::FeatureBlock;

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

fn within(t: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    t >= start && t <= end
}

pub fn is_market_hours(ts: &NaiveDateTime) -> bool {
    within(ts.time(), hm(8, 30), hm(15, 0))
}

pub fn is_high_impact(ts: &NaiveDateTime) -> bool {
    let t = ts.time();
    within(t, hm(8, 30), hm(9, 30)) || within(t, hm(14, 0), hm(15, 0))
}

/// Session features as 0/1 columns.
pub fn session_block(index: &[NaiveDateTime]) -> FeatureBlock {
    let flag = |b: bool| if b { 1.0 } else { 0.0 };
    let mut block = FeatureBlock::new("session", index.to_vec());
    block.push(
        "is_mexico_market_hours",
        index.iter().map(|ts| flag(is_market_hours(ts))).collect(),
    );
    block.push(
        "is_high_impact_period",
        index.iter().map(|ts| flag(is_high_impact(ts))).collect(),
    );
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn session_boundaries_are_inclusive() {
        assert!(!is_market_hours(&at(8, 29)));
        assert!(is_market_hours(&at(8, 30)));
        assert!(is_market_hours(&at(15, 0)));
        assert!(!is_market_hours(&at(15, 1)));
    }

    #[test]
    fn high_impact_windows() {
        assert!(is_high_impact(&at(9, 30)));
        assert!(!is_high_impact(&at(10, 0)));
        assert!(is_high_impact(&at(14, 0)));
        assert!(!is_high_impact(&at(16, 0)));
    }

    #[test]
    fn midnight_rows_are_outside() {
        let block = session_block(&[at(0, 0), at(11, 0)]);
        assert_eq!(block.column("is_mexico_market_hours").unwrap(), &[0.0, 1.0]);
        assert_eq!(block.column("is_high_impact_period").unwrap(), &[0.0, 0.0]);
    }
}
