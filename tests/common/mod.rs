//! Shared fixtures for integration tests
//!
//! Provides the tables used across the as-of, chain and backend tests, plus a
//! brute-force as-of reference to check the evaluator against.

#![allow(dead_code)]

use std::cmp::Ordering;

use asofframe::{Column, Table, Value};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Midnight of the given day of January 1989
pub fn day(d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1989, 1, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// The four-day time index used by the scenario tables
pub fn time_index() -> Vec<NaiveDateTime> {
    (1..=4).map(day).collect()
}

pub fn utc(d: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2001, 1, d, hour, 0, 0).unwrap()
}

/// Left `{time, A}` and right `{time, value}` of the basic as-of scenario
pub fn scenario_a() -> (Table, Table) {
    let left = Table::from_columns(vec![
        Column::from_vec("time", time_index()),
        Column::from_vec("A", vec!["a", "b", "c", "d"]),
    ])
    .unwrap();
    let right = Table::from_columns(vec![
        Column::from_vec(
            "time",
            vec![day(1) - Duration::hours(1), day(1) + Duration::hours(1)],
        ),
        Column::from_vec("value", vec!["S", "L"]),
    ])
    .unwrap();
    (left, right)
}

const ELEMENT_A: &str = "19218ac3-0408-4dac-91d3-dd1dd7d2b815";
const ELEMENT_B: &str = "2dd358d3-8932-4ad4-ae8c-ac249d634fdf";
pub const RUN_ID: &str = "357e1e75-a195-4fc1-94a0-817fadd019e9";

/// Episodes with element ids, some unassigned
pub fn active_episodes() -> Table {
    let a = Some(ELEMENT_A);
    let b = Some(ELEMENT_B);
    Table::from_columns(vec![
        Column::from_options("element_id", vec![a, a, b, a, b, b, None, None, None]),
        Column::from_vec("execution_id", vec![RUN_ID; 9]),
        Column::from_vec("trajectory", vec![-1_i64; 9]),
        Column::from_vec(
            "time",
            vec![
                utc(1, 0),
                utc(1, 12),
                utc(1, 12),
                utc(2, 0),
                utc(2, 0),
                utc(2, 12),
                utc(3, 0),
                utc(3, 12),
                utc(4, 0),
            ],
        ),
        Column::from_options(
            "start_time",
            vec![
                Some(utc(1, 0)),
                Some(utc(1, 0)),
                Some(utc(1, 12)),
                Some(utc(1, 0)),
                Some(utc(1, 12)),
                Some(utc(1, 12)),
                None,
                None,
                None,
            ],
        ),
        Column::from_options(
            "size",
            vec![Some(10.0), Some(10.0), Some(20.0), Some(10.0), Some(20.0), Some(20.0), None, None, None],
        ),
    ])
    .unwrap()
}

/// Property updates for the two elements
pub fn property_updates() -> Table {
    Table::from_columns(vec![
        Column::from_vec("run_id", vec![RUN_ID; 2]),
        Column::from_vec("element_id", vec![ELEMENT_A, ELEMENT_B]),
        Column::from_vec("time", vec![utc(1, 0), utc(1, 12)]),
        Column::from_vec("trajectory", vec![-1_i64; 2]),
        Column::from_vec("event_type", vec!["property_update"; 2]),
        Column::from_vec("path", vec!["/ElementInfo/size"; 2]),
        Column::from_vec("value", vec![11.0, 23.0]),
    ])
    .unwrap()
}

/// Brute-force backward as-of match: for each left row, the right row with
/// the greatest key `<=` the left key among rows whose `eq` columns agree,
/// earliest right row on ties.
pub fn reference_matches(left: &Table, right: &Table, key: &str, eq: &[&str]) -> Vec<Option<usize>> {
    let lk = left.column(key).unwrap().values();
    let rk = right.column(key).unwrap().values();
    (0..left.row_count())
        .map(|l| {
            let mut best: Option<usize> = None;
            for r in 0..right.row_count() {
                if usable(&lk[l]) && usable(&rk[r]) {
                    let agrees = eq.iter().all(|name| {
                        let a = &left.column(name).unwrap().values()[l];
                        let b = &right.column(name).unwrap().values()[r];
                        !a.is_null() && !b.is_null() && a == b
                    });
                    let not_after = rk[r].sql_cmp(&lk[l]) != Some(Ordering::Greater);
                    let better = match best {
                        None => true,
                        Some(current) => rk[r].sql_cmp(&rk[current]) == Some(Ordering::Greater),
                    };
                    if agrees && not_after && better {
                        best = Some(r);
                    }
                }
            }
            best
        })
        .collect()
}

fn usable(value: &Value) -> bool {
    !value.is_null() && !value.is_nan()
}
