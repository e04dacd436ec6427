mod common;

use std::collections::HashMap;

use asofframe::error::Result;
use asofframe::{ChainSuffix, Column, JoinChain, JoinHow, Table, Value};
use chrono::NaiveDateTime;

use common::{day, time_index};

const SIZES: [&str; 3] = ["S", "L", "XL"];

/// Table `k`: two rows per day, one with its own size and one with "M"
fn sized_table(k: usize) -> Table {
    let times: Vec<NaiveDateTime> = time_index().into_iter().flat_map(|t| [t, t]).collect();
    let sizes: Vec<&str> = (0..times.len()).map(|x| if x % 2 == 0 { SIZES[k] } else { "M" }).collect();
    let labels: Vec<String> = (0..times.len())
        .map(|x| format!("{}{}", (b'A' + k as u8) as char, x % 4))
        .collect();
    let values: Vec<i64> = (0..times.len() as i64).map(|x| 3 * x + k as i64).collect();
    Table::from_columns(vec![
        Column::from_vec("time", times),
        Column::from_vec("size", sizes),
        Column::from_vec(((b'A' + k as u8) as char).to_string(), labels),
        Column::from_vec(format!("value_{}", k), values),
    ])
    .unwrap()
}

/// Every distinct (time, size) in order of first appearance, with each
/// table's value at that key
fn direct_outer(tables: &[Table]) -> Vec<(Value, Value, Vec<Value>)> {
    let mut order: Vec<(Value, Value)> = Vec::new();
    let mut lookup: Vec<HashMap<(Value, Value), Value>> = Vec::new();
    for (k, table) in tables.iter().enumerate() {
        let mut values = HashMap::new();
        for row in table.rows() {
            let key = (row.get("time").unwrap().clone(), row.get("size").unwrap().clone());
            if !order.contains(&key) {
                order.push(key.clone());
            }
            values.insert(key, row.get(&format!("value_{}", k)).unwrap().clone());
        }
        lookup.push(values);
    }
    order
        .into_iter()
        .map(|key| {
            let values = lookup
                .iter()
                .map(|l| l.get(&key).cloned().unwrap_or(Value::Null))
                .collect();
            (key.0, key.1, values)
        })
        .collect()
}

fn assert_matches_direct(out: &Table, tables: &[Table]) -> Result<()> {
    let expected = direct_outer(tables);
    assert_eq!(out.row_count(), expected.len());
    for (row, (time, size, values)) in expected.iter().enumerate() {
        assert_eq!(&out.column("time")?.values()[row], time);
        assert_eq!(&out.column("size")?.values()[row], size);
        for (k, value) in values.iter().enumerate() {
            assert_eq!(&out.column(&format!("value_{}", k))?.values()[row], value);
        }
    }
    Ok(())
}

#[test]
fn test_scenario_d_three_way_outer_chain() -> Result<()> {
    let tables: Vec<Table> = (0..3).map(sized_table).collect();
    let out = tables
        .iter()
        .cloned()
        .fold(JoinChain::new(&["time", "size"]), JoinChain::push)
        .finish(JoinHow::Outer)?;

    assert_eq!(
        out.column_names(),
        vec!["time", "size", "A", "value_0", "B", "value_1", "C", "value_2"]
    );
    assert_eq!(out.row_count(), 16);
    assert_eq!(out.column("time")?.null_count(), 0);
    assert_eq!(out.column("size")?.null_count(), 0);
    assert_matches_direct(&out, &tables)
}

#[test]
fn test_numbered_suffixes_give_the_same_result() -> Result<()> {
    let tables: Vec<Table> = (0..3).map(sized_table).collect();
    let escalating = tables
        .iter()
        .cloned()
        .fold(JoinChain::new(&["time", "size"]), JoinChain::push)
        .finish(JoinHow::Outer)?;
    let numbered = tables
        .iter()
        .cloned()
        .fold(
            JoinChain::new(&["time", "size"]).suffix(ChainSuffix::Numbered),
            JoinChain::push,
        )
        .finish(JoinHow::Outer)?;
    assert_eq!(escalating, numbered);
    Ok(())
}

#[test]
fn test_inner_chain_keeps_shared_keys_only() -> Result<()> {
    let out = JoinChain::new(&["time", "size"])
        .push(sized_table(0))
        .push(sized_table(1))
        .push(sized_table(2))
        .finish(JoinHow::Inner)?;
    assert_eq!(out.row_count(), 4);
    assert!(out
        .column("size")?
        .values()
        .iter()
        .all(|v| v == &Value::from("M")));
    // the "M" row of day x is row 2x + 1 in every table
    assert_eq!(
        out.column("value_2")?.values(),
        &[Value::Int64(5), Value::Int64(11), Value::Int64(17), Value::Int64(23)]
    );
    Ok(())
}

#[test]
fn test_two_way_outer_keeps_unmatched_rows_from_both_sides() -> Result<()> {
    let out = JoinChain::new(&["time", "size"])
        .push(sized_table(0))
        .push(sized_table(1))
        .finish(JoinHow::Outer)?;
    assert_eq!(out.row_count(), 12);
    assert_eq!(out.column("value_0")?.null_count(), 4);
    assert_eq!(out.column("value_1")?.null_count(), 4);
    Ok(())
}

fn rows_of(k: usize, rows: &[(u32, &str)]) -> Table {
    Table::from_columns(vec![
        Column::from_vec("time", rows.iter().map(|(d, _)| day(*d)).collect::<Vec<_>>()),
        Column::from_vec("size", rows.iter().map(|(_, s)| *s).collect::<Vec<_>>()),
        Column::from_vec(format!("value_{}", k), (0..rows.len() as i64).map(|x| 10 * k as i64 + x).collect::<Vec<_>>()),
    ])
    .unwrap()
}

#[test]
fn test_outer_chain_matches_keys_first_seen_in_a_later_table() -> Result<()> {
    let tables = vec![
        rows_of(0, &[(1, "S")]),
        rows_of(1, &[(1, "S"), (1, "L")]),
        rows_of(2, &[(1, "L"), (2, "XL")]),
    ];
    let out = tables
        .iter()
        .cloned()
        .fold(JoinChain::new(&["time", "size"]), JoinChain::push)
        .finish(JoinHow::Outer)?;
    assert_eq!(out.column_names(), vec!["time", "size", "value_0", "value_1", "value_2"]);
    assert_eq!(out.row_count(), 3);
    assert_matches_direct(&out, &tables)
}
