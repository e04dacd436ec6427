mod common;

use asofframe::error::{Error, Result};
use asofframe::{Column, ColumnType, SortKey, Table, Value};
use serde_json::json;

use common::scenario_a;

#[test]
fn test_table_construction_rules() -> Result<()> {
    let mut table = Table::new();
    table.add_column(Column::from_vec("a", vec![1_i64, 2]))?;
    assert!(matches!(
        table.add_column(Column::from_vec("a", vec![3_i64, 4])),
        Err(Error::DuplicateColumnName(_))
    ));
    assert!(matches!(
        table.add_column(Column::from_vec("b", vec![1_i64])),
        Err(Error::InconsistentRowCount { expected: 2, found: 1 })
    ));
    assert!(matches!(
        Column::new("c", ColumnType::Int64, vec![Value::from("x")]),
        Err(Error::TypeMismatch(_)) | Err(Error::ColumnTypeMismatch { .. })
    ));
    Ok(())
}

#[test]
fn test_select_drop_rename() -> Result<()> {
    let (left, _) = scenario_a();
    let picked = left.select(&["A"])?;
    assert_eq!(picked.column_names(), vec!["A"]);

    let dropped = left.drop(&["A"])?;
    assert_eq!(dropped.column_names(), vec!["time"]);
    assert!(matches!(left.drop(&["nope"]), Err(Error::ColumnNotFound(_))));

    let renamed = left.rename(&[("A", "label")])?;
    assert_eq!(renamed.column_names(), vec!["time", "label"]);
    Ok(())
}

#[test]
fn test_sort_is_stable_with_nulls_last() -> Result<()> {
    let table = Table::from_columns(vec![
        Column::from_options("k", vec![Some(2_i64), None, Some(1), Some(2)]),
        Column::from_vec("tag", vec!["first", "null", "one", "second"]),
    ])?;
    let sorted = table.sort_by_columns(&["k"])?;
    let tags: Vec<&str> = sorted
        .column("tag")?
        .values()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(tags, vec!["one", "first", "second", "null"]);

    let descending = table.sort_by(&[SortKey::desc("k").nulls_first()])?;
    assert!(descending.column("k")?.is_null(0));
    Ok(())
}

#[test]
fn test_concat_with_parent_column() -> Result<()> {
    let (left, _) = scenario_a();
    let first = left.assign_constant("parent", "p1")?;
    let second = left.assign_constant("parent", "p2")?;
    let stacked = Table::concat(&[first, second])?;
    assert_eq!(stacked.row_count(), 8);
    assert_eq!(stacked.column("parent")?.values()[4], Value::from("p2"));

    let mismatched = Table::concat(&[left.clone(), left.select(&["time"])?]);
    assert!(matches!(mismatched, Err(Error::SchemaMismatch(_))));
    Ok(())
}

#[test]
fn test_coalesce_columns() -> Result<()> {
    let table = Table::from_columns(vec![
        Column::from_options("k", vec![Some(1_i64), None, None]),
        Column::from_options("k_right", vec![None, Some(2_i64), None]),
        Column::from_options("k_rright", vec![Some(9_i64), Some(9), Some(3)]),
    ])?;
    let out = table.coalesce("k", &["k", "k_right", "k_rright"])?;
    assert_eq!(
        out.column("k")?.values(),
        &[Value::Int64(1), Value::Int64(2), Value::Int64(3)]
    );
    assert_eq!(out.column_names()[0], "k");
    Ok(())
}

#[test]
fn test_json_column_object_round_trip() -> Result<()> {
    let json = json!({
        "time": ["1989-01-01 00:00:00", "1989-01-02 00:00:00"],
        "value": [1.5, "NaN"],
        "tag": [null, "b"]
    });
    let table = Table::from_column_object(
        &json,
        &[("time", ColumnType::Timestamp), ("value", ColumnType::Float64)],
    )?;
    assert_eq!(table.column("time")?.column_type(), ColumnType::Timestamp);
    assert!(table.column("value")?.values()[1].is_nan());
    assert!(table.column("tag")?.is_null(0));
    assert_eq!(table.to_column_object(), json);

    let typed = table.to_json_string()?;
    assert_eq!(Table::from_json_str(&typed)?, table);
    Ok(())
}

#[test]
fn test_display_mentions_shape() -> Result<()> {
    let (left, _) = scenario_a();
    let text = left.to_string();
    assert!(text.contains("time"));
    assert!(text.ends_with("[4 rows x 2 columns]"));
    Ok(())
}
