// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Group By Tests

use textsql::core::{DataType, Error, Schema, Value};
use textsql::executor::{BinaryOp, Executor, NoMatchPolicy, QueryConfig};
use textsql::plan::{Expr, GroupingKey, QueryPlan, SelectItem, SourceRef};

fn requests(rows: &[(&str, i64)]) -> QueryPlan {
    QueryPlan::source(SourceRef::memory(
        "requests",
        Schema::typed(&[("method", DataType::Text), ("ms", DataType::Integer)]),
        rows.iter()
            .map(|(m, v)| vec![Value::text(*m), Value::integer(*v)])
            .collect(),
    ))
}

fn sample() -> QueryPlan {
    requests(&[("GET", 10), ("POST", 30), ("GET", 20), ("get", 40), ("PUT", 5)])
}

fn by_method(input: QueryPlan, items: Vec<SelectItem>, having: Option<Expr>) -> QueryPlan {
    input.group_by(vec![GroupingKey::new(Expr::col("method"))], items, having)
}

fn count() -> Expr {
    Expr::call("count", vec![])
}

#[test]
fn test_aggregates_per_group() {
    let plan = by_method(
        sample(),
        vec![
            SelectItem::expr(Expr::col("method")),
            SelectItem::aliased(count(), "n"),
            SelectItem::aliased(Expr::call("min", vec![Expr::col("ms")]), "fastest"),
            SelectItem::aliased(Expr::call("avg", vec![Expr::col("ms")]), "mean"),
            SelectItem::aliased(Expr::call("last", vec![Expr::col("ms")]), "latest"),
        ],
        None,
    );
    let output = Executor::default().execute(&plan).unwrap();
    assert_eq!(
        output.column_names(),
        vec!["method", "n", "fastest", "mean", "latest"]
    );
    assert_eq!(output.columns[3].data_type, DataType::Float);
    assert_eq!(
        output.values(),
        vec![
            vec![
                Value::text("GET"),
                Value::integer(2),
                Value::integer(10),
                Value::float(15.0),
                Value::integer(20),
            ],
            vec![
                Value::text("POST"),
                Value::integer(1),
                Value::integer(30),
                Value::float(30.0),
                Value::integer(30),
            ],
            vec![
                Value::text("get"),
                Value::integer(1),
                Value::integer(40),
                Value::float(40.0),
                Value::integer(40),
            ],
            vec![
                Value::text("PUT"),
                Value::integer(1),
                Value::integer(5),
                Value::float(5.0),
                Value::integer(5),
            ],
        ]
    );
}

#[test]
fn test_case_insensitive_grouping_keeps_first_spelling() {
    let plan = by_method(
        sample(),
        vec![
            SelectItem::expr(Expr::col("method")),
            SelectItem::expr(Expr::call("sum", vec![Expr::col("ms")])),
        ],
        None,
    );
    let executor = Executor::new(QueryConfig::new().with_case_insensitive(true));
    assert_eq!(
        executor.execute(&plan).unwrap().values(),
        vec![
            vec![Value::text("GET"), Value::integer(70)],
            vec![Value::text("POST"), Value::integer(30)],
            vec![Value::text("PUT"), Value::integer(5)],
        ]
    );
}

#[test]
fn test_having_filters_groups() {
    let plan = by_method(
        sample(),
        vec![
            SelectItem::expr(Expr::col("method")),
            SelectItem::aliased(count(), "n"),
        ],
        Some(Expr::binary(BinaryOp::Gt, count(), Expr::lit(1))),
    );
    assert_eq!(
        Executor::default().execute(&plan).unwrap().values(),
        vec![vec![Value::text("GET"), Value::integer(2)]]
    );

    // An aggregate only HAVING uses still accumulates
    let plan = by_method(
        sample(),
        vec![SelectItem::expr(Expr::col("method"))],
        Some(Expr::binary(
            BinaryOp::Gt,
            Expr::call("max", vec![Expr::col("ms")]),
            Expr::lit(25),
        )),
    );
    assert_eq!(
        Executor::default().execute(&plan).unwrap().values(),
        vec![vec![Value::text("POST")], vec![Value::text("get")]]
    );
}

#[test]
fn test_having_rejects_lag() {
    let plan = by_method(
        sample(),
        vec![SelectItem::expr(Expr::col("method"))],
        Some(Expr::binary(
            BinaryOp::Gt,
            Expr::call("lag", vec![Expr::col("ms")]),
            Expr::lit(0),
        )),
    );
    let err = Executor::default().execute(&plan).unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)), "{:?}", err);
}

#[test]
fn test_non_key_column_must_be_invariant() {
    let plan = by_method(
        sample(),
        vec![
            SelectItem::expr(Expr::col("method")),
            SelectItem::expr(Expr::col("ms")),
        ],
        None,
    );
    let err = Executor::default().execute(&plan).unwrap_err();
    match err {
        Error::GroupInvariance { expression } => assert_eq!(expression, "ms"),
        other => panic!("unexpected error {:?}", other),
    }

    // Constant per group is fine
    let plan = by_method(
        requests(&[("GET", 1), ("POST", 2), ("GET", 1)]),
        vec![
            SelectItem::expr(Expr::col("method")),
            SelectItem::expr(Expr::col("ms")),
        ],
        None,
    );
    assert_eq!(Executor::default().execute(&plan).unwrap().len(), 2);
}

#[test]
fn test_empty_input() {
    let empty = || requests(&[]);

    let plan = empty().group_by(
        vec![],
        vec![
            SelectItem::expr(count()),
            SelectItem::expr(Expr::call("sum", vec![Expr::col("ms")])),
            SelectItem::expr(Expr::call("avg", vec![Expr::col("ms")])),
            SelectItem::expr(Expr::call("max", vec![Expr::col("method")])),
        ],
        None,
    );
    assert_eq!(
        Executor::default().execute(&plan).unwrap().values(),
        vec![vec![
            Value::integer(0),
            Value::integer(0),
            Value::float(0.0),
            Value::text(""),
        ]]
    );

    let plan = by_method(empty(), vec![SelectItem::expr(count())], None);
    assert!(Executor::default().execute(&plan).unwrap().is_empty());
}

#[test]
fn test_lag_in_aggregate_argument_sees_every_row() {
    // LAG steps over the whole stream, not per group
    let plan = by_method(
        requests(&[("a", 1), ("b", 2), ("a", 3), ("b", 4)]),
        vec![
            SelectItem::expr(Expr::col("method")),
            SelectItem::expr(Expr::call(
                "sum",
                vec![Expr::call("lag", vec![Expr::col("ms"), Expr::lit(1), Expr::lit(0)])],
            )),
        ],
        None,
    );
    assert_eq!(
        Executor::default().execute(&plan).unwrap().values(),
        vec![
            vec![Value::text("a"), Value::integer(2)],
            vec![Value::text("b"), Value::integer(4)],
        ]
    );
}

#[test]
fn test_lag_in_projection() {
    let delta = Expr::binary(
        BinaryOp::Sub,
        Expr::col("ms"),
        Expr::call("lag", vec![Expr::col("ms"), Expr::lit(1), Expr::lit("10")]),
    );
    let plan = requests(&[("a", 10), ("a", 15), ("a", 11)])
        .project(vec![SelectItem::aliased(delta, "delta")]);
    let values: Vec<i64> = Executor::default()
        .execute(&plan)
        .unwrap()
        .values()
        .into_iter()
        .map(|r| r[0].as_int64().unwrap())
        .collect();
    assert_eq!(values, vec![0, 5, -4]);
}

#[test]
fn test_lag_rejected_in_where() {
    let plan = sample().filter(Expr::binary(
        BinaryOp::Gt,
        Expr::call("lag", vec![Expr::col("ms")]),
        Expr::lit(0),
    ));
    assert!(matches!(
        Executor::default().execute(&plan).unwrap_err(),
        Error::InvalidQuery(_)
    ));
}

#[test]
fn test_key_by_output_ordinal() {
    let plan = sample().group_by(
        vec![GroupingKey::new(Expr::lit(1))],
        vec![
            SelectItem::aliased(
                Expr::call("upper", vec![Expr::col("method")]),
                "verb",
            ),
            SelectItem::expr(count()),
        ],
        None,
    );
    let output = Executor::default().execute(&plan).unwrap();
    assert_eq!(output.column_names(), vec!["verb", "COUNT()"]);
    assert_eq!(
        output.values(),
        vec![
            vec![Value::text("GET"), Value::integer(3)],
            vec![Value::text("POST"), Value::integer(1)],
            vec![Value::text("PUT"), Value::integer(1)],
        ]
    );
}

#[test]
fn test_distinct_count() {
    let plan = sample().group_by(
        vec![],
        vec![SelectItem::expr(Expr::call(
            "distinctcount",
            vec![Expr::col("method")],
        ))],
        None,
    );
    let count = |config: QueryConfig| {
        Executor::new(config).execute(&plan).unwrap().values()[0][0].clone()
    };
    assert_eq!(count(QueryConfig::new()), Value::integer(4));
    assert_eq!(
        count(QueryConfig::new().with_case_insensitive(true)),
        Value::integer(3)
    );
}

fn tagged_lines(rows: &[(&str, &str)]) -> QueryPlan {
    QueryPlan::source(SourceRef::memory(
        "tagged",
        Schema::typed(&[("k", DataType::Text), ("line", DataType::Text)]),
        rows.iter()
            .map(|(k, line)| vec![Value::text(*k), Value::text(*line)])
            .collect(),
    ))
}

/// SUM(CONVERT(EXTRACT(line, 'n=(\d+)'), INTEGER))
fn extracted_sum() -> Expr {
    Expr::call(
        "sum",
        vec![Expr::call("extract", vec![Expr::col("line"), Expr::lit(r"n=(\d+)")])
            .convert(DataType::Integer)],
    )
}

#[test]
fn test_skipped_row_leaves_groups_untouched() {
    // COUNT comes before the skipping aggregate and must not see the row
    let plan = tagged_lines(&[("A", "n=1"), ("A", "none"), ("B", "none")]).group_by(
        vec![GroupingKey::new(Expr::col("k"))],
        vec![
            SelectItem::expr(Expr::col("k")),
            SelectItem::expr(count()),
            SelectItem::expr(extracted_sum()),
        ],
        None,
    );
    let executor =
        Executor::new(QueryConfig::new().with_no_match_policy(NoMatchPolicy::SkipRow));
    assert_eq!(
        executor.execute(&plan).unwrap().values(),
        vec![vec![Value::text("A"), Value::integer(1), Value::integer(1)]]
    );

    // Under the default policy the same query fails
    assert!(Executor::default().execute(&plan).is_err());
}

#[test]
fn test_all_rows_skipped_without_keys() {
    let plan = tagged_lines(&[("A", "none"), ("B", "none")]).group_by(
        vec![],
        vec![SelectItem::expr(count()), SelectItem::expr(extracted_sum())],
        None,
    );
    let executor =
        Executor::new(QueryConfig::new().with_no_match_policy(NoMatchPolicy::SkipRow));
    assert_eq!(
        executor.execute(&plan).unwrap().values(),
        vec![vec![Value::integer(0), Value::integer(0)]]
    );
}

#[test]
fn test_lag_with_largest_offset_returns_default() {
    let plan = sample().project(vec![SelectItem::expr(Expr::call(
        "lag",
        vec![Expr::col("ms"), Expr::lit(i64::MAX), Expr::lit(-1)],
    ))]);
    let values = Executor::default().execute(&plan).unwrap().values();
    assert_eq!(values.len(), 5);
    assert!(values.iter().all(|row| row[0] == Value::integer(-1)));
}
