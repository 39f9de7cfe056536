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

//! End-to-end Scenario Tests
//!
//! Whole pipelines built from plans and run through the executor.

use textsql::core::{DataType, Schema, Value};
use textsql::executor::expression::BinaryOp;
use textsql::executor::{Executor, SubqueryKind};
use textsql::plan::{Expr, GroupingKey, OrderKey, QueryPlan, SelectItem, SourceRef};

fn texts(name: &str, column: &str, values: &[&str]) -> QueryPlan {
    QueryPlan::source(SourceRef::memory(
        name,
        Schema::typed(&[(column, DataType::Text)]),
        values.iter().map(|v| vec![Value::text(*v)]).collect(),
    ))
}

fn ints(values: &[i64]) -> QueryPlan {
    QueryPlan::source(SourceRef::memory(
        "ints",
        Schema::typed(&[("n", DataType::Integer)]),
        values.iter().map(|v| vec![Value::integer(*v)]).collect(),
    ))
}

fn pairs() -> QueryPlan {
    QueryPlan::source(SourceRef::memory(
        "pairs",
        Schema::typed(&[("k", DataType::Text), ("v", DataType::Integer)]),
        vec![
            vec![Value::text("A"), Value::integer(1)],
            vec![Value::text("A"), Value::integer(2)],
            vec![Value::text("B"), Value::integer(3)],
        ],
    ))
}

fn run(plan: &QueryPlan) -> Vec<Vec<Value>> {
    Executor::default()
        .execute(plan)
        .expect("query failed")
        .values()
}

fn column(rows: Vec<Vec<Value>>) -> Vec<i64> {
    rows.into_iter()
        .map(|r| r[0].as_int64().expect("integer column"))
        .collect()
}

#[test]
fn test_count_without_group_by() {
    let plan = texts("lines", "line", &["17", "22"]).project(vec![SelectItem::expr(
        Expr::call("count", vec![Expr::lit(1)]),
    )]);
    assert_eq!(run(&plan), vec![vec![Value::integer(2)]]);
}

#[test]
fn test_group_by_sum_in_first_seen_order() {
    let plan = pairs().group_by(
        vec![GroupingKey::new(Expr::ordinal(1))],
        vec![
            SelectItem::expr(Expr::ordinal(1)),
            SelectItem::expr(Expr::call("sum", vec![Expr::ordinal(2)])),
        ],
        None,
    );
    assert_eq!(
        run(&plan),
        vec![
            vec![Value::text("A"), Value::integer(3)],
            vec![Value::text("B"), Value::integer(3)],
        ]
    );
}

#[test]
fn test_order_by_descending() {
    let plan = pairs().order_by(vec![OrderKey::desc(Expr::col("v"))]);
    assert_eq!(
        run(&plan),
        vec![
            vec![Value::text("B"), Value::integer(3)],
            vec![Value::text("A"), Value::integer(2)],
            vec![Value::text("A"), Value::integer(1)],
        ]
    );
}

#[test]
fn test_distinct() {
    assert_eq!(column(run(&ints(&[1, 1, 2, 1, 2]).distinct())), vec![1, 2]);
}

#[test]
fn test_top_and_bottom() {
    assert_eq!(column(run(&ints(&[5, 4, 3, 2, 1]).top(2))), vec![5, 4]);
    assert_eq!(column(run(&ints(&[5, 4, 3, 2, 1]).bottom(2))), vec![2, 1]);
}

/// Rows of `inner` whose key equals the current outer row's key
fn correlated_count(inner: QueryPlan) -> Expr {
    Expr::subquery(
        SubqueryKind::Scalar,
        inner
            .alias("inner")
            .filter(Expr::col("inner.k").equals(Expr::col("outer.k")))
            .project(vec![SelectItem::expr(Expr::call("count", vec![]))]),
    )
}

#[test]
fn test_correlated_subquery_count() {
    let outer = texts("outer", "k", &["A", "A", "B"]).alias("outer");

    let plan = outer
        .clone()
        .project(vec![SelectItem::expr(correlated_count(texts(
            "inner",
            "k",
            &["A", "A", "A", "B"],
        )))]);
    assert_eq!(column(run(&plan)), vec![3, 3, 1]);

    // Correlated against the outer table itself
    let plan = outer.project(vec![SelectItem::expr(correlated_count(texts(
        "inner",
        "k",
        &["A", "A", "B"],
    )))]);
    assert_eq!(column(run(&plan)), vec![2, 2, 1]);
}

#[test]
fn test_filter_project_order_pipeline() {
    // SELECT k, v * 10 AS scaled WHERE v >= 2 ORDER BY scaled
    let plan = pairs()
        .filter(Expr::binary(BinaryOp::GtEq, Expr::col("v"), Expr::lit(2)))
        .project(vec![
            SelectItem::expr(Expr::col("k")),
            SelectItem::aliased(
                Expr::binary(BinaryOp::Mul, Expr::col("v"), Expr::lit(10)),
                "scaled",
            ),
        ])
        .order_by(vec![OrderKey::asc(Expr::col("scaled"))]);
    let output = Executor::default().execute(&plan).unwrap();
    assert_eq!(output.column_names(), vec!["k", "scaled"]);
    assert_eq!(
        output.values(),
        vec![
            vec![Value::text("A"), Value::integer(20)],
            vec![Value::text("B"), Value::integer(30)],
        ]
    );
    assert!(output.warnings.is_empty());
}

#[test]
fn test_row_stream() {
    let executor = Executor::default();
    let mut stream = executor.stream(&ints(&[3, 1, 2]).top(2)).unwrap();
    assert_eq!(stream.schema().len(), 1);
    let first = stream.next().unwrap().unwrap();
    assert_eq!(first[0], Value::integer(3));
    assert_eq!(first.line_no(), 1);
    assert!(stream.next().unwrap().is_ok());
    assert!(stream.next().is_none());
    assert!(stream.next().is_none());
}

#[test]
fn test_plan_runs_twice() {
    let executor = Executor::default();
    let plan = pairs().group_by(
        vec![GroupingKey::new(Expr::col("k"))],
        vec![
            SelectItem::expr(Expr::col("k")),
            SelectItem::expr(Expr::call("count", vec![])),
        ],
        None,
    );
    let first = executor.execute(&plan).unwrap().values();
    let second = executor.execute(&plan).unwrap().values();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}
