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

//! Group-by and sort throughput over in-memory rows
//!
//! Run with: cargo bench --bench group_by

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use textsql::core::{DataType, Schema, Value};
use textsql::executor::Executor;
use textsql::plan::{Expr, GroupingKey, OrderKey, QueryPlan, SelectItem, SourceRef};

const ROW_COUNT: usize = 100_000;
const HOSTS: usize = 500;

fn setup_source() -> SourceRef {
    let rows = (0..ROW_COUNT)
        .map(|i| {
            vec![
                Value::text(format!("host-{}", i % HOSTS)),
                Value::integer((i % 4096) as i64),
            ]
        })
        .collect();
    SourceRef::memory(
        "requests",
        Schema::typed(&[("host", DataType::Text), ("bytes", DataType::Integer)]),
        rows,
    )
}

fn per_host(input: QueryPlan, key: GroupingKey) -> QueryPlan {
    input.group_by(
        vec![key],
        vec![
            SelectItem::expr(Expr::col("host")),
            SelectItem::expr(Expr::call("count", vec![])),
            SelectItem::expr(Expr::call("sum", vec![Expr::col("bytes")])),
            SelectItem::expr(Expr::call("avg", vec![Expr::col("bytes")])),
        ],
        None,
    )
}

fn bench_hash_group_by(c: &mut Criterion) {
    let executor = Executor::default();
    let plan = per_host(
        QueryPlan::source(setup_source()),
        GroupingKey::new(Expr::col("host")),
    );

    let mut group = c.benchmark_group("GROUP BY (hash)");
    group.bench_function("textsql", |b| {
        b.iter(|| {
            let output = executor.execute(black_box(&plan)).unwrap();
            assert_eq!(output.len(), HOSTS);
        })
    });
    group.finish();
}

fn bench_streaming_group_by(c: &mut Criterion) {
    let executor = Executor::default();
    let plan = per_host(
        QueryPlan::source(setup_source()).order_by(vec![OrderKey::asc(Expr::col("host"))]),
        GroupingKey::orig(Expr::col("host")),
    );

    let mut group = c.benchmark_group("GROUP BY (sorted, ORIG key)");
    group.bench_function("textsql", |b| {
        b.iter(|| {
            let output = executor.execute(black_box(&plan)).unwrap();
            assert_eq!(output.len(), HOSTS);
        })
    });
    group.finish();
}

fn bench_order_by_top(c: &mut Criterion) {
    let executor = Executor::default();
    let plan = QueryPlan::source(setup_source())
        .order_by(vec![OrderKey::desc(Expr::col("bytes"))])
        .top(10);

    let mut group = c.benchmark_group("ORDER BY + TOP");
    group.bench_function("textsql", |b| {
        b.iter(|| {
            let output = executor.execute(black_box(&plan)).unwrap();
            assert_eq!(output.len(), 10);
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_hash_group_by,
    bench_streaming_group_by,
    bench_order_by_top
);
criterion_main!(benches);
