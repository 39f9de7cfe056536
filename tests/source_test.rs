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

//! Leaf Source Tests
//!
//! File, regex and delimited sources driven through the executor.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tempfile::{NamedTempFile, TempDir};
use textsql::core::{DataType, Error, Result, Schema, Value};
use textsql::executor::{
    BinaryOp, Executor, Provider, QueryConfig, SystemValue, WarningPolicy,
};
use textsql::plan::{Expr, GroupingKey, OrderKey, QueryPlan, SelectItem, SourceRef};
use textsql::source::{DelimitedProvider, LineInput, LineProvider, RegexProvider};

const ACCESS_LOG: &str = "\
10.0.0.1 /index.html 512
10.0.0.2 /login 128
10.0.0.1 /about 256
garbage
10.0.0.3 /index.html 1024
";

fn write_log(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temp file");
    file
}

/// Access log lines split into ip, path and bytes
fn access_log(path: &Path) -> SourceRef {
    let path = path.to_path_buf();
    SourceRef::new(
        "access",
        Arc::new(move || -> Result<Box<dyn Provider>> {
            let lines = LineProvider::files([path.clone()]);
            let provider = RegexProvider::new(
                Box::new(lines),
                r"^(?P<ip>\S+) (?P<path>\S+) (?P<bytes>\d+)$",
            )?;
            Ok(Box::new(provider) as Box<dyn Provider>)
        }),
    )
}

fn lenient() -> Executor {
    Executor::new(QueryConfig::new().with_warning_policy(WarningPolicy::Continue))
}

#[test]
fn test_bytes_per_client_from_file() {
    let file = write_log(ACCESS_LOG);
    let plan = QueryPlan::source(access_log(file.path()))
        .group_by(
            vec![GroupingKey::new(Expr::col("ip"))],
            vec![
                SelectItem::expr(Expr::col("ip")),
                SelectItem::aliased(
                    Expr::call("sum", vec![Expr::col("bytes").convert(DataType::Integer)]),
                    "total",
                ),
            ],
            None,
        )
        .order_by(vec![OrderKey::desc(Expr::col("total"))]);

    let output = lenient().execute(&plan).expect("query failed");
    assert_eq!(
        output.values(),
        vec![
            vec![Value::text("10.0.0.3"), Value::integer(1024)],
            vec![Value::text("10.0.0.1"), Value::integer(768)],
            vec![Value::text("10.0.0.2"), Value::integer(128)],
        ]
    );

    // The unmatched line is reported with its position
    assert_eq!(output.warnings.len(), 1);
    assert_eq!(output.warnings[0].line_no, 4);
    assert!(output.warnings[0].source.ends_with(
        file.path().file_name().unwrap().to_str().unwrap()
    ));
}

#[test]
fn test_unmatched_line_fails_by_default() {
    let file = write_log(ACCESS_LOG);
    let plan = QueryPlan::source(access_log(file.path()));
    let err = Executor::default().execute(&plan).unwrap_err();
    assert!(matches!(err, Error::RegexNoMatch { .. }), "{:?}", err);
}

#[test]
fn test_system_values_follow_the_leaf_row() {
    let file = write_log("a\nb\n");
    let path = file.path().to_path_buf();
    let source = SourceRef::new(
        "lines",
        Arc::new(move || -> Result<Box<dyn Provider>> {
            Ok(Box::new(LineProvider::files([path.clone()])))
        }),
    );
    let plan = QueryPlan::source(source)
        .filter(Expr::col("line").equals(Expr::lit("b")))
        .project(vec![
            SelectItem::expr(Expr::System(SystemValue::LineNumber)),
            SelectItem::expr(Expr::System(SystemValue::Source)),
        ]);
    let values = Executor::default().execute(&plan).unwrap().values();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0][0], Value::integer(2));
    assert_eq!(
        values[0][1],
        Value::text(file.path().display().to_string())
    );
}

#[test]
fn test_missing_file_among_many() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let first = dir.path().join("first.log");
    std::fs::write(&first, "one\ntwo\n").unwrap();
    let missing = dir.path().join("missing.log");
    let last = dir.path().join("last.log");
    std::fs::write(&last, "three\n").unwrap();

    let paths = vec![first, missing, last];
    let source = SourceRef::new(
        "logs",
        Arc::new(move || -> Result<Box<dyn Provider>> {
            Ok(Box::new(LineProvider::files(paths.clone())))
        }),
    );
    let plan = QueryPlan::source(source).project(vec![
        SelectItem::expr(Expr::col("line")),
        SelectItem::expr(Expr::System(SystemValue::TotalLineNumber)),
    ]);

    let output = lenient().execute(&plan).unwrap();
    assert_eq!(
        output.values(),
        vec![
            vec![Value::text("one"), Value::integer(1)],
            vec![Value::text("two"), Value::integer(2)],
            vec![Value::text("three"), Value::integer(3)],
        ]
    );
    assert_eq!(output.warnings.len(), 1);
    assert!(output.warnings[0].source.ends_with("missing.log"));

    assert!(Executor::default().execute(&plan).is_err());
}

#[test]
fn test_warning_budget_is_fatal_when_spent() {
    let text = "x\ny\nz\n";
    let source = SourceRef::new(
        "digits",
        Arc::new(move || -> Result<Box<dyn Provider>> {
            let lines = LineProvider::new(vec![LineInput::text("digits", text)]);
            Ok(Box::new(RegexProvider::new(Box::new(lines), r"^\d+$")?) as Box<dyn Provider>)
        }),
    );
    let plan = QueryPlan::source(source);
    let executor = Executor::new(
        QueryConfig::new()
            .with_warning_policy(WarningPolicy::Continue)
            .with_max_warnings(2),
    );
    assert!(executor.execute(&plan).is_err());
}

#[test]
fn test_csv_source() {
    let text = "host,bytes\n\"web, 1\",10\ndb,5\n\"web, 1\",7\n";
    let source = SourceRef::new(
        "hosts.csv",
        Arc::new(move || -> Result<Box<dyn Provider>> {
            let lines = LineProvider::new(vec![LineInput::text("hosts.csv", text)]);
            let schema = Schema::typed(&[("host", DataType::Text), ("bytes", DataType::Integer)]);
            Ok(Box::new(DelimitedProvider::csv(Box::new(lines), schema).with_header(true))
                as Box<dyn Provider>)
        }),
    );
    let plan = QueryPlan::source(source).group_by(
        vec![GroupingKey::new(Expr::col("host"))],
        vec![
            SelectItem::expr(Expr::col("host")),
            SelectItem::expr(Expr::call("sum", vec![Expr::col("bytes")])),
        ],
        None,
    );
    assert_eq!(
        Executor::default().execute(&plan).unwrap().values(),
        vec![
            vec![Value::text("web, 1"), Value::integer(17)],
            vec![Value::text("db"), Value::integer(5)],
        ]
    );
}

#[test]
fn test_cancellation_stops_a_stream() {
    let text: String = (1..=100).map(|i| format!("{}\n", i)).collect();
    let source = SourceRef::new(
        "numbers",
        Arc::new(move || -> Result<Box<dyn Provider>> {
            Ok(Box::new(LineProvider::text("numbers", text.clone())) as Box<dyn Provider>)
        }),
    );
    let plan = QueryPlan::source(source).filter(Expr::binary(
        BinaryOp::Gt,
        Expr::col("line").convert(DataType::Integer),
        Expr::lit(0),
    ));

    let executor = Executor::default();
    let mut stream = executor.stream(&plan).unwrap();
    assert!(stream.next().unwrap().is_ok());
    executor.cancellation().cancel();
    let err = stream.next().unwrap().unwrap_err();
    assert!(matches!(err, Error::Interrupted), "{:?}", err);
    assert!(stream.next().is_none());

    executor.cancellation().reset();
    assert_eq!(executor.execute(&plan).unwrap().len(), 100);
}
