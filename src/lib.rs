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

//! # textsql - SQL-style queries over text streams
//!
//! textsql runs projected, filtered, grouped, ordered and deduplicated
//! queries over lines of text instead of tables. Queries arrive as unbound
//! [`plan::QueryPlan`] trees, are bound once by the [`plan::Planner`], and run
//! as a tree of pull-based [`executor::Provider`] stages.
//!
//! ## Key Features
//!
//! - **Typed values** - INTEGER, FLOAT, TEXT, BOOLEAN, TIMESTAMP with explicit
//!   and implicit conversions
//! - **One comparer per query** - locale and case-insensitivity apply to every
//!   comparison, grouping key and distinct key
//! - **Streaming group-by** - ORIG keys bound memory to one partition
//! - **Correlated subqueries** - scalar, EXISTS, IN, ANY and ALL
//! - **Views** - named pipelines with typed parameters
//!
//! ## Quick Start
//!
//! ```rust
//! use textsql::core::{DataType, Schema, Value};
//! use textsql::executor::Executor;
//! use textsql::plan::{Expr, GroupingKey, QueryPlan, SelectItem, SourceRef};
//!
//! let source = SourceRef::memory(
//!     "sales",
//!     Schema::typed(&[("k", DataType::Text), ("v", DataType::Integer)]),
//!     vec![
//!         vec![Value::text("A"), Value::integer(1)],
//!         vec![Value::text("A"), Value::integer(2)],
//!         vec![Value::text("B"), Value::integer(3)],
//!     ],
//! );
//! let plan = QueryPlan::source(source).group_by(
//!     vec![GroupingKey::new(Expr::col("k"))],
//!     vec![
//!         SelectItem::expr(Expr::col("k")),
//!         SelectItem::expr(Expr::call("sum", vec![Expr::col("v")])),
//!     ],
//!     None,
//! );
//!
//! let output = Executor::default().execute(&plan).unwrap();
//! assert_eq!(
//!     output.values(),
//!     vec![
//!         vec![Value::text("A"), Value::integer(3)],
//!         vec![Value::text("B"), Value::integer(3)],
//!     ]
//! );
//! ```
//!
//! ## Modules
//!
//! - [`core`] - Core types ([`DataType`], [`Value`], [`Row`], [`Schema`], [`Error`])
//! - [`common`] - Key tables for grouping and distinct
//! - [`functions`] - Scalar, aggregate and stateful functions
//! - [`executor`] - Expressions, providers and pipeline stages
//! - [`plan`] - Unbound plans, views and the planner
//! - [`source`] - Line, regex and delimited leaf sources

pub mod common;
pub mod core;
pub mod executor;
pub mod functions;
pub mod plan;
pub mod source;

pub use crate::core::{ColumnName, Comparer, DataType, Error, Result, Row, Schema, Value};
pub use executor::{
    CancellationToken, ExecutionContext, Executor, Provider, QueryConfig, QueryOutput, RowStream,
    Warning,
};
pub use plan::{Expr, QueryPlan, SelectItem, SourceRef, ViewDefinition};
