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

//! Query plans and the planner
//!
//! - [`QueryPlan`] / [`Expr`] - the unbound pipeline handed over by a front end
//! - [`ViewDefinition`] / [`ViewRegistry`] - named, parameterized pipelines
//! - [`Planner`] - resolves names and types and builds the provider tree

pub mod ast;
mod binder;
pub mod planner;
pub mod view;

pub use ast::{Expr, GroupingKey, OrderKey, QueryPlan, SelectItem, SourceRef};
pub use planner::Planner;
pub use view::{ViewDefinition, ViewRegistry};
