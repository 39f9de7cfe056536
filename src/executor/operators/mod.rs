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

//! Pipeline stages.
//!
//! Every stage implements [`Provider`](super::Provider) and exclusively owns
//! the stages it wraps.
//!
//! # Available Stages
//!
//! | Stage | Behavior |
//! |-------|----------|
//! | [`FilterProvider`] | Streams rows matching a predicate |
//! | [`ProjectionProvider`] | Streams computed columns, steps LAG-style state |
//! | [`DistinctProvider`] | Streams first occurrences, remembers every key |
//! | [`TopProvider`] | Streams the first N rows, then stops pulling |
//! | [`BottomProvider`] | Drains input, emits the last N rows |
//! | [`OrderByProvider`] | Drains input (or each preserved run), sorts stably |
//! | [`GroupByProvider`] | Hash grouping, or streaming per ORIG run |
//! | [`MergeProvider`] | Concatenates inputs, one open at a time |
//! | [`NamedScopeProvider`] | Qualifies columns with an alias |
//! | [`ParameterizedScopeProvider`] | Binds view arguments for its input |

pub mod distinct;
pub mod filter;
pub mod group_by;
pub mod limit;
pub mod merge;
pub mod order_by;
pub mod projection;
pub mod scope;

pub use distinct::DistinctProvider;
pub use filter::FilterProvider;
pub use group_by::{GroupByProvider, GroupKey};
pub use limit::{BottomProvider, TopProvider};
pub use merge::MergeProvider;
pub use order_by::{OrderByProvider, SortKey, SortOrder};
pub use projection::ProjectionProvider;
pub use scope::{NamedScopeProvider, ParameterizedScopeProvider};

use crate::core::{Error, Result};

use super::context::ExecutionContext;

/// The context a stage stored at `initialize`
#[inline]
pub(crate) fn initialized<'a>(
    ctx: &'a Option<ExecutionContext>,
    stage: &str,
) -> Result<&'a ExecutionContext> {
    ctx.as_ref()
        .ok_or_else(|| Error::internal(format!("{} pulled before initialize", stage)))
}

/// Turn a row-skip signal into `Ok(None)`
#[inline]
pub(crate) fn skippable<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_row_skip() => Ok(None),
        Err(e) => Err(e),
    }
}
