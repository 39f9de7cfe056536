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

//! Aggregate Functions
//!
//! This module provides the aggregate functions:
//!
//! - [`CountFunction`] - COUNT(expr)
//! - [`SumFunction`] - SUM(numeric)
//! - [`MinFunction`] - MIN(expr)
//! - [`MaxFunction`] - MAX(expr)
//! - [`FirstFunction`] - FIRST(expr)
//! - [`LastFunction`] - LAST(expr)
//! - [`DistinctCountFunction`] - DISTINCTCOUNT(expr)
//!
//! AVG has no accumulator of its own: the binder compiles it into
//! `SUM(x) / COUNT(x)` over FLOAT.

mod count;
mod distinct_count;
mod first;
mod last;
mod max;
mod min;
mod sum;

pub use count::CountFunction;
pub use distinct_count::DistinctCountFunction;
pub use first::FirstFunction;
pub use last::LastFunction;
pub use max::MaxFunction;
pub use min::MinFunction;
pub use sum::SumFunction;
