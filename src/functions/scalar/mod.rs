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

//! Scalar Functions
//!
//! This module provides scalar functions for query expressions:
//!
//! ## String Functions
//! - [`UpperFunction`] - UPPER(text)
//! - [`LowerFunction`] - LOWER(text)
//! - [`LenFunction`] - LEN(text)
//! - [`TrimFunction`] - TRIM(text)
//! - [`SubstrFunction`] - SUBSTR(text, start, length)
//! - [`ReplaceFunction`] - REPLACE(text, from, to)
//! - [`ConcatFunction`] - CONCAT(value, ...)
//! - [`StartsWithFunction`] - STARTSWITH(text, prefix)
//! - [`IndexOfFunction`] - INDEXOF(text, needle)
//!
//! ## Math Functions
//! - [`AbsFunction`] - ABS(number)
//! - [`RoundFunction`] - ROUND(number, digits)
//! - [`FloorFunction`] - FLOOR(number)
//! - [`CeilingFunction`] - CEILING(number)
//!
//! ## Date/Time Functions
//! - [`NowFunction`] - NOW()
//! - [`DatePartFunction`] - DATEPART(part, timestamp)
//! - [`ToUnixFunction`] - TO_UNIX(timestamp)
//!
//! ## Regex Functions
//! - [`ExtractFunction`] - EXTRACT(text, pattern, group, default)
//! - [`MatchesFunction`] - MATCHES(text, pattern)
//!
//! ## Utility Functions
//! - [`IifFunction`] - IIF(condition, then, else)
//! - [`IfEmptyFunction`] - IFEMPTY(text, fallback)

mod datetime;
mod math;
mod pattern;
mod string;
mod utility;

pub use datetime::{DatePartFunction, NowFunction, ToUnixFunction};
pub use math::{AbsFunction, CeilingFunction, FloorFunction, RoundFunction};
pub use pattern::{ExtractFunction, MatchesFunction};
pub use string::{
    ConcatFunction, IndexOfFunction, LenFunction, LowerFunction, ReplaceFunction,
    StartsWithFunction, SubstrFunction, TrimFunction, UpperFunction,
};
pub use utility::{IfEmptyFunction, IifFunction};

use std::borrow::Cow;

use crate::core::{DataType, Error, Result, Value};

use super::ArgInfo;

/// Macro to validate argument count in scalar functions
#[macro_export]
macro_rules! validate_arg_count {
    // Exact count
    ($args:expr, $name:expr, $exact:expr) => {
        if $args.len() != $exact {
            return Err($crate::core::Error::invalid_argument(format!(
                "{} requires exactly {} argument{}, got {}",
                $name,
                $exact,
                if $exact == 1 { "" } else { "s" },
                $args.len()
            )));
        }
    };
    // Range (min to max inclusive)
    ($args:expr, $name:expr, $min:expr, $max:expr) => {
        if $args.len() < $min || $args.len() > $max {
            return Err($crate::core::Error::invalid_argument(format!(
                "{} requires {} to {} arguments, got {}",
                $name,
                $min,
                $max,
                $args.len()
            )));
        }
    };
}

/// Text view of any value; text is borrowed, other types are rendered
pub fn value_to_string(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Text(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_display_string()),
    }
}

/// Integer payload of an argument the binder typed as INTEGER
pub(crate) fn value_to_i64(name: &str, value: &Value) -> Result<i64> {
    value
        .as_int64()
        .ok_or_else(|| Error::type_mismatch(format!("{} expects INTEGER", name)))
}

/// Fail unless argument `index` has type `expected`
pub(crate) fn expect_arg(
    name: &str,
    args: &[ArgInfo],
    index: usize,
    expected: DataType,
) -> Result<()> {
    match args.get(index) {
        Some(arg) if arg.data_type == expected => Ok(()),
        Some(arg) => Err(Error::type_mismatch(format!(
            "{} argument {} must be {}, got {}",
            name,
            index + 1,
            expected,
            arg.data_type
        ))),
        None => Err(Error::invalid_argument(format!(
            "{} is missing argument {}",
            name,
            index + 1
        ))),
    }
}
