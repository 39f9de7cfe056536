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

//! Comparer - the ordering, equality and hashing policy of a query
//!
//! Exactly one [`Comparer`] is created per compiled query and shared by
//! reference with every stage. All text comparisons go through it so that
//! grouping, distinct, sorting and predicates agree on what "equal" means.
//!
//! Locales:
//! - `"ordinal"` compares by code point.
//! - any other locale name compares case-folded text first and breaks
//!   ties with lowercase before uppercase (dictionary order).
//!
//! Case-insensitive mode compares and hashes the case-folded text only,
//! so values equal under the policy always hash equal.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;

use super::error::{Error, Result};
use super::value::{compare_floats, normalize_float, Value};

/// Locale name selecting plain code point ordering
pub const ORDINAL_LOCALE: &str = "ordinal";

/// Immutable comparison policy `{ locale, case_insensitive }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparer {
    locale: Arc<str>,
    case_insensitive: bool,
    dictionary: bool,
}

impl Default for Comparer {
    fn default() -> Self {
        Self::new("invariant", false)
    }
}

impl Comparer {
    /// Create a comparer for the given locale name
    pub fn new(locale: impl AsRef<str>, case_insensitive: bool) -> Self {
        let locale = locale.as_ref();
        Self {
            dictionary: !locale.eq_ignore_ascii_case(ORDINAL_LOCALE),
            locale: Arc::from(locale),
            case_insensitive,
        }
    }

    /// Code point ordering, case-sensitive
    pub fn ordinal() -> Self {
        Self::new(ORDINAL_LOCALE, false)
    }

    /// Dictionary ordering, case-insensitive
    pub fn ignore_case() -> Self {
        Self::new("invariant", true)
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    // =========================================================================
    // Text
    // =========================================================================

    /// Compare two strings under this policy
    pub fn compare_text(&self, a: &str, b: &str) -> Ordering {
        match (self.dictionary, self.case_insensitive) {
            (false, false) => a.cmp(b),
            (_, true) => fold(a).cmp(fold(b)),
            (true, false) => fold(a).cmp(fold(b)).then_with(|| b.cmp(a)),
        }
    }

    /// Text equality under this policy
    #[inline]
    pub fn text_eq(&self, a: &str, b: &str) -> bool {
        if self.case_insensitive {
            fold(a).eq(fold(b))
        } else {
            a == b
        }
    }

    /// Case-fold a string when the policy is case-insensitive
    pub fn normalize<'a>(&self, s: &'a str) -> std::borrow::Cow<'a, str> {
        if self.case_insensitive {
            std::borrow::Cow::Owned(fold(s).collect())
        } else {
            std::borrow::Cow::Borrowed(s)
        }
    }

    // =========================================================================
    // Values
    // =========================================================================

    /// Compare two values.
    ///
    /// Fails unless both values have the same type, except Integer and
    /// Float which compare numerically.
    pub fn compare(&self, a: &Value, b: &Value) -> Result<Ordering> {
        match (a, b) {
            (Value::Integer(x), Value::Integer(y)) => Ok(x.cmp(y)),
            (Value::Float(x), Value::Float(y)) => Ok(compare_floats(*x, *y)),
            (Value::Integer(x), Value::Float(y)) => Ok(compare_floats(*x as f64, *y)),
            (Value::Float(x), Value::Integer(y)) => Ok(compare_floats(*x, *y as f64)),
            (Value::Text(x), Value::Text(y)) => Ok(self.compare_text(x, y)),
            (Value::Boolean(x), Value::Boolean(y)) => Ok(x.cmp(y)),
            (Value::Timestamp(x), Value::Timestamp(y)) => Ok(x.cmp(y)),
            _ => Err(Error::incomparable(a.data_type(), b.data_type())),
        }
    }

    /// Equality under this policy
    pub fn equals(&self, a: &Value, b: &Value) -> Result<bool> {
        match (a, b) {
            (Value::Text(x), Value::Text(y)) => Ok(self.text_eq(x, y)),
            _ => Ok(self.compare(a, b)? == Ordering::Equal),
        }
    }

    /// Lexicographic comparison of two key tuples
    pub fn compare_keys(&self, a: &[Value], b: &[Value]) -> Result<Ordering> {
        for (x, y) in a.iter().zip(b) {
            let ord = self.compare(x, y)?;
            if ord != Ordering::Equal {
                return Ok(ord);
            }
        }
        Ok(a.len().cmp(&b.len()))
    }

    /// Element-wise equality of two key tuples
    pub fn keys_equal(&self, a: &[Value], b: &[Value]) -> Result<bool> {
        if a.len() != b.len() {
            return Ok(false);
        }
        for (x, y) in a.iter().zip(b) {
            if !self.equals(x, y)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // =========================================================================
    // Hashing
    // =========================================================================

    /// Feed a value into a hasher consistently with [`Comparer::equals`]
    pub fn hash_value<H: Hasher>(&self, value: &Value, state: &mut H) {
        match value {
            Value::Integer(v) => {
                1u8.hash(state);
                normalize_float(*v as f64).to_bits().hash(state);
            }
            Value::Float(v) => {
                1u8.hash(state);
                normalize_float(*v).to_bits().hash(state);
            }
            Value::Text(s) => {
                2u8.hash(state);
                if self.case_insensitive {
                    for c in fold(s) {
                        c.hash(state);
                    }
                    0xffu8.hash(state);
                } else {
                    s.hash(state);
                }
            }
            Value::Boolean(b) => {
                3u8.hash(state);
                b.hash(state);
            }
            Value::Timestamp(t) => {
                4u8.hash(state);
                t.timestamp_nanos_opt().hash(state);
            }
        }
    }

    /// Hash a key tuple with FxHash
    pub fn hash_key(&self, values: &[Value]) -> u64 {
        let mut hasher = FxHasher::default();
        for value in values {
            self.hash_value(value, &mut hasher);
        }
        hasher.finish()
    }
}

#[inline]
fn fold(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase)
}
