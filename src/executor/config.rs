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

//! Query configuration
//!

use crate::core::Comparer;

/// What a multi-source leaf does when one source or line fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarningPolicy {
    /// Abort the query with the error
    #[default]
    Fail,
    /// Record a warning, skip the failing source or line, and continue
    Continue,
}

/// What regex extraction does when nothing matches and no default is given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoMatchPolicy {
    /// Fail the query with an evaluation error
    #[default]
    Fail,
    /// Drop the current row
    SkipRow,
}

/// Configuration options for compiling and running one query
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Locale of the query comparer ("ordinal" for code point order)
    /// Default: "invariant"
    pub locale: String,

    /// Whether text comparisons ignore case
    /// Default: false
    pub case_insensitive: bool,

    /// Per-source / per-line failure handling of leaf sources
    /// Default: Fail
    pub warning_policy: WarningPolicy,

    /// Number of recorded warnings after which the next one is fatal
    /// Default: 100
    pub max_warnings: usize,

    /// Regex extraction behavior without a match or default
    /// Default: Fail
    pub no_match_policy: NoMatchPolicy,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            locale: "invariant".to_string(),
            case_insensitive: false,
            warning_policy: WarningPolicy::Fail,
            max_warnings: 100,
            no_match_policy: NoMatchPolicy::Fail,
        }
    }
}

impl QueryConfig {
    /// Creates a new QueryConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the comparer locale
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Sets case-insensitive text comparison
    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    /// Sets the leaf source failure policy
    pub fn with_warning_policy(mut self, policy: WarningPolicy) -> Self {
        self.warning_policy = policy;
        self
    }

    /// Sets the warning budget
    pub fn with_max_warnings(mut self, max_warnings: usize) -> Self {
        self.max_warnings = max_warnings;
        self
    }

    /// Sets the regex no-match policy
    pub fn with_no_match_policy(mut self, policy: NoMatchPolicy) -> Self {
        self.no_match_policy = policy;
        self
    }

    /// Build the comparer this configuration describes
    pub fn comparer(&self) -> Comparer {
        Comparer::new(&self.locale, self.case_insensitive)
    }
}
