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

//! Regex scalar functions

use std::cell::RefCell;

use regex::Regex;
use rustc_hash::FxHashMap;

use crate::core::{DataType, Error, Result, Value};
use crate::executor::{NoMatchPolicy, QueryConfig};
use crate::functions::{ArgInfo, FunctionInfo, FunctionSignature, FunctionType, ScalarFunction};
use crate::validate_arg_count;

use super::{expect_arg, value_to_string};

// Thread-local cache for patterns that are not literals
thread_local! {
    static REGEX_CACHE: RefCell<FxHashMap<String, Regex>> = RefCell::new(FxHashMap::default());
}

/// Maximum number of cached regex patterns per thread to prevent memory bloat
const MAX_REGEX_CACHE_SIZE: usize = 100;

/// Get a cached regex or compile and cache it
fn get_or_compile_regex(pattern: &str) -> Result<Regex> {
    REGEX_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(re) = cache.get(pattern) {
            return Ok(re.clone());
        }

        let re = compile(pattern)?;

        // Evict about half the entries when full
        if cache.len() >= MAX_REGEX_CACHE_SIZE {
            let keys_to_remove: Vec<String> = cache
                .keys()
                .take(MAX_REGEX_CACHE_SIZE / 2)
                .cloned()
                .collect();
            for key in keys_to_remove {
                cache.remove(&key);
            }
        }

        cache.insert(pattern.to_string(), re.clone());
        Ok(re)
    })
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| Error::invalid_argument(format!("invalid pattern '{}': {}", pattern, e)))
}

/// The literal pattern of a call, compiled once at bind time
fn bind_pattern(name: &str, args: &[ArgInfo]) -> Result<Option<Regex>> {
    expect_arg(name, args, 1, DataType::Text)?;
    match args[1].constant.as_ref().and_then(Value::as_str) {
        Some(pattern) => compile(pattern).map(Some),
        None => Ok(None),
    }
}

/// Run `f` with the bound regex, or the cached one for a dynamic pattern
fn with_regex<T>(bound: &Option<Regex>, pattern: &Value, f: impl FnOnce(&Regex) -> T) -> Result<T> {
    match bound {
        Some(re) => Ok(f(re)),
        None => Ok(f(&get_or_compile_regex(&value_to_string(pattern))?)),
    }
}

// ============================================================================
// EXTRACT
// ============================================================================

/// EXTRACT function - returns a capture group of the first match.
///
/// `EXTRACT(text, pattern [, group [, default]])`. The group is an index or
/// a group name; it defaults to 1 when the pattern has groups, else the
/// whole match. Without a match the default is returned; without a default
/// the query's [`NoMatchPolicy`] decides between failing and skipping the
/// row.
#[derive(Default)]
pub struct ExtractFunction {
    regex: Option<Regex>,
    no_match: NoMatchPolicy,
}

impl ExtractFunction {
    fn capture(re: &Regex, text: &str, group: Option<&Value>) -> Option<String> {
        let caps = re.captures(text)?;
        let found = match group {
            Some(Value::Integer(i)) => usize::try_from(*i).ok().and_then(|i| caps.get(i)),
            Some(Value::Text(name)) => caps.name(name),
            Some(_) => None,
            None if caps.len() > 1 => caps.get(1),
            None => caps.get(0),
        };
        Some(found.map(|m| m.as_str().to_string()).unwrap_or_default())
    }
}

impl ScalarFunction for ExtractFunction {
    fn name(&self) -> &str {
        "EXTRACT"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "EXTRACT",
            FunctionType::Scalar,
            "Returns a capture group of the first regex match",
            FunctionSignature::new(2, 4),
        )
    }

    fn bind(&mut self, args: &[ArgInfo], config: &QueryConfig) -> Result<DataType> {
        self.regex = bind_pattern("EXTRACT", args)?;
        self.no_match = config.no_match_policy;
        if let Some(group) = args.get(2) {
            if !matches!(group.data_type, DataType::Integer | DataType::Text) {
                return Err(Error::type_mismatch(format!(
                    "EXTRACT group must be INTEGER or TEXT, got {}",
                    group.data_type
                )));
            }
            if let (Some(re), Some(Value::Integer(i))) = (&self.regex, &group.constant) {
                if *i < 0 || *i as usize >= re.captures_len() {
                    return Err(Error::invalid_argument(format!(
                        "EXTRACT group {} out of range",
                        i
                    )));
                }
            }
        }
        Ok(DataType::Text)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "EXTRACT", 2, 4);
        let text = value_to_string(&args[0]);
        let captured = with_regex(&self.regex, &args[1], |re| {
            Self::capture(re, &text, args.get(2))
        })?;
        match (captured, args.get(3)) {
            (Some(found), _) => Ok(Value::text(found)),
            (None, Some(default)) => Ok(Value::text(value_to_string(default).as_ref())),
            (None, None) => match self.no_match {
                NoMatchPolicy::SkipRow => Err(Error::RowSkipped),
                NoMatchPolicy::Fail => Err(Error::RegexNoMatch {
                    pattern: value_to_string(&args[1]).into_owned(),
                    input: text.into_owned(),
                }),
            },
        }
    }
}

// ============================================================================
// MATCHES
// ============================================================================

/// MATCHES function - whether the pattern matches anywhere in the text
#[derive(Default)]
pub struct MatchesFunction {
    regex: Option<Regex>,
}

impl ScalarFunction for MatchesFunction {
    fn name(&self) -> &str {
        "MATCHES"
    }

    fn info(&self) -> FunctionInfo {
        FunctionInfo::new(
            "MATCHES",
            FunctionType::Scalar,
            "Returns true when the regex matches the text",
            FunctionSignature::new(2, 2),
        )
    }

    fn bind(&mut self, args: &[ArgInfo], _config: &QueryConfig) -> Result<DataType> {
        self.regex = bind_pattern("MATCHES", args)?;
        Ok(DataType::Boolean)
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value> {
        validate_arg_count!(args, "MATCHES", 2);
        let text = value_to_string(&args[0]);
        with_regex(&self.regex, &args[1], |re| Value::Boolean(re.is_match(&text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound_extract(pattern: &str, arity: usize, policy: NoMatchPolicy) -> ExtractFunction {
        let mut args = vec![
            ArgInfo::new(DataType::Text, None),
            ArgInfo::new(DataType::Text, Some(Value::text(pattern))),
        ];
        if arity > 2 {
            args.push(ArgInfo::new(DataType::Integer, Some(Value::Integer(1))));
        }
        if arity > 3 {
            args.push(ArgInfo::new(DataType::Text, None));
        }
        let mut f = ExtractFunction::default();
        let config = QueryConfig::default().with_no_match_policy(policy);
        f.bind(&args, &config).unwrap();
        f
    }

    #[test]
    fn test_extract_first_group() {
        let f = bound_extract(r"status=(\d+)", 2, NoMatchPolicy::Fail);
        let out = f
            .evaluate(&[Value::text("GET / status=404"), Value::text(r"status=(\d+)")])
            .unwrap();
        assert_eq!(out, Value::text("404"));
    }

    #[test]
    fn test_extract_named_group() {
        let f = ExtractFunction::default();
        let out = f
            .evaluate(&[
                Value::text("user=alice id=7"),
                Value::text(r"user=(?P<name>\w+)"),
                Value::text("name"),
            ])
            .unwrap();
        assert_eq!(out, Value::text("alice"));
    }

    #[test]
    fn test_extract_default() {
        let f = bound_extract(r"(\d+)", 4, NoMatchPolicy::Fail);
        let out = f
            .evaluate(&[
                Value::text("none"),
                Value::text(r"(\d+)"),
                Value::Integer(1),
                Value::text("n/a"),
            ])
            .unwrap();
        assert_eq!(out, Value::text("n/a"));
    }

    #[test]
    fn test_extract_no_match_policies() {
        let fail = bound_extract(r"(\d+)", 2, NoMatchPolicy::Fail);
        let err = fail
            .evaluate(&[Value::text("abc"), Value::text(r"(\d+)")])
            .unwrap_err();
        assert!(matches!(err, Error::RegexNoMatch { .. }));

        let skip = bound_extract(r"(\d+)", 2, NoMatchPolicy::SkipRow);
        let err = skip
            .evaluate(&[Value::text("abc"), Value::text(r"(\d+)")])
            .unwrap_err();
        assert!(err.is_row_skip());
    }

    #[test]
    fn test_extract_bind_errors() {
        let mut f = ExtractFunction::default();
        let bad_pattern = [
            ArgInfo::new(DataType::Text, None),
            ArgInfo::new(DataType::Text, Some(Value::text("("))),
        ];
        assert!(f.bind(&bad_pattern, &QueryConfig::default()).is_err());

        let bad_group = [
            ArgInfo::new(DataType::Text, None),
            ArgInfo::new(DataType::Text, Some(Value::text("(a)"))),
            ArgInfo::new(DataType::Integer, Some(Value::Integer(2))),
        ];
        assert!(f.bind(&bad_group, &QueryConfig::default()).is_err());
    }

    #[test]
    fn test_matches_dynamic_pattern() {
        let f = MatchesFunction::default();
        assert_eq!(
            f.evaluate(&[Value::text("ERROR: disk"), Value::text("^ERROR")])
                .unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            f.evaluate(&[Value::text("INFO"), Value::text("^ERROR")])
                .unwrap(),
            Value::Boolean(false)
        );
    }
}
