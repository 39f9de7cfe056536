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

// Expression operators
//
// Operator enums plus the value-level arithmetic, comparison and LIKE
// matching that bound expressions dispatch to. Operands arrive already
// converted to a common type by the binder.

use std::cmp::Ordering;
use std::fmt;

use regex::Regex;

use crate::core::{Comparer, Error, Result, Value};

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation
    Neg,
    /// Logical NOT
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "NOT "),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Apply an arithmetic operator.
///
/// Integers use checked arithmetic; Text `+` concatenates.
pub fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => integer_arithmetic(op, *a, *b),
        (Value::Text(a), Value::Text(b)) if op == BinaryOp::Add => {
            let mut s = String::with_capacity(a.len() + b.len());
            s.push_str(a);
            s.push_str(b);
            Ok(Value::text(s))
        }
        (l, r) => match (l.as_float64(), r.as_float64()) {
            (Some(a), Some(b)) if l.data_type().is_numeric() && r.data_type().is_numeric() => {
                float_arithmetic(op, a, b)
            }
            _ => Err(Error::type_mismatch(format!(
                "operator {} cannot be applied to {} and {}",
                op,
                l.data_type(),
                r.data_type()
            ))),
        },
    }
}

fn integer_arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<Value> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(Error::DivisionByZero);
            }
            a.checked_div(b)
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(Error::DivisionByZero);
            }
            a.checked_rem(b)
        }
        _ => return Err(Error::internal(format!("{} is not arithmetic", op))),
    };
    result.map(Value::Integer).ok_or(Error::IntegerOverflow)
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> Result<Value> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::Mod if b == 0.0 => return Err(Error::DivisionByZero),
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        _ => return Err(Error::internal(format!("{} is not arithmetic", op))),
    };
    Ok(Value::Float(result))
}

/// Apply a comparison operator through the comparer
pub fn comparison(op: BinaryOp, left: &Value, right: &Value, comparer: &Comparer) -> Result<bool> {
    Ok(match op {
        BinaryOp::Eq => comparer.equals(left, right)?,
        BinaryOp::NotEq => !comparer.equals(left, right)?,
        _ => {
            let ord = comparer.compare(left, right)?;
            match op {
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::LtEq => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                BinaryOp::GtEq => ord != Ordering::Less,
                _ => return Err(Error::internal(format!("{} is not a comparison", op))),
            }
        }
    })
}

/// Arithmetic negation
pub fn negate(value: &Value) -> Result<Value> {
    match value {
        Value::Integer(i) => i.checked_neg().map(Value::Integer).ok_or(Error::IntegerOverflow),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(Error::type_mismatch(format!(
            "cannot negate {}",
            other.data_type()
        ))),
    }
}

/// Boolean payload of a value the binder typed as BOOLEAN
#[inline]
pub fn truthy(value: &Value) -> Result<bool> {
    value
        .as_boolean()
        .ok_or_else(|| Error::type_mismatch(format!("expected BOOLEAN, got {}", value.data_type())))
}

/// Compiled LIKE pattern for fast matching
///
/// Case-insensitive patterns are folded at compile time; the text is folded
/// through the comparer at match time.
#[derive(Debug, Clone)]
pub enum LikePattern {
    /// Exact match (no wildcards)
    Exact(String),
    /// Prefix match: "abc%"
    Prefix(String),
    /// Suffix match: "%abc"
    Suffix(String),
    /// Contains match: "%abc%"
    Contains(String),
    /// Match all: "%"
    MatchAll,
    /// Complex pattern requiring regex
    Regex(Regex),
}

impl LikePattern {
    /// Compile a LIKE pattern (`%` any run, `_` one character)
    pub fn compile(pattern: &str, comparer: &Comparer) -> Result<Self> {
        let pat = comparer.normalize(pattern).into_owned();
        let has_underscore = pat.contains('_');
        let wildcards = pat.matches('%').count();

        if pat == "%" {
            return Ok(LikePattern::MatchAll);
        }
        if !has_underscore {
            if wildcards == 0 {
                return Ok(LikePattern::Exact(pat));
            }
            if wildcards == 1 && pat.ends_with('%') {
                return Ok(LikePattern::Prefix(pat[..pat.len() - 1].to_string()));
            }
            if wildcards == 1 && pat.starts_with('%') {
                return Ok(LikePattern::Suffix(pat[1..].to_string()));
            }
            if wildcards == 2 && pat.len() > 2 && pat.starts_with('%') && pat.ends_with('%') {
                return Ok(LikePattern::Contains(pat[1..pat.len() - 1].to_string()));
            }
        }

        let regex = format!("(?s)^{}$", Self::like_to_regex(&pat));
        Regex::new(&regex)
            .map(LikePattern::Regex)
            .map_err(|e| Error::invalid_argument(format!("invalid LIKE pattern '{}': {}", pattern, e)))
    }

    fn like_to_regex(pattern: &str) -> String {
        let mut result = String::with_capacity(pattern.len() * 2);
        for c in pattern.chars() {
            match c {
                '%' => result.push_str(".*"),
                '_' => result.push('.'),
                _ => result.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
        result
    }

    /// Match a string against this pattern
    pub fn matches(&self, text: &str, comparer: &Comparer) -> bool {
        let text = comparer.normalize(text);
        match self {
            LikePattern::Exact(p) => text.as_ref() == p,
            LikePattern::Prefix(p) => text.starts_with(p.as_str()),
            LikePattern::Suffix(p) => text.ends_with(p.as_str()),
            LikePattern::Contains(p) => text.contains(p.as_str()),
            LikePattern::MatchAll => true,
            LikePattern::Regex(re) => re.is_match(&text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_arithmetic() {
        let r = arithmetic(BinaryOp::Add, &Value::integer(2), &Value::integer(3)).unwrap();
        assert_eq!(r, Value::integer(5));
        let r = arithmetic(BinaryOp::Div, &Value::integer(7), &Value::integer(2)).unwrap();
        assert_eq!(r, Value::integer(3));
        assert!(matches!(
            arithmetic(BinaryOp::Mod, &Value::integer(7), &Value::integer(0)),
            Err(Error::DivisionByZero)
        ));
        assert!(matches!(
            arithmetic(BinaryOp::Mul, &Value::integer(i64::MAX), &Value::integer(2)),
            Err(Error::IntegerOverflow)
        ));
    }

    #[test]
    fn test_float_and_text_arithmetic() {
        let r = arithmetic(BinaryOp::Div, &Value::float(1.0), &Value::float(4.0)).unwrap();
        assert_eq!(r, Value::float(0.25));
        assert!(matches!(
            arithmetic(BinaryOp::Div, &Value::float(1.0), &Value::float(0.0)),
            Err(Error::DivisionByZero)
        ));
        let r = arithmetic(BinaryOp::Add, &Value::text("ab"), &Value::text("cd")).unwrap();
        assert_eq!(r, Value::text("abcd"));
        assert!(arithmetic(BinaryOp::Sub, &Value::text("a"), &Value::text("b")).is_err());
    }

    #[test]
    fn test_comparison_uses_comparer() {
        let ci = Comparer::ignore_case();
        assert!(comparison(BinaryOp::Eq, &Value::text("GET"), &Value::text("get"), &ci).unwrap());
        let cs = Comparer::ordinal();
        assert!(!comparison(BinaryOp::Eq, &Value::text("GET"), &Value::text("get"), &cs).unwrap());
        assert!(comparison(BinaryOp::Lt, &Value::integer(1), &Value::float(1.5), &cs).unwrap());
        assert!(comparison(BinaryOp::Lt, &Value::integer(1), &Value::text("x"), &cs).is_err());
    }

    #[test]
    fn test_like_patterns() {
        let cs = Comparer::default();
        let check = |p: &str, t: &str| LikePattern::compile(p, &cs).unwrap().matches(t, &cs);
        assert!(check("abc", "abc"));
        assert!(check("ab%", "abcdef"));
        assert!(check("%ef", "abcdef"));
        assert!(check("%cd%", "abcdef"));
        assert!(check("%", ""));
        assert!(check("a_c", "abc"));
        assert!(check("a.c%", "a.cz"));
        assert!(!check("a.c", "abc"));
        assert!(!check("ab%", "xab"));

        let ci = Comparer::ignore_case();
        let p = LikePattern::compile("GET %", &ci).unwrap();
        assert!(p.matches("get /index", &ci));
    }
}
