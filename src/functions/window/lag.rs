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

//! LAG stateful function

use std::collections::VecDeque;

use crate::core::Value;
use crate::functions::StatefulFunction;

/// Slots reserved up front; larger offsets grow the ring as rows arrive
const PREALLOCATED_SLOTS: usize = 64;

/// LAG stateful function
///
/// Returns the value seen `offset` rows before the current row of the
/// stream, or the default value while fewer rows have been seen. Keeps a
/// ring of the last `offset + 1` inputs.
#[derive(Clone)]
pub struct LagFunction {
    offset: usize,
    default_value: Value,
    ring: VecDeque<Value>,
}

impl LagFunction {
    /// Create a new LAG function with the specified offset and default value
    pub fn new(offset: usize, default_value: Value) -> Self {
        Self {
            offset,
            default_value,
            ring: VecDeque::with_capacity(offset.min(PREALLOCATED_SLOTS) + 1),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn window(&self) -> usize {
        self.offset.saturating_add(1)
    }
}

impl StatefulFunction for LagFunction {
    fn name(&self) -> &str {
        "LAG"
    }

    fn step(&mut self, value: Value) {
        self.ring.push_back(value);
        if self.ring.len() > self.window() {
            self.ring.pop_front();
        }
    }

    fn current(&self) -> Value {
        if self.ring.len() == self.window() {
            if let Some(oldest) = self.ring.front() {
                return oldest.clone();
            }
        }
        self.default_value.clone()
    }

    fn reset(&mut self) {
        self.ring.clear();
    }

    fn clone_box(&self) -> Box<dyn StatefulFunction> {
        Box::new(LagFunction::new(self.offset, self.default_value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lag_offset_one() {
        let mut lag = LagFunction::new(1, Value::Integer(-1));
        let mut out = Vec::new();
        for v in [10, 20, 30] {
            lag.step(Value::Integer(v));
            out.push(lag.current());
        }
        assert_eq!(
            out,
            vec![Value::Integer(-1), Value::Integer(10), Value::Integer(20)]
        );
    }

    #[test]
    fn test_lag_offset_two() {
        let mut lag = LagFunction::new(2, Value::text(""));
        let mut out = Vec::new();
        for v in ["a", "b", "c", "d"] {
            lag.step(Value::text(v));
            out.push(lag.current());
        }
        assert_eq!(
            out,
            vec![
                Value::text(""),
                Value::text(""),
                Value::text("a"),
                Value::text("b")
            ]
        );
    }

    #[test]
    fn test_lag_offset_zero_is_current() {
        let mut lag = LagFunction::new(0, Value::Integer(0));
        lag.step(Value::Integer(7));
        assert_eq!(lag.current(), Value::Integer(7));
    }

    #[test]
    fn test_lag_huge_offset_keeps_default() {
        for offset in [usize::MAX, i64::MAX as usize, 5_000_000_000] {
            let mut lag = LagFunction::new(offset, Value::Integer(-1));
            assert!(lag.ring.capacity() <= 2 * (PREALLOCATED_SLOTS + 1));
            for v in 0..10 {
                lag.step(Value::Integer(v));
            }
            assert_eq!(lag.current(), Value::Integer(-1));
            assert_eq!(lag.clone_box().current(), Value::Integer(-1));
        }
    }

    #[test]
    fn test_lag_reset() {
        let mut lag = LagFunction::new(1, Value::Integer(0));
        lag.step(Value::Integer(1));
        lag.step(Value::Integer(2));
        lag.reset();
        lag.step(Value::Integer(3));
        assert_eq!(lag.current(), Value::Integer(0));
    }
}
