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

//! Accumulator store
//!
//! A [`StateBin`] maps accumulator identities to running state. The
//! group-by stage owns one bin per group plus one for the whole stream;
//! projection owns a single stream bin. Slots are created lazily from the
//! expression's bound prototype the first time the bin sees that id.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::core::{Error, Result, Value};
use crate::functions::{AggregateFunction, StatefulFunction};

/// Stable identity of an aggregate, stateful or invariant expression node,
/// assigned once per compiled query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccumulatorId(pub u32);

impl fmt::Display for AccumulatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

enum Slot {
    Aggregate(Box<dyn AggregateFunction>),
    Stateful(Box<dyn StatefulFunction>),
    Invariant(Value),
}

/// Per-group (or per-stream) accumulator state
#[derive(Default)]
pub struct StateBin {
    slots: FxHashMap<AccumulatorId, Slot>,
}

impl StateBin {
    pub fn new() -> Self {
        Self::default()
    }

    /// The accumulator for `id`, created from `prototype` on first use
    pub fn aggregate_mut(
        &mut self,
        id: AccumulatorId,
        prototype: &dyn AggregateFunction,
    ) -> Result<&mut dyn AggregateFunction> {
        match self
            .slots
            .entry(id)
            .or_insert_with(|| Slot::Aggregate(prototype.clone_box()))
        {
            Slot::Aggregate(agg) => Ok(agg.as_mut()),
            _ => Err(slot_conflict(id)),
        }
    }

    pub fn aggregate(&self, id: AccumulatorId) -> Option<&dyn AggregateFunction> {
        match self.slots.get(&id) {
            Some(Slot::Aggregate(agg)) => Some(agg.as_ref()),
            _ => None,
        }
    }

    /// The stateful function for `id`, created from `prototype` on first use
    pub fn stateful_mut(
        &mut self,
        id: AccumulatorId,
        prototype: &dyn StatefulFunction,
    ) -> Result<&mut dyn StatefulFunction> {
        match self
            .slots
            .entry(id)
            .or_insert_with(|| Slot::Stateful(prototype.clone_box()))
        {
            Slot::Stateful(func) => Ok(func.as_mut()),
            _ => Err(slot_conflict(id)),
        }
    }

    pub fn stateful(&self, id: AccumulatorId) -> Option<&dyn StatefulFunction> {
        match self.slots.get(&id) {
            Some(Slot::Stateful(func)) => Some(func.as_ref()),
            _ => None,
        }
    }

    /// The value recorded for an invariant column, if any
    pub fn invariant(&self, id: AccumulatorId) -> Option<&Value> {
        match self.slots.get(&id) {
            Some(Slot::Invariant(value)) => Some(value),
            _ => None,
        }
    }

    /// Record the first value of an invariant column
    pub fn record_invariant(&mut self, id: AccumulatorId, value: Value) {
        self.slots.insert(id, Slot::Invariant(value));
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

fn slot_conflict(id: AccumulatorId) -> Error {
    Error::internal(format!("accumulator {} reused with a different kind", id))
}
