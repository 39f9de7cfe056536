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

//! Order-by stage

use std::cmp::Ordering;
use std::collections::VecDeque;

use crate::core::{Comparer, Error, Result, Row, Schema, Value};
use crate::executor::context::{ExecutionContext, RowContext};
use crate::executor::expression::Expression;
use crate::executor::provider::{Provider, ProviderState};

use super::{initialized, skippable};

/// Direction of one sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
    /// Keep upstream order; marks the clustering key of a streaming
    /// group-by downstream
    Preserve,
}

/// A bound sort key
pub struct SortKey {
    pub expr: Expression,
    pub order: SortOrder,
}

impl SortKey {
    pub fn new(expr: Expression, order: SortOrder) -> Self {
        Self { expr, order }
    }
}

struct SortEntry {
    prefix: Vec<Value>,
    keys: Vec<Value>,
    row: Row,
}

/// Stable multi-key sort.
///
/// Without Preserve keys the whole input is buffered and sorted. Preserve
/// keys must form a prefix of the key list; the input is then cut into
/// contiguous runs of equal prefix values and each run is sorted on its
/// own, so only one run is buffered at a time.
pub struct OrderByProvider {
    input: Box<dyn Provider>,
    preserve: Vec<Expression>,
    keys: Vec<(Expression, SortOrder)>,
    /// First row of the next run, pulled while closing the current one
    pending: Option<SortEntry>,
    output: VecDeque<Row>,
    input_done: bool,
    ctx: Option<ExecutionContext>,
    current: Row,
    state: ProviderState,
}

impl OrderByProvider {
    pub fn new(input: Box<dyn Provider>, keys: Vec<SortKey>) -> Result<Self> {
        let mut preserve = Vec::new();
        let mut sort = Vec::new();
        for key in keys {
            match key.order {
                SortOrder::Preserve if sort.is_empty() => preserve.push(key.expr),
                SortOrder::Preserve => {
                    return Err(Error::invalid_query(
                        "ORIG order keys must precede all other order keys",
                    ))
                }
                order => sort.push((key.expr, order)),
            }
        }
        Ok(Self {
            input,
            preserve,
            keys: sort,
            pending: None,
            output: VecDeque::new(),
            input_done: false,
            ctx: None,
            current: Row::default(),
            state: ProviderState::Uninitialized,
        })
    }

    fn entry(&self, ctx: &ExecutionContext, row: Row) -> Result<Option<SortEntry>> {
        let rc = RowContext::new(ctx, &row);
        let evaluated = (|| -> Result<(Vec<Value>, Vec<Value>)> {
            let prefix = self
                .preserve
                .iter()
                .map(|e| e.evaluate(&rc))
                .collect::<Result<Vec<_>>>()?;
            let keys = self
                .keys
                .iter()
                .map(|(e, _)| e.evaluate(&rc))
                .collect::<Result<Vec<_>>>()?;
            Ok((prefix, keys))
        })();
        Ok(skippable(evaluated)?.map(|(prefix, keys)| SortEntry { prefix, keys, row }))
    }

    /// Buffer and sort the next run (the whole input without Preserve keys)
    fn fill(&mut self, ctx: &ExecutionContext) -> Result<()> {
        let mut run: Vec<SortEntry> = self.pending.take().into_iter().collect();
        while !self.input_done {
            if !self.input.next()? {
                self.input_done = true;
                break;
            }
            let row = self.input.take_row();
            let Some(entry) = self.entry(ctx, row)? else {
                continue;
            };
            if let Some(first) = run.first() {
                if !ctx.comparer().keys_equal(&first.prefix, &entry.prefix)? {
                    self.pending = Some(entry);
                    break;
                }
            }
            run.push(entry);
        }

        sort_entries(&mut run, &self.keys, ctx.comparer())?;
        log::trace!("OrderBy: sorted run of {} rows", run.len());
        self.output.extend(run.into_iter().map(|e| e.row));
        Ok(())
    }
}

fn sort_entries(
    run: &mut [SortEntry],
    keys: &[(Expression, SortOrder)],
    comparer: &Comparer,
) -> Result<()> {
    let Some((first, rest)) = run.split_first() else {
        return Ok(());
    };
    // Comparability is a relation between type classes, so checking every
    // key against the first row's covers every pair the sort can visit
    for i in 0..keys.len() {
        for entry in rest {
            comparer.compare(&first.keys[i], &entry.keys[i])?;
        }
    }
    // sort_by is stable: equal keys keep their upstream order
    run.sort_by(|a, b| {
        for (i, (_, order)) in keys.iter().enumerate() {
            // Cannot fail after the check above
            let ord = comparer
                .compare(&a.keys[i], &b.keys[i])
                .unwrap_or(Ordering::Equal);
            let ord = if *order == SortOrder::Descending {
                ord.reverse()
            } else {
                ord
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    Ok(())
}

impl Provider for OrderByProvider {
    fn initialize(&mut self, ctx: &ExecutionContext) -> Result<()> {
        self.input.initialize(ctx)?;
        self.pending = None;
        self.output.clear();
        self.input_done = false;
        self.ctx = Some(ctx.clone());
        self.state = ProviderState::Initialized;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        if self.state == ProviderState::Exhausted {
            return Ok(false);
        }
        if self.output.is_empty() {
            let ctx = initialized(&self.ctx, "OrderBy")?.clone();
            while self.output.is_empty() && (!self.input_done || self.pending.is_some()) {
                self.fill(&ctx)?;
            }
        }
        match self.output.pop_front() {
            Some(row) => {
                self.current = row;
                Ok(true)
            }
            None => {
                self.state = ProviderState::Exhausted;
                self.current = Row::default();
                Ok(false)
            }
        }
    }

    fn current_row(&self) -> &Row {
        &self.current
    }

    fn take_row(&mut self) -> Row {
        std::mem::take(&mut self.current)
    }

    fn uninitialize(&mut self) -> Result<()> {
        self.pending = None;
        self.output.clear();
        self.ctx = None;
        self.current = Row::default();
        self.state = ProviderState::Uninitialized;
        self.input.uninitialize()
    }

    fn dispose(&mut self) {
        self.pending = None;
        self.output.clear();
        self.ctx = None;
        self.current = Row::default();
        self.state = ProviderState::Uninitialized;
        self.preserve
            .iter()
            .chain(self.keys.iter().map(|(e, _)| e))
            .for_each(Expression::dispose_subqueries);
        self.input.dispose();
    }

    fn schema(&self) -> &Schema {
        self.input.schema()
    }

    fn name(&self) -> &str {
        "OrderBy"
    }
}
