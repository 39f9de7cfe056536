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

//! Group-by stage
//!
//! Two modes share one implementation:
//!
//! - **Full hash mode** (no ORIG keys): the whole input is consumed, every
//!   row is folded into the accumulator store of its group, and groups are
//!   emitted in first-seen order once the input is exhausted.
//! - **Streaming mode** (some keys marked ORIG): the input is assumed to
//!   arrive clustered by the ORIG keys. Hash grouping runs within each
//!   contiguous run of equal ORIG values; when the ORIG values change the
//!   run's groups are emitted and their state dropped. Clustering is not
//!   verified: a run that reappears later forms separate groups.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::common::KeyTable;
use crate::core::{ColumnName, Result, Row, Schema, Value};
use crate::executor::context::{ExecutionContext, RowContext};
use crate::executor::expression::Expression;
use crate::executor::provider::{Provider, ProviderState};
use crate::executor::state::StateBin;

use super::{initialized, skippable};

/// A bound grouping key
pub struct GroupKey {
    pub expr: Expression,
    /// Marks a partition key of streaming mode
    pub orig: bool,
}

impl GroupKey {
    pub fn new(expr: Expression, orig: bool) -> Self {
        Self { expr, orig }
    }
}

/// Groups of the current run, in first-seen order
#[derive(Default)]
struct Groups {
    table: KeyTable,
    bins: Vec<StateBin>,
}

impl Groups {
    fn bin_for(&mut self, key: Vec<Value>, ctx: &ExecutionContext) -> Result<&mut StateBin> {
        let comparer = ctx.comparer();
        let hash = comparer.hash_key(&key);
        let (index, inserted) = self.table.find_or_insert(hash, key, comparer)?;
        if inserted {
            self.bins.push(StateBin::new());
        }
        Ok(&mut self.bins[index])
    }

    /// Finalize every group into `out` and drop the run's state
    fn emit(
        &mut self,
        ctx: &ExecutionContext,
        items: &[Expression],
        having: Option<&Expression>,
        names: &Arc<[ColumnName]>,
        out: &mut VecDeque<Row>,
    ) -> Result<usize> {
        let empty = Row::default();
        let before = out.len();
        for (index, bin) in self.bins.iter().enumerate() {
            let rc = RowContext::new(ctx, &empty)
                .with_state(bin)
                .with_group_key(self.table.key(index));
            if let Some(having) = having {
                if !having.evaluate_bool(&rc)? {
                    continue;
                }
            }
            let values = items
                .iter()
                .map(|item| item.evaluate(&rc))
                .collect::<Result<Vec<_>>>()?;
            out.push_back(Row::from_values(values).renamed(Arc::clone(names)));
        }
        self.table.clear();
        self.bins.clear();
        Ok(out.len() - before)
    }

    fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

/// Groups rows and emits one row per group
pub struct GroupByProvider {
    input: Box<dyn Provider>,
    keys: Vec<Expression>,
    /// Positions of the ORIG keys within `keys`
    orig: Vec<usize>,
    items: Vec<Expression>,
    having: Option<Expression>,
    schema: Schema,
    has_state: bool,
    /// Per-stream state (LAG in keys or aggregate arguments)
    stream_state: StateBin,
    groups: Groups,
    run_key: Option<Vec<Value>>,
    output: VecDeque<Row>,
    input_done: bool,
    rows_seen: u64,
    groups_emitted: usize,
    ctx: Option<ExecutionContext>,
    current: Row,
    state: ProviderState,
}

impl GroupByProvider {
    /// Create a group-by stage.
    ///
    /// `items` and `having` are bound in grouped mode: they may reference
    /// key `k` through `GroupKey(k)`, in the order of `keys`.
    pub fn new(
        input: Box<dyn Provider>,
        keys: Vec<GroupKey>,
        items: Vec<Expression>,
        having: Option<Expression>,
        schema: Schema,
    ) -> Self {
        let orig = keys
            .iter()
            .enumerate()
            .filter(|(_, k)| k.orig)
            .map(|(i, _)| i)
            .collect();
        let keys: Vec<Expression> = keys.into_iter().map(|k| k.expr).collect();
        let has_state = keys.iter().chain(&items).chain(&having).any(Expression::has_state);
        Self {
            input,
            keys,
            orig,
            items,
            having,
            schema,
            has_state,
            stream_state: StateBin::new(),
            groups: Groups::default(),
            run_key: None,
            output: VecDeque::new(),
            input_done: false,
            rows_seen: 0,
            groups_emitted: 0,
            ctx: None,
            current: Row::default(),
            state: ProviderState::Uninitialized,
        }
    }

    /// Whether ORIG keys select streaming mode
    pub fn is_streaming(&self) -> bool {
        !self.orig.is_empty()
    }

    /// Pull input until some groups are ready or the input is exhausted
    fn consume(&mut self, ctx: &ExecutionContext) -> Result<()> {
        let Self {
            input,
            keys,
            orig,
            items,
            having,
            schema,
            has_state,
            stream_state,
            groups,
            run_key,
            output,
            input_done,
            rows_seen,
            groups_emitted,
            ..
        } = self;

        while output.is_empty() {
            if !input.next()? {
                *input_done = true;
                // No keys and no folded rows still produce one row of empty aggregates
                if keys.is_empty() && groups.is_empty() && *groups_emitted == 0 {
                    groups.bin_for(Vec::new(), ctx)?;
                }
                *groups_emitted +=
                    groups.emit(ctx, items, having.as_ref(), schema.column_names(), output)?;
                log::debug!(
                    "GroupBy: exhausted after {} rows, {} groups emitted",
                    rows_seen,
                    groups_emitted
                );
                return Ok(());
            }
            let row = input.take_row();
            *rows_seen += 1;
            let rc = RowContext::new(ctx, &row);

            if *has_state {
                let stepped = keys
                    .iter()
                    .chain(items.iter())
                    .chain(having.iter())
                    .try_for_each(|e| e.step_state(stream_state, &rc));
                if skippable(stepped)?.is_none() {
                    continue;
                }
            }
            let rc = rc.with_state(stream_state);

            let key = keys
                .iter()
                .map(|k| k.evaluate(&rc))
                .collect::<Result<Vec<_>>>();
            let Some(key) = skippable(key)? else {
                continue;
            };

            // Everything the row feeds to the accumulators is evaluated
            // before any group is touched, so a skipped row leaves no trace
            let mut inputs = Vec::new();
            let collected = items
                .iter()
                .chain(having.iter())
                .try_for_each(|e| e.collect_inputs(&rc, &mut inputs));
            if skippable(collected)?.is_none() {
                continue;
            }

            if !orig.is_empty() {
                let partition: Vec<Value> = orig.iter().map(|&i| key[i].clone()).collect();
                let closes_run = match run_key.as_deref() {
                    Some(current) => !ctx.comparer().keys_equal(current, &partition)?,
                    None => false,
                };
                if closes_run {
                    let emitted =
                        groups.emit(ctx, items, having.as_ref(), schema.column_names(), output)?;
                    log::trace!("GroupBy: run closed with {} groups", emitted);
                    *groups_emitted += emitted;
                }
                if closes_run || run_key.is_none() {
                    *run_key = Some(partition);
                }
            }

            let bin = groups.bin_for(key, ctx)?;
            let mut inputs = inputs.into_iter();
            items
                .iter()
                .chain(having.iter())
                .try_for_each(|e| e.apply_inputs(bin, &mut inputs, ctx.comparer()))?;
        }
        Ok(())
    }
}

impl Provider for GroupByProvider {
    fn initialize(&mut self, ctx: &ExecutionContext) -> Result<()> {
        self.input.initialize(ctx)?;
        self.stream_state.clear();
        self.groups = Groups::default();
        self.run_key = None;
        self.output.clear();
        self.input_done = false;
        self.rows_seen = 0;
        self.groups_emitted = 0;
        self.ctx = Some(ctx.clone());
        self.state = ProviderState::Initialized;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        if self.state == ProviderState::Exhausted {
            return Ok(false);
        }
        if self.output.is_empty() && !self.input_done {
            let ctx = initialized(&self.ctx, "GroupBy")?.clone();
            self.consume(&ctx)?;
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
        self.stream_state.clear();
        self.groups = Groups::default();
        self.run_key = None;
        self.output.clear();
        self.ctx = None;
        self.current = Row::default();
        self.state = ProviderState::Uninitialized;
        self.input.uninitialize()
    }

    fn dispose(&mut self) {
        self.stream_state.clear();
        self.groups = Groups::default();
        self.run_key = None;
        self.output.clear();
        self.ctx = None;
        self.current = Row::default();
        self.state = ProviderState::Uninitialized;
        self.keys
            .iter()
            .chain(&self.items)
            .chain(&self.having)
            .for_each(Expression::dispose_subqueries);
        self.input.dispose();
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn name(&self) -> &str {
        "GroupBy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, Error};
    use crate::executor::expression::{BinaryOp, ExprKind};
    use crate::executor::operators::test_util::{collect, pairs};
    use crate::executor::state::AccumulatorId;
    use crate::executor::MemoryProvider;
    use crate::functions::{AggregateFunction, CountFunction, SumFunction};

    fn count(id: u32) -> Expression {
        Expression::new(
            ExprKind::Aggregate {
                id: AccumulatorId(id),
                prototype: Box::new(CountFunction::default()),
                arg: Box::new(Expression::constant(Value::integer(1))),
            },
            DataType::Integer,
        )
    }

    fn sum_of(id: u32, column: usize) -> Expression {
        let mut sum = SumFunction::default();
        sum.bind(DataType::Integer).unwrap();
        Expression::new(
            ExprKind::Aggregate {
                id: AccumulatorId(id),
                prototype: Box::new(sum),
                arg: Box::new(Expression::column(column, DataType::Integer)),
            },
            DataType::Integer,
        )
    }

    fn group_key(k: usize, t: DataType) -> Expression {
        Expression::new(ExprKind::GroupKey(k), t)
    }

    fn schema2() -> Schema {
        Schema::typed(&[("k", DataType::Text), ("s", DataType::Integer)])
    }

    #[test]
    fn test_count_without_keys() {
        let input = Box::new(MemoryProvider::new(
            Schema::text(&["line"]),
            vec![vec![Value::text("17")], vec![Value::text("22")]],
        ));
        let mut g = GroupByProvider::new(
            input,
            Vec::new(),
            vec![count(0)],
            None,
            Schema::typed(&[("c", DataType::Integer)]),
        );
        assert_eq!(collect(&mut g), vec![vec![Value::integer(2)]]);
    }

    #[test]
    fn test_empty_input_without_keys_yields_one_row() {
        let mut g = GroupByProvider::new(
            pairs(&[]),
            Vec::new(),
            vec![count(0), sum_of(1, 1)],
            None,
            Schema::typed(&[("c", DataType::Integer), ("s", DataType::Integer)]),
        );
        assert_eq!(
            collect(&mut g),
            vec![vec![Value::integer(0), Value::integer(0)]]
        );

        // With keys, nothing
        let mut keyed = GroupByProvider::new(
            pairs(&[]),
            vec![GroupKey::new(Expression::column(0, DataType::Text), false)],
            vec![group_key(0, DataType::Text), count(0)],
            None,
            schema2(),
        );
        assert!(collect(&mut keyed).is_empty());
    }

    #[test]
    fn test_sum_per_group_first_seen_order() {
        let mut g = GroupByProvider::new(
            pairs(&[("A", 1), ("A", 2), ("B", 3)]),
            vec![GroupKey::new(Expression::column(0, DataType::Text), false)],
            vec![group_key(0, DataType::Text), sum_of(0, 1)],
            None,
            schema2(),
        );
        assert_eq!(
            collect(&mut g),
            vec![
                vec![Value::text("A"), Value::integer(3)],
                vec![Value::text("B"), Value::integer(3)],
            ]
        );
    }

    #[test]
    fn test_having_filters_groups() {
        let having = Expression::new(
            ExprKind::Binary(
                BinaryOp::Gt,
                Box::new(count(1)),
                Box::new(Expression::constant(Value::integer(1))),
            ),
            DataType::Boolean,
        );
        let mut g = GroupByProvider::new(
            pairs(&[("A", 1), ("B", 2), ("A", 3)]),
            vec![GroupKey::new(Expression::column(0, DataType::Text), false)],
            vec![group_key(0, DataType::Text), sum_of(0, 1)],
            Some(having),
            schema2(),
        );
        assert_eq!(
            collect(&mut g),
            vec![vec![Value::text("A"), Value::integer(4)]]
        );
    }

    #[test]
    fn test_invariance_violation() {
        let invariant = Expression::new(
            ExprKind::Invariant {
                id: AccumulatorId(5),
                operand: Box::new(Expression::column(1, DataType::Integer)),
                text: "v".to_string(),
            },
            DataType::Integer,
        );
        let mut g = GroupByProvider::new(
            pairs(&[("A", 1), ("A", 2)]),
            vec![GroupKey::new(Expression::column(0, DataType::Text), false)],
            vec![group_key(0, DataType::Text), invariant],
            None,
            schema2(),
        );
        let ctx = ExecutionContext::default();
        g.initialize(&ctx).unwrap();
        assert!(matches!(g.next(), Err(Error::GroupInvariance { .. })));
    }

    #[test]
    fn test_streaming_matches_full_hash() {
        let rows = [("A", 1), ("A", 2), ("B", 3), ("B", 4), ("C", 5)];
        let build = |orig: bool| {
            GroupByProvider::new(
                pairs(&rows),
                vec![GroupKey::new(Expression::column(0, DataType::Text), orig)],
                vec![group_key(0, DataType::Text), sum_of(0, 1)],
                None,
                schema2(),
            )
        };
        let mut streaming = build(true);
        assert!(streaming.is_streaming());
        let mut full = build(false);
        assert_eq!(collect(&mut streaming), collect(&mut full));
    }

    #[test]
    fn test_streaming_emits_per_run() {
        let ctx = ExecutionContext::default();
        let mut g = GroupByProvider::new(
            pairs(&[("A", 1), ("A", 2), ("B", 3), ("A", 4)]),
            vec![GroupKey::new(Expression::column(0, DataType::Text), true)],
            vec![group_key(0, DataType::Text), sum_of(0, 1)],
            None,
            schema2(),
        );
        g.initialize(&ctx).unwrap();
        assert!(g.next().unwrap());
        assert_eq!(g.current_row()[1], Value::integer(3));
        // The first group is out before the input is exhausted
        assert!(!g.input_done);
        let rest = crate::executor::drain(&mut g).unwrap();
        // Non-clustered input splits "A" into two groups
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[1].as_slice(), &[Value::text("A"), Value::integer(4)]);
    }
}
