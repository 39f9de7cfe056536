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

//! Pull-iterator provider interface for query pipelines.
//!
//! Every pipeline stage implements [`Provider`]. The root of a pipeline is
//! driven by repeatedly calling `next()`, which pulls from the stages it
//! wraps.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ Consumer     │ ← Pulls rows via next()
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │ Group By     │ ← Buffers groups, emits after exhaustion or per run
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │ Filter       │ ← Streams
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │ Source       │ ← Produces rows from lines
//! └──────────────┘
//! ```
//!
//! # Lifecycle
//!
//! `Uninitialized → Initialized → Exhausted`. Once `next()` returns false it
//! keeps returning false until the provider is initialized again.
//! `uninitialize()` may be called any number of times; a later
//! `initialize()` starts over.

use std::sync::Arc;

use crate::core::{Error, Result, Row, Schema, Value};

use super::context::ExecutionContext;

/// Lifecycle state of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderState {
    #[default]
    Uninitialized,
    Initialized,
    Exhausted,
}

impl ProviderState {
    /// Fail unless the provider may be pulled
    #[inline]
    pub fn ensure_initialized(self, name: &str) -> Result<()> {
        if self == ProviderState::Uninitialized {
            Err(Error::internal(format!("{} pulled before initialize", name)))
        } else {
            Ok(())
        }
    }
}

/// Pull-iterator interface for pipeline stages.
///
/// # Thread Safety
///
/// Providers are `Send` so a pipeline can be handed to another thread, but
/// a pipeline is driven by one thread at a time.
pub trait Provider: Send {
    /// Allocate resources and initialize wrapped providers.
    ///
    /// The context is kept for the evaluation of every row until
    /// `uninitialize`.
    fn initialize(&mut self, ctx: &ExecutionContext) -> Result<()>;

    /// Advance to the next row.
    ///
    /// Returns `Ok(false)` once exhausted and on every call after that.
    fn next(&mut self) -> Result<bool>;

    /// The row `next()` advanced to
    fn current_row(&self) -> &Row;

    /// Move the current row out, leaving an empty row behind
    fn take_row(&mut self) -> Row {
        self.current_row().clone()
    }

    /// Release resources. Safe to call repeatedly.
    fn uninitialize(&mut self) -> Result<()>;

    /// Final cleanup of this provider and everything it wraps
    fn dispose(&mut self) {
        if let Err(e) = self.uninitialize() {
            log::debug!("{}: error while disposing: {}", self.name(), e);
        }
    }

    /// Output schema, fixed at construction
    fn schema(&self) -> &Schema;

    /// Stage name for diagnostics
    fn name(&self) -> &str;
}

/// Constructs a fresh leaf provider each time a pipeline is bound
pub type SourceFactory = Arc<dyn Fn() -> Result<Box<dyn Provider>> + Send + Sync>;

/// Pull every remaining row out of an initialized provider
pub fn drain(provider: &mut dyn Provider) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    while provider.next()? {
        rows.push(provider.take_row());
    }
    Ok(rows)
}

/// In-memory leaf source with a fixed schema
///
/// Rows get 1-based line numbers in insertion order. The row values are
/// shared, so re-initializing replays them without copying the table.
pub struct MemoryProvider {
    schema: Schema,
    rows: Arc<[Vec<Value>]>,
    source: Arc<str>,
    position: usize,
    current: Row,
    ctx: Option<ExecutionContext>,
    state: ProviderState,
}

impl MemoryProvider {
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self::shared(schema, Arc::from(rows))
    }

    /// A provider over rows shared with other providers
    pub fn shared(schema: Schema, rows: Arc<[Vec<Value>]>) -> Self {
        Self {
            schema,
            rows,
            source: Arc::from("<memory>"),
            position: 0,
            current: Row::default(),
            ctx: None,
            state: ProviderState::Uninitialized,
        }
    }

    /// Set the source identifier rows report
    pub fn with_source(mut self, source: impl AsRef<str>) -> Self {
        self.source = Arc::from(source.as_ref());
        self
    }
}

impl Provider for MemoryProvider {
    fn initialize(&mut self, ctx: &ExecutionContext) -> Result<()> {
        self.position = 0;
        self.current = Row::default();
        self.ctx = Some(ctx.clone());
        self.state = ProviderState::Initialized;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        self.state.ensure_initialized(self.name())?;
        if self.state == ProviderState::Exhausted {
            return Ok(false);
        }
        if let Some(ctx) = &self.ctx {
            ctx.check_cancelled()?;
        }
        match self.rows.get(self.position) {
            Some(values) => {
                self.position += 1;
                let line_no = self.position as i64;
                self.current = Row::leaf(
                    values.clone(),
                    Arc::clone(self.schema.column_names()),
                    line_no,
                    line_no,
                    Arc::clone(&self.source),
                );
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
        self.ctx = None;
        self.current = Row::default();
        self.state = ProviderState::Uninitialized;
        Ok(())
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn name(&self) -> &str {
        "Memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> MemoryProvider {
        MemoryProvider::new(
            Schema::text(&["k"]),
            vec![vec![Value::text("a")], vec![Value::text("b")]],
        )
    }

    #[test]
    fn test_memory_provider_lifecycle() {
        let ctx = ExecutionContext::default();
        let mut p = provider();
        assert!(p.next().is_err());

        p.initialize(&ctx).unwrap();
        assert!(p.next().unwrap());
        assert_eq!(p.current_row()[0], Value::text("a"));
        assert_eq!(p.current_row().line_no(), 1);
        assert_eq!(p.current_row().original_columns(), p.current_row().as_slice());
        assert!(p.next().unwrap());
        assert!(!p.next().unwrap());
        assert!(!p.next().unwrap());

        p.uninitialize().unwrap();
        p.uninitialize().unwrap();
        p.initialize(&ctx).unwrap();
        assert_eq!(drain(&mut p).unwrap().len(), 2);
    }

    #[test]
    fn test_memory_provider_cancellation() {
        let ctx = ExecutionContext::default();
        let mut p = provider();
        p.initialize(&ctx).unwrap();
        ctx.cancellation().cancel();
        assert!(matches!(p.next(), Err(Error::Interrupted)));
    }
}
