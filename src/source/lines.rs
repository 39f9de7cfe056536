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

//! Raw line source
//!
//! Reads files and in-memory texts one line at a time, producing a single
//! TEXT column. Line numbers restart per source; the total line number
//! runs across all sources. Only one source is open at a time.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::{ColumnInfo, ColumnName, DataType, Error, Result, Row, Schema, Value};
use crate::executor::{ExecutionContext, Provider, ProviderState};

/// Name of the column a line source produces
pub const LINE_COLUMN: &str = "line";

/// One input of a [`LineProvider`]
#[derive(Debug, Clone)]
pub enum LineInput {
    File(PathBuf),
    /// In-memory text under a display name
    Text { name: String, text: Arc<str> },
}

impl LineInput {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        LineInput::File(path.into())
    }

    pub fn text(name: impl Into<String>, text: impl AsRef<str>) -> Self {
        LineInput::Text {
            name: name.into(),
            text: Arc::from(text.as_ref()),
        }
    }

    fn name(&self) -> String {
        match self {
            LineInput::File(path) => path.display().to_string(),
            LineInput::Text { name, .. } => name.clone(),
        }
    }

    fn open(&self) -> std::io::Result<Box<dyn BufRead + Send>> {
        match self {
            LineInput::File(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
            LineInput::Text { text, .. } => Ok(Box::new(Cursor::new(SharedText(Arc::clone(text))))),
        }
    }
}

struct SharedText(Arc<str>);

impl AsRef<[u8]> for SharedText {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// An open input
struct OpenInput {
    reader: Box<dyn BufRead + Send>,
    name: Arc<str>,
    line_no: i64,
}

/// Leaf provider over raw lines
pub struct LineProvider {
    inputs: Vec<LineInput>,
    schema: Schema,
    position: usize,
    open: Option<OpenInput>,
    total_line_no: i64,
    bytes: Vec<u8>,
    buffer: String,
    ctx: Option<ExecutionContext>,
    current: Row,
    state: ProviderState,
}

impl LineProvider {
    pub fn new(inputs: Vec<LineInput>) -> Self {
        Self {
            inputs,
            schema: Schema::new(vec![ColumnInfo::new(
                ColumnName::new(LINE_COLUMN),
                DataType::Text,
            )]),
            position: 0,
            open: None,
            total_line_no: 0,
            bytes: Vec::new(),
            buffer: String::new(),
            ctx: None,
            current: Row::default(),
            state: ProviderState::Uninitialized,
        }
    }

    /// Lines of the given files, in order
    pub fn files<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> Self {
        Self::new(paths.into_iter().map(LineInput::file).collect())
    }

    /// Lines of one in-memory text
    pub fn text(name: impl Into<String>, text: impl AsRef<str>) -> Self {
        Self::new(vec![LineInput::text(name, text)])
    }

    /// Open the next input that can be opened; false once all are used up
    fn open_next(&mut self, ctx: &ExecutionContext) -> Result<bool> {
        while let Some(input) = self.inputs.get(self.position) {
            self.position += 1;
            let name = input.name();
            match input.open() {
                Ok(reader) => {
                    log::debug!("Lines: opened '{}'", name);
                    self.open = Some(OpenInput {
                        reader,
                        name: Arc::from(name),
                        line_no: 0,
                    });
                    return Ok(true);
                }
                Err(e) => {
                    ctx.handle_failure(Error::io(&name, e.to_string()), &name, 0)?;
                }
            }
        }
        Ok(false)
    }

    /// Read the next line of the open input into the buffer.
    ///
    /// A line that is not valid UTF-8 is a per-line failure: it is reported
    /// through the warning policy and reading goes on with the next line.
    /// Any other read error gives up on the rest of the input.
    fn read_line(&mut self, ctx: &ExecutionContext) -> Result<bool> {
        loop {
            let Some(open) = self.open.as_mut() else {
                return Ok(false);
            };
            self.bytes.clear();
            match open.reader.read_until(b'\n', &mut self.bytes) {
                Ok(0) => {
                    log::debug!("Lines: '{}' done after {} lines", open.name, open.line_no);
                    self.open = None;
                    return Ok(false);
                }
                Ok(_) => {
                    if self.bytes.last() == Some(&b'\n') {
                        self.bytes.pop();
                        if self.bytes.last() == Some(&b'\r') {
                            self.bytes.pop();
                        }
                    }
                    open.line_no += 1;
                    self.total_line_no += 1;
                    match std::str::from_utf8(&self.bytes) {
                        Ok(line) => {
                            self.buffer.clear();
                            self.buffer.push_str(line);
                            return Ok(true);
                        }
                        Err(e) => {
                            let name = Arc::clone(&open.name);
                            let line_no = open.line_no;
                            let error = Error::io(
                                name.as_ref(),
                                format!("line {} is not valid UTF-8: {}", line_no, e),
                            );
                            ctx.handle_failure(error, &name, line_no)?;
                        }
                    }
                }
                Err(e) => {
                    let name = Arc::clone(&open.name);
                    let line_no = open.line_no + 1;
                    self.open = None;
                    ctx.handle_failure(Error::io(name.as_ref(), e.to_string()), &name, line_no)?;
                    return Ok(false);
                }
            }
        }
    }
}

impl Provider for LineProvider {
    fn initialize(&mut self, ctx: &ExecutionContext) -> Result<()> {
        self.position = 0;
        self.open = None;
        self.total_line_no = 0;
        self.ctx = Some(ctx.clone());
        self.current = Row::default();
        self.state = ProviderState::Initialized;
        Ok(())
    }

    fn next(&mut self) -> Result<bool> {
        self.state.ensure_initialized(self.name())?;
        if self.state == ProviderState::Exhausted {
            return Ok(false);
        }
        let ctx = match &self.ctx {
            Some(ctx) => ctx.clone(),
            None => return Err(Error::internal("Lines pulled before initialize")),
        };
        loop {
            ctx.check_cancelled()?;
            if self.open.is_none() && !self.open_next(&ctx)? {
                self.state = ProviderState::Exhausted;
                self.current = Row::default();
                log::debug!("Lines: exhausted after {} lines", self.total_line_no);
                return Ok(false);
            }
            if self.read_line(&ctx)? {
                if let Some(open) = &self.open {
                    self.current = Row::leaf(
                        vec![Value::text(self.buffer.as_str())],
                        Arc::clone(self.schema.column_names()),
                        open.line_no,
                        self.total_line_no,
                        Arc::clone(&open.name),
                    );
                }
                return Ok(true);
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
        self.open = None;
        self.ctx = None;
        self.current = Row::default();
        self.state = ProviderState::Uninitialized;
        Ok(())
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn name(&self) -> &str {
        "Lines"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{drain, QueryConfig, WarningPolicy};
    use std::io::Write;

    fn lines(rows: &[Row]) -> Vec<(String, i64, i64, String)> {
        rows.iter()
            .map(|r| {
                (
                    r[0].to_display_string(),
                    r.line_no(),
                    r.total_line_no(),
                    r.source().to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn test_line_numbers_across_sources() {
        let mut provider = LineProvider::new(vec![
            LineInput::text("a", "one\r\ntwo\n"),
            LineInput::text("b", "three"),
        ]);
        provider.initialize(&ExecutionContext::default()).unwrap();
        let rows = drain(&mut provider).unwrap();
        assert_eq!(
            lines(&rows),
            vec![
                ("one".to_string(), 1, 1, "a".to_string()),
                ("two".to_string(), 2, 2, "a".to_string()),
                ("three".to_string(), 1, 3, "b".to_string()),
            ]
        );
        assert_eq!(rows[0].original_columns(), rows[0].as_slice());
        assert!(!provider.next().unwrap());
    }

    #[test]
    fn test_reads_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "GET /index.html").unwrap();
        writeln!(file, "POST /login").unwrap();
        let mut provider = LineProvider::files([file.path()]);
        provider.initialize(&ExecutionContext::default()).unwrap();
        let rows = drain(&mut provider).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], Value::text("POST /login"));

        // Re-initializing starts over
        provider.uninitialize().unwrap();
        provider.initialize(&ExecutionContext::default()).unwrap();
        assert_eq!(drain(&mut provider).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_file_policy() {
        let missing = std::env::temp_dir().join("textsql-definitely-missing.log");
        let mut provider = LineProvider::new(vec![
            LineInput::file(&missing),
            LineInput::text("b", "x"),
        ]);

        provider.initialize(&ExecutionContext::default()).unwrap();
        let err = provider.next().unwrap_err();
        assert!(matches!(err, Error::Io { .. }));

        let ctx = ExecutionContext::new(
            QueryConfig::default().with_warning_policy(WarningPolicy::Continue),
        );
        provider.initialize(&ctx).unwrap();
        let rows = drain(&mut provider).unwrap();
        assert_eq!(rows.len(), 1);
        let warnings = ctx.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].source.contains("textsql-definitely-missing"));
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"one\nbad \xff byte\nthree\nfour\n").unwrap();
        let mut provider = LineProvider::files([file.path()]);

        provider.initialize(&ExecutionContext::default()).unwrap();
        assert!(provider.next().unwrap());
        assert!(matches!(provider.next().unwrap_err(), Error::Io { .. }));

        let ctx = ExecutionContext::new(
            QueryConfig::default().with_warning_policy(WarningPolicy::Continue),
        );
        provider.initialize(&ctx).unwrap();
        let rows = drain(&mut provider).unwrap();
        let seen: Vec<(String, i64)> = lines(&rows)
            .into_iter()
            .map(|(text, line_no, _, _)| (text, line_no))
            .collect();
        assert_eq!(
            seen,
            vec![
                ("one".to_string(), 1),
                ("three".to_string(), 3),
                ("four".to_string(), 4),
            ]
        );
        let warnings = ctx.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].line_no, 2);
    }

    #[test]
    fn test_cancellation() {
        let ctx = ExecutionContext::default();
        let mut provider = LineProvider::text("a", "1\n2\n3\n");
        provider.initialize(&ctx).unwrap();
        assert!(provider.next().unwrap());
        ctx.cancellation().cancel();
        assert_eq!(provider.next().unwrap_err(), Error::Interrupted);
    }
}
