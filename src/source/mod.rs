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

//! Leaf sources
//!
//! Providers that turn raw input into rows. Each produces leaf rows whose
//! original columns equal their columns.
//!
//! - [`LineProvider`] - one TEXT column per line of files or texts
//! - [`RegexProvider`] - regex capture groups of each line
//! - [`DelimitedProvider`] - delimiter-split, typed fields of each line

pub mod captures;
pub mod delimited;
pub mod lines;

pub use captures::RegexProvider;
pub use delimited::DelimitedProvider;
pub use lines::{LineInput, LineProvider, LINE_COLUMN};
