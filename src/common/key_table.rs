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

//! Comparer-aware key table for grouping and deduplication.
//!
//! Keys are tuples of [`Value`]s hashed and compared under the query's
//! [`Comparer`]. Entries are never removed, and a key's index is its
//! insertion position, so iterating indices yields keys in first-seen
//! order.
//!
//! # Memory Layout
//!
//! ```text
//! KeyTable
//! ├── bucket_heads: Vec<u32>    [bucket_count]     // First entry index per bucket
//! ├── entries: Vec<HashEntry>   [key_count]        // One per distinct key
//! ├── keys: Vec<Box<[Value]>>   [key_count]        // Key tuples, same index
//! └── bucket_mask: u64                             // For fast modulo
//!
//! HashEntry
//! ├── hash: u64     // Full hash for quick rejection
//! └── next: u32     // Next in chain (EMPTY = end)
//! ```

use crate::core::{Comparer, Result, Value};

/// Sentinel value indicating end of chain or empty bucket.
const EMPTY: u32 = u32::MAX;

/// Minimum number of buckets (must be power of 2).
const MIN_BUCKETS: usize = 16;

#[derive(Debug, Clone, Copy)]
struct HashEntry {
    /// Full 64-bit hash, compared before touching key data.
    hash: u64,
    /// Index of next entry in the chain (EMPTY = end of chain).
    next: u32,
}

/// Hash table of distinct key tuples in first-seen order
#[derive(Debug)]
pub struct KeyTable {
    bucket_heads: Vec<u32>,
    entries: Vec<HashEntry>,
    keys: Vec<Box<[Value]>>,
    bucket_mask: u64,
}

impl Default for KeyTable {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl KeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table sized for `capacity` keys at ~75% load.
    pub fn with_capacity(capacity: usize) -> Self {
        let bucket_count = (capacity * 4 / 3).max(MIN_BUCKETS).next_power_of_two();
        Self {
            bucket_heads: vec![EMPTY; bucket_count],
            entries: Vec::with_capacity(capacity),
            keys: Vec::with_capacity(capacity),
            bucket_mask: (bucket_count - 1) as u64,
        }
    }

    /// Find the index of `key`, if present.
    pub fn find(&self, hash: u64, key: &[Value], comparer: &Comparer) -> Result<Option<usize>> {
        let mut current = self.bucket_heads[(hash & self.bucket_mask) as usize];
        while current != EMPTY {
            let entry = &self.entries[current as usize];
            if entry.hash == hash && comparer.keys_equal(&self.keys[current as usize], key)? {
                return Ok(Some(current as usize));
            }
            current = entry.next;
        }
        Ok(None)
    }

    /// Find `key`, inserting it when absent.
    ///
    /// Returns the key's index and whether it was inserted.
    pub fn find_or_insert(
        &mut self,
        hash: u64,
        key: Vec<Value>,
        comparer: &Comparer,
    ) -> Result<(usize, bool)> {
        if let Some(index) = self.find(hash, &key, comparer)? {
            return Ok((index, false));
        }
        Ok((self.push(hash, key.into_boxed_slice()), true))
    }

    /// Insert `key` if it is new, hashing it with `comparer`.
    ///
    /// Returns true when the key was not present before.
    pub fn insert(&mut self, key: Vec<Value>, comparer: &Comparer) -> Result<bool> {
        let hash = comparer.hash_key(&key);
        self.find_or_insert(hash, key, comparer)
            .map(|(_, inserted)| inserted)
    }

    fn push(&mut self, hash: u64, key: Box<[Value]>) -> usize {
        if (self.keys.len() + 1) * 4 > self.bucket_heads.len() * 3 {
            self.grow();
        }
        let index = self.keys.len();
        let bucket = (hash & self.bucket_mask) as usize;
        self.entries.push(HashEntry {
            hash,
            next: self.bucket_heads[bucket],
        });
        self.bucket_heads[bucket] = index as u32;
        self.keys.push(key);
        index
    }

    /// Double the bucket count and relink every chain.
    fn grow(&mut self) {
        let bucket_count = self.bucket_heads.len() * 2;
        self.bucket_mask = (bucket_count - 1) as u64;
        self.bucket_heads.clear();
        self.bucket_heads.resize(bucket_count, EMPTY);
        for (index, entry) in self.entries.iter_mut().enumerate() {
            let bucket = (entry.hash & self.bucket_mask) as usize;
            entry.next = self.bucket_heads[bucket];
            self.bucket_heads[bucket] = index as u32;
        }
    }

    /// The key stored at `index`
    #[inline]
    pub fn key(&self, index: usize) -> &[Value] {
        &self.keys[index]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Remove every key, keeping the allocation.
    pub fn clear(&mut self) {
        self.bucket_heads.fill(EMPTY);
        self.entries.clear();
        self.keys.clear();
    }

    /// Consume the table, returning keys in first-seen order.
    pub fn into_keys(self) -> Vec<Box<[Value]>> {
        self.keys
    }
}
