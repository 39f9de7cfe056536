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

//! View registry

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::core::DataType;

use super::ast::QueryPlan;

/// A named, optionally parameterized pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ViewDefinition {
    pub name: String,
    /// Declared parameters; arguments are converted to these types
    pub parameters: Vec<(String, DataType)>,
    pub plan: QueryPlan,
}

impl ViewDefinition {
    pub fn new(name: impl Into<String>, plan: QueryPlan) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            plan,
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.parameters.push((name.into(), data_type));
        self
    }
}

/// Views by case-insensitive name
#[derive(Debug, Clone, Default)]
pub struct ViewRegistry {
    views: FxHashMap<String, Arc<ViewDefinition>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a view, replacing any view of the same name
    pub fn register(&mut self, view: ViewDefinition) {
        self.views.insert(view.name.to_lowercase(), Arc::new(view));
    }

    pub fn get(&self, name: &str) -> Option<Arc<ViewDefinition>> {
        self.views.get(&name.to_lowercase()).cloned()
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.views.remove(&name.to_lowercase()).is_some()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Schema;
    use crate::plan::SourceRef;

    #[test]
    fn test_registry_lookup_ignores_case() {
        let mut registry = ViewRegistry::new();
        let plan = QueryPlan::source(SourceRef::memory("t", Schema::text(&["k"]), vec![]));
        registry.register(
            ViewDefinition::new("Recent", plan.clone()).with_parameter("days", DataType::Integer),
        );
        let view = registry.get("RECENT").unwrap();
        assert_eq!(view.parameters, vec![("days".to_string(), DataType::Integer)]);
        assert!(registry.get("other").is_none());

        registry.register(ViewDefinition::new("recent", plan));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("recent").unwrap().parameters.is_empty());
        assert!(registry.remove("Recent"));
        assert!(registry.is_empty());
    }
}
