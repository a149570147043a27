use crate::utils::toml_config::ToolEntry;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Catalog of tools offered by the external execution service.
///
/// The registry does not execute anything itself: it renders the catalog into
/// the tool node's prompt and fills in the HTTP method when the model omits it.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolEntry>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_catalog(catalog: &[ToolEntry]) -> Self {
        let mut registry = Self::new();
        for entry in catalog {
            registry.register(entry.clone());
        }
        registry
    }

    /// Register a tool. A later entry with the same name replaces the earlier one.
    pub fn register(&mut self, entry: ToolEntry) {
        match self.index.get(&entry.name) {
            Some(&slot) => self.tools[slot] = entry,
            None => {
                self.index.insert(entry.name.clone(), self.tools.len());
                self.tools.push(entry);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.index.get(name).map(|&slot| &self.tools[slot])
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Method configured for `name`, upper-cased.
    pub fn default_method(&self, name: &str) -> Option<String> {
        self.get(name).map(|t| t.method.to_uppercase())
    }

    /// JSON array describing every tool, in registration order.
    pub fn render_catalog(&self) -> String {
        let entries: Vec<Value> = self
            .tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "method": t.method.to_uppercase(),
                    "parameters": t.parameters,
                })
            })
            .collect();
        Value::Array(entries).to_string()
    }
}
