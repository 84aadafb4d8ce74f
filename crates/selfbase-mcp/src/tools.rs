//! Tool registry for MCP tools.
//!
//! Definitions themselves live in [`crate::catalog`].

use crate::protocol::ToolDefinition;
use std::collections::HashMap;

/// Registry of available MCP tools.
#[derive(Clone, Debug)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDefinition>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool, replacing any tool of the same name.
    pub fn register(&mut self, tool: ToolDefinition) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tools, ordered by name so listings are stable.
    pub fn list(&self) -> Vec<&ToolDefinition> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool names, ordered.
    pub fn names(&self) -> Vec<&str> {
        self.list().into_iter().map(|t| t.name.as_str()).collect()
    }
}

impl FromIterator<ToolDefinition> for ToolRegistry {
    fn from_iter<I: IntoIterator<Item = ToolDefinition>>(iter: I) -> Self {
        let mut registry = Self::new();
        for tool in iter {
            registry.register(tool);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_tool(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: Some(format!("Test tool: {}", name)),
            input_schema: json!({"type": "object"}),
            annotations: None,
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(create_test_tool("test"));

        assert!(registry.get("test").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert!(registry.contains("test"));
    }

    #[test]
    fn test_list_is_sorted() {
        let registry: ToolRegistry = ["zeta", "alpha", "mid"]
            .into_iter()
            .map(create_test_tool)
            .collect();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.names(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register(create_test_tool("test"));
        let mut replacement = create_test_tool("test");
        replacement.description = Some("replaced".into());
        registry.register(replacement);

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("test").unwrap().description.as_deref(),
            Some("replaced")
        );
    }
}
