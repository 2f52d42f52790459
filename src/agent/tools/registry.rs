//! Tool registry: name-addressed lookup of tools and their schemas.

use std::collections::HashMap;

use serde_json::Value;

use super::base::Tool;
use crate::errors::RegistryError;

/// Registry for agent tools.
///
/// Holds name → tool pairs with unique names; registering a duplicate name
/// is an error rather than a silent replacement. Execution lives in the
/// [`ToolExecutor`](crate::agent::executor::ToolExecutor), not here.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool.
    ///
    /// The declared parameter spec is validated for shape here so a
    /// malformed schema surfaces at startup, not mid-conversation.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        validate_schema(&name, &tool.parameters())?;
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a reference to a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool definitions in OpenAI format, ordered by name so the
    /// advertised set is stable across calls.
    pub fn definitions(&self) -> Vec<Value> {
        let mut names: Vec<&String> = self.tools.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| self.tools[name].to_schema())
            .collect()
    }

    /// Get list of registered tool names.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that a declared parameter spec has the JSON-schema object shape
/// the completion API expects.
fn validate_schema(name: &str, parameters: &Value) -> Result<(), RegistryError> {
    if parameters.get("type").and_then(|t| t.as_str()) != Some("object") {
        return Err(RegistryError::InvalidSchema {
            name: name.to_string(),
            reason: "parameters.type must be \"object\"".to_string(),
        });
    }
    if !parameters
        .get("properties")
        .map(|p| p.is_object())
        .unwrap_or(false)
    {
        return Err(RegistryError::InvalidSchema {
            name: name.to_string(),
            reason: "parameters.properties must be an object".to_string(),
        });
    }
    Ok(())
}
