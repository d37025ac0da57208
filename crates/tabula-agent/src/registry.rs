use std::collections::HashMap;
use std::sync::Arc;

use tabula_core::error::{Result, TabulaError};
use tabula_core::traits::Tool;
use tabula_core::types::{ToolDefinition, ToolResult};
use tabula_db::SchemaInspector;

use crate::tools::{
    GetDatabaseSchema, GetTableList, GetTableSample, GetTableSummary, GetTableUniques, RunCustomQuery,
};

/// Registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: impl Tool) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Tool definitions for sending to the LLM.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    pub async fn execute(&self, name: &str, input: serde_json::Value) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| TabulaError::ToolNotFound(name.to_string()))?;
        tool.execute(input).await
    }

    /// Registry with the full database toolset.
    pub fn with_database_tools(inspector: SchemaInspector, default_sample_limit: i64) -> Self {
        let mut registry = Self::new();
        registry.register(GetTableList::new(inspector.clone()));
        registry.register(GetDatabaseSchema::new(inspector.clone()));
        registry.register(GetTableSample::new(inspector.clone(), default_sample_limit));
        registry.register(GetTableSummary::new(inspector.clone()));
        registry.register(GetTableUniques::new(inspector.clone()));
        registry.register(RunCustomQuery::new(inspector));
        registry
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;

    struct Echo;

    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<ToolResult>> {
            Box::pin(async move { Ok(ToolResult::success(input.to_string())) })
        }
    }

    #[tokio::test]
    async fn test_register_and_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(Echo);
        assert_eq!(registry.list(), vec!["echo"]);
        assert_eq!(registry.definitions().len(), 1);

        let result = registry
            .execute("echo", serde_json::json!({"a": 1}))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.content, r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute("nope", serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, TabulaError::ToolNotFound(_)));
    }
}
