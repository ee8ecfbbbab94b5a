//! Ordered tool registry, populated from optional subsystem groups
//! (spec §4.H).

use crate::tool::{Tool, ToolDescriptor};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct ToolRegistry {
    order: RwLock<Vec<String>>,
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, or replaces it in place if already present
    /// (insertion order is preserved across re-registration).
    pub fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        let mut tools = self.tools.write();
        if !tools.contains_key(&name) {
            self.order.write().push(name.clone());
        }
        tools.insert(name, tool);
    }

    /// Registers every tool a subsystem group provides. A group with no
    /// tools to contribute (optional feature disabled) is simply an
    /// empty iterator — startup never fails on an absent group.
    pub fn register_group(&self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) {
        for tool in tools {
            self.register(tool);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).cloned()
    }

    /// Tool descriptors in registration order — exactly what `tools/list`
    /// returns to clients.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        let order = self.order.read();
        let tools = self.tools.read();
        order
            .iter()
            .filter_map(|name| tools.get(name))
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
                default_timeout_ms: tool.default_timeout_ms(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::Concurrency;
    use async_trait::async_trait;
    use mcp_core::{McpError, Principal};
    use serde_json::{json, Value};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn input_schema(&self) -> Value {
            json!({})
        }
        fn concurrency(&self) -> Concurrency {
            Concurrency::Cooperative
        }
        async fn execute(&self, _principal: &Principal, arguments: Value) -> Result<Value, McpError> {
            Ok(arguments)
        }
    }

    struct PingTool;

    #[async_trait]
    impl Tool for PingTool {
        fn name(&self) -> &str {
            "ping"
        }
        fn description(&self) -> &str {
            "pings"
        }
        fn input_schema(&self) -> Value {
            json!({})
        }
        async fn execute(&self, _principal: &Principal, _arguments: Value) -> Result<Value, McpError> {
            Ok(json!("pong"))
        }
    }

    #[test]
    fn list_preserves_registration_order() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(PingTool));
        let names: Vec<String> = registry.list().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["echo".to_string(), "ping".to_string()]);
    }

    #[test]
    fn re_registering_keeps_original_position() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(PingTool));
        registry.register(Arc::new(EchoTool));
        let names: Vec<String> = registry.list().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["echo".to_string(), "ping".to_string()]);
    }

    #[test]
    fn empty_group_does_not_affect_registry() {
        let registry = ToolRegistry::new();
        registry.register_group(std::iter::empty());
        assert!(registry.is_empty());
    }
}
