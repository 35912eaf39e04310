use crate::traits::{Tool, ToolSpec};
use std::sync::{Arc, Mutex};

/// The set of invocable capabilities and their schemas, as presented to
/// the decision-maker. Lookup is fail-closed: an unregistered name is an
/// explicit miss, never a silent skip.
pub struct ToolRegistry {
    tools: Mutex<Vec<Arc<dyn Tool>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&self, tool: Arc<dyn Tool>) {
        self.tools.lock().unwrap().push(tool);
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.name() == name)
            .cloned()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.lock().unwrap().iter().map(|t| t.spec()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ToolResult;
    use async_trait::async_trait;
    use serde_json::json;

    struct NoopTool;

    #[async_trait]
    impl Tool for NoopTool {
        fn name(&self) -> &str {
            "noop"
        }

        fn description(&self) -> &str {
            "Do nothing"
        }

        fn parameters(&self) -> serde_json::Value {
            json!({"type": "object"})
        }

        async fn execute(&self, _args: serde_json::Value) -> anyhow::Result<ToolResult> {
            Ok(ToolResult::success(""))
        }
    }

    #[test]
    fn lookup_finds_registered_tools() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(NoopTool));

        assert!(registry.lookup("noop").is_some());
        assert!(registry.lookup("missing").is_none());
    }

    #[test]
    fn specs_cover_every_registration() {
        let registry = ToolRegistry::new();
        assert!(registry.specs().is_empty());

        registry.register(Arc::new(NoopTool));
        let specs = registry.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "noop");
    }
}
