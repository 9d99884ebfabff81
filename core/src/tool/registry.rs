//! Tool registry: register/lookup tools, list schemas for the inference
//! provider. Grounded in the teacher's `ToolRegistry` (HashMap + last-write-wins
//! register), generalized with input/output guardrail support per §4.2.

use std::collections::HashMap;

use super::{Tool, ToolSchema};

/// Owns a set of tools keyed by name. `register` is last-write-wins on a name
/// collision, matching the teacher's registry.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Idempotent: unregistering an absent name is a no-op.
    pub fn unregister(&mut self, name: &str) {
        self.tools.remove(name);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn list(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{ParameterType, ToolParameter};
    use crate::value::SendableValue;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    struct NoOp(&'static str);

    #[async_trait]
    impl Tool for NoOp {
        fn name(&self) -> &str {
            self.0
        }
        fn spec(&self) -> ToolSchema {
            ToolSchema {
                name: self.0.into(),
                description: "".into(),
                parameters: vec![ToolParameter::required("x", "", ParameterType::Any)],
            }
        }
        async fn call(&self, _args: BTreeMap<String, SendableValue>) -> Result<SendableValue, String> {
            Ok(SendableValue::Null)
        }
    }

    #[test]
    fn register_is_last_write_wins_on_name_collision() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(NoOp("dup")));
        registry.register(Box::new(NoOp("dup")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister_absent_name_is_idempotent_noop() {
        let mut registry = ToolRegistry::new();
        registry.unregister("missing");
        assert!(registry.is_empty());
    }

    #[test]
    fn list_returns_schema_per_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(NoOp("a")));
        registry.register(Box::new(NoOp("b")));
        let names: Vec<_> = registry.list().into_iter().map(|s| s.name).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"a".to_string()));
        assert!(names.contains(&"b".to_string()));
    }
}
