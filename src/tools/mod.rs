//! Local capabilities the remote model can call.
//!
//! Tools are registered by name in a [`ToolDispatcher`]. Dispatch always
//! yields exactly one result per call: handler errors and unknown names are
//! turned into a best-effort result string so the remote call never dangles.

mod location;
mod navigation;

pub use location::{Coordinates, CurrentLocationTool, LocationProvider, SharedLocation};
pub use navigation::{NavigateTool, Navigator, Page, RecordingNavigator};

use crate::error::Result;
use crate::remote::{FunctionCall, FunctionDeclaration};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// A local capability exposed to the model
pub trait ToolHandler: Send + Sync {
    /// Function name declared to the model
    fn name(&self) -> &str;

    /// Schema sent in the session setup
    fn declaration(&self) -> FunctionDeclaration;

    /// Activity text shown in the conversation while the tool runs
    fn activity(&self, _args: &Value) -> String {
        format!("Consulting {}...", self.name())
    }

    /// Resolve the call synchronously
    fn call(&self, args: &Value) -> Result<Value>;
}

/// Outcome of one dispatched call, ready to be answered by id
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub id: String,
    pub name: String,
    pub activity: String,
    pub result: Value,
}

#[derive(Default)]
pub struct ToolDispatcher {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher with `getCurrentLocation` and `navigateToPage`
    pub fn with_builtins(
        location: Arc<dyn LocationProvider>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(Arc::new(CurrentLocationTool::new(location)));
        dispatcher.register(Arc::new(NavigateTool::new(navigator)));
        dispatcher
    }

    /// Register a handler. Replaces any existing handler with the same name.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Declarations for all registered tools, sorted by name
    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        let mut decls: Vec<FunctionDeclaration> =
            self.handlers.values().map(|h| h.declaration()).collect();
        decls.sort_by(|a, b| a.name.cmp(&b.name));
        decls
    }

    /// Resolve one call. Never fails.
    pub fn dispatch(&self, call: &FunctionCall) -> ToolOutcome {
        info!("Tool call {} (id={})", call.name, call.id);

        let Some(handler) = self.handlers.get(&call.name) else {
            warn!("Unknown tool requested: {}", call.name);
            return ToolOutcome {
                id: call.id.clone(),
                name: call.name.clone(),
                activity: format!("Consulting {}...", call.name),
                result: Value::String(format!("Unknown tool: {}", call.name)),
            };
        };

        let activity = handler.activity(&call.args);
        let result = match handler.call(&call.args) {
            Ok(result) => result,
            Err(e) => {
                warn!("Tool {} failed: {}", call.name, e);
                Value::String(format!("Error: {}", e))
            }
        };

        ToolOutcome {
            id: call.id.clone(),
            name: call.name.clone(),
            activity,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;

    struct FailingTool;

    impl ToolHandler for FailingTool {
        fn name(&self) -> &str {
            "broken"
        }
        fn declaration(&self) -> FunctionDeclaration {
            FunctionDeclaration {
                name: "broken".into(),
                description: "Always fails".into(),
                parameters: serde_json::json!({ "type": "OBJECT", "properties": {} }),
            }
        }
        fn call(&self, _args: &Value) -> Result<Value> {
            Err(AssistantError::Tool("boom".into()))
        }
    }

    fn call(id: &str, name: &str) -> FunctionCall {
        FunctionCall {
            id: id.into(),
            name: name.into(),
            args: Value::Null,
        }
    }

    #[test]
    fn unknown_tool_still_answers() {
        let dispatcher = ToolDispatcher::new();
        let outcome = dispatcher.dispatch(&call("x1", "teleport"));
        assert_eq!(outcome.id, "x1");
        assert_eq!(outcome.result, Value::String("Unknown tool: teleport".into()));
    }

    #[test]
    fn handler_error_becomes_result_string() {
        let mut dispatcher = ToolDispatcher::new();
        dispatcher.register(Arc::new(FailingTool));
        let outcome = dispatcher.dispatch(&call("x2", "broken"));
        assert_eq!(outcome.activity, "Consulting broken...");
        assert_eq!(outcome.result, Value::String("Error: tool error: boom".into()));
    }

    #[test]
    fn builtins_are_declared_in_name_order() {
        let dispatcher = ToolDispatcher::with_builtins(
            Arc::new(SharedLocation::default()),
            Arc::new(RecordingNavigator::default()),
        );
        let names: Vec<String> = dispatcher.declarations().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["getCurrentLocation", "navigateToPage"]);
    }
}
