//! Tool abstraction and registry.
//!
//! Tools are the only path through which the model can affect task data. The
//! set of tools is closed: `ToolKind` enumerates every tool the dispatcher
//! will ever execute, so a model inventing a tool name is rejected without a
//! lookup in any dynamic table reaching beyond this enum.
//!
//! A tool failure is not a request failure. Validation and execution errors
//! are folded into a structured [`ToolOutcome`] whose payload goes back to
//! the model as a tool-result turn, letting the model recover (retry with
//! fixed arguments, or explain the problem to the user).

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// The closed set of task tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    AddTask,
    ListTasks,
    CompleteTask,
    UpdateTask,
    DeleteTask,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::AddTask,
        ToolKind::ListTasks,
        ToolKind::CompleteTask,
        ToolKind::UpdateTask,
        ToolKind::DeleteTask,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::AddTask => "add_task",
            ToolKind::ListTasks => "list_tasks",
            ToolKind::CompleteTask => "complete_task",
            ToolKind::UpdateTask => "update_task",
            ToolKind::DeleteTask => "delete_task",
        }
    }

    pub fn parse(s: &str) -> Option<ToolKind> {
        match s {
            "add_task" => Some(ToolKind::AddTask),
            "list_tasks" => Some(ToolKind::ListTasks),
            "complete_task" => Some(ToolKind::CompleteTask),
            "update_task" => Some(ToolKind::UpdateTask),
            "delete_task" => Some(ToolKind::DeleteTask),
            _ => None,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of one tool execution, success or failure, as a JSON payload
/// propagated verbatim to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    /// The full payload, including the `success` field, exactly as it will
    /// be serialized into the tool-result message.
    pub payload: Value,
}

impl ToolOutcome {
    /// A successful outcome. `payload` should be an object; a `success: true`
    /// field is merged in.
    pub fn ok(mut payload: Value) -> Self {
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("success".into(), Value::Bool(true));
        }
        ToolOutcome {
            success: true,
            payload,
        }
    }

    /// A failed outcome with an error kind and a human-readable message.
    pub fn error(kind: &str, message: impl Into<String>) -> Self {
        ToolOutcome {
            success: false,
            payload: serde_json::json!({
                "success": false,
                "error": kind,
                "message": message.into(),
            }),
        }
    }
}

/// One entry in a request's ordered tool call log.
///
/// `tool` is the name the model used, kept as a string so calls to unknown
/// tools are still recorded.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub arguments: Value,
    pub outcome: ToolOutcome,
}

/// The trait every task tool implements.
///
/// `user_id` is always supplied by the dispatcher from the authenticated
/// request, never from model-supplied arguments.
#[async_trait]
pub trait TaskTool: Send + Sync {
    fn kind(&self) -> ToolKind;

    fn description(&self) -> &str;

    /// JSON Schema for the model-facing parameters.
    fn parameters_schema(&self) -> Value;

    /// Structural validation of model-supplied arguments, before execution.
    fn validate(&self, args: &Value) -> Result<(), String>;

    /// Execute the tool for the given user.
    async fn execute(&self, user_id: &str, args: &Value) -> Result<ToolOutcome, ToolError>;
}

/// Registry of available tools, keyed by kind.
pub struct ToolRegistry {
    tools: HashMap<ToolKind, Box<dyn TaskTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Box<dyn TaskTool>) {
        self.tools.insert(tool.kind(), tool);
    }

    pub fn get(&self, kind: ToolKind) -> Option<&dyn TaskTool> {
        self.tools.get(&kind).map(|t| t.as_ref())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool definitions to advertise to the model, in stable order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        ToolKind::ALL
            .iter()
            .filter_map(|kind| self.tools.get(kind))
            .map(|tool| ToolDefinition {
                name: tool.kind().as_str().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
