//! Result types exchanged with the host.

use serde::{Deserialize, Serialize};

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation.
    pub planned_state: serde_json::Value,
    /// The update actions an apply would submit, in order (JSON-encoded).
    pub actions: Vec<serde_json::Value>,
    /// Whether the resource requires replacement.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: serde_json::Value) -> Self {
        Self {
            planned_state: state,
            actions: Vec::new(),
            requires_replace: false,
        }
    }

    /// Create a plan result for an in-place update.
    pub fn with_actions(planned_state: serde_json::Value, actions: Vec<serde_json::Value>) -> Self {
        Self {
            planned_state,
            actions,
            requires_replace: false,
        }
    }

    /// Create a plan result that destroys and recreates the resource.
    pub fn replace(planned_state: serde_json::Value) -> Self {
        Self {
            planned_state,
            actions: Vec::new(),
            requires_replace: true,
        }
    }

    /// Whether applying this plan changes anything.
    pub fn has_changes(&self) -> bool {
        self.requires_replace || !self.actions.is_empty()
    }
}

/// An imported resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: serde_json::Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: serde_json::Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}
