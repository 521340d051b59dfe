//! Tool host backed by the map servers.

use super::{ToolError, ToolHost};
use crate::model::{ToolCall, ToolSpec};
use maps::Toolbox;
use serde_json::Value;

impl From<maps::ToolSpec> for ToolSpec {
    fn from(spec: maps::ToolSpec) -> Self {
        Self {
            name: spec.name,
            description: spec.description,
            schema: spec.input_schema,
        }
    }
}

/// Exposes a [`Toolbox`] to the assistant loop.
#[derive(Debug, Clone)]
pub struct MapToolHost {
    toolbox: Toolbox,
    specs: Vec<ToolSpec>,
}

impl MapToolHost {
    /// Cache the tool specs up front; they never change.
    pub fn new(toolbox: Toolbox) -> Self {
        let specs = toolbox.specs().into_iter().map(ToolSpec::from).collect();
        Self { toolbox, specs }
    }
}

impl ToolHost for MapToolHost {
    fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
        Ok(self.toolbox.call(&call.name, call.input.clone()).await?)
    }
}
