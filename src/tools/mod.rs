//! Callable tools and the registry the dispatcher consults

pub mod registry;
pub mod time;
pub mod weather;

pub use registry::{ParameterType, ToolArguments, ToolHandler, ToolParameter, ToolRegistry, ToolSpec};
pub use time::TimeTool;
pub use weather::WeatherTool;

use crate::error::AssistantError;

/// Build the registry with every built-in tool.
///
/// # Errors
///
/// Fails if two tools share a name.
pub fn default_registry(weather: WeatherTool) -> Result<ToolRegistry, AssistantError> {
    let mut registry = ToolRegistry::new();
    registry.register(TimeTool::spec())?;
    registry.register(weather.into_spec())?;
    Ok(registry)
}
