//! Current time tool

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};

use super::{ToolArguments, ToolHandler, ToolSpec};

pub const TIME_TOOL_NAME: &str = "now";

/// Reports the server's current local date and time
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeTool;

impl TimeTool {
    #[must_use]
    pub fn spec() -> ToolSpec {
        ToolSpec::new(
            TIME_TOOL_NAME,
            "Get the current local date and time.",
            TimeTool,
        )
    }

    fn format<Tz: TimeZone>(now: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        now.format("%Y-%m-%d %H:%M:%S %:z").to_string()
    }
}

#[async_trait]
impl ToolHandler for TimeTool {
    async fn invoke(&self, _arguments: &ToolArguments) -> Result<String> {
        Ok(Self::format(&Local::now()))
    }
}
