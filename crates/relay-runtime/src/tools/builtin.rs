use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ToolError, ToolHandler};

const MAX_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Debug, Default, Deserialize)]
struct CurrentTimeArgs {
    #[serde(default)]
    offset_minutes: Option<i32>,
}

/// `get_current_time`: current time as RFC 3339, UTC unless an offset is given
pub struct CurrentTimeTool;

#[async_trait]
impl ToolHandler for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: CurrentTimeArgs =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let offset_minutes = args.offset_minutes.unwrap_or(0);
        if offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(ToolError::InvalidArguments(format!(
                "offset_minutes must be within ±{}",
                MAX_OFFSET_MINUTES
            )));
        }

        let offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| ToolError::InvalidArguments("offset out of range".to_string()))?;
        let now = Utc::now().with_timezone(&offset);

        Ok(json!({
            "iso8601": now.to_rfc3339(),
            "unix": now.timestamp(),
            "offset_minutes": offset_minutes,
        }))
    }
}
