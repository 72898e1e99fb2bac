//! `current_time` tool — reports the local date and time.

use std::collections::HashMap;
use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::Local;
use serde_json::{json, Value};

use super::base::{optional_string, Tool};

const DEFAULT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Get the current local date and time."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "description": "strftime-style format, default \"%Y-%m-%d %H:%M:%S\""
                }
            },
            "required": []
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let format = optional_string(&params, "format").unwrap_or_else(|| DEFAULT_FORMAT.into());

        // Writing through fmt::Write surfaces bad specifiers as an error
        let mut out = String::new();
        write!(out, "{}", Local::now().format(&format))
            .map_err(|_| anyhow::anyhow!("invalid time format '{format}'"))?;
        Ok(out)
    }
}
