//! File read tool — read file contents with path validation.

use crate::sandboxed_path;
use async_trait::async_trait;
use shellwright_core::{
    FieldKind, InputSchema, PermissionLevel, Tool, ToolContext, ToolError, ToolResult,
    ValidatedInput,
};

const MAX_READ_BYTES: u64 = 1024 * 1024;

pub struct FileReadTool;

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "file_read"
    }

    fn description(&self) -> &str {
        "Read the contents of a file inside the project. Optionally pass a 1-based start line and a line count."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new()
            .required("path", FieldKind::String, "The file path to read")
            .optional("offset", FieldKind::Integer, "1-based line to start reading from")
            .optional("limit", FieldKind::Integer, "Maximum number of lines to return")
    }

    fn default_permission(&self) -> PermissionLevel {
        PermissionLevel::Allow
    }

    async fn execute(&self, input: ValidatedInput, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let path = input.str("path").unwrap_or_default();
        let resolved = sandboxed_path(self.name(), ctx, path)?;

        match tokio::fs::metadata(&resolved).await {
            Ok(meta) if meta.is_dir() => {
                return Ok(ToolResult::error(format!("{path} is a directory; use list_dir")));
            }
            Ok(meta) if meta.len() > MAX_READ_BYTES => {
                return Ok(ToolResult::error(format!(
                    "{path} is {} bytes; files over {MAX_READ_BYTES} bytes are not read",
                    meta.len()
                )));
            }
            _ => {}
        }

        let content = match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => content,
            Err(e) => return Ok(ToolResult::error(format!("Failed to read file: {e}"))),
        };

        let offset = input.i64("offset").filter(|n| *n > 0);
        let limit = input.i64("limit").filter(|n| *n > 0);
        if offset.is_none() && limit.is_none() {
            return Ok(ToolResult::success(content));
        }

        let skip = offset.map(|n| n as usize - 1).unwrap_or(0);
        let take = limit.map(|n| n as usize).unwrap_or(usize::MAX);
        let slice: Vec<&str> = content.lines().skip(skip).take(take).collect();
        Ok(ToolResult::success(slice.join("\n")))
    }
}
