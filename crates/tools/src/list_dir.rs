//! Directory listing tool.

use crate::sandboxed_path;
use async_trait::async_trait;
use shellwright_core::{
    FieldKind, InputSchema, PermissionLevel, Tool, ToolContext, ToolError, ToolResult,
    ValidatedInput,
};

const MAX_ENTRIES: usize = 500;

/// Lists a directory, one entry per line, directories suffixed with `/`.
pub struct ListDirTool;

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List the entries of a directory inside the project. Directories end with '/'."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new().optional(
            "path",
            FieldKind::String,
            "Directory to list; defaults to the working directory",
        )
    }

    fn default_permission(&self) -> PermissionLevel {
        PermissionLevel::Allow
    }

    async fn execute(&self, input: ValidatedInput, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let path = input.str("path").unwrap_or(".");
        let resolved = sandboxed_path(self.name(), ctx, path)?;

        let mut reader = match tokio::fs::read_dir(&resolved).await {
            Ok(reader) => reader,
            Err(e) => return Ok(ToolResult::error(format!("Failed to list {path}: {e}"))),
        };

        let mut entries = Vec::new();
        loop {
            match reader.next_entry().await {
                Ok(Some(entry)) => {
                    let mut name = entry.file_name().to_string_lossy().to_string();
                    if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                        name.push('/');
                    }
                    entries.push(name);
                }
                Ok(None) => break,
                Err(e) => return Ok(ToolResult::error(format!("Failed to list {path}: {e}"))),
            }
        }

        if entries.is_empty() {
            return Ok(ToolResult::success(format!("{path} is empty")));
        }

        entries.sort();
        let total = entries.len();
        entries.truncate(MAX_ENTRIES);
        let mut output = entries.join("\n");
        if total > MAX_ENTRIES {
            output.push_str(&format!("\n[{} more entries not shown]", total - MAX_ENTRIES));
        }
        Ok(ToolResult::success(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellwright_core::{ToolCall, ToolRegistry};

    async fn list(input: serde_json::Value, ctx: &ToolContext) -> ToolResult {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(ListDirTool));
        registry.execute(&ToolCall::new("l1", "list_dir", input), ctx).await
    }

    #[tokio::test]
    async fn lists_sorted_with_dir_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();

        let result = list(serde_json::json!({}), &ToolContext::new(dir.path())).await;
        assert_eq!(result, ToolResult::success("a.txt\nb.txt\nsrc/"));
    }

    #[tokio::test]
    async fn empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("empty")).unwrap();
        let result = list(serde_json::json!({"path": "empty"}), &ToolContext::new(dir.path())).await;
        assert_eq!(result, ToolResult::success("empty is empty"));
    }

    #[tokio::test]
    async fn outside_root_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let result = list(serde_json::json!({"path": ".."}), &ToolContext::new(dir.path())).await;
        assert!(!result.is_success());
    }
}
