//! File write tool — write or create files with path validation.

use crate::sandboxed_path;
use async_trait::async_trait;
use shellwright_core::{
    FieldKind, InputSchema, Tool, ToolContext, ToolError, ToolResult, ValidatedInput,
};
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub struct FileWriteTool;

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "file_write"
    }

    fn description(&self) -> &str {
        "Write content to a file inside the project. Creates the file and missing parent directories; overwrites unless append is true."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new()
            .required("path", FieldKind::String, "The file path to write to")
            .required("content", FieldKind::String, "The content to write")
            .optional("append", FieldKind::Boolean, "Append instead of overwriting")
    }

    async fn execute(&self, input: ValidatedInput, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let path = input.str("path").unwrap_or_default();
        let content = input.str("content").unwrap_or_default();
        let append = input.bool("append").unwrap_or(false);
        let resolved = sandboxed_path(self.name(), ctx, path)?;

        if let Some(parent) = resolved.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(ToolResult::error(format!("Failed to create directory: {e}")));
        }

        let written = if append {
            append_to(&resolved, content).await
        } else {
            tokio::fs::write(&resolved, content).await
        };

        match written {
            Ok(()) => {
                debug!(path = %resolved.display(), bytes = content.len(), append, "File written");
                Ok(ToolResult::success(format!(
                    "Successfully wrote {} bytes to {path}",
                    content.len()
                )))
            }
            Err(e) => Ok(ToolResult::error(format!("Failed to write file: {e}"))),
        }
    }
}

async fn append_to(path: &std::path::Path, content: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await
}
