//! Built-in tool implementations for Shellwright.
//!
//! Tools give the agent the ability to act on the project: run shell
//! commands, read and write files, and list directories. File tools are
//! sandboxed to the project root of the [`ToolContext`].

pub mod file_read;
pub mod file_write;
pub mod list_dir;
pub mod shell;

pub use file_read::FileReadTool;
pub use file_write::FileWriteTool;
pub use list_dir::ListDirTool;
pub use shell::ShellTool;

use shellwright_core::{ToolContext, ToolError, ToolRegistry};
use std::path::PathBuf;

/// Create a default tool registry with all built-in tools.
///
/// Permission defaults:
/// - `file_read`, `list_dir`: allow
/// - `shell`, `file_write`: ask
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ShellTool::new()));
    registry.register(Box::new(FileReadTool));
    registry.register(Box::new(FileWriteTool));
    registry.register(Box::new(ListDirTool));
    registry
}

/// Resolve `path` against the context and reject anything outside the
/// project root.
pub(crate) fn sandboxed_path(
    tool_name: &str,
    ctx: &ToolContext,
    path: &str,
) -> Result<PathBuf, ToolError> {
    shellwright_security::validate_path(&ctx.resolve(path), &ctx.project_root).map_err(|e| {
        ToolError::PermissionDenied {
            tool_name: tool_name.into(),
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellwright_core::PermissionLevel;

    #[test]
    fn default_registry_has_builtin_tools() {
        let registry = default_registry();
        assert_eq!(registry.names(), vec!["shell", "file_read", "file_write", "list_dir"]);
    }

    #[test]
    fn default_permissions() {
        let registry = default_registry();
        let level = |name: &str| registry.get(name).map(|t| t.default_permission());
        assert_eq!(level("shell"), Some(PermissionLevel::Ask));
        assert_eq!(level("file_write"), Some(PermissionLevel::Ask));
        assert_eq!(level("file_read"), Some(PermissionLevel::Allow));
        assert_eq!(level("list_dir"), Some(PermissionLevel::Allow));
    }

    #[test]
    fn provider_schema_lists_every_tool() {
        let schemas = default_registry().to_provider_schema();
        assert_eq!(schemas.len(), 4);
        assert!(schemas.iter().all(|s| s.parameters["type"] == "object"));
    }
}
