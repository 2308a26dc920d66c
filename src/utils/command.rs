use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;

/// 命令执行结果
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandResult {
    pub fn from_output(output: Output) -> Self {
        CommandResult {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code(),
        }
    }

    pub fn from_error(error: io::Error) -> Self {
        CommandResult {
            success: false,
            stdout: String::new(),
            stderr: error.to_string(),
            exit_code: None,
        }
    }

    /// 失败原因的单行描述（优先 stderr，其次 stdout）
    pub fn failure_detail(&self) -> String {
        if !self.stderr.is_empty() {
            self.stderr.clone()
        } else if !self.stdout.is_empty() {
            self.stdout.clone()
        } else {
            format!("exit code {:?}", self.exit_code)
        }
    }
}

/// 命令执行器
///
/// 通过系统 shell 执行单行命令；可选指定工作目录（git 类命令需要在
/// 工具检出目录内执行）。
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    working_dir: Option<PathBuf>,
}

impl CommandExecutor {
    pub fn new() -> Self {
        CommandExecutor { working_dir: None }
    }

    /// 固定工作目录的执行器
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        CommandExecutor {
            working_dir: Some(dir.as_ref().to_path_buf()),
        }
    }

    /// 执行命令（同步）
    pub fn execute(&self, command_str: &str) -> CommandResult {
        let output = if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command_str]);
            #[cfg(target_os = "windows")]
            cmd.creation_flags(0x08000000); // CREATE_NO_WINDOW
            if let Some(dir) = &self.working_dir {
                cmd.current_dir(dir);
            }
            cmd.output()
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command_str]);
            if let Some(dir) = &self.working_dir {
                cmd.current_dir(dir);
            }
            cmd.output()
        };

        match output {
            Ok(output) => CommandResult::from_output(output),
            Err(e) => CommandResult::from_error(e),
        }
    }

    /// 执行命令（异步，spawn_blocking 包装）
    pub async fn execute_async(&self, command_str: &str) -> CommandResult {
        let command_str = command_str.to_string();
        let executor = self.clone();

        tokio::task::spawn_blocking(move || executor.execute(&command_str))
            .await
            .unwrap_or_else(|e| CommandResult {
                success: false,
                stdout: String::new(),
                stderr: format!("任务执行失败: {e}"),
                exit_code: None,
            })
    }

    /// 检查命令是否存在
    pub fn command_exists(&self, command: &str) -> bool {
        let cmd_name = command.split_whitespace().next().unwrap_or(command);

        let check_cmd = if cfg!(target_os = "windows") {
            format!("where {cmd_name}")
        } else {
            format!("command -v {cmd_name}")
        };

        self.execute(&check_cmd).success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute() {
        let executor = CommandExecutor::new();
        let result = executor.execute("echo test");

        assert!(result.success);
        assert!(result.stdout.contains("test"));
    }

    #[test]
    fn test_execute_in_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let executor = CommandExecutor::in_dir(temp.path());
        let result = if cfg!(windows) {
            executor.execute("cd")
        } else {
            executor.execute("pwd")
        };

        assert!(result.success);
    }

    #[test]
    fn test_command_exists() {
        let executor = CommandExecutor::new();

        if cfg!(windows) {
            assert!(executor.command_exists("cmd"));
        } else {
            assert!(executor.command_exists("sh"));
        }
        assert!(!executor.command_exists("definitely-not-a-real-command-xyz"));
    }

    #[test]
    fn test_failure_detail_prefers_stderr() {
        let result = CommandResult {
            success: false,
            stdout: "out".to_string(),
            stderr: "boom".to_string(),
            exit_code: Some(1),
        };
        assert_eq!(result.failure_detail(), "boom");
    }

    #[tokio::test]
    async fn test_async_execution() {
        let executor = CommandExecutor::new();
        let result = executor.execute_async("echo async_test").await;

        assert!(result.success);
    }
}
