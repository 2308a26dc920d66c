use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;

use super::LocalTool;
use crate::models::{ActionResult, ToolStatus};
use crate::utils::CommandExecutor;

/// resolve-sync 脚本的检出目录名
const TOOL_DIR_NAME: &str = "resolve-sync";
/// 检出目录内的入口脚本
const ENTRY_SCRIPT: &str = "resolve-sync.sh";

/// git 检出形态的本地工具
///
/// 事实来源全部通过在检出目录内执行 git 命令获得：
/// - 已安装：目录下存在 `.git`
/// - 本地版本：`git describe --tags --always`（尽力而为）
/// - 本地 commit：`git rev-parse HEAD`
/// - 远端 commit：`git ls-remote origin HEAD`
pub struct GitScriptTool {
    checkout_dir: PathBuf,
}

impl GitScriptTool {
    pub fn new() -> Self {
        GitScriptTool {
            checkout_dir: crate::utils::tools_dir().join(TOOL_DIR_NAME),
        }
    }

    /// 指定检出目录（测试用）
    pub fn with_checkout_dir(dir: impl Into<PathBuf>) -> Self {
        GitScriptTool {
            checkout_dir: dir.into(),
        }
    }

    pub fn checkout_dir(&self) -> &Path {
        &self.checkout_dir
    }

    fn executor(&self) -> CommandExecutor {
        CommandExecutor::in_dir(&self.checkout_dir)
    }

    fn is_installed(&self) -> bool {
        self.checkout_dir.join(".git").exists()
    }
}

impl Default for GitScriptTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalTool for GitScriptTool {
    async fn check_status(&self) -> ToolStatus {
        if !self.is_installed() {
            return ToolStatus::not_installed(None);
        }

        let executor = self.executor();
        let mut status = ToolStatus {
            installed: true,
            checked_at: Utc::now(),
            ..ToolStatus::default()
        };

        // 本地事实：version 纯属展示，失败只降级为 None
        let describe = executor.execute_async("git describe --tags --always").await;
        if describe.success && !describe.stdout.is_empty() {
            status.local_version = Some(describe.stdout.clone());
        }

        let head = executor.execute_async("git rev-parse HEAD").await;
        if head.success && !head.stdout.is_empty() {
            status.local_commit = Some(head.stdout.clone());
        } else {
            // 检出损坏：按未安装形态报告，错误进 error 字段
            tracing::warn!(detail = %head.failure_detail(), "解析本地 HEAD 失败");
            return ToolStatus::not_installed(Some(format!(
                "Failed to resolve local HEAD: {}",
                head.failure_detail()
            )));
        }

        // 远端事实：失败保留已解析的本地字段
        let remote = executor.execute_async("git ls-remote origin HEAD").await;
        if remote.success {
            status.remote_commit = remote
                .stdout
                .split_whitespace()
                .next()
                .filter(|s| !s.is_empty())
                .map(String::from);
        }
        if status.remote_commit.is_none() {
            tracing::warn!(detail = %remote.failure_detail(), "解析远端 HEAD 失败");
            status.error = Some(format!(
                "Failed to resolve remote HEAD: {}",
                remote.failure_detail()
            ));
        }

        status.derive_has_update()
    }

    async fn update(&self) -> ActionResult {
        if !self.is_installed() {
            return ActionResult::failed("Tool is not installed");
        }

        let result = self.executor().execute_async("git pull --ff-only").await;
        if result.success {
            ActionResult::ok(if result.stdout.is_empty() {
                "Updated".to_string()
            } else {
                result.stdout
            })
        } else {
            ActionResult::failed(format!("Update failed: {}", result.failure_detail()))
        }
    }

    async fn launch(&self) -> ActionResult {
        let script = self.checkout_dir.join(ENTRY_SCRIPT);
        if !script.exists() {
            return ActionResult::failed("Tool is not installed");
        }

        match tokio::process::Command::new(&script)
            .current_dir(&self.checkout_dir)
            .spawn()
        {
            Ok(_) => ActionResult::ok("Launched"),
            Err(e) => ActionResult::failed(format!("Failed to launch: {e}")),
        }
    }
}
