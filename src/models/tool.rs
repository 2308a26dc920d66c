use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 受管理本地工具的状态快照
///
/// 每次探测重新计算，不持久化。`has_update` 为派生字段：
/// 只有在工具已安装、且本地/远端 commit 均已解析并且不一致时才为 true。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolStatus {
    pub installed: bool,
    pub local_version: Option<String>,
    /// 完整 commit 引用，展示时截断为短格式
    pub local_commit: Option<String>,
    pub remote_commit: Option<String>,
    pub has_update: bool,
    /// 探测失败详情；存在时不清空已解析的其它字段
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ToolStatus {
    /// 未安装（或探测彻底失败）时的安全默认值
    pub fn not_installed(error: Option<String>) -> Self {
        ToolStatus {
            installed: false,
            local_version: None,
            local_commit: None,
            remote_commit: None,
            has_update: false,
            error,
            checked_at: Utc::now(),
        }
    }

    /// 根据当前字段重新派生 `has_update`
    ///
    /// 不变量：`installed` 为 false 或任一 commit 缺失时恒为 false。
    pub fn derive_has_update(mut self) -> Self {
        self.has_update = self.installed
            && matches!(
                (&self.local_commit, &self.remote_commit),
                (Some(local), Some(remote)) if local != remote
            );
        self
    }

    /// commit 短格式（前 7 位），用于展示
    pub fn short_commit(commit: &str) -> &str {
        if commit.len() > 7 {
            &commit[..7]
        } else {
            commit
        }
    }
}

impl Default for ToolStatus {
    fn default() -> Self {
        ToolStatus::not_installed(None)
    }
}

/// 单次动作（更新/启动/打开）的结果
///
/// 一次性消费：产生一条用户可见消息，或在静默路径下只写日志。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        ActionResult {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ActionResult {
            success: false,
            message: message.into(),
        }
    }
}
