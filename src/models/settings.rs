use serde::{Deserialize, Serialize};

/// 设置存储中使用的键名（与前端/存储协作方共享）
pub const KEY_AUTO_UPDATE_ON_LAUNCH: &str = "auto_update_on_launch";
pub const KEY_LAUNCH_AT_LOGIN: &str = "launch_at_login";

/// 持久化的用户偏好
///
/// 启动时加载一次（缺失键按字段默认值补齐），每次切换后单独立即写回，
/// 进程生命周期内不会删除。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// 启动时若检测到本地工具落后则自动静默更新
    #[serde(default = "default_true")]
    pub auto_update_on_launch: bool,
    /// 开机自启动（与系统级注册状态对账，持久化值为准）
    #[serde(default)]
    pub launch_at_login: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            auto_update_on_launch: true,
            launch_at_login: false,
        }
    }
}
