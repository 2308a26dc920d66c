pub mod command;

pub use command::{CommandExecutor, CommandResult};

use std::path::PathBuf;

/// 启动器自身的数据目录（设置、日志）
pub fn launcher_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".story-launcher")
}

/// 受管理工具的检出目录
pub fn tools_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".story-tools")
}
