// 重启协作方
//
// 就绪的更新由用户触发重启后生效；重启失败非致命，用户停留在
// 就绪横幅上可以重试。

use anyhow::{Context, Result};

/// 应用重启接口
pub trait Restarter: Send + Sync {
    fn relaunch(&self) -> Result<()>;
}

/// 直接拉起当前可执行文件的新实例
///
/// 旧实例的退出交给调用方（GUI 外壳或用户）。
pub struct ExecRestarter;

impl Restarter for ExecRestarter {
    fn relaunch(&self) -> Result<()> {
        let exe = std::env::current_exe().context("Unable to determine current executable path")?;
        std::process::Command::new(&exe)
            .spawn()
            .with_context(|| format!("Failed to relaunch {}", exe.display()))?;
        tracing::info!(exe = %exe.display(), "已拉起新实例");
        Ok(())
    }
}
