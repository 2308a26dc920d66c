// 开机自启动协作方
//
// 对应系统级注册状态：Linux 写 XDG autostart 桌面项，macOS 写
// LaunchAgent plist，Windows 走注册表 Run 键（reg 命令）。

use std::path::PathBuf;

use anyhow::{Context, Result};

/// 系统自启动注册接口
pub trait Autostart: Send + Sync {
    fn is_enabled(&self) -> bool;
    fn enable(&self) -> Result<()>;
    fn disable(&self) -> Result<()>;
}

/// 基于文件/注册表的系统实现
pub struct SystemAutostart {
    /// Unix 平台的注册项路径（桌面项或 plist）
    entry_path: PathBuf,
}

impl SystemAutostart {
    pub fn new() -> Self {
        SystemAutostart {
            entry_path: default_entry_path(),
        }
    }

    /// 指定注册项路径（测试用）
    pub fn with_entry_path(path: impl Into<PathBuf>) -> Self {
        SystemAutostart {
            entry_path: path.into(),
        }
    }

    fn entry_content(&self) -> Result<String> {
        let exe = std::env::current_exe().context("Unable to determine current executable path")?;
        let exe = exe.to_string_lossy();

        #[cfg(target_os = "macos")]
        {
            Ok(format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>inc.story.launcher</string>
    <key>ProgramArguments</key>
    <array>
        <string>{exe}</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
</dict>
</plist>
"#
            ))
        }

        #[cfg(not(target_os = "macos"))]
        {
            Ok(format!(
                "[Desktop Entry]\nType=Application\nName=Story Launcher\nExec={exe}\nX-GNOME-Autostart-enabled=true\n"
            ))
        }
    }
}

impl Default for SystemAutostart {
    fn default() -> Self {
        Self::new()
    }
}

fn default_entry_path() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .unwrap_or_default()
            .join("Library/LaunchAgents/inc.story.launcher.plist")
    }

    #[cfg(not(target_os = "macos"))]
    {
        dirs::config_dir()
            .unwrap_or_default()
            .join("autostart/story-launcher.desktop")
    }
}

#[cfg(not(target_os = "windows"))]
impl Autostart for SystemAutostart {
    fn is_enabled(&self) -> bool {
        self.entry_path.exists()
    }

    fn enable(&self) -> Result<()> {
        if let Some(parent) = self.entry_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&self.entry_path, self.entry_content()?)
            .with_context(|| format!("Failed to write {}", self.entry_path.display()))?;
        tracing::info!(path = %self.entry_path.display(), "已注册开机自启动");
        Ok(())
    }

    fn disable(&self) -> Result<()> {
        if self.entry_path.exists() {
            std::fs::remove_file(&self.entry_path)
                .with_context(|| format!("Failed to remove {}", self.entry_path.display()))?;
        }
        tracing::info!(path = %self.entry_path.display(), "已取消开机自启动");
        Ok(())
    }
}

#[cfg(target_os = "windows")]
impl Autostart for SystemAutostart {
    fn is_enabled(&self) -> bool {
        let executor = crate::utils::CommandExecutor::new();
        executor
            .execute(r#"reg query "HKCU\Software\Microsoft\Windows\CurrentVersion\Run" /v StoryLauncher"#)
            .success
    }

    fn enable(&self) -> Result<()> {
        let exe = std::env::current_exe().context("Unable to determine current executable path")?;
        let executor = crate::utils::CommandExecutor::new();
        let result = executor.execute(&format!(
            r#"reg add "HKCU\Software\Microsoft\Windows\CurrentVersion\Run" /v StoryLauncher /t REG_SZ /d "{}" /f"#,
            exe.display()
        ));
        anyhow::ensure!(result.success, "reg add failed: {}", result.failure_detail());
        Ok(())
    }

    fn disable(&self) -> Result<()> {
        let executor = crate::utils::CommandExecutor::new();
        let result = executor.execute(
            r#"reg delete "HKCU\Software\Microsoft\Windows\CurrentVersion\Run" /v StoryLauncher /f"#,
        );
        // 键不存在时 reg delete 返回失败，视为已禁用
        if !result.success {
            tracing::debug!(detail = %result.failure_detail(), "reg delete 未删除任何键");
        }
        Ok(())
    }
}
