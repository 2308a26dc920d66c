// 服务层模块
//
// - tool: 受管理本地工具的探测/更新/启动
// - settings: 偏好持久化与自启动对账
// - update: 应用自身更新（发布通道、下载、重启）
// - launcher: 顶层状态协调控制器
// - tray / autostart: 系统侧协作方接口
// - webapp: 远程 Web 应用入口

pub mod autostart;
pub mod launcher;
pub mod settings;
pub mod tool;
pub mod tray;
pub mod update;
pub mod webapp;

pub use autostart::{Autostart, SystemAutostart};
pub use launcher::{LauncherEvent, LauncherService};
pub use settings::{JsonFileStore, SettingsService, SettingsStore, StoreError};
pub use tool::{GitScriptTool, LocalTool};
pub use tray::{LogTrayIndicator, TrayIndicator};
pub use update::{ExecRestarter, GithubReleaseChannel, ReleaseChannel, Restarter, SelfUpdateService};
pub use webapp::{find_web_app, open_web_app, WebApp, WEB_APPS};
