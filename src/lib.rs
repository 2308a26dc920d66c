// lib.rs - 暴露启动器核心给二进制与外壳使用

pub mod logging;
pub mod models;
pub mod services;
pub mod utils;

pub use models::*;
pub use services::launcher::{LauncherEvent, LauncherService};
pub use services::settings::SettingsService;
pub use services::tool::{GitScriptTool, LocalTool};
pub use services::update::SelfUpdateService;

// 重新导出常用类型
pub use anyhow::{Context, Result};

pub use logging::{init_logger, update_log_level, LogLevel, LoggingConfig};
