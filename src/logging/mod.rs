//! 日志系统
//!
//! 基于 tracing 的结构化日志，支持：
//! - 控制台与滚动文件双输出
//! - JSON 格式可选
//! - 运行时动态调整级别（reload）
//! - `RUST_LOG` 环境变量覆盖

use std::path::PathBuf;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// 全局日志级别 reload handle
static LOG_LEVEL_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// 带可重载过滤层的 subscriber 类型（输出层挂载在它之上）
type FilteredRegistry =
    tracing_subscriber::layer::Layered<reload::Layer<EnvFilter, Registry>, Registry>;

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub console_enabled: bool,
    pub file_enabled: bool,
    /// 自定义日志目录；None 时使用 ~/.story-launcher/logs
    pub log_dir: Option<PathBuf>,
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            console_enabled: true,
            file_enabled: true,
            log_dir: None,
            json_format: false,
        }
    }
}

/// 初始化日志系统
///
/// 级别可以随后通过 [`update_log_level`] 动态调整；输出目标与格式的变更
/// 需要重启进程生效。
pub fn init_logger(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = create_env_filter(config.level);
    let (filter_layer, reload_handle) = reload::Layer::new(filter);

    if LOG_LEVEL_HANDLE.set(reload_handle).is_err() {
        anyhow::bail!("日志系统已初始化，不能重复初始化");
    }

    let mut layers: Vec<Box<dyn Layer<FilteredRegistry> + Send + Sync>> = Vec::new();

    if config.console_enabled {
        if config.json_format {
            layers.push(fmt::layer().json().with_writer(std::io::stdout).boxed());
        } else {
            layers.push(
                fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_target(cfg!(debug_assertions))
                    .with_ansi(true)
                    .boxed(),
            );
        }
    }

    if config.file_enabled {
        let log_dir = resolve_log_dir(config.log_dir.clone())?;
        let file_appender = rolling::daily(log_dir, "story-launcher");
        let (writer, guard) = non_blocking(file_appender);

        // guard 持有后台写线程，进程生命周期内不能 drop
        Box::leak(Box::new(guard));

        if config.json_format {
            layers.push(fmt::layer().json().with_writer(writer).with_ansi(false).boxed());
        } else {
            layers.push(fmt::layer().with_writer(writer).with_ansi(false).boxed());
        }
    }

    Registry::default().with(filter_layer).with(layers).init();

    tracing::info!(
        level = config.level.as_str(),
        console = config.console_enabled,
        file = config.file_enabled,
        json = config.json_format,
        "日志系统初始化完成"
    );

    Ok(())
}

/// 动态更新日志级别（热重载）
pub fn update_log_level(new_level: LogLevel) -> anyhow::Result<()> {
    let handle = LOG_LEVEL_HANDLE
        .get()
        .ok_or_else(|| anyhow::anyhow!("日志系统未初始化"))?;

    handle
        .reload(create_env_filter(new_level))
        .map_err(|e| anyhow::anyhow!("重载日志级别失败: {}", e))?;

    tracing::info!(new_level = new_level.as_str(), "日志级别已动态更新");
    Ok(())
}

/// 环境过滤器：RUST_LOG 优先，默认应用级别 + 第三方库 warn
fn create_env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "story_launcher={},hyper=warn,reqwest=warn,h2=warn",
            level.as_str()
        ))
    })
}

fn resolve_log_dir(custom: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let dir = match custom {
        Some(path) => path,
        None => crate::utils::launcher_dir().join("logs"),
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
