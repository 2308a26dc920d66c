// 状态协调控制器
//
// 启动时序：设置加载/对账 -> 首次探测 -> 条件静默自更新（至多一次）
// -> 重新探测；每次探测落地后把 staleness 镜像到托盘指示器。
// 对外暴露 refresh / update_now / launch 以及外部"检查更新"触发的订阅。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;

use crate::models::{ActionResult, Settings, ToolStatus};
use crate::services::settings::SettingsService;
use crate::services::tool::LocalTool;
use crate::services::tray::TrayIndicator;

/// 外部触发事件（托盘菜单等协作方投递，无负载）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LauncherEvent {
    CheckUpdates,
}

/// 启动器核心控制器
///
/// 独占持有 [`ToolStatus`] 状态单元；调用方只读快照，写入只经过
/// 本类型的公开操作。探测允许重叠，落地采用 last-write-wins。
pub struct LauncherService {
    tool: Arc<dyn LocalTool>,
    settings: Arc<SettingsService>,
    tray: Arc<dyn TrayIndicator>,
    status: RwLock<ToolStatus>,
    current_settings: RwLock<Settings>,
    /// 每个进程至多一次的自动更新守卫
    auto_update_done: AtomicBool,
    /// 更新动作的在途守卫（边界处抑制重复触发）
    updating: AtomicBool,
}

impl LauncherService {
    pub fn new(
        tool: Arc<dyn LocalTool>,
        settings: Arc<SettingsService>,
        tray: Arc<dyn TrayIndicator>,
    ) -> Self {
        LauncherService {
            tool,
            settings,
            tray,
            status: RwLock::new(ToolStatus::default()),
            current_settings: RwLock::new(Settings::default()),
            auto_update_done: AtomicBool::new(false),
            updating: AtomicBool::new(false),
        }
    }

    /// 启动时序
    ///
    /// 设置加载严格先于首次探测（避免自启动对账与状态读取竞争）；
    /// 若开启了 auto_update_on_launch 且首次探测报告落后，静默执行
    /// 一次更新并重新探测。自动更新每次启动至多触发一次。
    pub async fn startup(&self) {
        let settings = self.settings.load();
        if let Ok(mut current) = self.current_settings.write() {
            *current = settings;
        }

        let status = self.refresh().await;

        if settings.auto_update_on_launch
            && status.has_update
            && !self.auto_update_done.swap(true, Ordering::SeqCst)
        {
            tracing::info!("检测到工具落后，启动时自动更新");
            self.run_update(true).await;
        }
    }

    /// 重新探测工具状态
    ///
    /// 返回并落地最新快照；每次落地后镜像 staleness 到托盘指示器
    /// （失败只记日志）。
    pub async fn refresh(&self) -> ToolStatus {
        let status = self.tool.check_status().await;

        if let Some(error) = &status.error {
            tracing::warn!(error = %error, "工具状态探测携带错误");
        }
        tracing::info!(
            installed = status.installed,
            has_update = status.has_update,
            local = status.local_commit.as_deref().map(ToolStatus::short_commit),
            remote = status.remote_commit.as_deref().map(ToolStatus::short_commit),
            "工具状态已刷新"
        );

        if let Ok(mut current) = self.status.write() {
            *current = status.clone();
        }

        if let Err(e) = self.tray.set_update_indicator(status.has_update) {
            tracing::warn!(error = %e, "更新托盘指示器失败");
        }

        status
    }

    /// 手动触发工具更新
    ///
    /// 有更新动作在途时为 no-op（返回 None）。返回的消息由调用方
    /// 呈现给用户；任意结果之后都已完成强制重新探测。
    pub async fn update_now(&self) -> Option<ActionResult> {
        self.run_update(false).await
    }

    /// 启动本地工具；失败消息用户可见
    pub async fn launch_tool(&self) -> ActionResult {
        self.tool.launch().await
    }

    /// 最近一次落地的状态快照
    pub fn status(&self) -> ToolStatus {
        self.status.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// 当前设置快照
    pub fn settings(&self) -> Settings {
        self.current_settings
            .read()
            .map(|s| *s)
            .unwrap_or_default()
    }

    /// 切换 auto_update_on_launch（乐观更新，写回失败不回滚）
    pub fn set_auto_update_on_launch(&self, value: bool) {
        if let Ok(mut current) = self.current_settings.write() {
            current.auto_update_on_launch = value;
        }
        self.settings.set_auto_update_on_launch(value);
    }

    /// 切换 launch_at_login（乐观更新，写回失败不回滚）
    pub fn set_launch_at_login(&self, value: bool) {
        if let Ok(mut current) = self.current_settings.write() {
            current.launch_at_login = value;
        }
        self.settings.set_launch_at_login(value);
    }

    /// 订阅外部"检查更新"触发
    ///
    /// 返回发送端；事件到达即执行 refresh，可与任何在途更新并发。
    pub fn spawn_event_loop(self: &Arc<Self>) -> mpsc::UnboundedSender<LauncherEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let controller = Arc::clone(self);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    LauncherEvent::CheckUpdates => {
                        tracing::info!("外部触发：检查更新");
                        controller.refresh().await;
                    }
                }
            }
        });

        tx
    }

    /// 执行更新并强制重新探测
    ///
    /// silent=true 为启动时自动路径：结果不呈现给用户，失败只记日志。
    async fn run_update(&self, silent: bool) -> Option<ActionResult> {
        if self.updating.swap(true, Ordering::SeqCst) {
            tracing::warn!("更新动作在途，忽略重复触发");
            return None;
        }

        let result = self.tool.update().await;
        if result.success {
            tracing::info!(message = %result.message, silent, "工具更新完成");
        } else if silent {
            // 静默路径失败不打扰用户
            tracing::warn!(message = %result.message, "自动更新失败");
        } else {
            tracing::warn!(message = %result.message, "手动更新失败");
        }

        // 执行器不返回新状态，任何结果之后都必须重新探测
        self.refresh().await;
        self.updating.store(false, Ordering::SeqCst);

        if silent {
            None
        } else {
            Some(result)
        }
    }
}
