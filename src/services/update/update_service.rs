use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use super::release_channel::ReleaseChannel;
use super::restart::Restarter;
use crate::models::{AppUpdate, DownloadEvent, SelfUpdatePhase};

/// 下载进度跟踪器
///
/// 消费协作方的有序事件流；与当前状态不符的事件（Started 之前的
/// Progress、Finished 之后的任何事件）直接忽略。进度单调不减，
/// Finished 之前钳制在 99 以下，总大小未知时固定报 50。
#[derive(Debug, Default)]
struct DownloadProgressTracker {
    started: bool,
    finished: bool,
    total_size: u64,
    downloaded: u64,
    progress: f32,
}

impl DownloadProgressTracker {
    /// 应用一个事件，返回应用后的进度百分比
    fn apply(&mut self, event: DownloadEvent) -> f32 {
        match event {
            DownloadEvent::Started { total_size } => {
                if !self.started {
                    self.started = true;
                    self.total_size = total_size;
                    self.progress = self.progress.max(self.percent());
                }
            }
            DownloadEvent::Progress { chunk_size } => {
                if self.started && !self.finished {
                    self.downloaded += chunk_size;
                    self.progress = self.progress.max(self.percent());
                }
            }
            DownloadEvent::Finished => {
                if self.started && !self.finished {
                    self.finished = true;
                    self.progress = 100.0;
                }
            }
        }
        self.progress
    }

    fn percent(&self) -> f32 {
        if self.total_size == 0 {
            // 总大小未知，报固定中点
            50.0
        } else {
            let ratio = self.downloaded as f32 / self.total_size as f32 * 100.0;
            ratio.min(99.0)
        }
    }
}

/// 应用自更新服务
///
/// 每个进程仅一个实例、仅一轮检查/下载：`Idle -> Checking ->
/// (NoUpdate | Downloading -> Ready)`。检查或下载阶段出错丢弃进行中的
/// [`AppUpdate`]，回到 Idle，本次运行不重试。与工具状态子系统完全解耦。
pub struct SelfUpdateService {
    channel: Arc<dyn ReleaseChannel>,
    restarter: Arc<dyn Restarter>,
    phase: RwLock<SelfUpdatePhase>,
    update: RwLock<Option<AppUpdate>>,
    dismissed: AtomicBool,
    attempted: AtomicBool,
    settle_delay: Duration,
}

impl SelfUpdateService {
    pub fn new(channel: Arc<dyn ReleaseChannel>, restarter: Arc<dyn Restarter>) -> Self {
        SelfUpdateService {
            channel,
            restarter,
            phase: RwLock::new(SelfUpdatePhase::Idle),
            update: RwLock::new(None),
            dismissed: AtomicBool::new(false),
            attempted: AtomicBool::new(false),
            settle_delay: Duration::from_secs(1),
        }
    }

    /// 指定启动静默延迟（测试用 0）
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn phase(&self) -> SelfUpdatePhase {
        self.phase.read().map(|p| p.clone()).unwrap_or(SelfUpdatePhase::Idle)
    }

    /// 当前自更新进度快照（按值，不共享引用）
    pub fn current_update(&self) -> Option<AppUpdate> {
        self.update.read().ok().and_then(|u| u.clone())
    }

    /// 横幅是否已被用户关闭
    pub fn is_dismissed(&self) -> bool {
        self.dismissed.load(Ordering::SeqCst)
    }

    /// 启动自更新流程：静默延迟后检查一次，有更新则下载到就绪
    ///
    /// 进程生命周期内只生效一次；重复调用为 no-op。
    pub async fn run(&self) {
        if self.attempted.swap(true, Ordering::SeqCst) {
            tracing::debug!("自更新流程已启动过，忽略重复触发");
            return;
        }

        tokio::time::sleep(self.settle_delay).await;
        self.check_and_download().await;
    }

    async fn check_and_download(&self) {
        self.set_phase(SelfUpdatePhase::Checking);

        let release = match self.channel.check_for_update().await {
            Ok(Some(release)) => release,
            Ok(None) => {
                tracing::info!("没有可用的应用更新");
                self.set_phase(SelfUpdatePhase::NoUpdate);
                return;
            }
            Err(e) => {
                // 后台检查失败不打扰用户
                tracing::warn!(error = %e, "检查应用更新失败");
                self.discard();
                return;
            }
        };

        tracing::info!(version = %release.version, "发现新版本，开始下载");
        if let Ok(mut update) = self.update.write() {
            let mut pending = AppUpdate::new(release.version.clone());
            pending.downloading = true;
            *update = Some(pending);
        }
        self.set_phase(SelfUpdatePhase::Downloading);

        let tracker = std::sync::Mutex::new(DownloadProgressTracker::default());
        let update_cell = &self.update;
        let result = self
            .channel
            .download(&release, &|event| {
                let progress = match tracker.lock() {
                    Ok(mut tracker) => tracker.apply(event),
                    Err(_) => return,
                };
                if let Ok(mut update) = update_cell.write() {
                    if let Some(update) = update.as_mut() {
                        update.progress = progress;
                    }
                }
            })
            .await;

        match result {
            Ok(path) => {
                tracing::info!(path = %path.display(), version = %release.version, "更新已下载就绪");
                if let Ok(mut update) = self.update.write() {
                    if let Some(update) = update.as_mut() {
                        update.downloading = false;
                        update.downloaded_and_ready = true;
                        update.progress = 100.0;
                    }
                }
                self.set_phase(SelfUpdatePhase::Ready);
            }
            Err(e) => {
                tracing::warn!(error = %e, "下载应用更新失败");
                self.discard();
            }
        }
    }

    /// 用户触发重启以应用就绪的更新
    ///
    /// 仅在 Ready 阶段生效；重启失败只记日志，状态不变，用户可重试。
    pub fn restart(&self) {
        if self.phase() != SelfUpdatePhase::Ready {
            tracing::debug!("没有就绪的更新，忽略重启请求");
            return;
        }
        if let Err(e) = self.restarter.relaunch() {
            tracing::error!(error = %e, "重启应用失败");
        }
    }

    /// 用户关闭就绪横幅
    ///
    /// AppUpdate 保留（不重新弹出，新进程才会重新走流程）。
    pub fn dismiss(&self) {
        if self.current_update().is_none() {
            return;
        }
        self.dismissed.store(true, Ordering::SeqCst);
        tracing::info!("更新横幅已被关闭");
    }

    fn set_phase(&self, phase: SelfUpdatePhase) {
        if let Ok(mut current) = self.phase.write() {
            *current = phase;
        }
    }

    /// 丢弃进行中的更新并回到静止态
    fn discard(&self) {
        if let Ok(mut update) = self.update.write() {
            *update = None;
        }
        self.set_phase(SelfUpdatePhase::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReleaseInfo;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;

    use crate::services::update::release_channel::DownloadSink;

    struct FakeChannel {
        release: Option<ReleaseInfo>,
        events: Vec<DownloadEvent>,
        fail_check: bool,
        fail_download: bool,
        checks: AtomicUsize,
    }

    impl FakeChannel {
        fn no_update() -> Self {
            FakeChannel {
                release: None,
                events: vec![],
                fail_check: false,
                fail_download: false,
                checks: AtomicUsize::new(0),
            }
        }

        fn with_release(events: Vec<DownloadEvent>) -> Self {
            FakeChannel {
                release: Some(ReleaseInfo {
                    version: "9.9.9".to_string(),
                    download_url: "https://example.com/launcher.AppImage".to_string(),
                }),
                events,
                fail_check: false,
                fail_download: false,
                checks: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ReleaseChannel for FakeChannel {
        async fn check_for_update(&self) -> Result<Option<ReleaseInfo>> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            if self.fail_check {
                return Err(anyhow!("network down"));
            }
            Ok(self.release.clone())
        }

        async fn download(&self, _release: &ReleaseInfo, sink: DownloadSink<'_>) -> Result<PathBuf> {
            for event in &self.events {
                sink(event.clone());
            }
            if self.fail_download {
                return Err(anyhow!("disk full"));
            }
            Ok(PathBuf::from("/tmp/launcher.AppImage"))
        }
    }

    #[derive(Default)]
    struct FakeRestarter {
        calls: AtomicUsize,
    }

    impl Restarter for FakeRestarter {
        fn relaunch(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn service(channel: FakeChannel) -> (SelfUpdateService, Arc<FakeRestarter>) {
        let (service, restarter, _) = service_with(Arc::new(channel));
        (service, restarter)
    }

    fn service_with(
        channel: Arc<FakeChannel>,
    ) -> (SelfUpdateService, Arc<FakeRestarter>, Arc<FakeChannel>) {
        let restarter = Arc::new(FakeRestarter::default());
        let service = SelfUpdateService::new(channel.clone(), restarter.clone())
            .with_settle_delay(Duration::ZERO);
        (service, restarter, channel)
    }

    #[tokio::test]
    async fn test_no_update_is_terminal_and_actions_are_noops() {
        let (service, restarter) = service(FakeChannel::no_update());
        service.run().await;

        assert_eq!(service.phase(), SelfUpdatePhase::NoUpdate);
        assert!(service.current_update().is_none());

        service.dismiss();
        service.restart();
        assert!(!service.is_dismissed());
        assert_eq!(restarter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_download_to_ready() {
        let events = vec![
            DownloadEvent::Started { total_size: 200 },
            DownloadEvent::Progress { chunk_size: 100 },
            DownloadEvent::Progress { chunk_size: 100 },
            DownloadEvent::Finished,
        ];
        let (service, restarter) = service(FakeChannel::with_release(events));
        service.run().await;

        assert_eq!(service.phase(), SelfUpdatePhase::Ready);
        let update = service.current_update().unwrap();
        assert_eq!(update.version, "9.9.9");
        assert!(update.downloaded_and_ready);
        assert!(!update.downloading);
        assert_eq!(update.progress, 100.0);

        service.restart();
        assert_eq!(restarter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_check_failure_discards_silently() {
        let mut channel = FakeChannel::no_update();
        channel.fail_check = true;
        let (service, _) = service(channel);
        service.run().await;

        assert_eq!(service.phase(), SelfUpdatePhase::Idle);
        assert!(service.current_update().is_none());
    }

    #[tokio::test]
    async fn test_download_failure_discards_pending_update() {
        let mut channel = FakeChannel::with_release(vec![
            DownloadEvent::Started { total_size: 100 },
            DownloadEvent::Progress { chunk_size: 10 },
        ]);
        channel.fail_download = true;
        let (service, _) = service(channel);
        service.run().await;

        assert_eq!(service.phase(), SelfUpdatePhase::Idle);
        assert!(service.current_update().is_none());
    }

    #[tokio::test]
    async fn test_run_is_once_per_process() {
        let (service, _, channel) = service_with(Arc::new(FakeChannel::no_update()));
        service.run().await;
        service.run().await;

        // attempted 守卫：第二次 run 不触发第二次检查
        assert_eq!(channel.checks.load(Ordering::SeqCst), 1);
        assert_eq!(service.phase(), SelfUpdatePhase::NoUpdate);
    }

    #[tokio::test]
    async fn test_dismiss_retains_update_value() {
        let events = vec![
            DownloadEvent::Started { total_size: 10 },
            DownloadEvent::Progress { chunk_size: 10 },
            DownloadEvent::Finished,
        ];
        let (service, _) = service(FakeChannel::with_release(events));
        service.run().await;

        service.dismiss();
        assert!(service.is_dismissed());
        assert!(service.current_update().is_some());
    }

    #[test]
    fn test_tracker_progress_is_monotone_and_clamped() {
        let mut tracker = DownloadProgressTracker::default();

        // Started 之前的 Progress 被忽略
        assert_eq!(tracker.apply(DownloadEvent::Progress { chunk_size: 50 }), 0.0);

        tracker.apply(DownloadEvent::Started { total_size: 100 });
        assert_eq!(tracker.apply(DownloadEvent::Progress { chunk_size: 50 }), 50.0);
        // 超过总量也钳在 99
        assert_eq!(tracker.apply(DownloadEvent::Progress { chunk_size: 100 }), 99.0);
        // 只有 Finished 才报 100
        assert_eq!(tracker.apply(DownloadEvent::Finished), 100.0);
        // Finished 之后的事件被忽略
        assert_eq!(tracker.apply(DownloadEvent::Progress { chunk_size: 1 }), 100.0);
    }

    #[test]
    fn test_tracker_unknown_total_reports_midpoint() {
        let mut tracker = DownloadProgressTracker::default();
        tracker.apply(DownloadEvent::Started { total_size: 0 });
        assert_eq!(tracker.apply(DownloadEvent::Progress { chunk_size: 10 }), 50.0);
        assert_eq!(tracker.apply(DownloadEvent::Progress { chunk_size: 10 }), 50.0);
        assert_eq!(tracker.apply(DownloadEvent::Finished), 100.0);
    }
}
