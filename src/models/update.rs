use serde::{Deserialize, Serialize};

/// 应用自更新的进度值（仅内存，随探测失败或用户关闭横幅丢弃）
///
/// 整个进程生命周期最多存在一个实例；`downloading -> downloaded_and_ready`
/// 单调推进，不会回退。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppUpdate {
    pub version: String,
    pub downloading: bool,
    pub downloaded_and_ready: bool,
    /// 0..=100；下载中被钳制在 99 以下，只有 Finished 之后才报 100
    pub progress: f32,
}

impl AppUpdate {
    pub fn new(version: impl Into<String>) -> Self {
        AppUpdate {
            version: version.into(),
            downloading: false,
            downloaded_and_ready: false,
            progress: 0.0,
        }
    }
}

/// 自更新状态机的阶段
///
/// `NoUpdate` 与 `Ready` 为本次运行的终态；Checking/Downloading 期间出错
/// 丢弃进行中的 AppUpdate 并回到 `Idle`（本次运行不重试）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelfUpdatePhase {
    Idle,
    Checking,
    Downloading,
    Ready,
    NoUpdate,
}

/// 发布通道协作方返回的新版本描述
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub version: String,
    pub download_url: String,
}

/// 下载协作方推送的有序进度事件
///
/// 约定的偏序：Started 先于任何 Progress，全部 Progress 先于 Finished。
/// 乱序投递属于协作方契约问题，接收端只忽略与当前状态不符的事件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    Started { total_size: u64 },
    Progress { chunk_size: u64 },
    Finished,
}
