// 应用自身更新
//
// 发布通道查询、带进度的下载、就绪/重启，全程与本地工具状态解耦。

pub mod release_channel;
pub mod restart;
pub mod update_service;

pub use release_channel::{GithubReleaseChannel, ReleaseChannel};
pub use restart::{ExecRestarter, Restarter};
pub use update_service::SelfUpdateService;
