// 托盘指示器协作方
//
// 控制器在每次状态变化后把 staleness 布尔值镜像到这里；调用是
// 尽力而为的，失败由调用方记日志后忽略。

use anyhow::Result;

/// 托盘更新指示器接口
pub trait TrayIndicator: Send + Sync {
    fn set_update_indicator(&self, has_update: bool) -> Result<()>;
}

/// 无图形环境下的指示器：只落一条日志
///
/// GUI 外壳接入时由真正的托盘实现替换。
pub struct LogTrayIndicator;

impl TrayIndicator for LogTrayIndicator {
    fn set_update_indicator(&self, has_update: bool) -> Result<()> {
        tracing::info!(has_update, "托盘更新指示器");
        Ok(())
    }
}
