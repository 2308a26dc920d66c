// 本地工具协作方
//
// 状态探测（只读、幂等）与更新/启动动作的统一接口。
// 生产实现为 git 检出（GitScriptTool），测试中用脚本化假实现替代。

pub mod git_script;

pub use git_script::GitScriptTool;

use crate::models::{ActionResult, ToolStatus};
use async_trait::async_trait;

/// 受管理本地工具的协作方接口
///
/// 所有方法都把内部失败转换为返回值：`check_status` 写入 `error` 字段，
/// 动作方法返回 `success=false` 的 [`ActionResult`]。任何实现都不允许
/// 向调用方抛出错误。
#[async_trait]
pub trait LocalTool: Send + Sync {
    /// 探测安装/版本/commit 事实并派生 staleness
    ///
    /// 只读、幂等；并发调用各自运行到完成，调用方取最后落地的结果。
    async fn check_status(&self) -> ToolStatus;

    /// 执行工具更新动作
    ///
    /// 不校验前置条件（是否有更新由调用方判断），也不返回新状态，
    /// 调用方在任意结果之后必须重新探测。
    async fn update(&self) -> ActionResult;

    /// 启动工具；失败复用 ActionResult 形态报告
    async fn launch(&self) -> ActionResult;
}
