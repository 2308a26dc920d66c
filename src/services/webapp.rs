// 远程 Web 应用入口
//
// 无状态的一次性外部调用：交给系统默认浏览器打开。手动打开失败
// 属于用户可见错误。

use crate::models::ActionResult;

/// 静态的 Web 应用表
#[derive(Debug, Clone, Copy)]
pub struct WebApp {
    pub id: &'static str,
    pub name: &'static str,
    pub url: &'static str,
}

pub const WEB_APPS: &[WebApp] = &[
    WebApp {
        id: "spellbook",
        name: "Spellbook",
        url: "https://spellbook.story.inc",
    },
    WebApp {
        id: "portal",
        name: "Story Portal",
        url: "https://portal.story.inc",
    },
];

pub fn find_web_app(id: &str) -> Option<&'static WebApp> {
    WEB_APPS.iter().find(|app| app.id == id)
}

/// 在系统默认浏览器中打开 Web 应用
pub fn open_web_app(id: &str) -> ActionResult {
    let Some(app) = find_web_app(id) else {
        return ActionResult::failed(format!("Unknown web app: {id}"));
    };

    let spawn = if cfg!(target_os = "macos") {
        std::process::Command::new("open").arg(app.url).spawn()
    } else if cfg!(target_os = "windows") {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", app.url])
            .spawn()
    } else {
        std::process::Command::new("xdg-open").arg(app.url).spawn()
    };

    match spawn {
        Ok(_) => ActionResult::ok(format!("Opened {}", app.name)),
        Err(e) => ActionResult::failed(format!("Failed to open {}: {e}", app.name)),
    }
}
