use std::sync::Arc;

use story_launcher::services::autostart::SystemAutostart;
use story_launcher::services::settings::JsonFileStore;
use story_launcher::services::tray::LogTrayIndicator;
use story_launcher::services::update::{ExecRestarter, GithubReleaseChannel};
use story_launcher::services::webapp;
use story_launcher::{
    init_logger, GitScriptTool, LauncherEvent, LauncherService, LoggingConfig, SelfUpdateService,
    SettingsService, ToolStatus,
};

fn build_controller() -> Arc<LauncherService> {
    let settings = Arc::new(SettingsService::new(
        Box::new(JsonFileStore::new()),
        Box::new(SystemAutostart::new()),
    ));

    Arc::new(LauncherService::new(
        Arc::new(GitScriptTool::new()),
        settings,
        Arc::new(LogTrayIndicator),
    ))
}

fn print_status(status: &ToolStatus) {
    match serde_json::to_string_pretty(status) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to render status: {e}"),
    }
}

/// 常驻模式：完整启动时序 + 自更新轮 + 外部触发订阅
async fn run_forever(controller: Arc<LauncherService>) -> anyhow::Result<()> {
    controller.startup().await;

    let self_update = Arc::new(SelfUpdateService::new(
        Arc::new(GithubReleaseChannel::new()),
        Arc::new(ExecRestarter),
    ));
    let self_update_task = self_update.clone();
    tokio::spawn(async move {
        self_update_task.run().await;
    });

    let tx = controller.spawn_event_loop();

    // SIGUSR1 充当托盘菜单"检查更新"的无负载触发
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut stream = signal(SignalKind::user_defined1())?;
        tokio::spawn(async move {
            while stream.recv().await.is_some() {
                let _ = tx.send(LauncherEvent::CheckUpdates);
            }
        });
    }
    #[cfg(not(unix))]
    drop(tx);

    tracing::info!("启动器核心已就绪 (Ctrl-C 退出)");
    tokio::signal::ctrl_c().await?;
    tracing::info!("收到退出信号");
    Ok(())
}

fn print_usage() {
    eprintln!("Usage: story-launcher [run|status|update|launch|open <app>]");
    eprintln!("Web apps:");
    for app in webapp::WEB_APPS {
        eprintln!("  {} - {}", app.id, app.name);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger(&LoggingConfig::default())?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("run");

    let controller = build_controller();

    match command {
        "run" => run_forever(controller).await?,
        "status" => {
            let status = controller.refresh().await;
            print_status(&status);
        }
        "update" => {
            controller.refresh().await;
            match controller.update_now().await {
                Some(result) if result.success => println!("{}", result.message),
                Some(result) => {
                    eprintln!("{}", result.message);
                    std::process::exit(1);
                }
                None => eprintln!("Update already in progress"),
            }
        }
        "launch" => {
            let result = controller.launch_tool().await;
            if result.success {
                println!("{}", result.message);
            } else {
                eprintln!("{}", result.message);
                std::process::exit(1);
            }
        }
        "open" => match args.get(1) {
            Some(id) => {
                let result = webapp::open_web_app(id);
                if !result.success {
                    eprintln!("{}", result.message);
                    std::process::exit(1);
                }
            }
            None => {
                print_usage();
                std::process::exit(2);
            }
        },
        _ => {
            print_usage();
            std::process::exit(2);
        }
    }

    Ok(())
}
