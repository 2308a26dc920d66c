// 发布通道协作方
//
// 查询远端发布并以有序事件流（Started -> Progress* -> Finished）下载。
// 生产实现走 GitHub Releases API。

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use crate::models::{DownloadEvent, ReleaseInfo};

/// 进度事件接收端
pub type DownloadSink<'a> = &'a (dyn Fn(DownloadEvent) + Send + Sync);

/// 发布通道接口
#[async_trait]
pub trait ReleaseChannel: Send + Sync {
    /// 检查远端是否有比当前运行版本更新的发布；没有返回 None
    async fn check_for_update(&self) -> Result<Option<ReleaseInfo>>;

    /// 下载发布物，按序向 sink 推送进度事件，返回落盘路径
    async fn download(&self, release: &ReleaseInfo, sink: DownloadSink<'_>) -> Result<PathBuf>;
}

#[derive(Debug, Deserialize)]
struct GitHubRelease {
    tag_name: String,
    assets: Vec<GitHubAsset>,
}

#[derive(Debug, Deserialize)]
struct GitHubAsset {
    name: String,
    browser_download_url: String,
}

/// GitHub Releases 形态的发布通道
pub struct GithubReleaseChannel {
    repo: String,
    current_version: String,
    download_dir: PathBuf,
}

impl GithubReleaseChannel {
    /// 启动器自身的发布仓库
    pub const LAUNCHER_REPO: &'static str = "joyrider00/story-launcher";

    pub fn new() -> Self {
        GithubReleaseChannel {
            repo: Self::LAUNCHER_REPO.to_string(),
            current_version: env!("CARGO_PKG_VERSION").to_string(),
            download_dir: crate::utils::launcher_dir().join("updates"),
        }
    }

    /// 指定仓库与当前版本（测试用）
    pub fn with_repo(repo: impl Into<String>, current_version: impl Into<String>) -> Self {
        GithubReleaseChannel {
            repo: repo.into(),
            current_version: current_version.into(),
            download_dir: crate::utils::launcher_dir().join("updates"),
        }
    }

    fn client() -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(concat!("story-launcher/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")
    }

    async fn latest_release(&self) -> Result<GitHubRelease> {
        let url = format!("https://api.github.com/repos/{}/releases/latest", self.repo);
        let response = Self::client()?
            .get(&url)
            .send()
            .await
            .context("Failed to fetch release info")?;

        match response.status().as_u16() {
            403 => return Err(anyhow!("GitHub API rate limit exceeded")),
            404 => return Err(anyhow!("No releases found for {}", self.repo)),
            _ => {}
        }
        if !response.status().is_success() {
            return Err(anyhow!("GitHub API error: {}", response.status()));
        }

        response
            .json::<GitHubRelease>()
            .await
            .context("Failed to parse release info")
    }

    /// 按平台优先级挑选发布物
    fn pick_asset(release: &GitHubRelease) -> Option<&GitHubAsset> {
        let priorities: &[&str] = if cfg!(target_os = "windows") {
            &[".msi", ".exe"]
        } else if cfg!(target_os = "macos") {
            &[".app.tar.gz", ".dmg"]
        } else {
            &[".AppImage", ".tar.gz"]
        };

        priorities
            .iter()
            .find_map(|suffix| release.assets.iter().find(|a| a.name.ends_with(suffix)))
            .or_else(|| release.assets.first())
    }

    /// latest 是否比 current 更新（解析失败时退化为字符串不等比较）
    pub fn is_newer(current: &str, latest: &str) -> bool {
        match (parse_version(current), parse_version(latest)) {
            (Some(current), Some(latest)) => current < latest,
            _ => current.trim() != latest.trim(),
        }
    }
}

impl Default for GithubReleaseChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// 从任意版本字符串中提取 semver（"v1.2.3"、"release-1.2.3-beta" 等）
fn parse_version(version: &str) -> Option<Version> {
    static VERSION_REGEX: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(\d+\.\d+\.\d+(?:-[0-9A-Za-z\.-]+)?)").expect("invalid version regex")
    });

    let captures = VERSION_REGEX.captures(version.trim())?;
    Version::parse(captures.get(1)?.as_str()).ok()
}

#[async_trait]
impl ReleaseChannel for GithubReleaseChannel {
    async fn check_for_update(&self) -> Result<Option<ReleaseInfo>> {
        let release = self.latest_release().await?;
        let latest = release.tag_name.trim_start_matches('v').to_string();

        if !Self::is_newer(&self.current_version, &latest) {
            tracing::debug!(current = %self.current_version, latest = %latest, "已是最新版本");
            return Ok(None);
        }

        let asset = Self::pick_asset(&release)
            .ok_or_else(|| anyhow!("No compatible download found in release {latest}"))?;

        Ok(Some(ReleaseInfo {
            version: latest,
            download_url: asset.browser_download_url.clone(),
        }))
    }

    async fn download(&self, release: &ReleaseInfo, sink: DownloadSink<'_>) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .context("Failed to create update directory")?;

        let file_name = url::Url::parse(&release.download_url)
            .context("Invalid download URL")?
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(String::from))
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("Cannot extract filename from URL"))?;
        let file_path = self.download_dir.join(file_name);

        let response = Self::client()?
            .get(&release.download_url)
            .send()
            .await
            .context("Failed to start download")?;
        if !response.status().is_success() {
            return Err(anyhow!("Download failed: {}", response.status()));
        }

        // content-length 未知时按 0 上报，进度由接收端按固定中点处理
        let total_size = response.content_length().unwrap_or(0);
        sink(DownloadEvent::Started { total_size });

        let mut file = tokio::fs::File::create(&file_path)
            .await
            .with_context(|| format!("Failed to create {}", file_path.display()))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read download stream")?;
            file.write_all(&chunk)
                .await
                .context("Failed to write download")?;
            sink(DownloadEvent::Progress {
                chunk_size: chunk.len() as u64,
            });
        }
        file.flush().await.context("Failed to flush download")?;

        sink(DownloadEvent::Finished);
        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("1.2.3").unwrap(), Version::new(1, 2, 3));
        assert_eq!(parse_version("v2.0.5").unwrap(), Version::new(2, 0, 5));
        assert_eq!(
            parse_version("release-0.13.0-preview.2").unwrap(),
            Version::parse("0.13.0-preview.2").unwrap()
        );
        assert!(parse_version("not a version").is_none());
    }

    #[test]
    fn test_is_newer() {
        assert!(GithubReleaseChannel::is_newer("0.3.2", "0.4.0"));
        assert!(GithubReleaseChannel::is_newer("0.3.2", "1.0.0-beta"));
        assert!(!GithubReleaseChannel::is_newer("0.3.2", "0.3.2"));
        assert!(!GithubReleaseChannel::is_newer("1.0.0", "0.9.9"));
        // 解析失败退化为字符串比较
        assert!(GithubReleaseChannel::is_newer("0.3.2", "nightly"));
    }

    #[test]
    fn test_pick_asset_prefers_platform_suffix() {
        let release = GitHubRelease {
            tag_name: "v1.0.0".to_string(),
            assets: vec![
                GitHubAsset {
                    name: "launcher.msi".to_string(),
                    browser_download_url: "https://example.com/launcher.msi".to_string(),
                },
                GitHubAsset {
                    name: "launcher.app.tar.gz".to_string(),
                    browser_download_url: "https://example.com/launcher.app.tar.gz".to_string(),
                },
                GitHubAsset {
                    name: "launcher.AppImage".to_string(),
                    browser_download_url: "https://example.com/launcher.AppImage".to_string(),
                },
            ],
        };

        let asset = GithubReleaseChannel::pick_asset(&release).unwrap();
        if cfg!(target_os = "windows") {
            assert_eq!(asset.name, "launcher.msi");
        } else if cfg!(target_os = "macos") {
            assert_eq!(asset.name, "launcher.app.tar.gz");
        } else {
            assert_eq!(asset.name, "launcher.AppImage");
        }
    }

    #[test]
    fn test_pick_asset_falls_back_to_first() {
        let release = GitHubRelease {
            tag_name: "v1.0.0".to_string(),
            assets: vec![GitHubAsset {
                name: "launcher.unknown".to_string(),
                browser_download_url: "https://example.com/launcher.unknown".to_string(),
            }],
        };

        assert_eq!(
            GithubReleaseChannel::pick_asset(&release).unwrap().name,
            "launcher.unknown"
        );
    }
}
