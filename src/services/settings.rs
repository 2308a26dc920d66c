// 设置服务
//
// 持久化键值存储之上的偏好加载/写回，外加 launch_at_login 与系统
// 自启动注册状态的对账（持久化值为准）。

use std::fs;
use std::path::PathBuf;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{Settings, KEY_AUTO_UPDATE_ON_LAUNCH, KEY_LAUNCH_AT_LOGIN};
use crate::services::autostart::Autostart;

/// 设置持久化层错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("文件 I/O 错误: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),
}

/// 设置持久化协作方
pub trait SettingsStore: Send + Sync {
    /// 读取单个键；键不存在（或存储为空）返回 None
    fn get(&self, key: &str) -> Option<Value>;
    /// 写入单个键（立即落盘，按键独立写回，不攒批）
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    fn flush(&self) -> Result<(), StoreError>;
}

/// JSON 文件形态的设置存储
///
/// 读-改-写整个文件，自动创建父目录；解析失败按空存储处理
/// （所有键回退默认值），不会让加载失败。
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new() -> Self {
        JsonFileStore {
            path: crate::utils::launcher_dir().join("settings.json"),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    fn read_document(&self) -> Map<String, Value> {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    tracing::warn!(path = %self.path.display(), "设置文件内容无效，按空存储处理");
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        }
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.read_document().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut document = self.read_document();
        document.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content = serde_json::to_string_pretty(&Value::Object(document))?;
        fs::write(&self.path, content).map_err(|e| StoreError::Io {
            path: self.path.clone(),
            source: e,
        })
    }

    fn flush(&self) -> Result<(), StoreError> {
        // set 已即时落盘，这里只同步文件系统缓冲
        if self.path.exists() {
            let file = fs::File::open(&self.path).map_err(|e| StoreError::Io {
                path: self.path.clone(),
                source: e,
            })?;
            file.sync_all().map_err(|e| StoreError::Io {
                path: self.path.clone(),
                source: e,
            })?;
        }
        Ok(())
    }
}

/// 设置服务
pub struct SettingsService {
    store: Box<dyn SettingsStore>,
    autostart: Box<dyn Autostart>,
}

impl SettingsService {
    pub fn new(store: Box<dyn SettingsStore>, autostart: Box<dyn Autostart>) -> Self {
        SettingsService { store, autostart }
    }

    /// 加载设置并对账自启动注册
    ///
    /// 缺失键按字段默认值独立回退；加载后若系统自启动状态与持久化值
    /// 不一致，以持久化值为准调整系统状态（调整失败只记日志）。
    pub fn load(&self) -> Settings {
        let settings = Settings {
            auto_update_on_launch: self
                .store
                .get(KEY_AUTO_UPDATE_ON_LAUNCH)
                .and_then(|v| v.as_bool())
                .unwrap_or(Settings::default().auto_update_on_launch),
            launch_at_login: self
                .store
                .get(KEY_LAUNCH_AT_LOGIN)
                .and_then(|v| v.as_bool())
                .unwrap_or(Settings::default().launch_at_login),
        };

        self.reconcile_autostart(settings.launch_at_login);

        tracing::info!(
            auto_update_on_launch = settings.auto_update_on_launch,
            launch_at_login = settings.launch_at_login,
            "设置加载完成"
        );
        settings
    }

    /// 写回 auto_update_on_launch
    ///
    /// 乐观更新：持久化失败只记日志，调用方持有的内存值不回滚。
    pub fn set_auto_update_on_launch(&self, value: bool) {
        if let Err(e) = self.store.set(KEY_AUTO_UPDATE_ON_LAUNCH, Value::Bool(value)) {
            tracing::error!(error = %e, "写入 auto_update_on_launch 失败");
        }
    }

    /// 写回 launch_at_login 并同步系统自启动注册
    ///
    /// 先持久化再切换系统注册；任一失败只记日志，不回滚内存值
    /// （接受的短暂不一致窗口，见 DESIGN.md）。
    pub fn set_launch_at_login(&self, value: bool) {
        if let Err(e) = self.store.set(KEY_LAUNCH_AT_LOGIN, Value::Bool(value)) {
            tracing::error!(error = %e, "写入 launch_at_login 失败");
        }

        let result = if value {
            self.autostart.enable()
        } else {
            self.autostart.disable()
        };
        if let Err(e) = result {
            tracing::error!(error = %e, value, "切换系统自启动注册失败");
        }
    }

    fn reconcile_autostart(&self, desired: bool) {
        let actual = self.autostart.is_enabled();
        if actual == desired {
            return;
        }

        tracing::info!(persisted = desired, os_state = actual, "自启动状态不一致，按持久化值对账");
        let result = if desired {
            self.autostart.enable()
        } else {
            self.autostart.disable()
        };
        if let Err(e) = result {
            tracing::error!(error = %e, "对账系统自启动注册失败");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::autostart::SystemAutostart;
    use serde_json::json;
    use tempfile::TempDir;

    fn service(temp: &TempDir) -> SettingsService {
        SettingsService::new(
            Box::new(JsonFileStore::with_path(temp.path().join("settings.json"))),
            Box::new(SystemAutostart::with_entry_path(
                temp.path().join("autostart.desktop"),
            )),
        )
    }

    #[test]
    fn test_load_empty_store_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = service(&temp).load();

        assert!(settings.auto_update_on_launch);
        assert!(!settings.launch_at_login);
    }

    #[test]
    fn test_load_applies_per_key_defaults() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::with_path(temp.path().join("settings.json"));
        store.set(KEY_LAUNCH_AT_LOGIN, json!(true)).unwrap();

        let settings = service(&temp).load();

        assert!(settings.auto_update_on_launch); // 缺失键独立回退
        assert!(settings.launch_at_login);
    }

    #[test]
    fn test_load_reconciles_autostart_to_persisted_value() {
        let temp = TempDir::new().unwrap();
        let entry = temp.path().join("autostart.desktop");

        // 持久化 true、系统未注册：加载后必须已注册
        let store = JsonFileStore::with_path(temp.path().join("settings.json"));
        store.set(KEY_LAUNCH_AT_LOGIN, json!(true)).unwrap();
        let svc = service(&temp);
        svc.load();
        assert!(entry.exists());

        // 对称方向：持久化 false、系统已注册：加载后必须取消
        store.set(KEY_LAUNCH_AT_LOGIN, json!(false)).unwrap();
        svc.load();
        assert!(!entry.exists());
    }

    #[test]
    fn test_set_launch_at_login_toggles_registration() {
        let temp = TempDir::new().unwrap();
        let entry = temp.path().join("autostart.desktop");
        let svc = service(&temp);

        svc.set_launch_at_login(true);
        assert!(entry.exists());
        assert_eq!(
            svc.store.get(KEY_LAUNCH_AT_LOGIN).and_then(|v| v.as_bool()),
            Some(true)
        );

        svc.set_launch_at_login(false);
        assert!(!entry.exists());
    }

    #[test]
    fn test_store_roundtrip_and_flush() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::with_path(temp.path().join("nested/dir/settings.json"));

        assert!(store.get(KEY_AUTO_UPDATE_ON_LAUNCH).is_none());
        store.set(KEY_AUTO_UPDATE_ON_LAUNCH, json!(false)).unwrap();
        store.flush().unwrap();

        assert_eq!(
            store.get(KEY_AUTO_UPDATE_ON_LAUNCH).and_then(|v| v.as_bool()),
            Some(false)
        );
    }

    #[test]
    fn test_invalid_store_content_treated_as_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = JsonFileStore::with_path(&path);
        assert!(store.get(KEY_AUTO_UPDATE_ON_LAUNCH).is_none());
    }
}
