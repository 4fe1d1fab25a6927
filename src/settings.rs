//! 应用设置模块
//!
//! # 设计思路
//!
//! 设置以 JSON 文件持久化，每次上传开始时读取一次得到 `SettingsSnapshot`，
//! 之后的上传逻辑只依赖这份快照，不再随处读取全局设置。
//!
//! # 实现思路
//!
//! - 文件不存在时返回默认值；内容非法时返回 `AppError::Settings`。
//! - `#[serde(default)]` 保证旧版本设置文件缺字段时仍可读取。
//! - `expiration` 兼容旧格式中的字符串写法（如 `"3600"`），无法解析时按 0（永不过期）处理。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;
use crate::upload::NotificationPrefs;

/// 设置快照。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsSnapshot {
    pub endpoint_url: String,
    pub api_key: String,
    pub delete_key: String,
    #[serde(deserialize_with = "deserialize_expiration")]
    pub expiration: u64,
    pub randomize_filename: bool,
    pub convert_heic_to_jpeg: bool,
    pub notify_single: bool,
    pub notify_multi: bool,
    pub max_concurrent_uploads: usize,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            endpoint_url: "https://".to_string(),
            api_key: String::new(),
            delete_key: String::new(),
            expiration: 0,
            randomize_filename: true,
            convert_heic_to_jpeg: false,
            notify_single: false,
            notify_multi: true,
            max_concurrent_uploads: 4,
        }
    }
}

impl SettingsSnapshot {
    pub fn notification_prefs(&self) -> NotificationPrefs {
        NotificationPrefs {
            single: self.notify_single,
            multi: self.notify_multi,
        }
    }

    /// 用于展示的副本，密钥类字段被遮盖。
    pub fn masked(&self) -> Self {
        let mask = |value: &str| {
            if value.is_empty() {
                String::new()
            } else {
                "********".to_string()
            }
        };

        Self {
            api_key: mask(&self.api_key),
            delete_key: mask(&self.delete_key),
            ..self.clone()
        }
    }
}

fn deserialize_expiration<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Expiration {
        Seconds(u64),
        Text(String),
    }

    Ok(match Expiration::deserialize(deserializer)? {
        Expiration::Seconds(value) => value,
        Expiration::Text(text) => text.trim().parse().unwrap_or(0),
    })
}

/// 部分更新：`None` 字段保持原值。
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub endpoint_url: Option<String>,
    pub api_key: Option<String>,
    pub delete_key: Option<String>,
    pub expiration: Option<u64>,
    pub randomize_filename: Option<bool>,
    pub convert_heic_to_jpeg: Option<bool>,
    pub notify_single: Option<bool>,
    pub notify_multi: Option<bool>,
    pub max_concurrent_uploads: Option<usize>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.endpoint_url.is_none()
            && self.api_key.is_none()
            && self.delete_key.is_none()
            && self.expiration.is_none()
            && self.randomize_filename.is_none()
            && self.convert_heic_to_jpeg.is_none()
            && self.notify_single.is_none()
            && self.notify_multi.is_none()
            && self.max_concurrent_uploads.is_none()
    }

    pub fn apply(self, settings: &mut SettingsSnapshot) {
        if let Some(value) = self.endpoint_url {
            settings.endpoint_url = value;
        }
        if let Some(value) = self.api_key {
            settings.api_key = value;
        }
        if let Some(value) = self.delete_key {
            settings.delete_key = value;
        }
        if let Some(value) = self.expiration {
            settings.expiration = value;
        }
        if let Some(value) = self.randomize_filename {
            settings.randomize_filename = value;
        }
        if let Some(value) = self.convert_heic_to_jpeg {
            settings.convert_heic_to_jpeg = value;
        }
        if let Some(value) = self.notify_single {
            settings.notify_single = value;
        }
        if let Some(value) = self.notify_multi {
            settings.notify_multi = value;
        }
        if let Some(value) = self.max_concurrent_uploads {
            settings.max_concurrent_uploads = value.max(1);
        }
    }
}

/// 读取当前设置快照的能力。
pub trait SettingsProvider {
    fn snapshot(&self) -> Result<SettingsSnapshot, AppError>;
}

/// JSON 文件设置存储。
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<SettingsSnapshot, AppError> {
        if !self.path.exists() {
            log::debug!("⚙️ 设置文件不存在，使用默认设置: {}", self.path.display());
            return Ok(SettingsSnapshot::default());
        }

        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))
    }

    pub fn save(&self, settings: &SettingsSnapshot) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Settings(format!("创建设置目录失败: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;
        fs::write(&self.path, content)?;
        log::info!("💾 设置已保存: {}", self.path.display());
        Ok(())
    }

    /// 读取 → 应用补丁 → 写回，返回更新后的设置。
    pub fn update(&self, patch: SettingsPatch) -> Result<SettingsSnapshot, AppError> {
        let mut settings = self.load()?;
        patch.apply(&mut settings);
        self.save(&settings)?;
        Ok(settings)
    }
}

impl SettingsProvider for JsonSettingsStore {
    fn snapshot(&self) -> Result<SettingsSnapshot, AppError> {
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn unique_temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock error")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("linx-share-settings-test-{nanos}"));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = unique_temp_dir();
        let store = JsonSettingsStore::new(dir.join("settings.json"));

        let loaded = store.load().expect("load defaults");
        assert_eq!(loaded, SettingsSnapshot::default());
        assert!(loaded.randomize_filename);
        assert!(loaded.notify_multi);
        assert!(!loaded.notify_single);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn save_and_load_roundtrip_through_nested_dir() {
        let dir = unique_temp_dir();
        let store = JsonSettingsStore::new(dir.join("nested").join("settings.json"));

        let updated = store
            .update(SettingsPatch {
                endpoint_url: Some("https://linx.example".to_string()),
                expiration: Some(86_400),
                notify_single: Some(true),
                ..Default::default()
            })
            .expect("update settings");

        assert_eq!(store.load().expect("reload"), updated);
        assert_eq!(updated.expiration, 86_400);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn bad_json_is_reported() {
        let dir = unique_temp_dir();
        let path = dir.join("settings.json");
        fs::write(&path, "not-json").expect("write invalid settings");

        let result = JsonSettingsStore::new(&path).load();
        assert!(matches!(result, Err(AppError::Settings(_))));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn legacy_string_expiration_is_accepted() {
        let parsed: SettingsSnapshot =
            serde_json::from_str(r#"{"endpoint_url":"https://h","expiration":"3600"}"#).expect("parse legacy");
        assert_eq!(parsed.expiration, 3600);
        assert!(parsed.randomize_filename);

        let garbage: SettingsSnapshot =
            serde_json::from_str(r#"{"expiration":"soon"}"#).expect("parse garbage expiration");
        assert_eq!(garbage.expiration, 0);
    }

    #[test]
    fn masked_hides_secrets_only() {
        let settings = SettingsSnapshot {
            api_key: "secret".to_string(),
            ..SettingsSnapshot::default()
        };

        let masked = settings.masked();
        assert_eq!(masked.api_key, "********");
        assert_eq!(masked.delete_key, "");
        assert_eq!(masked.endpoint_url, settings.endpoint_url);
    }
}
