//! JSON 文件存储 - 基础设施层
//!
//! 整个存储是磁盘上的一个 JSON 对象，键即顶层字段。
//! 每次写入都是整文件读-改-写，由内部互斥锁串行化。

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::infrastructure::kv_store::KvStore;

/// JSON 文件存储
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// 读取整个文件；文件不存在视为空对象
    async fn load(&self, key: &str) -> Result<Map<String, JsonValue>, StoreError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(StoreError::read_failed(key, e)),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&content).map_err(|source| StoreError::Corrupted {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// 先写临时文件再重命名，避免中途失败留下半个文件
    async fn save(
        &self,
        key: &str,
        entries: &Map<String, JsonValue>,
    ) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::write_failed(key, e))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::write_failed(key, e))?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .map_err(|e| StoreError::write_failed(key, e))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| StoreError::write_failed(key, e))?;

        debug!("已写入 {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl KvStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>, StoreError> {
        let _guard = self.lock.lock().await;
        let entries = self.load(key).await?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: JsonValue) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load(key).await?;
        entries.insert(key.to_string(), value);
        self.save(key, &entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self
            .load(key)
            .await
            .map_err(|e| StoreError::delete_failed(key, e))?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.save(key, &entries).await
    }
}
