// ==========================================
// 销售线索 CRM - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{ImportConfigReader, ImportSettings};
use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::importer::error::{ImportError, ImportResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const BATCH_CEILING: &str = "import.batch_ceiling";
    pub const PROGRESS_INTERVAL: &str = "import.progress_interval";
    pub const FILL_SAMPLE_SIZE: &str = "import.fill_sample_size";
    pub const FILL_EMPTY_THRESHOLD: &str = "import.fill_empty_threshold";
    pub const FILL_MIN_ROWS: &str = "import.fill_min_rows";
    pub const AUTO_CREATE_FIELDS: &str = "import.auto_create_fields";
    pub const DEFAULT_STAGE: &str = "import.default_stage";
    pub const ERROR_DISPLAY_CAP: &str = "import.error_display_cap";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
    defaults: ImportSettings,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            defaults: ImportSettings::default(),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ImportResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| ImportError::ConfigReadError {
                key: "*".to_string(),
                message: format!("锁获取失败: {}", e),
            })?;
            configure_sqlite_connection(&conn_guard)?;
            init_schema(&conn_guard)?;
        }

        Ok(Self {
            conn,
            defaults: ImportSettings::default(),
        })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| ImportError::ConfigReadError {
            key: key.to_string(),
            message: format!("锁获取失败: {}", e),
        })?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| ImportError::ConfigReadError {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        Ok(value)
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> ImportResult<()> {
        let conn = self.conn.lock().map_err(|e| ImportError::ConfigReadError {
            key: key.to_string(),
            message: format!("锁获取失败: {}", e),
        })?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析配置值；不存在或格式错误时回退默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ImportResult<T>
    where
        T: FromStr + std::fmt::Debug,
    {
        let value = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %value,
                    default = ?default,
                    "配置值格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_batch_ceiling(&self) -> ImportResult<usize> {
        let value =
            self.get_parsed_or_default(config_keys::BATCH_CEILING, self.defaults.batch_ceiling)?;
        // 0 无意义，至少 1
        Ok(value.max(1))
    }

    async fn get_progress_interval(&self) -> ImportResult<usize> {
        let value = self.get_parsed_or_default(
            config_keys::PROGRESS_INTERVAL,
            self.defaults.progress_interval,
        )?;
        Ok(value.max(1))
    }

    async fn get_fill_sample_size(&self) -> ImportResult<usize> {
        self.get_parsed_or_default(config_keys::FILL_SAMPLE_SIZE, self.defaults.fill_sample_size)
    }

    async fn get_fill_empty_threshold(&self) -> ImportResult<f64> {
        let value = self.get_parsed_or_default(
            config_keys::FILL_EMPTY_THRESHOLD,
            self.defaults.fill_empty_threshold,
        )?;
        Ok(value.clamp(0.0, 1.0))
    }

    async fn get_fill_min_rows(&self) -> ImportResult<usize> {
        self.get_parsed_or_default(config_keys::FILL_MIN_ROWS, self.defaults.fill_min_rows)
    }

    async fn get_auto_create_default(&self) -> ImportResult<bool> {
        let value = match self.get_config_value(config_keys::AUTO_CREATE_FIELDS)? {
            Some(v) => v,
            None => return Ok(self.defaults.auto_create_fields),
        };
        match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "y" => Ok(true),
            "0" | "false" | "no" | "n" => Ok(false),
            _ => Ok(self.defaults.auto_create_fields),
        }
    }

    async fn get_default_stage(&self) -> ImportResult<String> {
        let value = self
            .get_config_value(config_keys::DEFAULT_STAGE)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Ok(value.unwrap_or_else(|| self.defaults.default_stage.clone()))
    }

    async fn get_error_display_cap(&self) -> ImportResult<usize> {
        self.get_parsed_or_default(
            config_keys::ERROR_DISPLAY_CAP,
            self.defaults.error_display_cap,
        )
    }
}
