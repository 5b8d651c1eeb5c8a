// ==========================================
// 销售线索 CRM - 文档存储 Repository 实现
// ==========================================
// 职责: 实现 DocumentStore（使用 rusqlite，文档以 JSON 存储）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::domain::company::merge_patch;
use crate::domain::lead::normalize_name;
use crate::domain::types::RecordKind;
use crate::repository::document_store::{
    DocumentStore, StoredDocument, WriteOp, DEFAULT_MAX_BATCH_OPS,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

// ==========================================
// SqliteDocumentStore
// ==========================================
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
    max_batch_ops: usize,
}

impl SqliteDocumentStore {
    /// 创建新的 Store 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            max_batch_ops: DEFAULT_MAX_BATCH_OPS,
        })
    }

    /// 从已有连接创建（与 ConfigManager 等共享连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn.lock()?;
            configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }

        Ok(Self {
            conn,
            max_batch_ops: DEFAULT_MAX_BATCH_OPS,
        })
    }

    /// 调整单批次操作上限
    pub fn with_max_batch_ops(mut self, max_batch_ops: usize) -> Self {
        self.max_batch_ops = max_batch_ops.max(1);
        self
    }

    /// 统计某种记录的文档数
    pub fn count(&self, kind: RecordKind) -> RepositoryResult<usize> {
        let conn = self.conn.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 按 id 读取单个文档
    pub fn get_by_id(&self, kind: RecordKind, id: &str) -> RepositoryResult<Option<Value>> {
        let conn = self.conn.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM documents WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// 公司类文档的名称索引键
    fn name_key_for(kind: RecordKind, data: &Value) -> Option<String> {
        match kind {
            RecordKind::Company => data
                .get("name")
                .and_then(|v| v.as_str())
                .map(normalize_name)
                .filter(|k| !k.is_empty()),
            RecordKind::Lead => None,
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn max_batch_ops(&self) -> usize {
        self.max_batch_ops
    }

    async fn get_all(&self, kind: RecordKind) -> RepositoryResult<Vec<StoredDocument>> {
        let conn = self.conn.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, data FROM documents WHERE kind = ?1 ORDER BY created_at, id")?;

        let rows = stmt.query_map(params![kind.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, text) = row?;
            documents.push(StoredDocument {
                id,
                data: serde_json::from_str(&text)?,
            });
        }

        debug!(kind = %kind, count = documents.len(), "get_all 完成");
        Ok(documents)
    }

    async fn batch_write(&self, kind: RecordKind, ops: Vec<WriteOp>) -> RepositoryResult<usize> {
        if ops.len() > self.max_batch_ops {
            return Err(RepositoryError::BatchLimitExceeded {
                len: ops.len(),
                max: self.max_batch_ops,
            });
        }

        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO documents (kind, id, name_key, data, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                "#,
            )?;

            for op in &ops {
                let name_key = Self::name_key_for(kind, &op.data);
                let text = serde_json::to_string(&op.data)?;
                stmt.execute(params![kind.as_str(), op.id, name_key, text, now])?;
                count += 1;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(count)
    }

    async fn get_or_create_many(
        &self,
        kind: RecordKind,
        names: Vec<String>,
    ) -> RepositoryResult<HashMap<String, String>> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        let mut resolved: HashMap<String, String> = HashMap::new();
        let mut created = 0usize;
        {
            let mut select =
                tx.prepare("SELECT id FROM documents WHERE kind = ?1 AND name_key = ?2")?;
            let mut insert = tx.prepare(
                r#"
                INSERT INTO documents (kind, id, name_key, data, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                "#,
            )?;

            for name in &names {
                let key = normalize_name(name);
                // 同一次调用内的重复名称只解析一次
                if key.is_empty() || resolved.contains_key(&key) {
                    continue;
                }

                let existing: Option<String> = select
                    .query_row(params![kind.as_str(), key], |row| row.get(0))
                    .optional()?;

                let id = match existing {
                    Some(id) => id,
                    None => {
                        let id = Uuid::new_v4().to_string();
                        let data = json!({ "name": name.trim() });
                        insert.execute(params![
                            kind.as_str(),
                            id,
                            key,
                            serde_json::to_string(&data)?,
                            now
                        ])?;
                        created += 1;
                        id
                    }
                };

                resolved.insert(key, id);
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        debug!(
            kind = %kind,
            resolved = resolved.len(),
            created = created,
            "get_or_create_many 完成"
        );
        Ok(resolved)
    }

    async fn update_one(&self, kind: RecordKind, id: &str, patch: Value) -> RepositoryResult<()> {
        let patch = match patch {
            Value::Object(map) => map,
            other => {
                return Err(RepositoryError::SerializationError(format!(
                    "补丁必须是 JSON 对象: {}",
                    other
                )))
            }
        };

        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;

        let raw: Option<String> = tx
            .query_row(
                "SELECT data FROM documents WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;

        let raw = raw.ok_or_else(|| RepositoryError::NotFound {
            entity: kind.to_string(),
            id: id.to_string(),
        })?;

        let mut data = match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        merge_patch(&mut data, &patch);
        let data = Value::Object(data);

        tx.execute(
            "UPDATE documents SET data = ?1, name_key = COALESCE(?2, name_key), updated_at = ?3 WHERE kind = ?4 AND id = ?5",
            params![
                serde_json::to_string(&data)?,
                Self::name_key_for(kind, &data),
                Utc::now().to_rfc3339(),
                kind.as_str(),
                id
            ],
        )?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_store() -> (NamedTempFile, SqliteDocumentStore) {
        let temp_file = NamedTempFile::new().unwrap();
        let store = SqliteDocumentStore::new(temp_file.path().to_str().unwrap()).unwrap();
        (temp_file, store)
    }

    #[tokio::test]
    async fn test_batch_write_rejects_over_limit() {
        let (_tmp, store) = create_store();
        let store = store.with_max_batch_ops(2);

        let ops: Vec<WriteOp> = (0..3)
            .map(|i| WriteOp {
                id: format!("L{}", i),
                data: json!({"name": format!("Lead {}", i)}),
            })
            .collect();

        let result = store.batch_write(RecordKind::Lead, ops).await;
        assert!(matches!(
            result,
            Err(RepositoryError::BatchLimitExceeded { len: 3, max: 2 })
        ));
        assert_eq!(store.count(RecordKind::Lead).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_batch_write_and_get_all() {
        let (_tmp, store) = create_store();
        let ops = vec![
            WriteOp {
                id: "L1".to_string(),
                data: json!({"name": "Alice", "company_name": "Acme"}),
            },
            WriteOp {
                id: "L2".to_string(),
                data: json!({"name": "Bob", "company_name": "Globex"}),
            },
        ];

        let written = store.batch_write(RecordKind::Lead, ops).await.unwrap();
        assert_eq!(written, 2);

        let all = store.get_all(RecordKind::Lead).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(store.get_all(RecordKind::Company).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_or_create_many_same_name_same_id() {
        let (_tmp, store) = create_store();

        let ids = store
            .get_or_create_many(
                RecordKind::Company,
                vec!["Acme".to_string(), " acme ".to_string(), "Globex".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert_eq!(store.count(RecordKind::Company).unwrap(), 2);

        // 再次调用复用已有 id
        let again = store
            .get_or_create_many(RecordKind::Company, vec!["ACME".to_string()])
            .await
            .unwrap();
        assert_eq!(again["acme"], ids["acme"]);
        assert_eq!(store.count(RecordKind::Company).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_one_merges_fields() {
        let (_tmp, store) = create_store();
        let ids = store
            .get_or_create_many(RecordKind::Company, vec!["Acme".to_string()])
            .await
            .unwrap();
        let id = ids["acme"].clone();

        store
            .update_one(
                RecordKind::Company,
                &id,
                json!({"website": "acme.com", "custom_fields": {"industry": "Retail"}}),
            )
            .await
            .unwrap();
        store
            .update_one(
                RecordKind::Company,
                &id,
                json!({"custom_fields": {"employees": "50"}}),
            )
            .await
            .unwrap();

        let data = store.get_by_id(RecordKind::Company, &id).unwrap().unwrap();
        assert_eq!(data["name"], json!("Acme"));
        assert_eq!(data["website"], json!("acme.com"));
        assert_eq!(
            data["custom_fields"],
            json!({"industry": "Retail", "employees": "50"})
        );
    }

    #[tokio::test]
    async fn test_update_one_not_found() {
        let (_tmp, store) = create_store();
        let result = store
            .update_one(RecordKind::Company, "missing", json!({"a": 1}))
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }
}
