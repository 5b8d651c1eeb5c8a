// ==========================================
// 销售线索 CRM - 自定义字段定义 Repository
// ==========================================
// 职责: 查询某种记录已定义的自定义字段（供映射推断使用）
// 红线: 字段定义的增删改由外部管理界面负责，这里只提供查询与注册
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::types::{RecordKind, Section};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

// ==========================================
// FieldDefinition - 已知自定义字段
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub kind: RecordKind,
    pub key: String,   // 字段键（slug）
    pub label: String, // 显示名
    pub section: Section,
}

// ==========================================
// FieldDefinitionSource Trait
// ==========================================
// 实现者: SqliteFieldDefinitionRepository
#[async_trait]
pub trait FieldDefinitionSource: Send + Sync {
    /// 查询某种记录的全部已知自定义字段
    async fn known_custom_fields(&self, kind: RecordKind) -> RepositoryResult<Vec<FieldDefinition>>;
}

pub struct SqliteFieldDefinitionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteFieldDefinitionRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 注册字段定义（已存在则更新显示名与分区）
    pub fn register(&self, definition: &FieldDefinition) -> RepositoryResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            r#"
            INSERT INTO field_definition (kind, field_key, label, section)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(kind, field_key) DO UPDATE SET
                label = excluded.label,
                section = excluded.section
            "#,
            params![
                definition.kind.as_str(),
                definition.key,
                definition.label,
                definition.section.as_str()
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl FieldDefinitionSource for SqliteFieldDefinitionRepository {
    async fn known_custom_fields(&self, kind: RecordKind) -> RepositoryResult<Vec<FieldDefinition>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT field_key, label, section FROM field_definition WHERE kind = ?1 ORDER BY field_key",
        )?;

        let rows = stmt.query_map(params![kind.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut definitions = Vec::new();
        for row in rows {
            let (key, label, section) = row?;
            definitions.push(FieldDefinition {
                kind,
                key,
                label,
                // 未知分区按 general 处理
                section: Section::parse(&section).unwrap_or(Section::General),
            });
        }

        Ok(definitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_register_and_query() {
        let temp_file = NamedTempFile::new().unwrap();
        let repo = SqliteFieldDefinitionRepository::new(temp_file.path().to_str().unwrap()).unwrap();

        repo.register(&FieldDefinition {
            kind: RecordKind::Lead,
            key: "lead_score".to_string(),
            label: "Lead Score".to_string(),
            section: Section::General,
        })
        .unwrap();
        repo.register(&FieldDefinition {
            kind: RecordKind::Company,
            key: "industry".to_string(),
            label: "Industry".to_string(),
            section: Section::General,
        })
        .unwrap();

        let lead_fields = repo.known_custom_fields(RecordKind::Lead).await.unwrap();
        assert_eq!(lead_fields.len(), 1);
        assert_eq!(lead_fields[0].key, "lead_score");

        let company_fields = repo.known_custom_fields(RecordKind::Company).await.unwrap();
        assert_eq!(company_fields[0].label, "Industry");
    }
}
