// ==========================================
// 销售线索 CRM - 文档存储 Repository Trait
// ==========================================
// 职责: 定义导入管道消费的文档存储接口（不包含实现）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::types::RecordKind;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// 单批次默认操作上限
pub const DEFAULT_MAX_BATCH_OPS: usize = 500;

// ==========================================
// StoredDocument - 已落库文档
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Value,
}

// ==========================================
// WriteOp - 批量写入操作（按 id 创建或覆盖）
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOp {
    pub id: String,
    pub data: Value,
}

// ==========================================
// DocumentStore Trait
// ==========================================
// 实现者: SqliteDocumentStore
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 单次 batch_write 允许的最大操作数
    fn max_batch_ops(&self) -> usize;

    /// 读取某种记录的全部文档
    async fn get_all(&self, kind: RecordKind) -> RepositoryResult<Vec<StoredDocument>>;

    /// 原子批量写入
    ///
    /// # 返回
    /// - Ok(usize): 写入的文档数
    /// - Err(BatchLimitExceeded): ops 超过 max_batch_ops，调用方须自行分块
    async fn batch_write(&self, kind: RecordKind, ops: Vec<WriteOp>) -> RepositoryResult<usize>;

    /// 按名称批量查找或创建
    ///
    /// # 返回
    /// - HashMap<归一化名称, id>：同一次调用内名称相同的条目解析为同一 id
    async fn get_or_create_many(
        &self,
        kind: RecordKind,
        names: Vec<String>,
    ) -> RepositoryResult<HashMap<String, String>>;

    /// 将补丁合并到单个文档（字段级覆盖，嵌套对象浅合并）
    async fn update_one(&self, kind: RecordKind, id: &str, patch: Value) -> RepositoryResult<()>;
}
