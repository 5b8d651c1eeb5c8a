// ==========================================
// 销售线索 CRM - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供文档存储与字段定义查询接口，屏蔽数据库细节
// 约束: 所有查询使用参数化，防止 SQL 注入
// ==========================================

pub mod document_store;
pub mod document_store_impl;
pub mod error;
pub mod field_definition_repo;

// 重导出核心仓储
pub use document_store::{DocumentStore, StoredDocument, WriteOp, DEFAULT_MAX_BATCH_OPS};
pub use document_store_impl::SqliteDocumentStore;
pub use error::{RepositoryError, RepositoryResult};
pub use field_definition_repo::{
    FieldDefinition, FieldDefinitionSource, SqliteFieldDefinitionRepository,
};
