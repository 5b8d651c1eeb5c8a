// ==========================================
// 销售线索 CRM - 批量导入核心库
// ==========================================
// 职责: 表格文件 → 线索/公司文档的导入与对账管道
// 技术栈: Rust + SQLite（文档表）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 文档存储
pub mod repository;

// 导入层 - 解析/映射/去重/落库
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Channel, ChannelStatus, RecordKind, Section, TargetEntity};

// 领域实体
pub use domain::{
    CompanyUpdate, DedupKey, ExistingRecordIndex, FieldMapping, ImportPhase, ImportResult,
    LeadDraft, LeadRecord, MappingTarget, ParsedTable, StandardField,
};

// 导入器
pub use importer::{ImportError, LeadImporter, LeadImporterImpl};

// 存储
pub use repository::{DocumentStore, SqliteDocumentStore};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "销售线索批量导入";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
