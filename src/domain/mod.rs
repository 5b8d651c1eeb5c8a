// ==========================================
// 销售线索 CRM - 领域模型层
// ==========================================
// 职责: 定义导入管道的实体与类型
// 红线: 不含数据访问逻辑，不含导入流程逻辑
// ==========================================

pub mod company;
pub mod import;
pub mod lead;
pub mod mapping;
pub mod types;

// 重导出核心类型
pub use company::{merge_patch, CompanyUpdate};
pub use import::{ImportPhase, ImportResult, ParsedTable, RawRow};
pub use lead::{normalize_name, DedupKey, ExistingRecordIndex, LeadDraft, LeadRecord};
pub use mapping::{slugify, FieldMapping, MappingTarget, StandardField};
pub use types::{Channel, ChannelStatus, RecordKind, Section, TargetEntity};
