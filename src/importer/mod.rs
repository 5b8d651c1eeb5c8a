// ==========================================
// 销售线索 CRM - 导入层
// ==========================================
// 职责: 表格文件 → 线索 + 公司文档
// 支持: CSV, Excel
// ==========================================

// 模块声明
pub mod batch_writer;
pub mod company_resolver;
pub mod duplicate_resolver;
pub mod error;
pub mod file_parser;
pub mod forward_fill;
pub mod lead_importer_impl;
pub mod lead_importer_trait;
pub mod mapping_inferencer;
pub mod mapping_rules;
pub mod row_transformer;

// 重导出核心类型
pub use batch_writer::BatchWriter;
pub use company_resolver::{CompanyResolution, CompanyResolver};
pub use duplicate_resolver::KeyedDuplicateResolver;
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use forward_fill::ForwardFill;
pub use lead_importer_impl::LeadImporterImpl;
pub use mapping_inferencer::KeywordMappingInferencer;
pub use row_transformer::MappingRowTransformer;

// 重导出 Trait 接口
pub use lead_importer_trait::{
    DuplicateResolver, FileParser, FillPolicy, ForwardFillRepairer, LeadImporter,
    MappingInferencer, ProgressFn, RowTransformer, TransformedRow,
};
