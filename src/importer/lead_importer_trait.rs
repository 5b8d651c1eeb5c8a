// ==========================================
// 销售线索 CRM - 线索导入 Trait
// ==========================================
// 职责: 定义线索导入管道各阶段接口（不包含实现）
// 流程: 解析 → 向下填充 → 映射推断 → 逐行转换/去重 → 公司解析 → 批量落库
// ==========================================

use crate::domain::company::CompanyUpdate;
use crate::domain::import::{ImportResult, ParsedTable, RawRow};
use crate::domain::lead::{DedupKey, ExistingRecordIndex, LeadDraft};
use crate::domain::mapping::FieldMapping;
use crate::importer::error::ImportResult as Result;
use crate::repository::field_definition_repo::FieldDefinition;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;

/// 进度回调: (当前行, 总行数)
///
/// 回调在导入流程内同步调用，须足够轻量；管道不等待、不重试回调
pub type ProgressFn = dyn Fn(usize, usize) + Send + Sync;

// ==========================================
// LeadImporter Trait
// ==========================================
// 用途: 线索导入主接口
// 实现者: LeadImporterImpl
#[async_trait]
pub trait LeadImporter: Send + Sync {
    /// 解析文件表头并返回推断的映射（不导入，供操作员审阅/修改）
    async fn preview_mappings(&self, file_path: &Path) -> Result<Vec<FieldMapping>>;

    /// 从文件导入线索（映射自动推断）
    ///
    /// # 返回
    /// - Ok(ImportResult): 导入结果（成功/重复/失败计数与逐行信息）
    /// - Err: 文件解析失败、快照读取失败（Preparing 阶段错误）
    async fn import_file(
        &self,
        file_path: &Path,
        progress: Option<&ProgressFn>,
    ) -> Result<ImportResult>;

    /// 使用操作员确认过的映射从文件导入
    async fn import_with_mappings(
        &self,
        file_path: &Path,
        mappings: &[FieldMapping],
        progress: Option<&ProgressFn>,
    ) -> Result<ImportResult>;

    /// 导入已解析的表格
    ///
    /// # 导入流程（4个阶段）
    /// 1. Preparing: 向下填充 + 读取已有线索快照
    /// 2. Transforming: 逐行转换、必填校验、去重（保持输入顺序）
    /// 3. ResolvingCompanies: 公司批量查找/创建 + 字段合并更新
    /// 4. PersistingLeads: 按上限分块批量写入线索
    async fn import_table(
        &self,
        table: ParsedTable,
        mappings: &[FieldMapping],
        progress: Option<&ProgressFn>,
    ) -> Result<ImportResult>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（外部协作者）
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为表头 + 原始行记录 + 行级警告
    fn parse(&self, file_path: &Path) -> Result<ParsedTable>;
}

// ==========================================
// FillPolicy - 向下填充参数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillPolicy {
    pub sample_size: usize,
    pub empty_threshold: f64,
    pub min_rows: usize, // 采样行数不足时不判定稀疏列
}

impl Default for FillPolicy {
    fn default() -> Self {
        Self {
            sample_size: 20,
            empty_threshold: 0.2,
            min_rows: 5,
        }
    }
}

// ==========================================
// ForwardFillRepairer Trait
// ==========================================
// 用途: 修复合并单元格导致的稀疏列
// 实现者: ForwardFill
pub trait ForwardFillRepairer: Send + Sync {
    /// 对稀疏列做向下填充（纯函数，无 I/O）
    fn repair(&self, headers: &[String], rows: Vec<RawRow>, policy: &FillPolicy) -> Vec<RawRow>;
}

// ==========================================
// MappingInferencer Trait
// ==========================================
// 用途: 由表头推断字段映射
// 实现者: KeywordMappingInferencer
pub trait MappingInferencer: Send + Sync {
    /// 推断每列的映射（确定性：相同输入得到相同输出）
    ///
    /// # 参数
    /// - headers: 源文件表头（按列顺序）
    /// - auto_create_default: 未识别列是否自动创建字段
    /// - known_fields: 已定义的自定义字段（可为空）
    fn infer(
        &self,
        headers: &[String],
        auto_create_default: bool,
        known_fields: &[FieldDefinition],
    ) -> Vec<FieldMapping>;
}

// ==========================================
// TransformedRow - 单行转换结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedRow {
    pub draft: LeadDraft,
    pub company_update: Option<CompanyUpdate>,
}

// ==========================================
// RowTransformer Trait
// ==========================================
// 用途: 按映射将原始行转换为线索草稿 + 公司字段更新
// 实现者: MappingRowTransformer
pub trait RowTransformer: Send + Sync {
    /// 转换单行
    ///
    /// # 返回
    /// - Some(TransformedRow): 转换成功
    /// - None: 必填字段（name / company_name）缺失
    fn transform(
        &self,
        row: &RawRow,
        mappings: &[FieldMapping],
        default_stage: &str,
        row_number: usize,
    ) -> Option<TransformedRow>;
}

// ==========================================
// DuplicateResolver Trait
// ==========================================
// 用途: 检测与已有线索 / 本次已接受线索的重复
// 实现者: KeyedDuplicateResolver
pub trait DuplicateResolver: Send + Sync {
    /// 判断草稿是否重复（两个集合均为 O(1) 查找）
    fn is_duplicate(
        &self,
        draft: &LeadDraft,
        existing: &ExistingRecordIndex,
        accepted_this_run: &HashSet<DedupKey>,
    ) -> bool;
}
