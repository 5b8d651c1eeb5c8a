// ==========================================
// 销售线索 CRM - 线索导入器实现
// ==========================================
// 职责: 整合导入流程，从文件到文档存储
// 流程: 解析 → 向下填充 → 映射推断 → 逐行转换/去重 → 公司解析 → 分块落库
// 状态: Preparing → Transforming → ResolvingCompanies → PersistingLeads → Done
//       Preparing 阶段出错 → Failed（以 Err 返回）
// ==========================================

use crate::config::{ImportConfigReader, ImportSettings};
use crate::domain::company::CompanyUpdate;
use crate::domain::import::{ImportPhase, ParsedTable};
use crate::domain::lead::{ExistingRecordIndex, LeadDraft, LeadRecord};
use crate::domain::mapping::{FieldMapping, MappingTarget};
use crate::domain::types::RecordKind;
use crate::importer::batch_writer::BatchWriter;
use crate::importer::company_resolver::{CompanyResolution, CompanyResolver};
use crate::importer::duplicate_resolver::KeyedDuplicateResolver;
use crate::importer::error::{ImportError, ImportResult as Result};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::forward_fill::ForwardFill;
use crate::importer::lead_importer_trait::{
    DuplicateResolver, FileParser, FillPolicy, ForwardFillRepairer, LeadImporter,
    MappingInferencer, ProgressFn, RowTransformer, TransformedRow,
};
use crate::importer::mapping_inferencer::KeywordMappingInferencer;
use crate::importer::row_transformer::MappingRowTransformer;
use crate::repository::document_store::{DocumentStore, WriteOp};
use crate::repository::field_definition_repo::{FieldDefinition, FieldDefinitionSource};
use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// LeadImporterImpl - 线索导入器实现
// ==========================================
pub struct LeadImporterImpl<S, C>
where
    S: DocumentStore,
    C: ImportConfigReader,
{
    // 数据访问层
    store: S,
    field_source: Box<dyn FieldDefinitionSource>,

    // 配置读取器
    config: C,

    // 导入组件
    file_parser: Box<dyn FileParser>,
    repairer: Box<dyn ForwardFillRepairer>,
    inferencer: Box<dyn MappingInferencer>,
    transformer: Box<dyn RowTransformer>,
    duplicate_resolver: Box<dyn DuplicateResolver>,
}

impl<S, C> LeadImporterImpl<S, C>
where
    S: DocumentStore,
    C: ImportConfigReader,
{
    /// 创建新的 LeadImporter 实例
    ///
    /// # 参数
    /// - store: 文档存储
    /// - config: 配置读取器
    /// - field_source: 已知自定义字段查询
    /// - file_parser: 文件解析器
    /// - repairer: 向下填充修复器
    /// - inferencer: 映射推断器
    /// - transformer: 行转换器
    /// - duplicate_resolver: 重复检测器
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: S,
        config: C,
        field_source: Box<dyn FieldDefinitionSource>,
        file_parser: Box<dyn FileParser>,
        repairer: Box<dyn ForwardFillRepairer>,
        inferencer: Box<dyn MappingInferencer>,
        transformer: Box<dyn RowTransformer>,
        duplicate_resolver: Box<dyn DuplicateResolver>,
    ) -> Self {
        Self {
            store,
            field_source,
            config,
            file_parser,
            repairer,
            inferencer,
            transformer,
            duplicate_resolver,
        }
    }

    /// 使用默认组件创建
    pub fn with_default_components(
        store: S,
        config: C,
        field_source: Box<dyn FieldDefinitionSource>,
    ) -> Self {
        Self::new(
            store,
            config,
            field_source,
            Box::new(UniversalFileParser),
            Box::new(ForwardFill),
            Box::new(KeywordMappingInferencer),
            Box::new(MappingRowTransformer),
            Box::new(KeyedDuplicateResolver),
        )
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S, C> LeadImporter for LeadImporterImpl<S, C>
where
    S: DocumentStore,
    C: ImportConfigReader,
{
    async fn preview_mappings(&self, file_path: &Path) -> Result<Vec<FieldMapping>> {
        let table = self.parse_file(file_path)?;
        let settings = self.config.load_import_settings().await?;
        let known_fields = self.load_known_fields().await?;

        Ok(self
            .inferencer
            .infer(&table.headers, settings.auto_create_fields, &known_fields))
    }

    async fn import_file(
        &self,
        file_path: &Path,
        progress: Option<&ProgressFn>,
    ) -> Result<crate::domain::import::ImportResult> {
        info!(file_path = %file_path.display(), "开始导入线索文件");

        let table = self.parse_file(file_path)?;
        let settings = self.config.load_import_settings().await?;
        let known_fields = self
            .load_known_fields()
            .await
            .map_err(|e| self.fail(e))?;

        let mappings =
            self.inferencer
                .infer(&table.headers, settings.auto_create_fields, &known_fields);
        debug!(
            columns = mappings.len(),
            skipped = mappings.iter().filter(|m| m.is_skipped()).count(),
            "映射推断完成"
        );

        self.run(table, &mappings, &settings, progress).await
    }

    async fn import_with_mappings(
        &self,
        file_path: &Path,
        mappings: &[FieldMapping],
        progress: Option<&ProgressFn>,
    ) -> Result<crate::domain::import::ImportResult> {
        info!(file_path = %file_path.display(), "开始导入线索文件（指定映射）");

        let table = self.parse_file(file_path)?;
        self.import_table(table, mappings, progress).await
    }

    async fn import_table(
        &self,
        table: ParsedTable,
        mappings: &[FieldMapping],
        progress: Option<&ProgressFn>,
    ) -> Result<crate::domain::import::ImportResult> {
        validate_mappings(mappings).map_err(|e| self.fail(e))?;
        let settings = self.config.load_import_settings().await?;
        self.run(table, mappings, &settings, progress).await
    }
}

// 辅助方法
impl<S, C> LeadImporterImpl<S, C>
where
    S: DocumentStore,
    C: ImportConfigReader,
{
    /// 导入主流程（表格已解析）
    #[instrument(
        skip(self, table, mappings, settings, progress),
        fields(batch_id, rows = table.rows.len())
    )]
    async fn run(
        &self,
        mut table: ParsedTable,
        mappings: &[FieldMapping],
        settings: &ImportSettings,
        progress: Option<&ProgressFn>,
    ) -> Result<crate::domain::import::ImportResult> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        // === 阶段 1: Preparing ===
        info!(phase = %ImportPhase::Preparing, "准备导入");
        let rows = std::mem::take(&mut table.rows);
        let warnings = std::mem::take(&mut table.warnings);
        let headers = &table.headers;
        let total = rows.len();

        let policy = FillPolicy {
            sample_size: settings.fill_sample_size,
            empty_threshold: settings.fill_empty_threshold,
            min_rows: settings.fill_min_rows,
        };
        let rows = self.repairer.repair(headers, rows, &policy);

        let existing_docs = self
            .store
            .get_all(RecordKind::Lead)
            .await
            .map_err(|e| self.fail(e.into()))?;
        let existing = ExistingRecordIndex::from_documents(existing_docs.iter().map(|d| &d.data));
        debug!(existing = existing.len(), "已有线索快照读取完成");

        let mut result = crate::domain::import::ImportResult {
            warnings,
            ..Default::default()
        };
        for mapping in mappings {
            if !mapping.is_skipped() && !headers.contains(&mapping.source_column) {
                warn!(column = %mapping.source_column, "映射列不在文件表头中");
                result
                    .warnings
                    .push(format!("映射列 {} 不在文件表头中，已忽略", mapping.source_column));
            }
        }

        // === 阶段 2: Transforming ===
        info!(phase = %ImportPhase::Transforming, total = total, "逐行转换");
        let interval = settings.progress_interval.max(1);
        let mut accepted: Vec<LeadDraft> = Vec::new();
        let mut accepted_keys = HashSet::new();
        let mut company_updates: HashMap<String, CompanyUpdate> = HashMap::new();

        for (idx, row) in rows.iter().enumerate() {
            // 错误信息引用源文件行号（解析时跳过的空行不参与编号）
            let row_number = table.line_of(idx);
            result.total_processed += 1;

            match self
                .transformer
                .transform(row, mappings, &settings.default_stage, row_number)
            {
                None => {
                    result.failed += 1;
                    result
                        .errors
                        .push(format!("第 {} 行: 缺少必填字段（姓名或公司名）", row_number));
                }
                Some(TransformedRow {
                    draft,
                    company_update,
                }) => {
                    if self
                        .duplicate_resolver
                        .is_duplicate(&draft, &existing, &accepted_keys)
                    {
                        result.duplicates += 1;
                        result.errors.push(format!(
                            "第 {} 行: 重复线索 {} @ {}，已跳过",
                            row_number, draft.name, draft.company_name
                        ));
                    } else {
                        accepted_keys.insert(draft.dedup_key());
                        if let Some(update) = company_update {
                            match company_updates.entry(update.company_key.clone()) {
                                Entry::Occupied(mut entry) => entry.get_mut().merge_from(update),
                                Entry::Vacant(entry) => {
                                    entry.insert(update);
                                }
                            }
                        }
                        accepted.push(draft);
                    }
                }
            }

            let processed = idx + 1;
            if processed % interval == 0 && processed < total {
                if let Some(callback) = progress {
                    callback(processed, total);
                }
            }
        }

        info!(
            accepted = accepted.len(),
            duplicates = result.duplicates,
            failed = result.failed,
            "逐行转换完成"
        );

        // === 阶段 3: ResolvingCompanies ===
        info!(
            phase = %ImportPhase::ResolvingCompanies,
            companies = company_updates.len(),
            "解析公司"
        );
        let resolution = match CompanyResolver::new(&self.store)
            .resolve_and_merge(&accepted, company_updates)
            .await
        {
            Ok(resolution) => resolution,
            Err(e) => {
                error!(error = %e, "公司解析失败，本批线索全部计为失败");
                result.failed += accepted.len();
                result
                    .errors
                    .push(format!("公司解析失败，{} 条线索未导入: {}", accepted.len(), e));
                return Ok(self.finish(result, &batch_id, start_time, progress, total));
            }
        };
        if resolution.update_failures > 0 {
            warn!(
                update_failures = resolution.update_failures,
                "部分公司字段更新失败（不影响线索导入）"
            );
        }

        // === 阶段 4: PersistingLeads ===
        let attempted = accepted.len();
        let writer = BatchWriter::new(&self.store, settings.batch_ceiling);
        info!(
            phase = %ImportPhase::PersistingLeads,
            leads = attempted,
            chunk_size = writer.chunk_size(),
            "批量写入线索"
        );

        let persisted = match build_write_ops(accepted, &resolution, &batch_id) {
            Ok(ops) => writer
                .write_all(RecordKind::Lead, ops)
                .await
                .map_err(ImportError::from),
            Err(e) => Err(e),
        };

        match persisted {
            Ok(written) => result.successful = written,
            Err(e) => {
                // 全有或全无：已提交的块也不计入成功
                error!(error = %e, attempted = attempted, "线索批量写入失败");
                result.successful = 0;
                result.failed += attempted;
                result
                    .errors
                    .push(format!("线索批量写入失败，{} 条线索计为失败: {}", attempted, e));
            }
        }

        Ok(self.finish(result, &batch_id, start_time, progress, total))
    }

    /// 解析文件（失败即 Failed 状态）
    fn parse_file(&self, file_path: &Path) -> Result<ParsedTable> {
        let table = self.file_parser.parse(file_path).map_err(|e| self.fail(e))?;
        info!(
            rows = table.rows.len(),
            columns = table.headers.len(),
            warnings = table.warnings.len(),
            "文件解析完成"
        );
        Ok(table)
    }

    /// 读取线索与公司两类已知自定义字段
    async fn load_known_fields(&self) -> Result<Vec<FieldDefinition>> {
        let mut fields = self
            .field_source
            .known_custom_fields(RecordKind::Lead)
            .await?;
        fields.extend(
            self.field_source
                .known_custom_fields(RecordKind::Company)
                .await?,
        );
        Ok(fields)
    }

    fn fail(&self, err: ImportError) -> ImportError {
        error!(phase = %ImportPhase::Failed, error = %err, "导入失败");
        err
    }

    fn finish(
        &self,
        result: crate::domain::import::ImportResult,
        batch_id: &str,
        start_time: Instant,
        progress: Option<&ProgressFn>,
        total: usize,
    ) -> crate::domain::import::ImportResult {
        if let Some(callback) = progress {
            callback(total, total);
        }

        info!(
            phase = %ImportPhase::Done,
            batch_id = %batch_id,
            total = result.total_processed,
            successful = result.successful,
            duplicates = result.duplicates,
            failed = result.failed,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "线索导入完成"
        );
        result
    }
}

/// 草稿 → 线索文档写入操作（每条线索分配新 id 与公司 id）
fn build_write_ops(
    drafts: Vec<LeadDraft>,
    resolution: &CompanyResolution,
    batch_id: &str,
) -> Result<Vec<WriteOp>> {
    drafts
        .into_iter()
        .map(|draft| {
            let company_id = resolution.id_for(&draft.company_name).cloned();
            let record = LeadRecord::from_draft(Uuid::new_v4().to_string(), draft, company_id, batch_id);
            Ok(WriteOp {
                id: record.id.clone(),
                data: serde_json::to_value(&record)?,
            })
        })
        .collect()
}

/// 操作员提供的映射：自定义/自动字段名不得为空
fn validate_mappings(mappings: &[FieldMapping]) -> Result<()> {
    for mapping in mappings {
        match &mapping.target {
            MappingTarget::Custom { key } | MappingTarget::Synthesized { key, .. }
                if key.trim().is_empty() =>
            {
                return Err(ImportError::InvalidMapping(format!(
                    "列 {} 的目标字段名为空",
                    mapping.source_column
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::domain::mapping::StandardField;
    use crate::repository::document_store_impl::SqliteDocumentStore;
    use crate::repository::field_definition_repo::SqliteFieldDefinitionRepository;
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;

    fn create_importer() -> (
        NamedTempFile,
        LeadImporterImpl<SqliteDocumentStore, ConfigManager>,
    ) {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = crate::db::open_sqlite_connection(temp_file.path().to_str().unwrap()).unwrap();
        let conn = Arc::new(Mutex::new(conn));

        let store = SqliteDocumentStore::from_connection(conn.clone()).unwrap();
        let config = ConfigManager::from_connection(conn.clone()).unwrap();
        let fields = SqliteFieldDefinitionRepository::from_connection(conn);

        let importer = LeadImporterImpl::with_default_components(store, config, Box::new(fields));
        (temp_file, importer)
    }

    fn name_company_mappings() -> Vec<FieldMapping> {
        vec![
            FieldMapping::standard("Name", StandardField::Name),
            FieldMapping::standard("Company", StandardField::CompanyName),
        ]
    }

    #[test]
    fn test_validate_mappings_rejects_empty_key() {
        let mappings = vec![FieldMapping::custom(
            "Score",
            " ",
            crate::domain::types::Section::General,
            crate::domain::types::TargetEntity::Primary,
        )];
        assert!(matches!(
            validate_mappings(&mappings),
            Err(ImportError::InvalidMapping(_))
        ));
        assert!(validate_mappings(&name_company_mappings()).is_ok());
    }

    #[tokio::test]
    async fn test_import_table_counts() {
        let (_tmp, importer) = create_importer();
        let table = ParsedTable::from_rows(
            &["Name", "Company"],
            &[&["Alice", "Acme"], &["alice", "ACME"], &["Bob", ""]],
        );

        let result = importer
            .import_table(table, &name_company_mappings(), None)
            .await
            .unwrap();

        assert_eq!(result.successful, 1);
        assert_eq!(result.duplicates, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.total_processed, 3);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().any(|e| e.starts_with("第 4 行")));
    }

    #[tokio::test]
    async fn test_leads_carry_company_id_and_batch() {
        let (_tmp, importer) = create_importer();
        let table = ParsedTable::from_rows(&["Name", "Company"], &[&["Alice", "Acme"]]);

        importer
            .import_table(table, &name_company_mappings(), None)
            .await
            .unwrap();

        let leads = importer.store().get_all(RecordKind::Lead).await.unwrap();
        let companies = importer.store().get_all(RecordKind::Company).await.unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(companies.len(), 1);
        assert_eq!(leads[0].data["company_id"], companies[0].id.as_str());
        assert!(leads[0].data["import_batch_id"].is_string());
        assert_eq!(leads[0].data["stage"], "new");
    }

    #[tokio::test]
    async fn test_unknown_mapping_column_warns() {
        let (_tmp, importer) = create_importer();
        let table = ParsedTable::from_rows(&["Name", "Company"], &[&["Alice", "Acme"]]);
        let mut mappings = name_company_mappings();
        mappings.push(FieldMapping::standard("Mail", StandardField::Email));

        let result = importer.import_table(table, &mappings, None).await.unwrap();

        assert_eq!(result.successful, 1);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Mail"));
    }
}
