// ==========================================
// 销售线索 CRM - 行转换器实现
// ==========================================
// 职责: 原始行 + 映射 → 线索草稿 + 公司字段更新
// 规则:
// - 空白单元格不写入任何字段（保留默认值）
// - 渠道状态经关键字表转换，未命中则保持未设置
// - name / company_name 缺失返回 None（计为失败，不计为重复）
// ==========================================

use crate::domain::company::CompanyUpdate;
use crate::domain::import::RawRow;
use crate::domain::lead::{normalize_name, LeadDraft};
use crate::domain::mapping::{FieldMapping, MappingTarget, StandardField};
use crate::domain::types::TargetEntity;
use crate::importer::lead_importer_trait::{RowTransformer, TransformedRow};
use crate::importer::mapping_rules::classify_channel_status;
use serde_json::Value;
use std::collections::BTreeMap;

pub struct MappingRowTransformer;

impl RowTransformer for MappingRowTransformer {
    fn transform(
        &self,
        row: &RawRow,
        mappings: &[FieldMapping],
        default_stage: &str,
        row_number: usize,
    ) -> Option<TransformedRow> {
        let mut name: Option<String> = None;
        let mut last_name: Option<String> = None;
        let mut company_name: Option<String> = None;
        let mut draft = LeadDraft {
            name: String::new(),
            company_name: String::new(),
            email: None,
            phone: None,
            title: None,
            linkedin_url: None,
            notes: None,
            stage: default_stage.to_string(),
            custom_fields: BTreeMap::new(),
            channel_status: BTreeMap::new(),
            source_row: row_number,
        };
        let mut company = CompanyUpdate::default();

        for mapping in mappings {
            let Some(value) = self.get_string(row, &mapping.source_column) else {
                continue;
            };

            match &mapping.target {
                MappingTarget::Skip => {}
                MappingTarget::Mapped { field } => match field {
                    StandardField::Name => name = Some(value),
                    StandardField::LastName => last_name = Some(value),
                    StandardField::CompanyName => company_name = Some(value),
                    StandardField::Email => draft.email = Some(value),
                    StandardField::Phone => draft.phone = Some(value),
                    StandardField::Title => draft.title = Some(value),
                    StandardField::LinkedinUrl => draft.linkedin_url = Some(value),
                    StandardField::Notes => draft.notes = Some(value),
                    StandardField::Stage => draft.stage = value,
                    StandardField::Website => company.set_field(field.key(), Value::String(value)),
                    StandardField::LinkedinStatus | StandardField::EmailStatus => {
                        if let (Some(channel), Some(status)) =
                            (field.section().channel(), classify_channel_status(&value))
                        {
                            draft.channel_status.insert(channel, status);
                        }
                    }
                },
                MappingTarget::Custom { key } | MappingTarget::Synthesized { key, .. } => {
                    match mapping.target_entity {
                        TargetEntity::Primary => {
                            draft.custom_fields.insert(key.clone(), Value::String(value));
                        }
                        TargetEntity::Secondary => {
                            company.set_custom_field(key, Value::String(value));
                        }
                    }
                }
            }
        }

        // 名/姓分列时拼接为全名
        draft.name = match (name, last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first,
            (None, Some(last)) => last,
            (None, None) => return None,
        };
        draft.company_name = company_name?;

        let company_update = if company.is_empty() {
            None
        } else {
            company.company_key = normalize_name(&draft.company_name);
            Some(company)
        };

        Some(TransformedRow {
            draft,
            company_update,
        })
    }
}

impl MappingRowTransformer {
    /// 读取非空单元格（trim 后为空视为缺失）
    fn get_string(&self, row: &RawRow, column: &str) -> Option<String> {
        row.get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
    }
}
