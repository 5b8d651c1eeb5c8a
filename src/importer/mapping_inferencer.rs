// ==========================================
// 销售线索 CRM - 映射推断器实现
// ==========================================
// 职责: 表头 → FieldMapping（纯函数，无 I/O，结果确定）
// 流程: 归一化 → 标准字段 → 已知自定义字段 → 分区/实体分类 → 未识别
// ==========================================

use crate::domain::mapping::{slugify, FieldMapping};
use crate::domain::types::{RecordKind, TargetEntity};
use crate::importer::lead_importer_trait::MappingInferencer;
use crate::importer::mapping_rules::{
    classify_entity, classify_section, match_standard_field, normalize_header,
};
use crate::repository::field_definition_repo::FieldDefinition;

pub struct KeywordMappingInferencer;

impl MappingInferencer for KeywordMappingInferencer {
    fn infer(
        &self,
        headers: &[String],
        auto_create_default: bool,
        known_fields: &[FieldDefinition],
    ) -> Vec<FieldMapping> {
        headers
            .iter()
            .map(|header| self.infer_one(header, auto_create_default, known_fields))
            .collect()
    }
}

impl KeywordMappingInferencer {
    fn infer_one(
        &self,
        header: &str,
        auto_create_default: bool,
        known_fields: &[FieldDefinition],
    ) -> FieldMapping {
        let normalized = normalize_header(header);

        if let Some(field) = match_standard_field(&normalized) {
            return FieldMapping::standard(header, field);
        }

        if let Some(definition) = find_known_field(header, &normalized, known_fields) {
            let entity = match definition.kind {
                RecordKind::Lead => TargetEntity::Primary,
                RecordKind::Company => TargetEntity::Secondary,
            };
            return FieldMapping::custom(header, definition.key.clone(), definition.section, entity);
        }

        let section = classify_section(&normalized);
        let entity = classify_entity(&normalized, section);
        FieldMapping::unmapped(header, section, entity, auto_create_default)
    }
}

/// 按字段键或显示名匹配已定义字段（线索字段优先于公司字段）
fn find_known_field<'a>(
    header: &str,
    normalized: &str,
    known_fields: &'a [FieldDefinition],
) -> Option<&'a FieldDefinition> {
    let slug = slugify(header);
    let matches = |def: &&FieldDefinition| {
        def.key == slug || normalize_header(&def.label) == normalized
    };

    known_fields
        .iter()
        .filter(|def| def.kind == RecordKind::Lead)
        .find(matches)
        .or_else(|| {
            known_fields
                .iter()
                .filter(|def| def.kind == RecordKind::Company)
                .find(matches)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mapping::{MappingTarget, StandardField};
    use crate::domain::types::Section;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_infer_standard_fields() {
        let mappings = KeywordMappingInferencer.infer(
            &headers(&["Full Name", "Company", "E-mail", "LinkedIn Status", "Website"]),
            true,
            &[],
        );

        assert_eq!(mappings[0].target, MappingTarget::Mapped { field: StandardField::Name });
        assert_eq!(mappings[1].target, MappingTarget::Mapped { field: StandardField::CompanyName });
        assert_eq!(mappings[2].target, MappingTarget::Mapped { field: StandardField::Email });
        assert_eq!(
            mappings[3].target,
            MappingTarget::Mapped { field: StandardField::LinkedinStatus }
        );
        assert_eq!(mappings[3].section, Section::Linkedin);
        assert_eq!(mappings[4].target_entity, TargetEntity::Secondary);
    }

    #[test]
    fn test_infer_unmapped_columns() {
        let mappings = KeywordMappingInferencer.infer(
            &headers(&["Industry", "Connection Note", "Lead Score"]),
            true,
            &[],
        );

        assert_eq!(mappings[0].target_entity, TargetEntity::Secondary);
        assert_eq!(
            mappings[0].target,
            MappingTarget::Synthesized { key: "industry".to_string(), section: Section::General }
        );
        assert_eq!(mappings[1].section, Section::Linkedin);
        assert_eq!(mappings[1].target_entity, TargetEntity::Primary);
        assert_eq!(
            mappings[1].target,
            MappingTarget::Synthesized {
                key: "linkedin_connection_note".to_string(),
                section: Section::Linkedin
            }
        );
        assert_eq!(mappings[2].target_entity, TargetEntity::Primary);
    }

    #[test]
    fn test_infer_auto_create_off_skips() {
        let mappings = KeywordMappingInferencer.infer(&headers(&["Lead Score"]), false, &[]);
        assert!(mappings[0].is_skipped());
        assert!(!mappings[0].auto_create);
    }

    #[test]
    fn test_infer_is_idempotent() {
        let input = headers(&["Name", "Company", "Industry", "Email Subject", "Random"]);
        let first = KeywordMappingInferencer.infer(&input, true, &[]);
        let second = KeywordMappingInferencer.infer(&input, true, &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_infer_known_custom_field() {
        let known = vec![
            FieldDefinition {
                kind: RecordKind::Company,
                key: "employee_count".to_string(),
                label: "Headcount".to_string(),
                section: Section::General,
            },
            FieldDefinition {
                kind: RecordKind::Lead,
                key: "lead_score".to_string(),
                label: "Lead Score".to_string(),
                section: Section::General,
            },
        ];

        let mappings =
            KeywordMappingInferencer.infer(&headers(&["headcount", "Lead Score"]), false, &known);

        assert_eq!(
            mappings[0].target,
            MappingTarget::Custom { key: "employee_count".to_string() }
        );
        assert_eq!(mappings[0].target_entity, TargetEntity::Secondary);
        assert_eq!(mappings[1].target, MappingTarget::Custom { key: "lead_score".to_string() });
        assert_eq!(mappings[1].target_entity, TargetEntity::Primary);
    }

    #[test]
    fn test_standard_field_beats_known_field() {
        let known = vec![FieldDefinition {
            kind: RecordKind::Lead,
            key: "email".to_string(),
            label: "Email".to_string(),
            section: Section::Email,
        }];
        let mappings = KeywordMappingInferencer.infer(&headers(&["Email"]), true, &known);
        assert_eq!(mappings[0].target, MappingTarget::Mapped { field: StandardField::Email });
    }
}
