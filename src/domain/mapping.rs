// ==========================================
// 销售线索 CRM - 字段映射领域模型
// ==========================================
// 职责: 源列 → 目标字段的映射描述
// 生命周期: 每次导入生成一次，生成后只读
// ==========================================

use crate::domain::types::{Section, TargetEntity};
use serde::{Deserialize, Serialize};

// ==========================================
// StandardField - 线索标准字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardField {
    Name,
    LastName, // 姓氏列，转换时拼接到 name 之后
    Email,
    Phone,
    Title,
    CompanyName,
    LinkedinUrl,
    Website,
    LinkedinStatus,
    EmailStatus,
    Stage,
    Notes,
}

impl StandardField {
    /// 字段键（落库时的 JSON 键）
    pub fn key(&self) -> &'static str {
        match self {
            StandardField::Name => "name",
            StandardField::LastName => "last_name",
            StandardField::Email => "email",
            StandardField::Phone => "phone",
            StandardField::Title => "title",
            StandardField::CompanyName => "company_name",
            StandardField::LinkedinUrl => "linkedin_url",
            StandardField::Website => "website",
            StandardField::LinkedinStatus => "linkedin_status",
            StandardField::EmailStatus => "email_status",
            StandardField::Stage => "stage",
            StandardField::Notes => "notes",
        }
    }

    /// 字段所属分区
    pub fn section(&self) -> Section {
        match self {
            StandardField::LinkedinUrl | StandardField::LinkedinStatus => Section::Linkedin,
            StandardField::EmailStatus => Section::Email,
            _ => Section::General,
        }
    }

    /// 字段写入的实体（公司网站写到公司上）
    pub fn target_entity(&self) -> TargetEntity {
        match self {
            StandardField::Website => TargetEntity::Secondary,
            _ => TargetEntity::Primary,
        }
    }
}

// ==========================================
// MappingTarget - 映射目标（带标签的变体）
// ==========================================
// Synthesized 在推断阶段一次性生成字段名，转换阶段不再重新派生
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MappingTarget {
    Mapped { field: StandardField },
    Custom { key: String },
    Synthesized { key: String, section: Section },
    Skip,
}

// ==========================================
// FieldMapping - 单列映射
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub source_column: String,
    pub target: MappingTarget,
    pub section: Section,
    pub target_entity: TargetEntity,
    pub auto_create: bool,
}

impl FieldMapping {
    /// 映射到标准字段
    pub fn standard(source_column: impl Into<String>, field: StandardField) -> Self {
        Self {
            source_column: source_column.into(),
            target: MappingTarget::Mapped { field },
            section: field.section(),
            target_entity: field.target_entity(),
            auto_create: false,
        }
    }

    /// 映射到已定义的自定义字段
    pub fn custom(
        source_column: impl Into<String>,
        key: impl Into<String>,
        section: Section,
        target_entity: TargetEntity,
    ) -> Self {
        Self {
            source_column: source_column.into(),
            target: MappingTarget::Custom { key: key.into() },
            section,
            target_entity,
            auto_create: false,
        }
    }

    /// 未识别的列
    ///
    /// auto_create 为 true 时立即生成字段名（Synthesized），否则为 Skip
    /// 表头 slug 为空（如纯符号列）时同样为 Skip
    pub fn unmapped(
        source_column: impl Into<String>,
        section: Section,
        target_entity: TargetEntity,
        auto_create: bool,
    ) -> Self {
        let source_column = source_column.into();
        let target = if auto_create && !slugify(&source_column).is_empty() {
            MappingTarget::Synthesized {
                key: synthesized_field_key(&source_column, section),
                section,
            }
        } else {
            MappingTarget::Skip
        };

        Self {
            source_column,
            target,
            section,
            target_entity,
            auto_create,
        }
    }

    /// 面向操作员的目标字段名（未命名字段显示为 "skip"）
    pub fn target_field_name(&self) -> &str {
        match &self.target {
            MappingTarget::Mapped { field } => field.key(),
            MappingTarget::Custom { key } => key,
            MappingTarget::Synthesized { .. } | MappingTarget::Skip => "skip",
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.target, MappingTarget::Skip)
    }
}

/// 列名 slug 化：小写，非字母数字 → 下划线，连续下划线合并，去首尾下划线
pub fn slugify(header: &str) -> String {
    let mut slug = String::with_capacity(header.len());
    for ch in header.trim().to_lowercase().chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

/// 自动创建字段的字段名（渠道分区加前缀，便于后续分组显示）
pub fn synthesized_field_key(header: &str, section: Section) -> String {
    let slug = slugify(header);
    match section {
        Section::General => slug,
        Section::Linkedin | Section::Email => {
            let prefix = format!("{}_", section.as_str());
            if slug.starts_with(&prefix) {
                slug
            } else {
                format!("{}{}", prefix, slug)
            }
        }
    }
}
