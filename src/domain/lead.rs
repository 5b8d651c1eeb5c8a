// ==========================================
// 销售线索 CRM - 线索领域模型
// ==========================================
// 职责: 线索草稿、落库记录、去重键
// ==========================================

use crate::domain::types::{Channel, ChannelStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

// ==========================================
// LeadDraft - 单行转换结果（导入中间结构）
// ==========================================
// 红线: name / company_name 缺失的草稿不会被构造
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadDraft {
    // ===== 必填 =====
    pub name: String,
    pub company_name: String,

    // ===== 联系方式 =====
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
    pub linkedin_url: Option<String>,
    pub notes: Option<String>,

    // ===== 管道阶段 =====
    pub stage: String,

    // ===== 动态字段 =====
    pub custom_fields: BTreeMap<String, Value>,
    pub channel_status: BTreeMap<Channel, ChannelStatus>,

    // 元信息
    pub source_row: usize, // 原始文件行号
}

impl LeadDraft {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(&self.name, &self.company_name)
    }
}

// ==========================================
// LeadRecord - 线索落库文档
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub id: String,
    pub name: String,
    pub company_name: String,
    pub company_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
    pub linkedin_url: Option<String>,
    pub notes: Option<String>,
    pub stage: String,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub channel_status: BTreeMap<Channel, ChannelStatus>,
    pub import_batch_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LeadRecord {
    pub fn from_draft(
        id: String,
        draft: LeadDraft,
        company_id: Option<String>,
        import_batch_id: &str,
    ) -> Self {
        Self {
            id,
            name: draft.name,
            company_name: draft.company_name,
            company_id,
            email: draft.email,
            phone: draft.phone,
            title: draft.title,
            linkedin_url: draft.linkedin_url,
            notes: draft.notes,
            stage: draft.stage,
            custom_fields: draft.custom_fields,
            channel_status: draft.channel_status,
            import_batch_id: Some(import_batch_id.to_string()),
            created_at: Utc::now(),
        }
    }
}

// ==========================================
// DedupKey - 去重键
// ==========================================
// 规则: trim + 小写后的 name 与 company_name 组合
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn new(name: &str, company_name: &str) -> Self {
        DedupKey(format!(
            "{}\u{1f}{}",
            normalize_name(name),
            normalize_name(company_name)
        ))
    }

    /// 从已落库的线索文档提取去重键（缺字段的文档不参与去重）
    pub fn from_document(data: &Value) -> Option<Self> {
        let name = data.get("name")?.as_str()?;
        let company = data.get("company_name")?.as_str()?;
        if name.trim().is_empty() || company.trim().is_empty() {
            return None;
        }
        Some(DedupKey::new(name, company))
    }
}

/// 名称归一化（去重与公司解析共用）
pub fn normalize_name(value: &str) -> String {
    value.trim().to_lowercase()
}

// ==========================================
// ExistingRecordIndex - 已有线索快照
// ==========================================
// 导入开始前读取一次，导入期间只读，不随外部写入刷新
#[derive(Debug, Clone, Default)]
pub struct ExistingRecordIndex {
    keys: HashSet<DedupKey>,
}

impl ExistingRecordIndex {
    pub fn from_documents<'a, I>(documents: I) -> Self
    where
        I: IntoIterator<Item = &'a Value>,
    {
        Self {
            keys: documents.into_iter().filter_map(DedupKey::from_document).collect(),
        }
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            keys: pairs.iter().map(|(n, c)| DedupKey::new(n, c)).collect(),
        }
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dedup_key_normalized() {
        assert_eq!(
            DedupKey::new("  Alice ", "ACME"),
            DedupKey::new("alice", "acme ")
        );
        assert_ne!(DedupKey::new("Alice", "Acme"), DedupKey::new("Alice", "Globex"));
    }

    #[test]
    fn test_dedup_key_no_concatenation_collision() {
        assert_ne!(DedupKey::new("ab", "c"), DedupKey::new("a", "bc"));
    }

    #[test]
    fn test_index_from_documents_skips_incomplete() {
        let docs = vec![
            json!({"name": "Alice", "company_name": "Acme"}),
            json!({"name": "Bob"}),
            json!({"name": "", "company_name": "Acme"}),
        ];
        let index = ExistingRecordIndex::from_documents(docs.iter());
        assert_eq!(index.len(), 1);
        assert!(index.contains(&DedupKey::new("alice", "acme")));
    }
}
