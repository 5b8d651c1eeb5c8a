// ==========================================
// 销售线索 CRM - 公司解析器
// ==========================================
// 职责: 已接受线索的公司名 → 公司 id，并合并累积的公司字段
// 流程:
// 1. 收集不重复的公司名（按首次出现顺序）
// 2. 一次 get_or_create_many 调用解析全部 id
// 3. 各公司的字段更新并发下发；单个失败只记日志，不中断导入
// ==========================================

use crate::domain::company::CompanyUpdate;
use crate::domain::lead::{normalize_name, LeadDraft};
use crate::domain::types::RecordKind;
use crate::importer::error::ImportResult;
use crate::repository::document_store::DocumentStore;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

// ==========================================
// CompanyResolution - 公司解析结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyResolution {
    pub ids: HashMap<String, String>, // 归一化公司名 → 公司 id
    pub updated: usize,
    pub update_failures: usize,
}

impl CompanyResolution {
    pub fn id_for(&self, company_name: &str) -> Option<&String> {
        self.ids.get(&normalize_name(company_name))
    }
}

pub struct CompanyResolver<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> CompanyResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// 解析公司 id 并合并公司字段
    ///
    /// # 返回
    /// - Ok(CompanyResolution): id 映射 + 更新统计（更新失败不视为错误）
    /// - Err: get_or_create_many 调用失败
    pub async fn resolve_and_merge(
        &self,
        drafts: &[LeadDraft],
        updates: HashMap<String, CompanyUpdate>,
    ) -> ImportResult<CompanyResolution> {
        let names = distinct_company_names(drafts);
        if names.is_empty() {
            return Ok(CompanyResolution::default());
        }

        debug!(companies = names.len(), "批量解析公司");
        let ids = self
            .store
            .get_or_create_many(RecordKind::Company, names)
            .await?;

        let mut update_failures = 0;
        let mut pending = Vec::new();
        for (key, update) in updates {
            if update.is_empty() {
                continue;
            }
            match ids.get(&key) {
                Some(id) => pending.push((key, id.clone(), update)),
                None => {
                    warn!(company = %key, "公司未解析到 id，跳过字段更新");
                    update_failures += 1;
                }
            }
        }

        let update_tasks = pending.into_iter().map(|(key, id, update)| async move {
            match self
                .store
                .update_one(RecordKind::Company, &id, update.into_patch())
                .await
            {
                Ok(()) => true,
                Err(e) => {
                    warn!(company = %key, company_id = %id, error = %e, "公司字段更新失败");
                    false
                }
            }
        });

        // 不同公司的更新互不依赖，并发执行
        let results = join_all(update_tasks).await;
        let updated = results.iter().filter(|ok| **ok).count();
        update_failures += results.len() - updated;

        info!(
            companies = ids.len(),
            updated = updated,
            update_failures = update_failures,
            "公司解析完成"
        );

        Ok(CompanyResolution {
            ids,
            updated,
            update_failures,
        })
    }
}

/// 按首次出现顺序收集不重复的公司名
fn distinct_company_names(drafts: &[LeadDraft]) -> Vec<String> {
    let mut seen = HashSet::new();
    drafts
        .iter()
        .filter(|draft| seen.insert(normalize_name(&draft.company_name)))
        .map(|draft| draft.company_name.trim().to_string())
        .collect()
}
