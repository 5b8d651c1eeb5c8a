// ==========================================
// 销售线索 CRM - 重复检测器实现
// ==========================================
// 职责: 检测与已有线索 / 本次已接受线索的重复
// 去重键: trim + 小写后的 name + company_name
// ==========================================

use crate::domain::lead::{DedupKey, ExistingRecordIndex, LeadDraft};
use crate::importer::lead_importer_trait::DuplicateResolver;
use std::collections::HashSet;

pub struct KeyedDuplicateResolver;

impl DuplicateResolver for KeyedDuplicateResolver {
    fn is_duplicate(
        &self,
        draft: &LeadDraft,
        existing: &ExistingRecordIndex,
        accepted_this_run: &HashSet<DedupKey>,
    ) -> bool {
        let key = draft.dedup_key();
        existing.contains(&key) || accepted_this_run.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn create_test_draft(name: &str, company: &str, source_row: usize) -> LeadDraft {
        LeadDraft {
            name: name.to_string(),
            company_name: company.to_string(),
            email: None,
            phone: None,
            title: None,
            linkedin_url: None,
            notes: None,
            stage: "new".to_string(),
            custom_fields: BTreeMap::new(),
            channel_status: BTreeMap::new(),
            source_row,
        }
    }

    #[test]
    fn test_duplicate_against_existing() {
        let existing = ExistingRecordIndex::from_pairs(&[("Alice", "Acme")]);
        let accepted = HashSet::new();

        assert!(KeyedDuplicateResolver.is_duplicate(
            &create_test_draft(" alice", "ACME ", 2),
            &existing,
            &accepted
        ));
        assert!(!KeyedDuplicateResolver.is_duplicate(
            &create_test_draft("Alice", "Globex", 3),
            &existing,
            &accepted
        ));
    }

    #[test]
    fn test_duplicate_within_run() {
        let existing = ExistingRecordIndex::default();
        let mut accepted = HashSet::new();

        let first = create_test_draft("Bob", "Initech", 2);
        assert!(!KeyedDuplicateResolver.is_duplicate(&first, &existing, &accepted));
        accepted.insert(first.dedup_key());

        let second = create_test_draft("BOB", "initech", 5);
        assert!(KeyedDuplicateResolver.is_duplicate(&second, &existing, &accepted));
    }

    #[test]
    fn test_large_batch_stays_linear() {
        // 5000 行同批次去重，集合查找保证不会退化为 O(n²)
        let existing = ExistingRecordIndex::default();
        let mut accepted = HashSet::new();
        let mut duplicates = 0;

        for i in 0..5000 {
            let draft = create_test_draft(&format!("Lead {}", i % 2500), "Acme", i + 2);
            if KeyedDuplicateResolver.is_duplicate(&draft, &existing, &accepted) {
                duplicates += 1;
            } else {
                accepted.insert(draft.dedup_key());
            }
        }

        assert_eq!(accepted.len(), 2500);
        assert_eq!(duplicates, 2500);
    }
}
