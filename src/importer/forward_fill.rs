// ==========================================
// 销售线索 CRM - 向下填充修复器
// ==========================================
// 职责: 修复电子表格合并单元格造成的稀疏列
// 规则:
// - 采样前 min(行数, sample_size) 行，空值比例 > 阈值 的列判定为可填充
// - 采样行数少于 min_rows 时不判定（小文件中单个空格不代表合并单元格）
// - 可填充列中的空单元格复制同列最近的前一个非空值
// - 其余列原样保留（全空列仍为空，不视为错误）
// ==========================================

use crate::domain::import::RawRow;
use crate::importer::lead_importer_trait::{FillPolicy, ForwardFillRepairer};
use tracing::debug;

pub struct ForwardFill;

impl ForwardFillRepairer for ForwardFill {
    fn repair(&self, headers: &[String], mut rows: Vec<RawRow>, policy: &FillPolicy) -> Vec<RawRow> {
        let eligible = self.fill_eligible_columns(headers, &rows, policy);
        if eligible.is_empty() {
            return rows;
        }

        debug!(columns = ?eligible, "向下填充稀疏列");

        for column in &eligible {
            let mut last_value: Option<String> = None;
            for row in rows.iter_mut() {
                let current = row
                    .get(column.as_str())
                    .filter(|v| !v.trim().is_empty())
                    .cloned();
                match current {
                    Some(value) => last_value = Some(value),
                    None => {
                        if let Some(previous) = &last_value {
                            row.insert(column.clone(), previous.clone());
                        }
                    }
                }
            }
        }

        rows
    }
}

impl ForwardFill {
    /// 判定可填充列（按表头顺序返回）
    pub fn fill_eligible_columns(
        &self,
        headers: &[String],
        rows: &[RawRow],
        policy: &FillPolicy,
    ) -> Vec<String> {
        let sample_len = rows.len().min(policy.sample_size);
        if sample_len == 0 || sample_len < policy.min_rows {
            return Vec::new();
        }

        headers
            .iter()
            .filter(|header| {
                let empty = rows[..sample_len]
                    .iter()
                    .filter(|row| {
                        row.get(header.as_str())
                            .map(|v| v.trim().is_empty())
                            .unwrap_or(true)
                    })
                    .count();
                (empty as f64 / sample_len as f64) > policy.empty_threshold
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_sparse_column_filled_from_preceding() {
        let headers = headers(&["Company", "Name"]);
        let rows = vec![
            row(&[("Company", "Acme"), ("Name", "Alice")]),
            row(&[("Company", ""), ("Name", "Bob")]),
            row(&[("Company", ""), ("Name", "Carol")]),
            row(&[("Company", "Globex"), ("Name", "Dan")]),
            row(&[("Company", ""), ("Name", "Eve")]),
        ];

        let repaired = ForwardFill.repair(&headers, rows, &FillPolicy::default());

        let companies: Vec<&str> = repaired.iter().map(|r| r["Company"].as_str()).collect();
        assert_eq!(companies, vec!["Acme", "Acme", "Acme", "Globex", "Globex"]);
    }

    #[test]
    fn test_dense_column_untouched() {
        // 5 行中 1 行为空 = 20%，不超过阈值
        let headers = headers(&["Email"]);
        let rows = vec![
            row(&[("Email", "a@x.com")]),
            row(&[("Email", "")]),
            row(&[("Email", "c@x.com")]),
            row(&[("Email", "d@x.com")]),
            row(&[("Email", "e@x.com")]),
        ];

        let repaired = ForwardFill.repair(&headers, rows.clone(), &FillPolicy::default());

        assert_eq!(repaired, rows);
    }

    #[test]
    fn test_leading_empty_stays_empty() {
        let headers = headers(&["Company"]);
        let rows = vec![
            row(&[("Company", "")]),
            row(&[("Company", "Acme")]),
            row(&[("Company", "")]),
            row(&[("Company", "Globex")]),
            row(&[("Company", "")]),
        ];

        let repaired = ForwardFill.repair(&headers, rows, &FillPolicy::default());

        assert_eq!(repaired[0]["Company"], "");
        assert_eq!(repaired[2]["Company"], "Acme");
        assert_eq!(repaired[4]["Company"], "Globex");
    }

    #[test]
    fn test_small_table_not_filled() {
        let headers = headers(&["Company"]);
        let rows = vec![
            row(&[("Company", "Acme")]),
            row(&[("Company", "Acme")]),
            row(&[("Company", "")]),
        ];

        let repaired = ForwardFill.repair(&headers, rows.clone(), &FillPolicy::default());

        assert_eq!(repaired, rows);
    }

    #[test]
    fn test_fully_empty_column_stays_empty() {
        let headers = headers(&["Notes"]);
        let rows = vec![row(&[("Notes", "")]), row(&[]), row(&[("Notes", "")])];

        let repaired = ForwardFill.repair(&headers, rows, &FillPolicy::default());

        assert!(repaired
            .iter()
            .all(|r| r.get("Notes").map(|v| v.is_empty()).unwrap_or(true)));
    }

    #[test]
    fn test_only_first_sample_rows_decide() {
        let headers = headers(&["Region"]);
        let policy = FillPolicy {
            sample_size: 2,
            empty_threshold: 0.2,
            min_rows: 1,
        };
        // 采样的前 2 行均非空，后续空值不触发填充
        let rows = vec![
            row(&[("Region", "EU")]),
            row(&[("Region", "US")]),
            row(&[("Region", "")]),
            row(&[("Region", "")]),
        ];

        let repaired = ForwardFill.repair(&headers, rows, &policy);

        assert_eq!(repaired[2]["Region"], "");
    }
}
