// ==========================================
// 销售线索 CRM - 导入运行领域模型
// ==========================================
// 职责: 原始行、解析结果、导入阶段、导入结果
// 生命周期: 仅在一次导入调用内
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 原始行记录（列名 → 单元格原始值）
pub type RawRow = HashMap<String, String>;

// ==========================================
// ParsedTable - 表格解析结果
// ==========================================
// headers 保留源文件列顺序
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    #[serde(default)]
    pub line_numbers: Vec<usize>, // 每行在源文件中的行号（与 rows 一一对应）
    pub warnings: Vec<String>,    // 行级解析警告（不阻断导入）
}

impl ParsedTable {
    /// 由表头与按列顺序排列的行值构造（测试与内存数据源使用）
    pub fn from_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let rows: Vec<RawRow> = rows
            .iter()
            .map(|values| {
                headers
                    .iter()
                    .zip(values.iter())
                    .map(|(h, v)| (h.clone(), v.to_string()))
                    .collect()
            })
            .collect();

        // 第 1 行为表头
        let line_numbers = (0..rows.len()).map(|idx| idx + 2).collect();

        Self {
            headers,
            rows,
            line_numbers,
            warnings: Vec::new(),
        }
    }

    /// 第 idx 个数据行的源文件行号；未记录时按紧邻表头推算
    pub fn line_of(&self, idx: usize) -> usize {
        self.line_numbers.get(idx).copied().unwrap_or(idx + 2)
    }
}

// ==========================================
// ImportPhase - 导入状态机
// ==========================================
// Preparing → Transforming → ResolvingCompanies → PersistingLeads → Done
// Failed 仅由 Preparing 阶段的错误到达
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportPhase {
    Preparing,
    Transforming,
    ResolvingCompanies,
    PersistingLeads,
    Done,
    Failed,
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportPhase::Preparing => "PREPARING",
            ImportPhase::Transforming => "TRANSFORMING",
            ImportPhase::ResolvingCompanies => "RESOLVING_COMPANIES",
            ImportPhase::PersistingLeads => "PERSISTING_LEADS",
            ImportPhase::Done => "DONE",
            ImportPhase::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

// ==========================================
// ImportResult - 导入结果汇总
// ==========================================
// 导入期间单调累积，返回后不再修改
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub successful: usize,
    pub failed: usize,
    pub duplicates: usize,
    pub total_processed: usize,
    pub errors: Vec<String>,   // 完整的逐行错误/审计信息
    pub warnings: Vec<String>, // 解析警告
}

impl ImportResult {
    /// 供界面显示的错误列表：最多 cap 条，其余折叠为一行计数
    pub fn display_errors(&self, cap: usize) -> Vec<String> {
        let mut shown: Vec<String> = self.errors.iter().take(cap).cloned().collect();
        if self.errors.len() > cap {
            shown.push(format!("… 另有 {} 条错误未显示", self.errors.len() - cap));
        }
        shown
    }
}
