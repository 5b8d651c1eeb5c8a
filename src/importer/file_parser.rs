// ==========================================
// 销售线索 CRM - 文件解析器实现
// ==========================================
// 职责: 表格文件 → 表头 + 原始行 + 行级警告
// 支持: CSV/TSV (.csv/.tsv/.txt) / Excel (.xlsx/.xls)
// ==========================================

use crate::domain::import::{ParsedTable, RawRow};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::lead_importer_trait::FileParser;
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

// ==========================================
// 公共辅助
// ==========================================

/// 选择分隔符: .tsv 固定为制表符，其余按表头行中制表符与逗号的数量判断
fn detect_delimiter(path: &Path, ext: &str) -> ImportResult<u8> {
    if ext == "tsv" {
        return Ok(b'\t');
    }

    let mut first_line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut first_line)?;

    let tabs = first_line.matches('\t').count();
    let commas = first_line.matches(',').count();
    Ok(if tabs > commas { b'\t' } else { b',' })
}

/// 去掉空表头与重复表头（保留首次出现的位置），重复项记为警告
///
/// 行记录按列名存储，重名列的后一列会覆盖前一列
fn finalize_headers(headers: &[String], warnings: &mut Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut result = Vec::new();

    for header in headers.iter().filter(|h| !h.is_empty()) {
        if seen.insert(header.as_str()) {
            result.push(header.clone());
        } else if reported.insert(header.as_str()) {
            warn!(header = %header, "表头重复");
            warnings.push(format!("表头 {} 重复出现，仅保留最后一列的值", header));
        }
    }

    result
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse(&self, file_path: &Path) -> ImportResult<ParsedTable> {
        let path = file_path;

        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !ext.is_empty() && ext != "csv" && ext != "tsv" && ext != "txt" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let delimiter = detect_delimiter(path, &ext)?;
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true) // 允许行长度不一致（记为警告）
            .from_reader(file);

        // 读取表头（去掉 UTF-8 BOM）
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::MissingHeaders);
        }

        let mut rows = Vec::new();
        let mut line_numbers = Vec::new();
        let mut warnings = Vec::new();
        let kept_headers = finalize_headers(&headers, &mut warnings);

        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(row_idx + 2);

            if record.len() != headers.len() {
                warnings.push(format!(
                    "第 {} 行: 列数 {} 与表头列数 {} 不一致",
                    line,
                    record.len(),
                    headers.len()
                ));
            }

            let mut row_map = RawRow::new();
            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    if header.is_empty() {
                        continue;
                    }
                    row_map.insert(header.clone(), value.trim().to_string());
                }
            }

            // 跳过完全空白的行
            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }

            rows.push(row_map);
            line_numbers.push(line);
        }

        debug!(
            rows = rows.len(),
            warnings = warnings.len(),
            delimiter = %(delimiter as char).escape_default(),
            "CSV 解析完成"
        );

        Ok(ParsedTable {
            headers: kept_headers,
            rows,
            line_numbers,
            warnings,
        })
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse(&self, file_path: &Path) -> ImportResult<ParsedTable> {
        let path = file_path;

        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(path)?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        // 提取表头（第一行）
        let mut sheet_rows = range.rows();
        let header_row = sheet_rows.next().ok_or(ImportError::MissingHeaders)?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::MissingHeaders);
        }

        let mut warnings = Vec::new();
        let kept_headers = finalize_headers(&headers, &mut warnings);

        // 工作表行号从 1 开始；已用区域可能不从第 1 行起
        let header_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);

        // 读取数据行
        let mut rows = Vec::new();
        let mut line_numbers = Vec::new();
        for (offset, data_row) in sheet_rows.enumerate() {
            let mut row_map = RawRow::new();

            for (col_idx, cell) in data_row.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    if header.is_empty() {
                        continue;
                    }
                    row_map.insert(header.clone(), cell.to_string().trim().to_string());
                }
            }

            // 跳过完全空白的行
            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }

            rows.push(row_map);
            line_numbers.push(header_line + offset + 1);
        }

        Ok(ParsedTable {
            headers: kept_headers,
            rows,
            line_numbers,
            warnings,
        })
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse(&self, file_path: &Path) -> ImportResult<ParsedTable> {
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" | "tsv" | "txt" => CsvParser.parse(file_path),
            "xlsx" | "xls" => ExcelParser.parse(file_path),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}
