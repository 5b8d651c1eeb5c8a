// ==========================================
// 销售线索 CRM - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::importer::error::ImportResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// ImportSettings - 一次导入使用的配置快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSettings {
    pub batch_ceiling: usize,       // 单批次写入上限
    pub progress_interval: usize,   // 进度回调间隔（行）
    pub fill_sample_size: usize,    // 向下填充采样行数
    pub fill_empty_threshold: f64,  // 空值比例阈值（超过则填充）
    pub fill_min_rows: usize,       // 稀疏列判定的最少采样行数
    pub auto_create_fields: bool,   // 未识别列是否自动建字段
    pub default_stage: String,      // 默认管道阶段
    pub error_display_cap: usize,   // 界面显示的错误条数上限
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_ceiling: 500,
            progress_interval: 50,
            fill_sample_size: 20,
            fill_empty_threshold: 0.2,
            fill_min_rows: 5,
            auto_create_fields: true,
            default_stage: "new".to_string(),
            error_display_cap: 20,
        }
    }
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    // ===== 写入配置 =====

    /// 单批次写入操作上限
    ///
    /// # 默认值
    /// - 500
    async fn get_batch_ceiling(&self) -> ImportResult<usize>;

    // ===== 进度配置 =====

    /// 进度回调间隔（每 N 行回调一次）
    ///
    /// # 默认值
    /// - 50
    async fn get_progress_interval(&self) -> ImportResult<usize>;

    // ===== 向下填充配置 =====

    /// 稀疏列判定的采样行数
    ///
    /// # 默认值
    /// - 20
    async fn get_fill_sample_size(&self) -> ImportResult<usize>;

    /// 稀疏列判定的空值比例阈值（严格大于时填充）
    ///
    /// # 默认值
    /// - 0.2
    async fn get_fill_empty_threshold(&self) -> ImportResult<f64>;

    /// 稀疏列判定所需的最少采样行数
    ///
    /// # 默认值
    /// - 5
    async fn get_fill_min_rows(&self) -> ImportResult<usize>;

    // ===== 映射配置 =====

    /// 未识别列是否默认自动创建字段
    ///
    /// # 默认值
    /// - true
    async fn get_auto_create_default(&self) -> ImportResult<bool>;

    /// 导入线索的默认管道阶段
    ///
    /// # 默认值
    /// - "new"
    async fn get_default_stage(&self) -> ImportResult<String>;

    // ===== 展示配置 =====

    /// 错误列表显示上限
    ///
    /// # 默认值
    /// - 20
    async fn get_error_display_cap(&self) -> ImportResult<usize>;

    /// 读取完整配置快照（导入开始时调用一次）
    async fn load_import_settings(&self) -> ImportResult<ImportSettings> {
        Ok(ImportSettings {
            batch_ceiling: self.get_batch_ceiling().await?,
            progress_interval: self.get_progress_interval().await?,
            fill_sample_size: self.get_fill_sample_size().await?,
            fill_empty_threshold: self.get_fill_empty_threshold().await?,
            fill_min_rows: self.get_fill_min_rows().await?,
            auto_create_fields: self.get_auto_create_default().await?,
            default_stage: self.get_default_stage().await?,
            error_display_cap: self.get_error_display_cap().await?,
        })
    }
}
