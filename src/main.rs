// ==========================================
// 销售线索 CRM - 命令行导入入口
// ==========================================
// 用法: lead-import <文件路径> [数据库路径]
// ==========================================

use lead_import::config::{ConfigManager, ImportConfigReader};
use lead_import::db::{get_default_db_path, open_sqlite_connection};
use lead_import::importer::{LeadImporter, LeadImporterImpl, ProgressFn};
use lead_import::repository::{SqliteDocumentStore, SqliteFieldDefinitionRepository};
use lead_import::{logging, APP_NAME, VERSION};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    let mut args = std::env::args().skip(1);
    let Some(file_path) = args.next().map(PathBuf::from) else {
        eprintln!("用法: lead-import <文件路径> [数据库路径]");
        return ExitCode::from(2);
    };
    let db_path = args.next().unwrap_or_else(get_default_db_path);

    tracing::info!("{} v{}", APP_NAME, VERSION);
    tracing::info!("使用数据库: {}", db_path);

    match run(&file_path, &db_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "导入失败");
            eprintln!("导入失败: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(file_path: &Path, db_path: &str) -> anyhow::Result<()> {
    let conn = Arc::new(Mutex::new(open_sqlite_connection(db_path)?));

    let store = SqliteDocumentStore::from_connection(conn.clone())?;
    let config = ConfigManager::from_connection(conn.clone())?;
    let fields = SqliteFieldDefinitionRepository::from_connection(conn);
    let error_display_cap = config.get_error_display_cap().await?;

    let importer = LeadImporterImpl::with_default_components(store, config, Box::new(fields));

    let progress: &ProgressFn = &|current, total| {
        eprintln!("进度: {}/{}", current, total);
    };
    let result = importer.import_file(file_path, Some(progress)).await?;

    println!("导入完成");
    println!("  处理行数: {}", result.total_processed);
    println!("  成功: {}", result.successful);
    println!("  重复: {}", result.duplicates);
    println!("  失败: {}", result.failed);

    for warning in &result.warnings {
        println!("  警告: {}", warning);
    }
    for message in result.display_errors(error_display_cap) {
        println!("  - {}", message);
    }

    Ok(())
}
