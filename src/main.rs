use clap::Parser;
use m3u_merge::core::ConfigProvider;
use m3u_merge::utils::{logger, validation::Validate};
use m3u_merge::{CliConfig, LocalStorage, MergeEngine, MergePipeline};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting m3u-merge CLI");

    if let Err(e) = config.resolve_sources() {
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.severity().exit_code());
    }

    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());
        std::process::exit(e.severity().exit_code());
    }

    // 創建存儲和管道
    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = match MergePipeline::new(storage, config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.severity().exit_code());
        }
    };

    let engine = MergeEngine::new(pipeline);

    match engine.run().await {
        Ok(report) => {
            let output_path = report.output_path.as_deref().unwrap_or_default();
            tracing::info!("✅ Merge completed successfully!");
            println!("✅ Merge completed successfully!");
            println!(
                "📺 {} channels in {} categories ({} dead, {} duplicates skipped)",
                report.written, report.categories, report.dead, report.duplicates
            );
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Merge failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = e.severity().exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
