use clap::Parser;
use m3u_merge::core::ConfigProvider;
use m3u_merge::utils::{logger, validation::Validate};
use m3u_merge::{LocalStorage, MergeEngine, MergePipeline, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-merge")]
#[command(about = "Playlist merge driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "m3u-merge.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Dry run - list sources and settings without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting TOML-based playlist merge");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // 載入 TOML 配置
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.severity().exit_code());
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config);
        return Ok(());
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = match MergePipeline::new(storage, config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.severity().exit_code());
        }
    };

    match MergeEngine::new(pipeline).run().await {
        Ok(report) => {
            tracing::info!("✅ Merge completed successfully!");
            println!("✅ Merge completed successfully!");
            println!(
                "📺 {} channels in {} categories ({} dead, {} duplicates skipped)",
                report.written, report.categories, report.dead, report.duplicates
            );
            if let Some(output_path) = &report.output_path {
                println!("📁 Output saved to: {}", output_path);
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Merge failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
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

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Merge: {}", config.merge.name);
    if let Some(description) = &config.merge.description {
        println!("  Description: {}", description);
    }
    println!("  Sources: {}", config.sources().len());
    println!("  Output: {}/{}", config.output_path(), config.output_file());
    println!("  Grouping: {:?}", config.category_mode());
    println!("  Concurrent Probes: {}", config.max_concurrent_probes());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📡 Sources:");
    for (index, source) in config.sources().iter().enumerate() {
        println!("  {}. {} -> {}", index + 1, source.name, source.location);
    }

    println!();
    println!("⚙️ Network:");
    println!("  User-Agent: {}", config.user_agent());
    println!("  Fetch timeout: {}s", config.fetch_timeout().as_secs());
    println!("  Probe timeout: {}s", config.probe_timeout().as_secs());

    println!();
    println!("💾 Output Configuration:");
    println!("  Playlist: {}", config.output_file());
    match config.report_file() {
        Some(report) => println!("  Report: {}", report),
        None => println!("  Report: disabled"),
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
}
