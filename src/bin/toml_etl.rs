use clap::Parser;
use std::time::Duration;
use tenure_etl::adapters::emitter::OutputFormat;
use tenure_etl::config::toml_config::{SourceKind, TomlConfig};
use tenure_etl::core::{ConfigProvider, SnapshotSource};
use tenure_etl::utils::{logger, validation::Validate};
use tenure_etl::{DirectorySource, EtlEngine, HttpSource, LocalStorage, TenurePipeline};

#[derive(Parser)]
#[command(name = "toml-etl")]
#[command(about = "Tenure ETL driven by a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "tenure-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Dry run - list snapshots and outputs without reconciling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger();
    } else {
        let level = config.monitoring.as_ref().and_then(|m| m.log_level.as_deref());
        logger::init_cli_logger_with_level(args.verbose, level);
    }

    tracing::info!("🚀 Starting TOML-based tenure ETL");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    let storage = LocalStorage::new(config.output_path().to_string());

    let source_kind = config.source.r#type;
    let exit_code = match source_kind {
        SourceKind::Directory => {
            let dir = config.source_dir().unwrap_or(".").to_string();
            let extension = config.source_extension().to_string();
            let source = DirectorySource::new(LocalStorage::new(String::new()), &dir, &extension);
            execute(source, storage, config, args.dry_run, monitor_enabled).await
        }
        SourceKind::Http => {
            let mut source = HttpSource::new(config.snapshot_urls().to_vec());
            if let Some(timeout) = config.source.timeout_seconds {
                source = source.with_timeout(Duration::from_secs(timeout));
            }
            execute(source, storage, config, args.dry_run, monitor_enabled).await
        }
    };

    if exit_code > 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

async fn execute<Src: SnapshotSource>(
    source: Src,
    storage: LocalStorage,
    config: TomlConfig,
    dry_run: bool,
    monitor_enabled: bool,
) -> i32 {
    if dry_run {
        tracing::info!("🔍 DRY RUN MODE - No reconciliation will occur");
        return match perform_dry_run(&source, &config).await {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("❌ {}", e.user_friendly_message());
                e.exit_code()
            }
        };
    }

    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let pipeline = TenurePipeline::new(storage, source, config);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Tenure ETL completed successfully!");
            println!("✅ Tenure ETL completed successfully!");
            println!("📁 Output saved to: {}", output_path);
            0
        }
        Err(e) => {
            tracing::error!(
                "❌ Tenure ETL failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            e.exit_code()
        }
    }
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name,
        config.pipeline.version.as_deref().unwrap_or("0")
    );
    match config.source.r#type {
        SourceKind::Directory => println!(
            "  Source: directory {} (*.{})",
            config.source_dir().unwrap_or("."),
            config.source_extension()
        ),
        SourceKind::Http => println!("  Source: {} snapshot URLs", config.snapshot_urls().len()),
    }
    println!("  Organization: {}", config.organization());
    println!(
        "  Date precision: {}",
        config
            .date_precision()
            .map(|p| p.as_str())
            .unwrap_or("unspecified")
    );
    println!("  Duplicate policy: {:?}", config.duplicate_policy());
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.load.output_formats.join(", "));

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run<Src: SnapshotSource>(
    source: &Src,
    config: &TomlConfig,
) -> tenure_etl::Result<()> {
    println!("🔍 Dry Run Analysis:");
    println!();

    let snapshots = source.snapshots().await?;
    println!("📡 Snapshots ({}):", snapshots.len());
    for snapshot in &snapshots {
        println!("  {}  {}", snapshot.date, snapshot.label);
    }

    println!();
    println!("💾 Output Configuration:");
    match config.archive_filename() {
        Some(archive) => println!("  Archive: {}/{}", config.output_path(), archive),
        None => {
            for name in &config.load.output_formats {
                let format: OutputFormat = name.parse()?;
                println!(
                    "  {}: {}/{}",
                    format,
                    config.output_path(),
                    config.output_filename(format)
                );
            }
        }
    }

    Ok(())
}
