use clap::Parser;
use std::time::Duration;
use txn_guard::app::{Simulation, SimulationPlan, SimulationReport};
use txn_guard::utils::{logger, validation::Validate};
use txn_guard::{CliConfig, GuardConfig, InMemoryStore};

fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 載入 TOML 配置（未指定則使用預設值）
    let mut config = match &cli.config {
        Some(path) => match GuardConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path, e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(1);
            }
        },
        None => GuardConfig::default(),
    };

    // 初始化日誌
    logger::init_from_config(&config.logging, cli.verbose);
    tracing::info!("Starting txn-guard simulation");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 應用命令列覆蓋設定
    if let Some(mode) = cli.mode {
        config.coordinator.serialization = mode.into();
        tracing::info!("🔧 Serialization mode overridden to: {:?}", config.coordinator.serialization);
    }

    // 驗證配置
    if let Err(e) = cli.validate().and_then(|_| config.validate()) {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let plan = SimulationPlan {
        workers: cli.workers,
        ops_per_worker: cli.ops_per_worker,
        domains: cli.parsed_domains()?,
        deadlock_every: cli.deadlock_every,
        work: Duration::from_millis(2),
    };

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No operations will be executed");
        println!("Mode:            {:?}", config.coordinator.serialization);
        println!("Workers:         {}", plan.workers);
        println!("Ops per worker:  {}", plan.ops_per_worker);
        println!("Domains:         {:?}", plan.domains);
        let (domain_min, domain_max) = config.domain_executor.backoff().bounds();
        println!(
            "Domain backoff:  {:?}-{:?}, deadline {:?}",
            domain_min,
            domain_max,
            config.domain_executor.deadline()
        );
        let (global_min, global_max) = config.global_interceptor.backoff().bounds();
        println!("Global backoff:  {:?}-{:?}", global_min, global_max);
        return Ok(());
    }

    let simulation = Simulation::new(config.build_coordinator(), InMemoryStore::new());
    let report = simulation.run(&plan);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    if report.failed > 0 {
        tracing::warn!("{} operations failed after retry", report.failed);
        // 與 ErrorSeverity::Medium 相同的退出碼
        std::process::exit(2);
    }

    Ok(())
}

fn print_summary(report: &SimulationReport) {
    println!("✅ Simulation finished in {}ms ({:?})", report.elapsed_ms, report.mode);
    println!(
        "   {} operations, {} succeeded, {} failed, {} attempts",
        report.operations, report.succeeded, report.failed, report.attempts
    );
    for (domain, peak) in &report.peak_in_flight {
        println!("   {:<20} peak in flight: {}", domain.to_string(), peak);
    }
    println!("   overall peak in flight: {}", report.peak_in_flight_total);
}
