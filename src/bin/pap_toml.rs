use calculadora_pap::core::ConfigProvider;
use calculadora_pap::utils::currency::format_currency;
use calculadora_pap::utils::{logger, validation::Validate};
use calculadora_pap::{CalculationEngine, LocalStorage, PapPipeline, TomlConfig};
use clap::Parser;

#[derive(Parser)]
#[command(name = "pap-toml")]
#[command(about = "Calculadora PAP a partir de um arquivo de execução TOML")]
struct Args {
    /// Path to TOML run file
    #[arg(short, long, default_value = "pap.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override the offline setting from the run file
    #[arg(long)]
    offline: Option<bool>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Dry run - validate and show the run without calling the API
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logging
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting TOML-based calculadora-pap");
    tracing::info!("📁 Loading run file from: {}", args.config);

    // Run file
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load run file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // Command line overrides
    if let Some(offline) = args.offline {
        config.source.offline = offline;
        tracing::info!("🔧 Offline mode overridden to: {}", offline);
    }

    // Configuration
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Run file loaded and validated successfully");

    println!("📋 Configuration Summary:");
    for line in config.summary() {
        println!("  {}", line);
    }
    println!();

    let prepared = config
        .rates()
        .and_then(|rates| config.calculation_input().map(|input| (rates, input)));
    let (rates, input) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Sugestão: {}", e.recovery_suggestion());
            std::process::exit(e.severity().exit_code());
        }
    };

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No request will be made");
        perform_dry_run(&config, &rates);
        return Ok(());
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = PapPipeline::new(storage, config, rates, input)?;
    let engine = CalculationEngine::new(pipeline);

    match engine.run_with_outcome().await {
        Ok((outcome, output_path)) => {
            for line in outcome.summary_lines() {
                println!("{}", line);
            }
            println!();
            println!("✅ Total mensal: {}", format_currency(outcome.result.total));
            println!("📁 Resultados salvos em: {}", output_path);
        }
        Err(e) => {
            // Full error details go to the log
            tracing::error!(
                "❌ Calculation failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Sugestão: {}", e.recovery_suggestion());

            // Exit code follows the error severity
            let exit_code = e.severity().exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn perform_dry_run(config: &TomlConfig, rates: &calculadora_pap::RateTable) {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📡 Data Source:");
    if config.use_cache() {
        println!("  data.json em {}", config.output_path());
    } else {
        let request = config.request();
        println!("  Endpoint: {}", config.api_endpoint());
        for (key, value) in request.query_params() {
            println!("  {} = {}", key, value);
        }
    }

    println!();
    println!("🧮 Serviços:");
    for (service, quantity) in &config.services {
        let known = if rates.is_known(service) { "✅" } else { "❌ desconhecido" };
        println!("  {} {}: {}", known, service, quantity);
    }

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));
    if config.bundle_output() {
        println!("  Compression: calculadora_pap.zip (ZIP)");
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
}
