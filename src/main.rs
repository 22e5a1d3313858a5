use calculadora_pap::core::Pipeline;
use calculadora_pap::utils::currency::format_currency;
use calculadora_pap::utils::{logger, validation::Validate};
use calculadora_pap::{
    CalculationEngine, CliConfig, LocalStorage, PapError, PapPipeline, RateTable,
};
use clap::Parser;

async fn run(config: CliConfig) -> calculadora_pap::Result<()> {
    let rates = match &config.rates {
        Some(path) => RateTable::from_file(path)?,
        None => RateTable::builtin()?,
    };
    let input = config.calculation_input()?;
    let consult_only = config.consult_only;

    // Storage and pipeline
    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = PapPipeline::new(storage, config, rates, input)?;

    if consult_only {
        let raw = pipeline.extract().await?;
        let context = pipeline.context_from(&raw)?;
        println!(
            "✅ {} - {} | População {} | {} | Qualidade {} | Vínculo {}",
            context.municipio,
            context.uf,
            context.population,
            context.stratum,
            context.quality_label,
            context.bond_label
        );
        return Ok(());
    }

    let engine = CalculationEngine::new(pipeline);
    let (outcome, output_path) = engine.run_with_outcome().await?;

    for line in outcome.summary_lines() {
        println!("{}", line);
    }
    println!();
    println!("✅ Total mensal: {}", format_currency(outcome.result.total));
    println!("📁 Resultados salvos em: {}", output_path);

    Ok(())
}

fn exit_with(e: PapError) -> ! {
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

    std::process::exit(e.severity().exit_code())
}

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    // Logging
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting calculadora-pap");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // Configuration
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        exit_with(e);
    }
}
