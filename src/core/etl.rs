use crate::core::Pipeline;
use crate::domain::outcome::CalculationOutcome;
use crate::utils::currency::format_currency;
use crate::utils::error::Result;

/// Drives a pipeline through extract, transform and load.
pub struct CalculationEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> CalculationEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        self.run_with_outcome().await.map(|(_, output_path)| output_path)
    }

    /// Like `run`, also handing back the outcome for display.
    pub async fn run_with_outcome(&self) -> Result<(CalculationOutcome, String)> {
        tracing::info!("📥 Consultando dados de financiamento...");
        let raw = self.pipeline.extract().await?;

        tracing::info!("🧮 Calculando componentes...");
        let outcome = self.pipeline.transform(raw).await?;
        tracing::info!(
            "Total mensal para {} - {}: {}",
            outcome.context.municipio,
            outcome.context.uf,
            format_currency(outcome.result.total)
        );
        for warning in &outcome.warnings {
            tracing::debug!("Aviso: {}", warning);
        }

        tracing::info!("💾 Gravando resultados...");
        let output_path = self.pipeline.load(outcome.clone()).await?;
        tracing::info!("Resultados salvos em: {}", output_path);

        Ok((outcome, output_path))
    }
}
