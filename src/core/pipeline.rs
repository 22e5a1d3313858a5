use crate::adapters::http::FinanciamentoClient;
use crate::core::cache::{to_pretty_json, ReportCache};
use crate::core::calculator::PapCalculator;
use crate::core::projection::project_resources;
use crate::core::scenarios::{analyze, ScenarioProjector};
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::labels::QualityLabel;
use crate::domain::model::{CalculationResult, MunicipalityContext, ServiceSelection};
use crate::domain::outcome::{AdditionalParameters, CalculationOutcome, ScenarioComparison};
use crate::domain::rates::RateTable;
use crate::domain::report::PaymentReport;
use crate::utils::error::{PapError, Result};
use crate::utils::validation::{
    business_rule_warnings, validate_additional, validate_context, validate_selection,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const COMPONENTS_FILE: &str = "componentes.csv";
pub const SCENARIOS_FILE: &str = "cenarios.csv";
pub const RESULT_FILE: &str = "resultado.json";
pub const BUNDLE_FILE: &str = "calculadora_pap.zip";

/// What the user asks to calculate, on top of what the payment report says.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationInput {
    pub selection: ServiceSelection,
    #[serde(default)]
    pub quality_label: Option<QualityLabel>,
    #[serde(default)]
    pub bond_label: Option<QualityLabel>,
    #[serde(default)]
    pub emulti_quality_label: Option<QualityLabel>,
    #[serde(default)]
    pub population: Option<u64>,
    #[serde(default)]
    pub additional: Option<AdditionalParameters>,
}

impl CalculationInput {
    pub fn new(selection: ServiceSelection) -> Self {
        Self {
            selection,
            ..Default::default()
        }
    }

    /// Report context with the user's label and population overrides applied.
    pub fn apply(&self, context: MunicipalityContext) -> MunicipalityContext {
        MunicipalityContext {
            population: self.population.unwrap_or(context.population),
            quality_label: self.quality_label.unwrap_or(context.quality_label),
            bond_label: self.bond_label.unwrap_or(context.bond_label),
            emulti_quality_label: self.emulti_quality_label.or(context.emulti_quality_label),
            ..context
        }
    }
}

fn currency_cell(value: rust_decimal::Decimal) -> String {
    format!("{:.2}", value)
}

fn csv_bytes(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| PapError::IoError(std::io::Error::other(e.to_string())))
}

pub fn components_csv(result: &CalculationResult) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "componente",
        "servico",
        "classificacao",
        "valor_unitario",
        "quantidade",
        "total",
    ])?;

    for breakdown in result.components() {
        for row in &breakdown.rows {
            writer.write_record(&[
                breakdown.component.key().to_string(),
                row.service.clone(),
                row.label.map(|l| l.as_str().to_string()).unwrap_or_default(),
                currency_cell(row.unit_value),
                row.quantity.to_string(),
                currency_cell(row.total),
            ])?;
        }
    }
    writer.write_record(&[
        "total".to_string(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        currency_cell(result.total),
    ])?;

    csv_bytes(writer)
}

pub fn scenarios_csv(comparison: &ScenarioComparison) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "classificacao",
        "vinculo",
        "qualidade",
        "total_cenario",
        "diferenca_mensal",
        "diferenca_anual",
        "variacao_percentual",
    ])?;

    for row in &comparison.rows {
        writer.write_record(&[
            row.label.as_str().to_string(),
            currency_cell(row.bond),
            currency_cell(row.quality),
            currency_cell(row.scenario_total),
            currency_cell(row.monthly_difference),
            currency_cell(row.annual_difference),
            currency_cell(row.variation_percent),
        ])?;
    }

    csv_bytes(writer)
}

pub struct PapPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: FinanciamentoClient,
    rates: RateTable,
    input: CalculationInput,
}

impl<S: Storage, C: ConfigProvider> PapPipeline<S, C> {
    pub fn new(storage: S, config: C, rates: RateTable, input: CalculationInput) -> Result<Self> {
        let client =
            FinanciamentoClient::with_timeout(config.api_endpoint(), config.request_timeout_seconds())?;

        Ok(Self {
            storage,
            config,
            client,
            rates,
            input,
        })
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    pub fn input(&self) -> &CalculationInput {
        &self.input
    }

    /// Context of the cached or freshly fetched report, before user overrides.
    pub fn context_from(&self, raw: &serde_json::Value) -> Result<MunicipalityContext> {
        let report = PaymentReport::from_value(raw)?;
        MunicipalityContext::from_report(&report, &self.config.request())
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for PapPipeline<S, C> {
    async fn extract(&self) -> Result<serde_json::Value> {
        let cache = ReportCache::new(&self.storage);

        if self.config.use_cache() {
            tracing::info!("📂 Usando dados em cache ({})", crate::core::cache::CACHE_FILE);
            return cache.load().await;
        }

        let request = self.config.request();
        let raw = self.client.fetch(&request).await?;
        cache.save(&raw).await?;

        Ok(raw)
    }

    async fn transform(&self, raw: serde_json::Value) -> Result<CalculationOutcome> {
        let report = PaymentReport::from_value(&raw)?;
        if report.is_empty() {
            return Err(PapError::ProcessingError {
                message: "Nenhum dado encontrado para os parâmetros informados".to_string(),
            });
        }

        let request = self.config.request();
        let context = self
            .input
            .apply(MunicipalityContext::from_report(&report, &request)?);

        validate_context(&context)?;
        validate_selection(&self.rates, &self.input.selection)?;
        if let Some(additional) = &self.input.additional {
            validate_additional(additional)?;
        }

        tracing::debug!(
            "Context: {} - {} | população {} | {} | qualidade {} | vínculo {}",
            context.municipio,
            context.uf,
            context.population,
            context.stratum,
            context.quality_label,
            context.bond_label
        );

        let mut warnings = business_rule_warnings(&self.input.selection, &context);
        if self.config.use_cache() {
            for message in report.request_mismatches(&request) {
                tracing::warn!("⚠️ {}", message);
                warnings.push(message);
            }
        }

        let calculator = PapCalculator::new(&self.rates);
        let result = calculator.calculate(&self.input.selection, &context);
        warnings.extend(result.warnings.iter().cloned());

        let scenarios =
            ScenarioProjector::new(&calculator).project(&self.input.selection, &context, &result);
        let analysis = analyze(&scenarios);
        let projection = self
            .input
            .additional
            .as_ref()
            .map(|additional| project_resources(additional, &scenarios));

        Ok(CalculationOutcome {
            context,
            result,
            scenarios,
            analysis,
            projection,
            reported: report.reported_values(),
            warnings,
        })
    }

    async fn load(&self, outcome: CalculationOutcome) -> Result<String> {
        let mut files: Vec<(&str, Vec<u8>)> = Vec::new();

        for format in self.config.output_formats() {
            match format.as_str() {
                "csv" => {
                    files.push((COMPONENTS_FILE, components_csv(&outcome.result)?));
                    files.push((SCENARIOS_FILE, scenarios_csv(&outcome.scenarios)?));
                }
                "json" => files.push((RESULT_FILE, to_pretty_json(&outcome)?)),
                other => {
                    return Err(PapError::InvalidConfigValueError {
                        field: "formats".to_string(),
                        value: other.to_string(),
                        reason: "Formatos aceitos: csv, json".to_string(),
                    })
                }
            }
        }

        for (name, data) in &files {
            tracing::debug!("Writing {} ({} bytes)", name, data.len());
            self.storage.write_file(name, data).await?;
        }

        if !self.config.bundle_output() {
            return Ok(self.config.output_path().to_string());
        }

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
            for (name, data) in &files {
                zip.start_file::<_, ()>(*name, FileOptions::default())?;
                zip.write_all(data)?;
            }
            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage.write_file(BUNDLE_FILE, &zip_data).await?;

        Ok(format!("{}/{}", self.config.output_path(), BUNDLE_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ServiceQuantities;
    use crate::domain::report::ConsultRequest;
    use httpmock::prelude::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                PapError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        api_endpoint: String,
        output_path: String,
        use_cache: bool,
        output_formats: Vec<String>,
        bundle_output: bool,
    }

    impl MockConfig {
        fn new(api_endpoint: String) -> Self {
            Self {
                api_endpoint,
                output_path: "test_output".to_string(),
                use_cache: false,
                output_formats: vec!["csv".to_string(), "json".to_string()],
                bundle_output: false,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn api_endpoint(&self) -> &str {
            &self.api_endpoint
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn request(&self) -> ConsultRequest {
            ConsultRequest::new("2927408", "202501")
        }

        fn use_cache(&self) -> bool {
            self.use_cache
        }

        fn output_formats(&self) -> &[String] {
            &self.output_formats
        }

        fn bundle_output(&self) -> bool {
            self.bundle_output
        }
    }

    fn report_body() -> serde_json::Value {
        serde_json::json!({
            "resumosPlanosOrcamentarios": [
                {"sgUf": "BA", "noMunicipio": "SALVADOR", "vlEfetivoRepasse": 150000.0}
            ],
            "pagamentos": [{
                "sgUf": "BA",
                "noMunicipio": "SALVADOR",
                "qtPopulacao": 10000,
                "dsFaixaIndiceEquidadeEsfEap": "ESTRATO 2",
                "dsClassificacaoQualidadeEsfEap": "Bom",
                "dsClassificacaoVinculoEsfEap": "Bom"
            }]
        })
    }

    fn single_esf() -> CalculationInput {
        CalculationInput::new(ServiceSelection::new(
            ServiceQuantities::new().with("eSF", 1),
        ))
    }

    fn pipeline(config: MockConfig, storage: MockStorage) -> PapPipeline<MockStorage, MockConfig> {
        PapPipeline::new(storage, config, RateTable::builtin().unwrap(), single_esf()).unwrap()
    }

    #[tokio::test]
    async fn test_extract_fetches_and_caches_response() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/")
                .query_param("coUf", "29")
                .query_param("coMunicipio", "292740");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(report_body());
        });

        let storage = MockStorage::new();
        let pipeline = pipeline(MockConfig::new(server.url("/")), storage.clone());

        let raw = pipeline.extract().await.unwrap();

        api_mock.assert();
        assert_eq!(raw, report_body());
        let cached = storage.get_file("data.json").await.unwrap();
        assert_eq!(serde_json::from_slice::<serde_json::Value>(&cached).unwrap(), report_body());
    }

    #[tokio::test]
    async fn test_extract_offline_reads_cache_without_api_call() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET);
            then.status(500);
        });

        let storage = MockStorage::new();
        storage
            .write_file("data.json", &to_pretty_json(&report_body()).unwrap())
            .await
            .unwrap();
        let mut config = MockConfig::new(server.url("/"));
        config.use_cache = true;

        let raw = pipeline(config, storage).extract().await.unwrap();

        api_mock.assert_hits(0);
        assert_eq!(raw["pagamentos"][0]["noMunicipio"], "SALVADOR");
    }

    #[tokio::test]
    async fn test_extract_api_failure_is_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(500);
        });

        let storage = MockStorage::new();
        let result = pipeline(MockConfig::new(server.url("/")), storage.clone())
            .extract()
            .await;

        assert!(result.is_err());
        assert!(storage.get_file("data.json").await.is_none());
    }

    #[tokio::test]
    async fn test_transform_reference_values() {
        let pipeline = pipeline(MockConfig::new("http://test.com".to_string()), MockStorage::new());

        let outcome = pipeline.transform(report_body()).await.unwrap();

        assert_eq!(outcome.context.municipio, "SALVADOR");
        assert_eq!(outcome.result.fixed.subtotal, dec!(16000));
        assert_eq!(outcome.result.quality.subtotal, dec!(6000));
        assert_eq!(outcome.result.per_capita.subtotal, dec!(4958.33));
        assert_eq!(outcome.scenarios.rows.len(), 4);
        assert_eq!(outcome.reported.effective_transfer_total, dec!(150000));
        assert!(outcome.projection.is_none());
        // 10000 people for one eSF
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_transform_applies_user_overrides() {
        let mut input = single_esf();
        input.quality_label = Some(QualityLabel::Otimo);
        input.population = Some(2400);
        input.additional = Some(AdditionalParameters {
            esf_eap: dec!(40000),
            ..Default::default()
        });

        let pipeline = PapPipeline::new(
            MockStorage::new(),
            MockConfig::new("http://test.com".to_string()),
            RateTable::builtin().unwrap(),
            input,
        )
        .unwrap();

        let outcome = pipeline.transform(report_body()).await.unwrap();

        assert_eq!(outcome.context.quality_label, QualityLabel::Otimo);
        assert_eq!(outcome.context.bond_label, QualityLabel::Bom);
        assert_eq!(outcome.result.quality.subtotal, dec!(8000));
        assert_eq!(outcome.result.per_capita.subtotal, dec!(1190));
        assert!(outcome.warnings.is_empty());
        assert!(outcome.projection.is_some());
    }

    #[tokio::test]
    async fn test_transform_offline_flags_cache_of_another_request() {
        let mut body = report_body();
        body["pagamentos"][0]["coMunicipio"] = serde_json::json!("310620");
        body["pagamentos"][0]["nuParcela"] = serde_json::json!(202412);

        let mut config = MockConfig::new("http://test.com".to_string());
        config.use_cache = true;
        let pipeline = pipeline(config, MockStorage::new());

        let outcome = pipeline.transform(body.clone()).await.unwrap();
        assert!(outcome.warnings.iter().any(|w| w.contains("município 310620")));
        assert!(outcome.warnings.iter().any(|w| w.contains("competência 202412")));

        // fresh responses answer the request itself
        let online = self::pipeline(MockConfig::new("http://test.com".to_string()), MockStorage::new());
        let outcome = online.transform(body).await.unwrap();
        assert!(!outcome.warnings.iter().any(|w| w.contains("cache")));
    }

    #[tokio::test]
    async fn test_transform_rejects_empty_report() {
        let pipeline = pipeline(MockConfig::new("http://test.com".to_string()), MockStorage::new());

        let result = pipeline.transform(serde_json::json!({})).await;

        assert!(matches!(result, Err(PapError::ProcessingError { .. })));
    }

    #[tokio::test]
    async fn test_load_writes_selected_formats() {
        let storage = MockStorage::new();
        let pipeline = pipeline(MockConfig::new("http://test.com".to_string()), storage.clone());

        let outcome = pipeline.transform(report_body()).await.unwrap();
        let output = pipeline.load(outcome).await.unwrap();

        assert_eq!(output, "test_output");
        let components = String::from_utf8(storage.get_file(COMPONENTS_FILE).await.unwrap()).unwrap();
        assert!(components.starts_with("componente,servico,classificacao"));
        assert!(components.contains("fixed,eSF,,16000.00,1,16000.00"));
        assert!(components.trim_end().ends_with("total,,,,,32958.33"));

        let scenarios = String::from_utf8(storage.get_file(SCENARIOS_FILE).await.unwrap()).unwrap();
        assert_eq!(scenarios.lines().count(), 5);

        let json: serde_json::Value =
            serde_json::from_slice(&storage.get_file(RESULT_FILE).await.unwrap()).unwrap();
        assert_eq!(json["context"]["municipio"], "SALVADOR");
        assert!(storage.get_file(BUNDLE_FILE).await.is_none());
    }

    #[tokio::test]
    async fn test_load_bundles_zip() {
        let storage = MockStorage::new();
        let mut config = MockConfig::new("http://test.com".to_string());
        config.output_formats = vec!["json".to_string()];
        config.bundle_output = true;
        let pipeline = pipeline(config, storage.clone());

        let outcome = pipeline.transform(report_body()).await.unwrap();
        let output = pipeline.load(outcome).await.unwrap();

        assert_eq!(output, "test_output/calculadora_pap.zip");
        let zip_data = storage.get_file(BUNDLE_FILE).await.unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
        assert_eq!(archive.len(), 1);
        assert!(archive.file_names().any(|name| name == RESULT_FILE));
        assert!(storage.get_file(COMPONENTS_FILE).await.is_none());
    }
}
