use crate::domain::report::ConsultRequest;
use crate::utils::error::Result;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str =
    "https://relatorioaps-prd.saude.gov.br/financiamento/pagamento";

/// Client for the ministry's payment report endpoint. One GET per query, no retry.
#[derive(Debug, Clone)]
pub struct FinanciamentoClient {
    client: Client,
    endpoint: String,
}

impl FinanciamentoClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout_seconds: Option<u64>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(seconds) = timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn fetch(&self, request: &ConsultRequest) -> Result<serde_json::Value> {
        request.validate()?;

        tracing::debug!(
            "Making API request to: {} (coUf={}, coMunicipio={}, parcela={})",
            self.endpoint,
            request.co_uf(),
            request.co_municipio(),
            request.competencia
        );

        let response = self
            .client
            .get(&self.endpoint)
            .query(&request.query_params())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        tracing::debug!("API response status: {}", response.status());

        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }
}
