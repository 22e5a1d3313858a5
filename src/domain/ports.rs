use crate::domain::outcome::CalculationOutcome;
use crate::domain::report::ConsultRequest;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn output_path(&self) -> &str;
    fn request(&self) -> ConsultRequest;
    /// Read `data.json` instead of calling the API.
    fn use_cache(&self) -> bool;
    fn output_formats(&self) -> &[String];
    fn bundle_output(&self) -> bool;
    fn request_timeout_seconds(&self) -> Option<u64> {
        None
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<serde_json::Value>;
    async fn transform(&self, raw: serde_json::Value) -> Result<CalculationOutcome>;
    async fn load(&self, outcome: CalculationOutcome) -> Result<String>;
}
