use crate::domain::ports::Storage;
use crate::utils::error::{PapError, Result};
use serde::Serialize;

pub const CACHE_FILE: &str = "data.json";

/// Pretty JSON with four-space indentation.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    Ok(buffer)
}

/// Last API response, kept in `data.json` so a run can be repeated offline.
pub struct ReportCache<'a, S: Storage> {
    storage: &'a S,
}

impl<'a, S: Storage> ReportCache<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// Overwrites the cache with `value`.
    pub async fn save(&self, value: &serde_json::Value) -> Result<()> {
        let data = to_pretty_json(value)?;
        self.storage.write_file(CACHE_FILE, &data).await?;
        tracing::debug!("Response cached in {} ({} bytes)", CACHE_FILE, data.len());
        Ok(())
    }

    pub async fn load(&self) -> Result<serde_json::Value> {
        let data = self.storage.read_file(CACHE_FILE).await.map_err(|e| match e {
            PapError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                PapError::ConfigError {
                    message: format!(
                        "{} não encontrado: consulte a API antes de usar o modo offline",
                        CACHE_FILE
                    ),
                }
            }
            other => other,
        })?;

        tracing::debug!("Loaded cached response from {}", CACHE_FILE);
        Ok(serde_json::from_slice(&data)?)
    }
}
