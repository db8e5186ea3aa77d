use std::path::Path;

use quiz_core::model::QuestionBank;

use crate::config::BankLocation;
use crate::error::LoadError;

/// Loads the question bank once, from disk or over HTTP.
#[derive(Clone, Default)]
pub struct BankLoader {
    client: reqwest::Client,
}

impl BankLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Load and validate the bank at `location`.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` if the document cannot be fetched or is not a valid bank.
    pub async fn load(&self, location: &BankLocation) -> Result<QuestionBank, LoadError> {
        let result = match location {
            BankLocation::File(path) => load_from_path(path).await,
            BankLocation::Url(url) => self.fetch(url).await,
        };
        match &result {
            Ok(bank) => tracing::info!(%location, questions = bank.len(), "question bank loaded"),
            Err(err) => tracing::error!(%location, error = %err, "failed to load question bank"),
        }
        result
    }

    async fn fetch(&self, url: &str) -> Result<QuestionBank, LoadError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::HttpStatus(status));
        }
        let body = response.text().await?;
        Ok(QuestionBank::from_json(&body)?)
    }
}

/// Read and validate a bank document from disk.
///
/// # Errors
///
/// Returns `LoadError::Io` if the file cannot be read and `LoadError::Invalid` if it is not a valid bank.
pub async fn load_from_path(path: &Path) -> Result<QuestionBank, LoadError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
    Ok(QuestionBank::from_json(&raw)?)
}
