use crate::domain::model::{BatchItem, ExecutionMode, OutputFormat};
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

/// Settings a batch run reads. Implemented by the settings file and by test
/// doubles.
pub trait ConfigProvider: Send + Sync {
    fn search_url(&self) -> String;
    fn reverse_url(&self) -> String;
    fn max_address(&self) -> usize;
    fn level_of_detail(&self) -> u8;
    fn max_results(&self) -> usize;
    fn detailed(&self) -> bool;
    fn show_labels(&self) -> bool;
    fn layer_name(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> Vec<OutputFormat>;
    fn bundle(&self) -> bool;
    fn execution_mode(&self) -> ExecutionMode;
    fn concurrent_requests(&self) -> usize;
}

/// Failure to get a body back from the service, already phrased for the
/// results log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The service answered with a non-success status.
    Status(String),
    /// No answer at all (connect, timeout, TLS, ...).
    Transport(String),
}

#[async_trait]
pub trait ServiceClient: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    /// What `transform` produces and `load` writes.
    type Output: Send + Sync;

    async fn extract(&self) -> Result<Vec<BatchItem>>;
    async fn transform(&self, items: Vec<BatchItem>) -> Result<Self::Output>;
    async fn load(&self, outcome: &Self::Output) -> Result<String>;
}
