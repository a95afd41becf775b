use std::fmt;

#[derive(Debug, Clone)]
pub struct FetchDiagnosticsError {
    pub endpoint: String,
    /// One of `request`, `timeout`, `http`, `decode`.
    pub stage: &'static str,
    pub detail: String,
}

impl FetchDiagnosticsError {
    pub fn new(endpoint: &str, stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            stage,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FetchDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetch error (endpoint={}, stage={}): {}",
            self.endpoint, self.stage, self.detail
        )
    }
}

impl std::error::Error for FetchDiagnosticsError {}
