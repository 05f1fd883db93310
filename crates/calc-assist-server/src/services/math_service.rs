use anyhow::{anyhow, Context, Result};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::config::MathConfig;

/// Body returned for any transport or decoding failure
pub const FAILED_BODY: &str = "ERROR: FAILED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOperation {
    Derive,
    Integrate,
    Simplify,
}

impl MathOperation {
    pub fn path(self) -> &'static str {
        match self {
            Self::Derive => "derive",
            Self::Integrate => "integrate",
            Self::Simplify => "simplify",
        }
    }

    /// Calculator display line for a successful result (uppercased)
    pub fn render(self, expr: &str, result: &str) -> String {
        let line = match self {
            Self::Derive => format!("d/dx({expr}) = {result}"),
            Self::Integrate => format!("integral({expr}) = {result} + C"),
            Self::Simplify => result.to_string(),
        };
        line.to_uppercase()
    }
}

#[derive(Debug, Deserialize)]
struct NewtonResponse {
    result: Option<String>,
    error: Option<String>,
}

/// Proxy to the external symbolic math service.
///
/// Failures are reported in-band as `ERROR: ...` bodies because the
/// calculator client has no structured error handling.
#[derive(Clone)]
pub struct MathService {
    client: Client,
    base_url: String,
}

impl MathService {
    pub fn new(config: MathConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(config.timeout_seconds))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: config.base_url,
        }
    }

    pub async fn evaluate(&self, operation: MathOperation, expr: &str) -> String {
        debug!("{}: {}", operation.path(), expr);

        match self.fetch(operation, expr).await {
            Ok(NewtonResponse { error: Some(message), .. }) => {
                warn!("Math service error for {}: {}", operation.path(), message);
                format!("ERROR: {message}")
            }
            Ok(NewtonResponse { result: Some(result), .. }) => {
                let line = operation.render(expr, &result);
                debug!("result: {}", line);
                line
            }
            Ok(_) => {
                error!("{} returned neither result nor error", operation.path());
                FAILED_BODY.to_string()
            }
            Err(e) => {
                error!("{} error: {:#}", operation.path(), e);
                FAILED_BODY.to_string()
            }
        }
    }

    fn endpoint(&self, operation: MathOperation, expr: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).context("Invalid math service URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Math service URL cannot have a path"))?
            .pop_if_empty()
            .push(operation.path())
            .push(expr);
        Ok(url)
    }

    async fn fetch(&self, operation: MathOperation, expr: &str) -> Result<NewtonResponse> {
        let url = self.endpoint(operation, expr)?;

        self.client
            .get(url)
            .send()
            .await
            .context("Failed to call math service")?
            .json()
            .await
            .context("Failed to parse math service response")
    }
}
