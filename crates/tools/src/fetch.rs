//! Fetch tool — GET a URL and return the body as text.

use async_trait::async_trait;
use gloop_core::{Tool, ToolArg, ToolArgs, ToolError};
use tracing::debug;

/// Response bodies are clipped so one page cannot flood the context.
const BODY_CAP: usize = 100_000;

pub struct FetchTool {
    client: reqwest::Client,
}

impl FetchTool {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for FetchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FetchTool {
    fn name(&self) -> &str {
        "Fetch"
    }

    fn description(&self) -> &str {
        "Fetch a URL with HTTP GET and return the response body as text."
    }

    fn arguments(&self) -> Vec<ToolArg> {
        vec![ToolArg::new("url", "The URL to fetch (http or https)")]
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let url = args
            .get("url")
            .map(String::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' argument".into()))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ToolError::InvalidArguments(
                "URL must start with http:// or https://".into(),
            ));
        }

        debug!(url = %url, "fetching");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "Fetch".into(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "Fetch".into(),
                reason: e.to_string(),
            })?;

        let clipped = if body.chars().count() > BODY_CAP {
            let head: String = body.chars().take(BODY_CAP).collect();
            format!("{head}\n[response truncated at {BODY_CAP} characters]")
        } else {
            body
        };

        Ok(format!("[status: {status}]\n{clipped}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_http_urls() {
        let mut args = ToolArgs::new();
        args.insert("url".into(), "ftp://example.com".into());
        let err = FetchTool::new().execute(&args).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn missing_url_is_invalid() {
        let err = FetchTool::new().execute(&ToolArgs::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
