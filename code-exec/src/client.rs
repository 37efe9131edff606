use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::{
    error::Error,
    types::{RuntimeRequest, RuntimeResponse},
};

pub const DEFAULT_RUNTIME_URL: &str = "https://emkc.org/api/v2/piston";

/// Remote service that compiles and runs submitted source
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    async fn execute(&self, request: &RuntimeRequest) -> Result<RuntimeResponse, Error>;
}

/// Client for a Piston-compatible execution API
pub struct PistonClient {
    client: Client,
    api_url: String,
}

impl PistonClient {
    pub fn new(api_url: impl Into<String>) -> Result<Self, Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(Error::HttpClient)?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl RuntimeClient for PistonClient {
    async fn execute(&self, request: &RuntimeRequest) -> Result<RuntimeResponse, Error> {
        debug!(
            language = %request.language,
            version = %request.version,
            "Dispatching to runtime"
        );

        let response = self
            .client
            .post(format!("{}/execute", self.api_url))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Rejections such as an unknown runtime still carry a JSON `message`
        match serde_json::from_str::<RuntimeResponse>(&body) {
            Ok(parsed) if status.is_success() || parsed.message.is_some() => Ok(parsed),
            Ok(_) => Err(Error::Api {
                status_code: status.as_u16(),
                message: body,
            }),
            Err(_) if !status.is_success() => Err(Error::Api {
                status_code: status.as_u16(),
                message: body,
            }),
            Err(e) => Err(Error::Decode(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RuntimeSpec;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn python_request() -> RuntimeRequest {
        RuntimeRequest::single_file(
            &RuntimeSpec {
                runtime: "python".to_string(),
                version: "3.10.0".to_string(),
            },
            "print('hi')",
        )
    }

    #[tokio::test]
    async fn test_successful_execution() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/execute"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(json!({
                "language": "python",
                "version": "3.10.0",
                "files": [{ "content": "print('hi')" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "language": "python",
                "version": "3.10.0",
                "run": { "stdout": "hi\n", "stderr": "", "output": "hi\n", "code": 0, "signal": null }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = PistonClient::new(mock_server.uri()).unwrap();
        let response = client.execute(&python_request()).await.unwrap();

        let run = response.run.unwrap();
        assert_eq!(run.code, Some(0));
        assert_eq!(run.combined_output(), "hi\n");
        assert!(response.message.is_none());
    }

    #[tokio::test]
    async fn test_rejection_with_message_is_returned() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "message": "python-3.10.0 runtime is unknown"
            })))
            .mount(&mock_server)
            .await;

        let client = PistonClient::new(mock_server.uri()).unwrap();
        let response = client.execute(&python_request()).await.unwrap();
        assert_eq!(
            response.message.as_deref(),
            Some("python-3.10.0 runtime is unknown")
        );
    }

    #[tokio::test]
    async fn test_api_error_handling() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&mock_server)
            .await;

        let client = PistonClient::new(mock_server.uri()).unwrap();
        let result = client.execute(&python_request()).await;

        assert!(matches!(
            result,
            Err(Error::Api {
                status_code: 502,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_undecodable_success_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&mock_server)
            .await;

        let client = PistonClient::new(mock_server.uri()).unwrap();
        let result = client.execute(&python_request()).await;
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn test_connection_failure() {
        // Nothing listens on the discard port
        let client = PistonClient::new("http://127.0.0.1:9").unwrap();
        let result = client.execute(&python_request()).await;
        assert!(matches!(result, Err(Error::HttpClient(_))));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = PistonClient::new("http://localhost:2000/api/v2/piston/").unwrap();
        assert_eq!(client.api_url(), "http://localhost:2000/api/v2/piston");
    }
}
