use crate::error::TransportError;
use reqwest::multipart::{Form, Part};

/// One binary part of a multipart submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePart {
    pub field: &'static str,
    pub file_name: String,
    pub contents: Vec<u8>,
}

/// A fully built submission, independent of how it is sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessRequest {
    /// Path under the API base, e.g. `process_latest`.
    pub endpoint: &'static str,
    pub parts: Vec<FilePart>,
}

impl ProcessRequest {
    pub fn url(&self, api_base: &str) -> String {
        format!("{}/{}", api_base.trim_end_matches('/'), self.endpoint)
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.parts.iter().map(|p| p.field).collect()
    }
}

/// What came back from the processing service.
///
/// The body is only read for success statuses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RemoteResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a [`ProcessRequest`] and yields the response.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: ProcessRequest) -> Result<RemoteResponse, TransportError>;
}

/// HTTP transport backed by `reqwest`, usable natively and in the browser.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_base: Option<String>,
}

impl HttpTransport {
    pub fn new(api_base: Option<String>) -> Self {
        HttpTransport {
            client: reqwest::Client::new(),
            api_base,
        }
    }

    pub fn with_client(client: reqwest::Client, api_base: Option<String>) -> Self {
        HttpTransport { client, api_base }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ProcessRequest) -> Result<RemoteResponse, TransportError> {
        let api_base = self
            .api_base
            .as_deref()
            .filter(|base| !base.trim().is_empty())
            .ok_or(TransportError::MissingApiBase)?;
        let url = request.url(api_base);

        let mut form = Form::new();
        for part in request.parts {
            form = form.part(
                part.field,
                Part::bytes(part.contents).file_name(part.file_name),
            );
        }

        log::debug!("POST {}", url);
        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Ok(RemoteResponse {
                status,
                body: Vec::new(),
            });
        }

        let body = response.bytes().await?;
        Ok(RemoteResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_endpoint() {
        let request = ProcessRequest {
            endpoint: "process_latest",
            parts: Vec::new(),
        };
        assert_eq!(
            request.url("https://api.example.test/"),
            "https://api.example.test/process_latest"
        );
        assert_eq!(
            request.url("http://localhost:8000"),
            "http://localhost:8000/process_latest"
        );
    }

    #[test]
    fn success_range() {
        let ok = RemoteResponse {
            status: 204,
            body: Vec::new(),
        };
        let redirect = RemoteResponse {
            status: 302,
            body: Vec::new(),
        };
        assert!(ok.is_success());
        assert!(!redirect.is_success());
    }

    #[tokio::test]
    async fn missing_api_base_is_a_transport_failure() {
        let transport = HttpTransport::new(None);
        let request = ProcessRequest {
            endpoint: "process_backlog",
            parts: Vec::new(),
        };
        let err = transport.send(request).await.unwrap_err();
        assert!(matches!(err, TransportError::MissingApiBase));
    }
}
