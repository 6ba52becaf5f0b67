//! Data source resolution.
//!
//! Executes a widget's configured HTTP fetch against the shared
//! `reqwest::Client` and optionally extracts a nested value with a
//! dot-path (`data.items.0.total`).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use std::time::Duration;
use tessera_core::{DataSource, EngineConfig, TesseraError, TesseraResult};
use tracing::debug;

/// Anything that can turn a data source descriptor into JSON.
#[async_trait]
pub trait DataFetcher: Send + Sync {
    async fn fetch(&self, source: &DataSource) -> TesseraResult<Value>;
}

/// Supported request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    /// Parse a configured method. Absent means GET.
    pub fn parse(method: Option<&str>) -> TesseraResult<Self> {
        match method.map(|m| m.trim().to_uppercase()).as_deref() {
            None | Some("") | Some("GET") => Ok(Self::Get),
            Some("POST") => Ok(Self::Post),
            Some("PUT") => Ok(Self::Put),
            Some(other) => Err(TesseraError::configuration(format!(
                "Unsupported HTTP method '{}'. Supported: GET, POST, PUT",
                other
            ))),
        }
    }
}

/// HTTP-backed data source resolver.
#[derive(Clone)]
pub struct DataSourceResolver {
    client: reqwest::Client,
    base_url: String,
}

impl DataSourceResolver {
    /// Create a resolver with its own client.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self::with_client(client, base_url)
    }

    /// Create a resolver sharing an existing client.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.engine.api_base_url, config.request_timeout())
    }

    /// Absolute URL for an endpoint. Relative endpoints join the API base.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        let endpoint = endpoint.trim();
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
        }
    }

    /// Fetch the source and apply its `data_path`.
    pub async fn resolve(&self, source: &DataSource) -> TesseraResult<Value> {
        let endpoint = source
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| TesseraError::configuration("Data source has no endpoint"))?;
        let method = HttpMethod::parse(source.method.as_deref())?;
        let headers = build_headers(source)?;
        let url = self.endpoint_url(endpoint);

        debug!(url = %url, method = ?method, "Resolving data source");

        let request = match method {
            HttpMethod::Get => {
                let query = source.params.as_ref().map(query_pairs).unwrap_or_default();
                self.client.get(&url).query(&query)
            }
            HttpMethod::Post | HttpMethod::Put => {
                let body = request_body(source);
                let builder = if method == HttpMethod::Post {
                    self.client.post(&url)
                } else {
                    self.client.put(&url)
                };
                builder.json(&body)
            }
        };

        let response = request
            .headers(headers)
            .send()
            .await
            .map_err(|e| TesseraError::network(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TesseraError::network(format!(
                "Request to {} returned {}",
                url, status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TesseraError::network(format!("Reading {} failed: {}", url, e)))?;

        let data = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|e| {
                TesseraError::network(format!("Response from {} is not JSON: {}", url, e))
            })?
        };

        Ok(extract_path(data, source.data_path.as_deref()))
    }
}

#[async_trait]
impl DataFetcher for DataSourceResolver {
    async fn fetch(&self, source: &DataSource) -> TesseraResult<Value> {
        self.resolve(source).await
    }
}

/// Walk `path` segment by segment. Any missing or empty segment yields null.
pub fn extract_path(value: Value, path: Option<&str>) -> Value {
    let path = match path.map(str::trim) {
        None | Some("") => return value,
        Some(p) => p,
    };

    let mut current = value;
    for segment in path.split('.') {
        if segment.is_empty() {
            return Value::Null;
        }
        let next = match current {
            Value::Object(mut map) => map.remove(segment),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| items.into_iter().nth(i)),
            _ => None,
        };
        match next {
            Some(v) => current = v,
            None => return Value::Null,
        }
    }
    current
}

/// Query string pairs: strings verbatim, nulls skipped, everything else as
/// JSON text.
fn query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key.clone(), s.clone())),
            other => Some((key.clone(), other.to_string())),
        })
        .collect()
}

fn request_body(source: &DataSource) -> Value {
    match (&source.body, &source.params) {
        (Some(body), _) => body.clone(),
        (None, Some(params)) => Value::Object(params.clone()),
        (None, None) => Value::Null,
    }
}

fn build_headers(source: &DataSource) -> TesseraResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in source.headers.iter().flatten() {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            TesseraError::configuration(format!("Invalid header name '{}'", name))
        })?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            TesseraError::configuration(format!("Invalid value for header '{}'", name))
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_nested_path() {
        let data = json!({"data": {"items": [{"total": 3}, {"total": 9}]}});
        assert_eq!(extract_path(data.clone(), Some("data.items.1.total")), json!(9));
        assert_eq!(extract_path(data.clone(), Some("data.items")).as_array().unwrap().len(), 2);
        assert_eq!(extract_path(data, None)["data"]["items"][0]["total"], json!(3));
    }

    #[test]
    fn test_malformed_paths_yield_null() {
        let data = json!({"a": {"b": 1}, "list": [1, 2]});
        for path in ["a..b", ".", "a.", ".a", "missing", "a.b.c", "list.9", "list.x", "a.b.0"] {
            assert_eq!(extract_path(data.clone(), Some(path)), Value::Null, "path {path}");
        }
    }

    #[test]
    fn test_blank_path_returns_whole_value() {
        let data = json!([1, 2, 3]);
        assert_eq!(extract_path(data.clone(), Some("  ")), data);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!(HttpMethod::parse(None).unwrap(), HttpMethod::Get);
        assert_eq!(HttpMethod::parse(Some("post")).unwrap(), HttpMethod::Post);
        assert_eq!(HttpMethod::parse(Some("PUT")).unwrap(), HttpMethod::Put);
        assert!(matches!(
            HttpMethod::parse(Some("DELETE")),
            Err(TesseraError::Configuration(_))
        ));
    }

    #[test]
    fn test_endpoint_url_joins_base() {
        let resolver = DataSourceResolver::new("http://erp.local/api/", Duration::from_secs(1));
        assert_eq!(resolver.endpoint_url("/tasks"), "http://erp.local/api/tasks");
        assert_eq!(resolver.endpoint_url("tasks"), "http://erp.local/api/tasks");
        assert_eq!(
            resolver.endpoint_url("https://other.example.com/x"),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn test_query_pairs() {
        let params = json!({"status": "open", "limit": 10, "skip": null, "tags": ["a"]});
        let mut pairs = query_pairs(params.as_object().unwrap());
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("limit".to_string(), "10".to_string()),
                ("status".to_string(), "open".to_string()),
                ("tags".to_string(), "[\"a\"]".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_configuration_error() {
        let resolver = DataSourceResolver::new("http://127.0.0.1:9", Duration::from_secs(1));
        let err = resolver.resolve(&DataSource::default()).await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_unsupported_method_is_configuration_error() {
        let resolver = DataSourceResolver::new("http://127.0.0.1:9", Duration::from_secs(1));
        let source = DataSource {
            endpoint: Some("/x".to_string()),
            method: Some("PATCH".to_string()),
            ..Default::default()
        };
        assert!(resolver.resolve(&source).await.unwrap_err().is_configuration());
    }

    #[tokio::test]
    async fn test_invalid_header_is_configuration_error() {
        let resolver = DataSourceResolver::new("http://127.0.0.1:9", Duration::from_secs(1));
        let source = DataSource {
            endpoint: Some("/x".to_string()),
            headers: Some([("bad header".to_string(), "v".to_string())].into()),
            ..Default::default()
        };
        assert!(resolver.resolve(&source).await.unwrap_err().is_configuration());
    }
}
