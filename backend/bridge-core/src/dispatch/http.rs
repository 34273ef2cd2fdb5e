//! HTTP backend for the workload API.
//!
//! Maps a registry descriptor plus a `{ path, query, body }` input onto one
//! HTTP request. Non-2xx answers become [`OperationError::Status`] with the
//! response body preserved; a request that never got an answer becomes
//! [`OperationError::Network`].

use crate::dispatch::backend::Backend;
use crate::error::backend::BackendError;
use crate::error::operation::OperationError;
use crate::registry::OperationDescriptor;

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;
use std::sync::OnceLock;
use std::time::Duration;

use log::{debug, trace};
use regex::Regex;
use reqwest::{Client, Method};
use serde_json::{Map, Value};
use url::Url;

const PATH_PARAM_PATTERN: &str = r"^\{(?P<param>[A-Za-z0-9_]+)\}$";
const PATH_PARAM_CAPTURE: &str = "param";

const INPUT_PATH_KEY: &str = "path";
const INPUT_QUERY_KEY: &str = "query";
const INPUT_BODY_KEY: &str = "body";

static PATH_PARAM_REGEX: OnceLock<Regex> = OnceLock::new();

pub(crate) fn get_path_param_regex() -> &'static Regex {
    PATH_PARAM_REGEX.get_or_init(|| Regex::new(PATH_PARAM_PATTERN).expect("valid regex pattern"))
}

#[derive(Clone)]
pub struct HttpBackend {
    base_url: Url,
    client: Client,
}

impl HttpBackend {
    /// # Errors
    ///
    /// - [`BackendError::UrlParse`] if `base_url` is not an absolute http(s) URL
    /// - [`BackendError::Http`] if the HTTP client cannot be built
    #[track_caller]
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url)?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(BackendError::UrlParse {
                message: format!("Unsupported backend URL: {base_url}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve the request URL for `descriptor` from the input's `path` and
    /// `query` sections.
    pub(crate) fn build_url(
        &self,
        descriptor: &OperationDescriptor,
        input: &Value,
    ) -> Result<Url, OperationError> {
        let path_params = section(input, INPUT_PATH_KEY);
        let regex = get_path_param_regex();

        let mut segments = Vec::new();
        for segment in descriptor.path.split('/').filter(|s| !s.is_empty()) {
            match regex
                .captures(segment)
                .and_then(|caps| caps.name(PATH_PARAM_CAPTURE))
            {
                Some(param) => {
                    let value = path_params
                        .and_then(|params| params.get(param.as_str()))
                        .and_then(scalar_to_string)
                        .ok_or_else(|| OperationError::Validation {
                            message: format!(
                                "{}: missing path parameter '{}'",
                                descriptor.name,
                                param.as_str()
                            ),
                        })?;
                    segments.push(value);
                }
                None => segments.push(segment.to_string()),
            }
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| OperationError::Internal {
                message: format!("Backend URL cannot carry a path: {}", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments.iter().map(String::as_str));

        let pairs = query_pairs(section(input, INPUT_QUERY_KEY));
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        Ok(url)
    }
}

impl Backend for HttpBackend {
    async fn execute(
        &self,
        descriptor: &OperationDescriptor,
        input: Value,
    ) -> Result<Value, OperationError> {
        let url = self.build_url(descriptor, &input)?;
        let method = to_reqwest_method(descriptor);

        debug!("{} {} ({})", descriptor.method, url, descriptor.name);

        let mut request = self.client.request(method, url);
        if descriptor.method.has_body() {
            if let Some(body) = input.get(INPUT_BODY_KEY).filter(|body| !is_empty(body)) {
                request = request.json(body);
            }
        }

        let response = request.send().await.map_err(|e| OperationError::Network {
            message: e.to_string(),
        })?;

        let status = HttpStatusCode(response.status().as_u16());
        let text = response.text().await.map_err(|e| OperationError::Network {
            message: e.to_string(),
        })?;
        trace!("{} answered {status}: {text}", descriptor.name);

        let payload = parse_payload(&text);
        if status.is_success() {
            Ok(payload)
        } else {
            Err(OperationError::Status {
                status,
                error: payload,
            })
        }
    }
}

fn section<'a>(input: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    input.get(key).and_then(Value::as_object)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn query_pairs(query: Option<&Map<String, Value>>) -> Vec<(String, String)> {
    let Some(query) = query else {
        return Vec::new();
    };

    let mut pairs = Vec::new();
    for (key, value) in query {
        match value {
            Value::Array(items) => pairs.extend(
                items
                    .iter()
                    .filter_map(scalar_to_string)
                    .map(|item| (key.clone(), item)),
            ),
            other => {
                if let Some(item) = scalar_to_string(other) {
                    pairs.push((key.clone(), item));
                }
            }
        }
    }
    pairs
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Empty body → `null`; JSON when it parses; the raw text otherwise.
fn parse_payload(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn to_reqwest_method(descriptor: &OperationDescriptor) -> Method {
    use crate::registry::HttpMethod;

    match descriptor.method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}
