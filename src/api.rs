//! HTTP plumbing for the gateway's local API.
//!
//! The gateway serves HTTPS with a self-signed certificate and tracks the
//! session through an auth cookie, so the agent is built with a permissive
//! TLS connector and a cookie store. This layer knows nothing about
//! response shapes; it hands back decoded `serde_json::Value`s and
//! classifies failures into the error taxonomy (connection problems,
//! access denied, device-reported errors).

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub force_sm_off: bool,
}

pub struct Api {
    base: Url,
    agent: ureq::Agent,
}

impl Api {
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        let base = normalize_endpoint(endpoint)?;
        // The gateway's certificate is self-signed and issued for neither
        // the IP nor any resolvable name.
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| Error::Api(format!("could not set up TLS: {e}")))?;
        let agent = ureq::AgentBuilder::new()
            .tls_connector(Arc::new(tls))
            .timeout(timeout)
            .build();
        Ok(Api { base, agent })
    }

    /// The normalized base URL, always ending in `/api/`.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::Api(format!("invalid path '{path}': {e}")))
    }

    pub fn get(&self, path: &str) -> Result<Value> {
        let url = self.url(path)?;
        let response = self.agent.request_url("GET", &url).call();
        process_response(path, response)
    }

    pub fn post<T: Serialize>(&self, path: &str, payload: &T) -> Result<Value> {
        let url = self.url(path)?;
        let response = self.agent.request_url("POST", &url).send_json(payload);
        process_response(path, response)
    }

    // Endpoints are mapped one method per path so callers never deal in
    // path strings.

    pub fn login(&self, request: &LoginRequest) -> Result<Value> {
        self.post("login/Basic", request)
    }

    pub fn logout(&self) -> Result<Value> {
        self.get("logout")
    }

    pub fn get_status(&self) -> Result<Value> {
        self.get("status")
    }

    pub fn get_system_status(&self) -> Result<Value> {
        self.get("system_status")
    }

    pub fn get_system_status_soe(&self) -> Result<Value> {
        self.get("system_status/soe")
    }

    pub fn get_system_status_grid_status(&self) -> Result<Value> {
        self.get("system_status/grid_status")
    }

    pub fn get_meters_aggregates(&self) -> Result<Value> {
        self.get("meters/aggregates")
    }

    pub fn get_meters_site(&self) -> Result<Value> {
        self.get("meters/site")
    }

    pub fn get_meters_solar(&self) -> Result<Value> {
        self.get("meters/solar")
    }

    pub fn get_sitemaster(&self) -> Result<Value> {
        self.get("sitemaster")
    }

    pub fn get_sitemaster_run(&self) -> Result<Value> {
        self.get("sitemaster/run")
    }

    pub fn get_sitemaster_stop(&self) -> Result<Value> {
        self.get("sitemaster/stop")
    }

    pub fn get_site_info(&self) -> Result<Value> {
        self.get("site_info")
    }

    pub fn post_site_info_site_name(&self, payload: &Value) -> Result<Value> {
        self.post("site_info/site_name", payload)
    }

    pub fn get_config(&self) -> Result<Value> {
        self.get("config")
    }

    pub fn get_operation(&self) -> Result<Value> {
        self.get("operation")
    }

    pub fn get_powerwalls(&self) -> Result<Value> {
        self.get("powerwalls")
    }

    pub fn get_solars(&self) -> Result<Value> {
        self.get("solars")
    }

    pub fn post_islanding_mode(&self, payload: &Value) -> Result<Value> {
        self.post("v2/islanding/mode", payload)
    }
}

fn process_response(
    path: &str,
    response: std::result::Result<ureq::Response, ureq::Error>,
) -> Result<Value> {
    let response = match response {
        Ok(response) => response,
        Err(ureq::Error::Status(status @ (401 | 403), response)) => {
            return Err(access_denied(path, status, response));
        }
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            return Err(Error::Api(format!(
                "'{path}' returned status code {status} with body: {body}"
            )));
        }
        Err(ureq::Error::Transport(transport)) => {
            return Err(Error::Unreachable(transport.to_string()));
        }
    };

    let body = response
        .into_string()
        .map_err(|e| Error::Api(format!("could not read response body for '{path}': {e}")))?;
    if body.is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    let json: Value = serde_json::from_str(&body)
        .map_err(|e| Error::Api(format!("error while decoding response for '{path}': {e}")))?;

    // Older firmware wraps application errors into an `error` field on an
    // otherwise 2xx response.
    if let Some(error) = json.get("error").and_then(Value::as_str) {
        return Err(Error::Api(error.to_string()));
    }

    Ok(json)
}

fn access_denied(path: &str, status: u16, response: ureq::Response) -> Error {
    log::warn!("access denied ({status}) for '{path}'");
    let body = response.into_string().unwrap_or_default();
    let json: Option<Value> = serde_json::from_str(&body).ok();
    let field = |name: &str| {
        json.as_ref()
            .and_then(|j| j.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    Error::AccessDenied {
        resource: path.to_string(),
        error: field("error"),
        message: field("message"),
    }
}

/// Normalizes a user-supplied endpoint into the gateway's API base URL:
/// the scheme defaults to `https`, and the path is suffixed with `/api/`
/// unless it already points there.
fn normalize_endpoint(endpoint: &str) -> Result<Url> {
    let with_scheme = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    };
    let mut url = Url::parse(&with_scheme)
        .map_err(|e| Error::Api(format!("invalid endpoint '{endpoint}': {e}")))?;

    let path = url.path().trim_end_matches('/').to_string();
    if path.ends_with("/api") {
        url.set_path(&format!("{path}/"));
    } else {
        url.set_path(&format!("{path}/api/"));
    }
    Ok(url)
}
