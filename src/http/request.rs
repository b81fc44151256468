use std::fmt::{self, Display};

use reqwest::Url;

use crate::error::{RelayError, RelayResult};
use crate::record::SpiraId;

/// REST service root, relative to the Spira base URL.
const SERVICE_SEGMENTS: [&str; 3] = ["Services", "v5_0", "RestService.svc"];

/// Whether the connection to Spira is encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Plain,
    Encrypted,
}

impl Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Transport::Plain => "http",
            Transport::Encrypted => "https",
        };
        write!(f, "{label}")
    }
}

/// The `test-runs/record` route of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
    transport: Transport,
}

impl Endpoint {
    pub fn for_project(
        service_url: &str,
        project_id: &SpiraId,
        username: &str,
        token: &str,
    ) -> RelayResult<Self> {
        let base = service_url.trim();
        let base = if base.contains("://") {
            base.to_string()
        } else {
            format!("http://{base}")
        };

        let invalid = |reason: String| RelayError::InvalidUrl {
            url: service_url.to_string(),
            reason,
        };

        let project = project_id.to_string();
        let mut url = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(invalid("URL has no host".to_string()));
        }

        let transport = match url.scheme() {
            "https" => Transport::Encrypted,
            "http" => Transport::Plain,
            other => return Err(invalid(format!("unsupported scheme `{other}`"))),
        };

        url.path_segments_mut()
            .map_err(|_| invalid("URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(SERVICE_SEGMENTS)
            .extend(["projects", project.as_str(), "test-runs", "record"]);
        url.set_query(None);
        url.query_pairs_mut()
            .append_pair("username", username)
            .append_pair("api-key", token);

        Ok(Self { url, transport })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Host, with the port when it is not the scheme default.
    pub fn host(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// Path and query, as sent on the request line.
    pub fn path(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{query}", self.url.path()),
            None => self.url.path().to_string(),
        }
    }

    /// Same route with the API key masked, for logs.
    pub fn redacted(&self) -> String {
        let mut url = self.url.clone();
        let pairs: Vec<(String, String)> = self
            .url
            .query_pairs()
            .map(|(key, value)| {
                let value = if key == "api-key" {
                    "***".to_string()
                } else {
                    value.into_owned()
                };
                (key.into_owned(), value)
            })
            .collect();
        url.query_pairs_mut().clear().extend_pairs(pairs);
        url.to_string()
    }
}
