use crate::config::ApiKey;
use crate::fetcher::error::FetchError;
use crate::types::variable::Variable;
use bon::bon;
use chrono::NaiveDateTime;
use log::debug;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.data.gov.sg/v1/environment/";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Format of the `date_time` query parameter, local time to the second.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub url: String,
    pub status: StatusCode,
    pub body: String,
}

/// Performs a single readings request. Connection-level failures are errors,
/// any response that arrives (including error statuses) is a reply.
pub trait Transport {
    fn get(&self, variable: Variable, timestamp: NaiveDateTime) -> Result<HttpReply, FetchError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, variable: Variable, timestamp: NaiveDateTime) -> Result<HttpReply, FetchError> {
        (**self).get(variable, timestamp)
    }
}

/// Blocking transport against the data.gov.sg environment API.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: ApiKey,
}

#[bon]
impl HttpTransport {
    #[builder]
    pub fn new(
        api_key: ApiKey,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()
            .map_err(FetchError::ClientBuild)?;
        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    pub fn endpoint(&self, variable: Variable) -> String {
        format!("{}{}", self.base_url, variable.path_segment())
    }
}

impl Transport for HttpTransport {
    fn get(&self, variable: Variable, timestamp: NaiveDateTime) -> Result<HttpReply, FetchError> {
        let url = self.endpoint(variable);
        let date_time = timestamp.format(DATE_TIME_FORMAT).to_string();
        debug!("GET {} date_time={}", url, date_time);

        let response = self
            .client
            .get(&url)
            .header("api-key", self.api_key.expose())
            .query(&[("date_time", date_time.as_str())])
            .send()
            .map_err(|e| FetchError::NetworkRequest(url.clone(), e))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| FetchError::BodyRead(url.clone(), e))?;
        Ok(HttpReply { url, status, body })
    }
}
