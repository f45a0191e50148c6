use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION},
    Url,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{instrument, trace};

use crate::{envelope, Result};

/// Root of the booking API. Operation paths are joined onto it.
pub const BASE_URL: &str = "https://booking.bbdc.sg/bbdc-back-service/api/";

/// User agent used by the client 🥸
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

/// Header carrying the course-scoped token.
pub const JSESSIONID: &str = "jsessionid";

/// Headers the web frontend sends with every request.
const BROWSER_HEADERS: [(&str, &str); 14] = [
    ("accept", "application/json, text/plain, */*"),
    ("accept-language", "en-GB,en-US;q=0.9,en;q=0.8"),
    ("content-type", "application/json;charset=UTF-8"),
    ("dnt", "1"),
    ("jsessionid", ""),
    ("origin", "https://booking.bbdc.sg"),
    ("referer", "https://booking.bbdc.sg/"),
    (
        "sec-ch-ua",
        r#""Not/A)Brand";v="99", "Google Chrome";v="115", "Chromium";v="115""#,
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", r#""macOS""#),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "same-origin"),
    ("authority", "booking.bbdc.sg"),
];

/// Where to send requests and what to send along with every one of them.
///
/// Built once at startup and handed to [`Client::new`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: Url,
    headers: HeaderMap,
}

impl ClientConfig {
    /// Target `base_url` with the browser header bundle.
    #[must_use]
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let headers = BROWSER_HEADERS
            .into_iter()
            .map(|(k, v)| (HeaderName::from_static(k), HeaderValue::from_static(v)))
            .collect();

        Self { base_url, headers }
    }

    /// Base URL, always ending with a slash.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Headers attached to every request.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl Default for ClientConfig {
    #[allow(clippy::missing_panics_doc)] // BASE_URL is a valid url
    fn default() -> Self {
        Self::new(BASE_URL.parse().unwrap())
    }
}

/// Per-request tokens, sent on top of the fixed header bundle.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Tokens<'a> {
    pub(crate) authorization: Option<&'a str>,
    pub(crate) jsessionid: Option<&'a str>,
}

impl Tokens<'_> {
    fn headers(self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if let Some(token) = self.authorization {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(token)?);
        }

        if let Some(token) = self.jsessionid {
            headers.insert(
                HeaderName::from_static(JSESSIONID),
                HeaderValue::from_str(token)?,
            );
        }

        Ok(headers)
    }
}

/// A wrapper around [`reqwest::Client`] preconfigured for the booking API.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
}

impl Client {
    /// Initialize a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying [`reqwest::Client`] initialization fails.
    pub fn new(config: ClientConfig) -> reqwest::Result<Self> {
        let ClientConfig { base_url, headers } = config;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self { http, base_url })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn build(
        &self,
        path: &str,
        body: &impl Serialize,
        tokens: Tokens<'_>,
    ) -> Result<reqwest::Request> {
        // Raw bytes rather than `.json()`, which would shadow the bundle's content type.
        let req = self
            .http
            .post(format!("{}{path}", self.base_url))
            .headers(tokens.headers()?)
            .body(serde_json::to_vec(body)?)
            .build()?;

        Ok(req)
    }

    /// POST `body` to `path` and decode the `data` of the response envelope.
    #[instrument(skip(self, body, tokens))]
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
        tokens: Tokens<'_>,
    ) -> Result<T> {
        let req = self.build(path, body, tokens)?;

        trace!("POST {}", req.url());

        let res = self.http.execute(req).await?;

        trace!(status = ?res.status());

        let text = res.error_for_status()?.text().await?;

        envelope::decode(&text)
    }
}
