//! Minimal WebDAV/CalDAV transport over reqwest.
//!
//! Only the verbs calblock needs: PROPFIND, REPORT, GET, PUT and DELETE,
//! with HTTP basic authentication.

use calblock_core::{CalblockError, CalblockResult};
use reqwest::header::{CONTENT_TYPE, ETAG, HeaderMap, HeaderValue, IF_NONE_MATCH};
use reqwest::{Method, StatusCode};
use url::Url;

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
const ICS_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// Whether a failed request was reading or writing. Rejected writes are
/// reported as `RemoteWriteFailed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

#[derive(Clone)]
pub struct DavClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: String,
}

impl DavClient {
    pub fn new(server_url: &str, username: &str, password: &str) -> CalblockResult<Self> {
        let base_url = Url::parse(server_url).map_err(|e| {
            CalblockError::ConfigInvalid(format!("invalid CalDAV server URL {}: {}", server_url, e))
        })?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("calblock/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CalblockError::Provider(format!("failed to build HTTP client: {}", e)))?;

        Ok(DavClient {
            http,
            base_url,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a calendar identifier (absolute URL or path) against the server,
    /// normalized to a collection URL with a trailing slash.
    pub fn calendar_url(&self, calendar_id: &str) -> CalblockResult<Url> {
        let mut url = self.base_url.join(calendar_id).map_err(|e| {
            CalblockError::ConfigInvalid(format!("invalid calendar URL {}: {}", calendar_id, e))
        })?;

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(url)
    }

    /// `<calendar>/<resource>`, with `resource` as a single encoded segment.
    pub fn resource_url(&self, calendar_url: &Url, resource: &str) -> CalblockResult<Url> {
        let mut url = calendar_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                CalblockError::ConfigInvalid(format!("{} cannot hold resources", calendar_url))
            })?
            .pop_if_empty()
            .push(resource);

        Ok(url)
    }

    pub async fn propfind(&self, url: &Url, depth: &str, body: &str) -> CalblockResult<String> {
        let mut headers = HeaderMap::new();
        headers.insert("Depth", header_value(depth)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(XML_CONTENT_TYPE));

        let response = self
            .request(dav_method(b"PROPFIND")?, url, headers, Some(body.to_string()))
            .await?;
        let response = check(response, url, Access::Read)?;

        response.text().await.map_err(|e| transport_error(url, e))
    }

    pub async fn report(&self, url: &Url, body: &str) -> CalblockResult<String> {
        let mut headers = HeaderMap::new();
        headers.insert("Depth", HeaderValue::from_static("1"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(XML_CONTENT_TYPE));

        let response = self
            .request(dav_method(b"REPORT")?, url, headers, Some(body.to_string()))
            .await?;
        let response = check(response, url, Access::Read)?;

        response.text().await.map_err(|e| transport_error(url, e))
    }

    /// Fetch a resource body together with its ETag.
    pub async fn get(&self, url: &Url) -> CalblockResult<(String, Option<String>)> {
        let response = self.request(Method::GET, url, HeaderMap::new(), None).await?;
        let response = check(response, url, Access::Read)?;
        let etag = etag_of(response.headers());
        let body = response.text().await.map_err(|e| transport_error(url, e))?;

        Ok((body, etag))
    }

    /// Store a resource. With `create_only` the server must not already hold
    /// one at this URL.
    pub async fn put(&self, url: &Url, ics: String, create_only: bool) -> CalblockResult<Option<String>> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(ICS_CONTENT_TYPE));
        if create_only {
            headers.insert(IF_NONE_MATCH, HeaderValue::from_static("*"));
        }

        let response = self.request(Method::PUT, url, headers, Some(ics)).await?;
        let response = check(response, url, Access::Write)?;

        Ok(etag_of(response.headers()))
    }

    pub async fn delete(&self, url: &Url) -> CalblockResult<()> {
        let response = self
            .request(Method::DELETE, url, HeaderMap::new(), None)
            .await?;
        check(response, url, Access::Write)?;

        Ok(())
    }

    async fn request(
        &self,
        method: Method,
        url: &Url,
        headers: HeaderMap,
        body: Option<String>,
    ) -> CalblockResult<reqwest::Response> {
        tracing::debug!(%method, %url, "CalDAV request");

        let mut request = self.http.request(method, url.clone()).headers(headers);
        if !self.username.is_empty() {
            request = request.basic_auth(&self.username, Some(&self.password));
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        request.send().await.map_err(|e| transport_error(url, e))
    }
}

fn dav_method(name: &[u8]) -> CalblockResult<Method> {
    Method::from_bytes(name).map_err(|e| CalblockError::Provider(e.to_string()))
}

fn header_value(value: &str) -> CalblockResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| CalblockError::Provider(e.to_string()))
}

fn etag_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn transport_error(url: &Url, e: reqwest::Error) -> CalblockError {
    CalblockError::Provider(format!("request to {} failed: {}", url, e))
}

/// Map an HTTP status onto the error taxonomy.
fn check(response: reqwest::Response, url: &Url, access: Access) -> CalblockResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = format!("{} returned {}", url, status);
    Err(match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => CalblockError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CalblockError::AuthRequired(message),
        _ if access == Access::Write => CalblockError::RemoteWriteFailed(message),
        _ => CalblockError::Provider(message),
    })
}
