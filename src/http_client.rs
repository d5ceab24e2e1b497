use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;
const MAX_REDIRECTS: usize = 10;

/// Statuses accepted as content when they are the final response.
const REDIRECT_STATUSES: [StatusCode; 4] = [
    StatusCode::MOVED_PERMANENTLY,
    StatusCode::FOUND,
    StatusCode::TEMPORARY_REDIRECT,
    StatusCode::PERMANENT_REDIRECT,
];

/// A fetched page: the URL the body was finally served from, and the body.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub body: String,
}

impl Page {
    /// An empty body counts as no content.
    pub fn has_content(&self) -> bool {
        !self.body.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    HttpStatus(u16),
    #[error("response too large: {0} bytes")]
    TooLarge(u64),
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    max_response_size: usize,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!(
                "Mozilla/5.0 (compatible; friendlink-checker/",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self {
            client,
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    pub fn with_max_response_size(mut self, bytes: usize) -> Self {
        self.max_response_size = bytes;
        self
    }

    /// Single GET, no retries. Redirects are followed by the client; the
    /// returned page carries the final URL.
    pub async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        let final_url = response.url().clone();

        if REDIRECT_STATUSES.contains(&status) {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("<no location header>");
            info!(%url, %location, status = status.as_u16(), "{url} was redirected to {location}");
        } else if status != StatusCode::OK {
            return Err(FetchError::HttpStatus(status.as_u16()));
        } else if Url::parse(url).map_or(true, |requested| requested != final_url) {
            info!(%url, redirect = %final_url, "{url} was redirected to {final_url}");
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_response_size as u64 {
                return Err(FetchError::TooLarge(content_length));
            }
        }

        let body = response.text().await?;
        if body.len() > self.max_response_size {
            return Err(FetchError::TooLarge(body.len() as u64));
        }

        Ok(Page {
            url: final_url.to_string(),
            body,
        })
    }

    /// `fetch` with failures logged and turned into `None`.
    pub async fn fetch_page(&self, url: &str) -> Option<Page> {
        match self.fetch(url).await {
            Ok(page) => Some(page),
            Err(e) => {
                warn!(%url, error = %e, "failed to fetch {url}: {e}");
                None
            }
        }
    }
}
