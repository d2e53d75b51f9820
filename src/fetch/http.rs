// src/fetch/http.rs
// =============================================================================
// This module downloads pages over HTTP.
//
// Key functionality:
// - One shared reqwest Client for the whole crawl (connection pooling)
// - Follows up to 10 redirects and reports the final URL
// - Any status code is a page: a 404 page still has a content type and a body
// - Turns reqwest errors into short, readable reasons (timeout, DNS, SSL...)
//
// Rust concepts:
// - async/await: For network I/O
// - map_err: Convert reqwest::Error into our own CrawlError
// - #[async_trait]: Implement the async Fetcher trait
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use super::{FetchedPage, Fetcher};
use crate::crawl::CrawlError;

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    // Creates a fetcher
    //
    // Parameters:
    //   timeout: how long one request may take, body included
    //   user_agent: sent with every request so site owners know who we are
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, CrawlError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CrawlError::Fetch {
                url: url.to_string(),
                reason: categorize_error(&e),
            })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let final_url = response.url().to_string();

        // The body is read separately; the connection can still fail here
        let body = response.bytes().await.map_err(|e| CrawlError::BodyRead {
            url: url.to_string(),
            reason: categorize_error(&e),
        })?;

        Ok(FetchedPage {
            status,
            content_type,
            final_url,
            body: body.to_vec(),
        })
    }
}

// Categorizes different error types from reqwest
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure
// - SSL certificate issues
// - Too many redirects
// - A URL reqwest can't even build a request for
fn categorize_error(error: &reqwest::Error) -> String {
    // Convert error to string once to avoid lifetime issues
    let error_string = error.to_string();

    if error.is_timeout() {
        "Request timed out".to_string()
    } else if error.is_redirect() {
        "Too many redirects".to_string()
    } else if error.is_builder() {
        "Invalid URL".to_string()
    } else if error.is_connect() {
        // Connection errors often mean DNS issues or host unreachable
        if error_string.contains("dns") {
            "Could not resolve hostname".to_string()
        } else {
            "Connection failed".to_string()
        }
    } else if error_string.contains("certificate") || error_string.contains("ssl") {
        "SSL certificate error".to_string()
    } else {
        error_string
    }
}
