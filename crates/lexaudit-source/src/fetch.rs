//! Document and page download.

use async_trait::async_trait;
use lexaudit_core::DocumentRef;
use tracing::{debug, info, warn};
use url::Url;

use crate::http::{HttpConfig, check_status, parliament_base, resolve_url};
use crate::{FetchError, SourceError};

/// Fetches raw document bytes.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, doc: &DocumentRef) -> Result<Vec<u8>, FetchError>;
}

/// Fetches HTML pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, SourceError>;
}

/// HTTP implementation of [`DocumentSource`] and [`PageSource`].
///
/// Relative URLs resolve against the Parliament host. Every request is
/// bounded by the client timeout, so one slow document cannot stall the
/// others.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base: Url,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, SourceError> {
        Ok(Self {
            client: config.build_client()?,
            base: parliament_base(),
        })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base: parliament_base(),
        }
    }

    /// Absolute URL for a document reference.
    pub fn normalize(&self, href: &str) -> Result<Url, SourceError> {
        resolve_url(&self.base, href)
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, SourceError> {
        let resp = self.client.get(url).send().await?;
        check_status(resp).await
    }
}

#[async_trait]
impl DocumentSource for HttpFetcher {
    async fn fetch(&self, doc: &DocumentRef) -> Result<Vec<u8>, FetchError> {
        let url = self
            .normalize(&doc.url)
            .map_err(|e| FetchError::new(&doc.url, e))?;

        debug!(url = %url, category = %doc.category, "downloading document");
        let result = async {
            let resp = self.get(url.clone()).await?;
            Ok::<_, SourceError>(resp.bytes().await?.to_vec())
        }
        .await;

        match result {
            Ok(bytes) => {
                info!(url = %url, bytes = bytes.len(), "downloaded document");
                Ok(bytes)
            }
            Err(e) => {
                warn!(url = %url, error = %e, "document download failed");
                Err(FetchError::new(url.as_str(), e))
            }
        }
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, SourceError> {
        let url = self.normalize(url)?;
        debug!(url = %url, "fetching page");
        let resp = self.get(url).await?;
        Ok(resp.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexaudit_core::DocumentCategory;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer a single request with a canned HTTP response; returns the base URL.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/")
    }

    #[test]
    fn normalizes_relative_document_paths() {
        let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
        let url = fetcher.normalize("/UserFiles/2022/law.pdf").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.hellenicparliament.gr/UserFiles/2022/law.pdf"
        );
    }

    #[tokio::test]
    async fn invalid_url_is_fetch_error() {
        let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
        let doc = DocumentRef::new("http://[::1", DocumentCategory::Other, "");
        let err = fetcher.fetch(&doc).await.unwrap_err();
        assert_eq!(err.url, "http://[::1");
        assert!(!err.cause.is_empty());
    }

    #[tokio::test]
    async fn error_status_carries_body() {
        let url = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 4\r\nConnection: close\r\n\r\nbusy",
        )
        .await;
        let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
        match fetcher.fetch_page(&url).await.unwrap_err() {
            SourceError::Server { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "busy");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn success_status_passes_body_through() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 10\r\nConnection: close\r\n\r\n<p>law</p>",
        )
        .await;
        let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
        assert_eq!(fetcher.fetch_page(&url).await.unwrap(), "<p>law</p>");
    }
}
