use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufRead, BufReader};
use warden_dns_domain::DomainError;

/// Where a rule list comes from: a local file or an HTTP(S) URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSource {
    File(PathBuf),
    Http(String),
}

impl ListSource {
    pub fn parse(spec: &str) -> Self {
        if spec.starts_with("http://") || spec.starts_with("https://") {
            ListSource::Http(spec.to_string())
        } else {
            ListSource::File(PathBuf::from(spec))
        }
    }

    pub fn display(&self) -> String {
        match self {
            ListSource::File(path) => path.display().to_string(),
            ListSource::Http(url) => url.clone(),
        }
    }

    /// Open the source as a buffered byte stream.
    pub async fn open(
        &self,
        client: &reqwest::Client,
    ) -> Result<Box<dyn AsyncBufRead + Send + Unpin>, DomainError> {
        match self {
            ListSource::File(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|e| {
                    DomainError::ListSource(format!("cannot open {}: {e}", path.display()))
                })?;
                Ok(Box::new(BufReader::new(file)))
            }
            ListSource::Http(url) => {
                let response = client
                    .get(url)
                    .timeout(Duration::from_secs(30))
                    .send()
                    .await
                    .map_err(|e| DomainError::ListSource(format!("fetch error for {url}: {e}")))?;

                if !response.status().is_success() {
                    return Err(DomainError::ListSource(format!(
                        "HTTP {} for {url}",
                        response.status().as_u16()
                    )));
                }

                let body = response
                    .text()
                    .await
                    .map_err(|e| DomainError::ListSource(format!("read error for {url}: {e}")))?;
                Ok(Box::new(std::io::Cursor::new(body)))
            }
        }
    }
}
