//! HTTP download helper for adapters

use futures::StreamExt;
use hoard_common::mime::ext_from_path;
use hoard_common::{HoardError, Result};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use url::Url;

/// Download `url` into a temporary file
///
/// The file keeps the URL's filename suffixes (`.../a.tar.gz` gives a
/// `.tar.gz` temp file) so extension detection on import still works. It is
/// deleted when the returned path is dropped, unless it was moved away first.
#[instrument(skip(client))]
pub async fn download_to_temp(client: &reqwest::Client, url: &str) -> Result<TempPath> {
    let parsed = Url::parse(url)
        .map_err(|e| HoardError::Validation(format!("invalid url '{}': {}", url, e)))?;

    let response = client.get(parsed.clone()).send().await?;
    if !response.status().is_success() {
        return Err(HoardError::Network(format!(
            "Failed to download {}: {}",
            url,
            response.status()
        )));
    }

    let ext = ext_from_path(parsed.path());
    let suffix = if ext.is_empty() {
        String::new()
    } else {
        format!(".{}", ext)
    };

    let (file, temp_path) = tempfile::Builder::new()
        .prefix("hoard-")
        .suffix(&suffix)
        .tempfile()?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
    }
    file.flush().await?;

    debug!(bytes = downloaded, path = %temp_path.display(), "Downloaded");

    Ok(temp_path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_download_keeps_suffixes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/12/original.tar.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"archive-bytes".to_vec()))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/media/12/original.tar.gz", server.uri());
        let temp = download_to_temp(&client, &url).await.unwrap();

        assert_eq!(std::fs::read(&temp).unwrap(), b"archive-bytes");
        assert_eq!(ext_from_path(&temp), "tar.gz");
    }

    #[tokio::test]
    async fn test_download_without_extension() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/thumb"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let temp = download_to_temp(&client, &format!("{}/thumb", server.uri()))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&temp).unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn test_download_large_body_in_many_chunks() {
        let body: Vec<u8> = (0..256 * 1024).map(|i| (i % 251) as u8).collect();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let temp = download_to_temp(&client, &format!("{}/big.bin", server.uri()))
            .await
            .unwrap();

        let written = tokio::fs::read(&temp).await.unwrap();
        assert_eq!(written.len(), body.len());
        assert_eq!(written, body);
    }

    #[tokio::test]
    async fn test_download_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let result = download_to_temp(&client, &format!("{}/gone.png", server.uri())).await;

        match result {
            Err(HoardError::Network(message)) => assert!(message.contains("404")),
            other => panic!("expected network error, got {:?}", other.map(|p| p.to_path_buf())),
        }
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let client = reqwest::Client::new();
        let result = download_to_temp(&client, "not a url").await;
        assert!(matches!(result, Err(HoardError::Validation(_))));
    }
}
