//! Google Drive v3 file source.
//!
//! Lists files page by page and downloads one file at a time into its own
//! fresh temp directory, keeping the Drive file name so the extension still
//! selects the right extractor.

use crate::oauth::{DriveSession, OAuthClient};
use async_trait::async_trait;
use kbchat_config::DriveConfig;
use kbchat_core::error::SourceError;
use kbchat_core::source::{FetchedFile, FileSource, RemoteFile};
use serde::Deserialize;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info};

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const MAX_PAGE_SIZE: usize = 100;

pub struct GoogleDriveSource {
    oauth: OAuthClient,
    session: RwLock<DriveSession>,
    http: reqwest::Client,
    api_base: String,
    max_results: usize,
    default_query: String,
    download_root: PathBuf,
}

impl GoogleDriveSource {
    pub fn new(oauth: OAuthClient, session: DriveSession, config: &DriveConfig) -> Self {
        Self {
            oauth,
            session: RwLock::new(session),
            http: reqwest::Client::new(),
            api_base: DRIVE_API_BASE.into(),
            max_results: config.max_results,
            default_query: config.default_query.clone(),
            download_root: std::env::temp_dir(),
        }
    }

    /// Point API calls elsewhere (e.g., for testing).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_download_root(mut self, root: PathBuf) -> Self {
        self.download_root = root;
        self
    }

    /// Current session, including any refresh done since construction.
    pub async fn session(&self) -> DriveSession {
        self.session.read().await.clone()
    }

    async fn access_token(&self) -> Result<String, SourceError> {
        {
            let session = self.session.read().await;
            if !session.is_expired() {
                return Ok(session.access_token.clone());
            }
        }

        let mut session = self.session.write().await;
        if session.is_expired() {
            *session = self.oauth.refresh(&session).await?;
        }
        Ok(session.access_token.clone())
    }

    async fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, SourceError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        match status {
            200..=299 => Ok(response),
            401 => Err(SourceError::NotAuthenticated(
                "Drive rejected the access token; log in again".into(),
            )),
            404 => Err(SourceError::NotFound(url.to_string())),
            _ => Err(SourceError::ApiError {
                status_code: status,
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl FileSource for GoogleDriveSource {
    fn name(&self) -> &str {
        "google_drive"
    }

    async fn list(&self, query: Option<&str>) -> Result<Vec<RemoteFile>, SourceError> {
        let q = query
            .filter(|q| !q.trim().is_empty())
            .unwrap_or(self.default_query.as_str());
        let url = format!("{}/files", self.api_base);
        let page_size = self.max_results.clamp(1, MAX_PAGE_SIZE).to_string();

        let mut files: Vec<RemoteFile> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", q),
                ("spaces", "drive"),
                ("fields", "nextPageToken, files(id, name, mimeType)"),
                ("pageSize", page_size.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let page: FileListPage = self
                .get(&url, &params)
                .await?
                .json()
                .await
                .map_err(|e| SourceError::ApiError {
                    status_code: 200,
                    message: format!("Failed to parse file list: {e}"),
                })?;

            files.extend(page.files);
            debug!(count = files.len(), "Fetched Drive file page");

            match page.next_page_token {
                Some(token) if files.len() < self.max_results => page_token = Some(token),
                _ => break,
            }
        }

        files.truncate(self.max_results);
        Ok(files)
    }

    async fn fetch(&self, id: &str) -> Result<FetchedFile, SourceError> {
        let url = format!("{}/files/{id}", self.api_base);

        let meta: FileMetadata = self
            .get(&url, &[("fields", "id, name, mimeType")])
            .await?
            .json()
            .await
            .map_err(|e| SourceError::ApiError {
                status_code: 200,
                message: format!("Failed to parse file metadata: {e}"),
            })?;
        let name = meta.name.unwrap_or_else(|| "downloaded_file".into());

        let bytes = self
            .get(&url, &[("alt", "media")])
            .await?
            .bytes()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let dir = self
            .download_root
            .join(format!("kbchat-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| SourceError::Io(format!("{}: {e}", dir.display())))?;
        let path = dir.join(safe_file_name(&name));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| SourceError::Io(format!("{}: {e}", path.display())))?;

        info!(id, name = %name, bytes = bytes.len(), "Downloaded Drive file");
        Ok(FetchedFile {
            id: id.to_string(),
            name,
            path,
        })
    }
}

/// Keep a Drive display name usable as a single path component.
fn safe_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => "downloaded_file".into(),
        trimmed => trimmed.to_string(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListPage {
    #[serde(default)]
    files: Vec<RemoteFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileMetadata {
    #[serde(default)]
    name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn live_session() -> DriveSession {
        DriveSession {
            access_token: "ya29.test".into(),
            refresh_token: None,
            expires_at: Utc::now() + Duration::hours(1),
            scope: None,
        }
    }

    fn source(config: &DriveConfig) -> GoogleDriveSource {
        GoogleDriveSource::new(OAuthClient::new("id", "secret", "uri"), live_session(), config)
    }

    /// Serve one canned HTTP response per connection, in order, and return
    /// the base URL plus a handle yielding the request lines seen.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                let request = String::from_utf8_lossy(&buf);
                seen.push(request.lines().next().unwrap_or_default().to_string());

                let reply = format!(
                    "HTTP/1.1 {status} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            seen
        });
        (format!("http://{addr}"), handle)
    }

    #[test]
    fn file_list_page_parses() {
        let page: FileListPage = serde_json::from_str(
            r#"{"nextPageToken":"tok","files":[{"id":"1","name":"a.pdf","mimeType":"application/pdf"}]}"#,
        )
        .unwrap();
        assert_eq!(page.files.len(), 1);
        assert_eq!(page.next_page_token.as_deref(), Some("tok"));

        let last: FileListPage = serde_json::from_str(r#"{"files":[]}"#).unwrap();
        assert!(last.next_page_token.is_none());
    }

    #[test]
    fn file_names_are_made_safe() {
        assert_eq!(safe_file_name("report.pdf"), "report.pdf");
        assert_eq!(safe_file_name("2024/Q1 report.csv"), "2024_Q1 report.csv");
        assert_eq!(safe_file_name(".."), "downloaded_file");
        assert_eq!(safe_file_name("  "), "downloaded_file");
    }

    #[tokio::test]
    async fn list_follows_page_tokens() {
        let (base, handle) = serve(vec![
            (200, r#"{"nextPageToken":"p2","files":[{"id":"1","name":"a.pdf","mimeType":"application/pdf"}]}"#),
            (200, r#"{"files":[{"id":"2","name":"b.csv","mimeType":"text/csv"}]}"#),
        ])
        .await;

        let drive = source(&DriveConfig::default()).with_api_base(base);
        let files = drive.list(None).await.unwrap();
        assert_eq!(files.iter().map(|f| f.id.as_str()).collect::<Vec<_>>(), ["1", "2"]);

        let requests = handle.await.unwrap();
        assert!(requests[0].starts_with("GET /files?"));
        assert!(requests[0].contains("pageSize=100"));
        assert!(requests[1].contains("pageToken=p2"));
    }

    #[tokio::test]
    async fn list_stops_at_max_results() {
        let (base, handle) = serve(vec![(
            200,
            r#"{"nextPageToken":"more","files":[{"id":"1","name":"a"},{"id":"2","name":"b"},{"id":"3","name":"c"}]}"#,
        )])
        .await;

        let config = DriveConfig {
            max_results: 2,
            ..DriveConfig::default()
        };
        let drive = source(&config).with_api_base(base);
        let files = drive.list(Some("name contains 'a'")).await.unwrap();
        assert_eq!(files.len(), 2);

        let requests = handle.await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].contains("pageSize=2"));
    }

    #[tokio::test]
    async fn fetch_downloads_under_drive_name() {
        let (base, _handle) = serve(vec![
            (200, r#"{"id":"abc","name":"notes.txt","mimeType":"text/plain"}"#),
            (200, "The sky is blue."),
        ])
        .await;

        let root = TempDir::new().unwrap();
        let drive = source(&DriveConfig::default())
            .with_api_base(base)
            .with_download_root(root.path().to_path_buf());

        let fetched = drive.fetch("abc").await.unwrap();
        assert_eq!(fetched.name, "notes.txt");
        assert!(fetched.path.starts_with(root.path()));
        assert!(fetched.path.ends_with("notes.txt"));
        assert_eq!(std::fs::read_to_string(&fetched.path).unwrap(), "The sky is blue.");
    }

    #[tokio::test]
    async fn unknown_file_is_not_found() {
        let (base, _handle) = serve(vec![(404, r#"{"error":{"code":404}}"#)]).await;
        let drive = source(&DriveConfig::default()).with_api_base(base);
        let err = drive.fetch("missing").await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn expired_session_without_refresh_token_fails() {
        let mut session = live_session();
        session.expires_at = Utc::now() - Duration::minutes(5);
        let drive = GoogleDriveSource::new(
            OAuthClient::new("id", "secret", "uri"),
            session,
            &DriveConfig::default(),
        );
        let err = drive.list(None).await.unwrap_err();
        assert!(matches!(err, SourceError::NotAuthenticated(_)));
    }
}
