//! Typed client for the backend REST API

use std::time::Duration;

use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::error::ApiError;
use super::types::{
    BackendInfo, BackendSettings, DownloadRequest, DownloadSummary, FileEntry, FileKind,
    FileListResponse, FileStats, LogsResponse, ProcessRequest, ProcessSummary,
    SaveSettingsResponse, SchedulerStatus, StatusMessage,
};

/// Timeout for ordinary API calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for file downloads
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the backend's JSON API
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: Url,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .no_proxy()
            .build()?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `GET /`
    pub async fn test_connection(&self) -> Result<BackendInfo, ApiError> {
        let response = self.http.get(self.base.clone()).send().await?;
        read_json(response).await
    }

    pub async fn start_download(
        &self,
        request: &DownloadRequest,
    ) -> Result<DownloadSummary, ApiError> {
        self.post_json(&["api", "start_download"], request).await
    }

    /// Process a downloaded file; `file_path` may be a bare file name
    pub async fn process_excel(&self, file_path: &str) -> Result<ProcessSummary, ApiError> {
        let body = ProcessRequest {
            file_path: file_path.to_string(),
        };
        self.post_json(&["api", "process_excel"], &body).await
    }

    /// Most recent backend log lines
    pub async fn logs(&self) -> Result<Vec<String>, ApiError> {
        let response: LogsResponse = self.get_json(&["api", "logs"]).await?;
        Ok(response.logs)
    }

    pub async fn settings(&self) -> Result<BackendSettings, ApiError> {
        self.get_json(&["api", "settings"]).await
    }

    pub async fn save_settings(
        &self,
        settings: &BackendSettings,
    ) -> Result<SaveSettingsResponse, ApiError> {
        self.post_json(&["api", "settings"], settings).await
    }

    pub async fn start_scheduler(&self) -> Result<StatusMessage, ApiError> {
        self.post_empty(&["api", "scheduler", "start"]).await
    }

    /// Stopping an idle scheduler is not an HTTP error; check `is_success()`
    pub async fn stop_scheduler(&self) -> Result<StatusMessage, ApiError> {
        self.post_empty(&["api", "scheduler", "stop"]).await
    }

    pub async fn scheduler_status(&self) -> Result<SchedulerStatus, ApiError> {
        self.get_json(&["api", "scheduler", "status"]).await
    }

    /// Files in one archive directory, newest first
    pub async fn list_files(&self, kind: FileKind) -> Result<Vec<FileEntry>, ApiError> {
        let response: FileListResponse = self.get_json(&["api", "files", kind.as_segment()]).await?;
        Ok(response.files)
    }

    /// Raw contents of an archived file
    pub async fn download_file(&self, kind: FileKind, name: &str) -> Result<Vec<u8>, ApiError> {
        validate_file_name(name)?;
        let url = self.endpoint(&["api", "files", "download", kind.as_segment(), name])?;
        debug!("Downloading {} file {}", kind, name);

        let response = self
            .http
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn delete_file(&self, kind: FileKind, name: &str) -> Result<StatusMessage, ApiError> {
        validate_file_name(name)?;
        let url = self.endpoint(&["api", "files", kind.as_segment(), name])?;
        let response = self.http.delete(url).send().await?;
        read_json(response).await
    }

    pub async fn file_stats(&self) -> Result<FileStats, ApiError> {
        self.get_json(&["api", "files", "stats"]).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url.path());
        let response = self.http.get(url).send().await?;
        read_json(response).await
    }

    async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        debug!("POST {}", url.path());
        let response = self.http.post(url).json(body).send().await?;
        read_json(response).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        debug!("POST {}", url.path());
        let response = self.http.post(url).send().await?;
        read_json(response).await
    }
}

/// Only plain names are accepted; the backend resolves them in its own directories
fn validate_file_name(name: &str) -> Result<(), ApiError> {
    let invalid = name.trim().is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name == "."
        || name.contains("..");
    if invalid {
        return Err(ApiError::InvalidFileName(name.to_string()));
    }
    Ok(())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let response = check_status(response).await?;
    Ok(response.json::<T>().await?)
}

/// Turn error statuses into `ApiError::Status`, using the body's `detail` when present
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            value.get("detail").map(|detail| match detail.as_str() {
                Some(text) => text.to_string(),
                None => detail.to_string(),
            })
        })
        .unwrap_or_else(|| body.trim().to_string());

    Err(ApiError::Status { status, detail })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one canned response; the raw request comes back on the receiver
    async fn serve_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
        });

        (format!("http://{}", addr), rx)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn request_line(request: &str) -> &str {
        request.lines().next().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_connection_hits_root() {
        let (base, request) = serve_once(
            "200 OK",
            r#"{"message":"HomeStock Python Backend Running","status":"ok","version":"0.3.0"}"#,
        )
        .await;

        let info = BackendClient::new(&base).unwrap().test_connection().await.unwrap();

        assert_eq!(info.status, "ok");
        assert_eq!(info.version.as_deref(), Some("0.3.0"));
        assert_eq!(request_line(&request.await.unwrap()), "GET / HTTP/1.1");
    }

    #[tokio::test]
    async fn logs_are_unwrapped() {
        let (base, request) = serve_once("200 OK", r#"{"logs":["first\n","second\n"]}"#).await;

        let logs = BackendClient::new(&base).unwrap().logs().await.unwrap();

        assert_eq!(logs, vec!["first\n".to_string(), "second\n".to_string()]);
        assert_eq!(request_line(&request.await.unwrap()), "GET /api/logs HTTP/1.1");
    }

    #[tokio::test]
    async fn save_settings_posts_json_and_surfaces_warning() {
        let (base, request) = serve_once(
            "200 OK",
            r#"{"status":"success","message":"Settings saved and scheduler updated","scheduler_restarted":true,"warning":"Warning: NSE data is typically available after 6:30 PM IST"}"#,
        )
        .await;
        let settings = BackendSettings {
            download_path: "downloads".to_string(),
            processed_path: "processed".to_string(),
            scheduler_time: "17:00".to_string(),
            scheduler_enabled: true,
        };

        let saved = BackendClient::new(&base)
            .unwrap()
            .save_settings(&settings)
            .await
            .unwrap();

        assert!(saved.scheduler_restarted);
        assert!(saved.warning.unwrap().contains("6:30 PM"));

        let raw = request.await.unwrap();
        assert_eq!(request_line(&raw), "POST /api/settings HTTP/1.1");
        let body = raw.split("\r\n\r\n").nth(1).unwrap();
        let sent: BackendSettings = serde_json::from_str(body).unwrap();
        assert_eq!(sent, settings);
    }

    #[tokio::test]
    async fn error_status_carries_detail() {
        let (base, _request) =
            serve_once("404 Not Found", r#"{"detail":"File not found: missing.csv"}"#).await;

        let err = BackendClient::new(&base)
            .unwrap()
            .process_excel("missing.csv")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        match err {
            ApiError::Status { detail, .. } => assert_eq!(detail, "File not found: missing.csv"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn file_names_are_encoded_into_the_path() {
        let (base, request) = serve_once("200 OK", "csv,data").await;

        let bytes = BackendClient::new(&base)
            .unwrap()
            .download_file(FileKind::Processed, "NSE Report 2024.csv")
            .await
            .unwrap();

        assert_eq!(bytes, b"csv,data");
        assert_eq!(
            request_line(&request.await.unwrap()),
            "GET /api/files/download/processed/NSE%20Report%202024.csv HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn delete_uses_delete_method() {
        let (base, request) = serve_once(
            "200 OK",
            r#"{"status":"success","message":"File 'a.csv' deleted successfully"}"#,
        )
        .await;

        let ack = BackendClient::new(&base)
            .unwrap()
            .delete_file(FileKind::Downloaded, "a.csv")
            .await
            .unwrap();

        assert!(ack.is_success());
        assert_eq!(
            request_line(&request.await.unwrap()),
            "DELETE /api/files/downloaded/a.csv HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn stopping_idle_scheduler_is_not_an_http_error() {
        let (base, _request) =
            serve_once("200 OK", r#"{"status":"error","message":"No active scheduler"}"#).await;

        let ack = BackendClient::new(&base)
            .unwrap()
            .stop_scheduler()
            .await
            .unwrap();

        assert!(!ack.is_success());
        assert_eq!(ack.message, "No active scheduler");
    }

    #[tokio::test]
    async fn start_download_posts_date_range() {
        let (base, request) = serve_once(
            "200 OK",
            r#"{"status":"success","message":"Downloaded 2 files","files_downloaded":2,"details":["2024-03-01: ok","2024-03-02: ok"]}"#,
        )
        .await;
        let body = DownloadRequest {
            date_from: chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            date_to: chrono::NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            job_type: "NSE".to_string(),
            custom_url: None,
        };

        let summary = BackendClient::new(&base)
            .unwrap()
            .start_download(&body)
            .await
            .unwrap();

        assert_eq!(summary.files_downloaded, 2);
        assert_eq!(summary.details.len(), 2);

        let raw = request.await.unwrap();
        assert_eq!(request_line(&raw), "POST /api/start_download HTTP/1.1");
        let sent: serde_json::Value =
            serde_json::from_str(raw.split("\r\n\r\n").nth(1).unwrap()).unwrap();
        assert_eq!(sent["date_from"], "2024-03-01");
        assert_eq!(sent["job_type"], "NSE");
        assert!(sent.get("custom_url").is_none());
    }

    #[tokio::test]
    async fn process_excel_sends_file_path() {
        let (base, request) = serve_once(
            "200 OK",
            r#"{"status":"success","output_file":"Processed_20240301.csv","rows_processed":1850,"message":"done"}"#,
        )
        .await;

        let summary = BackendClient::new(&base)
            .unwrap()
            .process_excel("BhavCopy_NSE_20240301.csv")
            .await
            .unwrap();

        assert_eq!(summary.output_file, "Processed_20240301.csv");
        assert_eq!(summary.rows_processed, 1850);

        let raw = request.await.unwrap();
        assert_eq!(request_line(&raw), "POST /api/process_excel HTTP/1.1");
        let sent: serde_json::Value =
            serde_json::from_str(raw.split("\r\n\r\n").nth(1).unwrap()).unwrap();
        assert_eq!(sent, serde_json::json!({ "file_path": "BhavCopy_NSE_20240301.csv" }));
    }

    #[tokio::test]
    async fn start_scheduler_posts_without_body() {
        let (base, request) = serve_once(
            "200 OK",
            r#"{"status":"success","message":"Scheduler started"}"#,
        )
        .await;

        let ack = BackendClient::new(&base)
            .unwrap()
            .start_scheduler()
            .await
            .unwrap();

        assert!(ack.is_success());
        assert_eq!(
            request_line(&request.await.unwrap()),
            "POST /api/scheduler/start HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn list_files_unwraps_entries() {
        let (base, request) = serve_once(
            "200 OK",
            r#"{"files":[{"name":"Processed_20240301.csv","size":2048,"modified":"2024-03-01T19:02:11.104233"}]}"#,
        )
        .await;

        let files = BackendClient::new(&base)
            .unwrap()
            .list_files(FileKind::Processed)
            .await
            .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "Processed_20240301.csv");
        assert_eq!(files[0].size, 2048);
        assert_eq!(
            request_line(&request.await.unwrap()),
            "GET /api/files/processed HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn file_stats_reads_both_directories() {
        let (base, request) = serve_once(
            "200 OK",
            r#"{"downloaded":{"count":3,"total_size":4096},"processed":{"count":1,"total_size":512}}"#,
        )
        .await;

        let stats = BackendClient::new(&base)
            .unwrap()
            .file_stats()
            .await
            .unwrap();

        assert_eq!(stats.downloaded.count, 3);
        assert_eq!(stats.downloaded.total_size, 4096);
        assert_eq!(stats.processed.count, 1);
        assert_eq!(
            request_line(&request.await.unwrap()),
            "GET /api/files/stats HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn path_like_file_names_are_rejected_before_sending() {
        let client = BackendClient::new("http://127.0.0.1:9").unwrap();

        for name in ["", "../settings.json", "nested/file.csv", "..\\x.csv", "."] {
            let err = client.delete_file(FileKind::Downloaded, name).await.unwrap_err();
            assert!(matches!(err, ApiError::InvalidFileName(_)), "{name:?}");
        }
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            BackendClient::new("not a url"),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(matches!(
            BackendClient::new("mailto:backend@example.com"),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn endpoints_are_built_from_segments() {
        let client = BackendClient::new("http://127.0.0.1:8000").unwrap();
        let url = client.endpoint(&["api", "scheduler", "status"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/api/scheduler/status");
    }
}
