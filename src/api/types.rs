//! Request and response bodies of the backend REST API

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Which archive directory a file lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Downloaded,
    Processed,
}

impl FileKind {
    /// Path segment used by the file endpoints
    pub fn as_segment(&self) -> &'static str {
        match self {
            Self::Downloaded => "downloaded",
            Self::Processed => "processed",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_segment())
    }
}

/// Body of `GET /`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendInfo {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Body of `POST /api/start_download`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRequest {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub job_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DownloadSummary {
    pub status: String,
    pub message: String,
    #[serde(default)]
    pub files_downloaded: u32,
    /// One line per requested day
    #[serde(default)]
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRequest {
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcessSummary {
    pub status: String,
    pub output_file: String,
    #[serde(default)]
    pub rows_processed: u64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct LogsResponse {
    #[serde(default)]
    pub logs: Vec<String>,
}

/// Backend-side configuration (`GET`/`POST /api/settings`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSettings {
    pub download_path: String,
    pub processed_path: String,
    /// Daily run time as `HH:MM`
    pub scheduler_time: String,
    pub scheduler_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SaveSettingsResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub scheduler_restarted: bool,
    /// Set when the backend accepted the settings with a caveat
    #[serde(default)]
    pub warning: Option<String>,
}

/// Generic `{status, message}` acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusMessage {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl StatusMessage {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerStatus {
    pub status: String,
    #[serde(default)]
    pub next_run: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
}

impl SchedulerStatus {
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }

    /// Parsed `next_run`, which the backend sends as `YYYY-MM-DD HH:MM:SS+HH:MM`
    pub fn next_run_time(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.next_run.as_deref()?.trim();
        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z"))
            .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z"))
            .ok()
    }
}

/// One file in an archive directory
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub modified: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct FileListResponse {
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct DirectoryStats {
    pub count: u64,
    pub total_size: u64,
}

/// Body of `GET /api/files/stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct FileStats {
    pub downloaded: DirectoryStats,
    pub processed: DirectoryStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn download_request_serializes_iso_dates() {
        let request = DownloadRequest {
            date_from: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            date_to: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            job_type: "NSE".to_string(),
            custom_url: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "date_from": "2024-03-01",
                "date_to": "2024-03-08",
                "job_type": "NSE"
            })
        );
    }

    #[test]
    fn file_entry_accepts_fractional_seconds() {
        let entry: FileEntry = serde_json::from_str(
            r#"{"name":"BhavCopy_NSE_20240301.csv","size":1024,"modified":"2024-03-01T18:47:02.531902"}"#,
        )
        .unwrap();

        assert_eq!(entry.size, 1024);
        assert_eq!(entry.modified.date().day(), 1);
        assert_eq!(entry.modified.time().minute(), 47);
    }

    #[test]
    fn scheduler_next_run_parses_backend_format() {
        let status: SchedulerStatus = serde_json::from_str(
            r#"{"status":"running","next_run":"2024-03-01 18:45:00+05:30","job_id":"daily_download"}"#,
        )
        .unwrap();

        assert!(status.is_running());
        let next = status.next_run_time().unwrap();
        assert_eq!(next.hour(), 18);
        assert_eq!(next.offset().local_minus_utc(), 5 * 3600 + 30 * 60);
    }

    #[test]
    fn stopped_scheduler_has_no_next_run() {
        let status: SchedulerStatus =
            serde_json::from_str(r#"{"status":"stopped","next_run":null,"job_id":null}"#).unwrap();

        assert!(!status.is_running());
        assert!(status.next_run_time().is_none());
    }

    #[test]
    fn save_response_warning_is_optional() {
        let plain: SaveSettingsResponse =
            serde_json::from_str(r#"{"status":"success","message":"Saved"}"#).unwrap();
        assert!(plain.warning.is_none());
        assert!(!plain.scheduler_restarted);

        let warned: SaveSettingsResponse = serde_json::from_str(
            r#"{"status":"success","message":"Saved","scheduler_restarted":true,"warning":"too early"}"#,
        )
        .unwrap();
        assert_eq!(warned.warning.as_deref(), Some("too early"));
    }
}
