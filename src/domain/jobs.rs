use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-preset progress trails the one before it by this many points.
const PRESET_STAGGER: i64 = 5;
const PRESET_FLOOR: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Download {
    pub preset_id: String,
    pub url: String,
    /// RFC 3339, UTC
    pub expires_at: String,
}

/// Output URL reported by the render worker for one preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutput {
    pub preset_id: String,
    pub url: String,
}

impl RenderOutput {
    pub fn into_download(self, expires_at: DateTime<Utc>) -> Download {
        Download {
            preset_id: self.preset_id,
            url: self.url,
            expires_at: format_timestamp(expires_at),
        }
    }
}

/// What a caller asks to render.
#[derive(Debug, Clone, Default)]
pub struct JobSpec {
    pub asset_id: Option<String>,
    pub track_id: Option<String>,
    pub preset_ids: Vec<String>,
    pub metadata: Option<Value>,
    /// Caller holding the concurrency lock for this job
    pub owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderJob {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
    pub presets: Vec<String>,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
    /// Projected total duration in milliseconds
    pub duration_ms: u64,
    /// Only `queued` or a pinned `error` is ever stored; `running` and
    /// `done` are derived from elapsed time.
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<Vec<Download>>,
    /// Set once the first observer of `done` has run finalization
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub finalized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetProgress {
    pub preset_id: String,
    pub progress: u8,
}

/// Time-derived view of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub status: JobStatus,
    pub progress: u8,
    /// Seconds remaining, absent once terminal
    pub eta: Option<u64>,
    pub presets: Vec<PresetProgress>,
}

impl RenderJob {
    pub fn new(id: String, spec: JobSpec, created_at: i64, duration_ms: u64) -> Self {
        Self {
            id,
            asset_id: spec.asset_id,
            track_id: spec.track_id,
            presets: spec.preset_ids,
            created_at,
            duration_ms: duration_ms.max(1),
            status: JobStatus::Queued,
            downloads: None,
            finalized: false,
            owner: spec.owner,
            metadata: spec.metadata,
        }
    }

    /// Unique, roughly time-ordered job id.
    pub fn next_id(now_ms: i64) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("job_{}_{}", now_ms, &suffix[..12])
    }

    /// Pure projection of status and progress at `now_ms`.
    pub fn project(&self, now_ms: i64) -> Projection {
        let duration = self.duration_ms.max(1) as f64;
        let elapsed = (now_ms - self.created_at) as f64;
        let ratio = (elapsed / duration).clamp(0.0, 1.0);
        let progress = (ratio * 100.0).round() as u8;

        let status = if self.status == JobStatus::Error {
            JobStatus::Error
        } else if progress == 0 {
            JobStatus::Queued
        } else if progress >= 100 {
            JobStatus::Done
        } else {
            JobStatus::Running
        };

        let presets = self
            .presets
            .iter()
            .enumerate()
            .map(|(idx, preset_id)| PresetProgress {
                preset_id: preset_id.clone(),
                progress: (progress as i64 - idx as i64 * PRESET_STAGGER).clamp(PRESET_FLOOR, 100)
                    as u8,
            })
            .collect();

        let eta = if status.is_terminal() {
            None
        } else {
            let remaining_secs = ((duration - elapsed) / 1000.0).round();
            Some(remaining_secs.max(1.0) as u64)
        };

        Projection {
            status,
            progress,
            eta,
            presets,
        }
    }

    /// Downloads at the conventional export location, one per preset.
    pub fn synthesize_downloads(&self, base_url: &str, expires_at: DateTime<Utc>) -> Vec<Download> {
        let base = base_url.trim_end_matches('/');
        let asset = self.asset_id.as_deref().unwrap_or("asset");
        let expires_at = format_timestamp(expires_at);
        self.presets
            .iter()
            .map(|preset_id| Download {
                preset_id: preset_id.clone(),
                url: format!("{}/{}-{}.mp4", base, asset, preset_id),
                expires_at: expires_at.clone(),
            })
            .collect()
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const T0: i64 = 1_700_000_000_000;

    fn job(presets: &[&str], duration_ms: u64) -> RenderJob {
        RenderJob::new(
            "job_1".to_string(),
            JobSpec {
                asset_id: Some("a1".to_string()),
                preset_ids: presets.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            },
            T0,
            duration_ms,
        )
    }

    #[test]
    fn test_fresh_job_is_queued() {
        let p = job(&["p1", "p2"], 8000).project(T0);
        assert_eq!(p.status, JobStatus::Queued);
        assert_eq!(p.progress, 0);
        assert_eq!(p.eta, Some(8));
        // Floor applies even before work starts.
        assert!(p.presets.iter().all(|pp| pp.progress == 5));
    }

    #[test]
    fn test_midway_job_is_running_with_staggered_presets() {
        let p = job(&["p1", "p2", "p3"], 10_000).project(T0 + 5_000);
        assert_eq!(p.status, JobStatus::Running);
        assert_eq!(p.progress, 50);
        assert_eq!(p.eta, Some(5));
        let progress: Vec<u8> = p.presets.iter().map(|pp| pp.progress).collect();
        assert_eq!(progress, vec![50, 45, 40]);
    }

    #[test]
    fn test_elapsed_duration_is_done() {
        let p = job(&["p1"], 4000).project(T0 + 4000);
        assert_eq!(p.status, JobStatus::Done);
        assert_eq!(p.progress, 100);
        assert_eq!(p.eta, None);

        let later = job(&["p1"], 4000).project(T0 + 60_000);
        assert_eq!(later.progress, 100);
    }

    #[test]
    fn test_clock_before_creation_clamps_to_zero() {
        let p = job(&["p1"], 4000).project(T0 - 10_000);
        assert_eq!(p.status, JobStatus::Queued);
        assert_eq!(p.progress, 0);
    }

    #[test]
    fn test_eta_never_below_one_second() {
        let p = job(&["p1"], 10_000).project(T0 + 9_900);
        assert_eq!(p.status, JobStatus::Running);
        assert_eq!(p.eta, Some(1));
    }

    #[test]
    fn test_pinned_error_wins_over_time() {
        let mut j = job(&["p1"], 4000);
        j.status = JobStatus::Error;
        let p = j.project(T0 + 100_000);
        assert_eq!(p.status, JobStatus::Error);
        assert_eq!(p.eta, None);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let j = job(&["p1", "p2"], 7_321);
        let mut last = 0;
        for step in 0..100 {
            let p = j.project(T0 + step * 97);
            assert!(p.progress >= last);
            last = p.progress;
        }
    }

    #[test]
    fn test_synthesized_downloads() {
        let expires = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let downloads = job(&["p1", "p2"], 4000)
            .synthesize_downloads("https://cdn.example/exports/", expires);
        assert_eq!(downloads.len(), 2);
        assert_eq!(downloads[0].url, "https://cdn.example/exports/a1-p1.mp4");
        assert_eq!(downloads[1].preset_id, "p2");
        assert_eq!(downloads[0].expires_at, "2024-01-02T03:04:05.000Z");
    }

    #[test]
    fn test_job_json_shape() {
        let j = job(&["p1"], 4000);
        let json = serde_json::to_value(&j).unwrap();
        assert_eq!(json["assetId"], "a1");
        assert_eq!(json["createdAt"], T0);
        assert_eq!(json["status"], "queued");
        assert!(json.get("downloads").is_none());

        let back: RenderJob = serde_json::from_value(json).unwrap();
        assert_eq!(back, j);
    }

    #[test]
    fn test_next_id_is_unique() {
        let a = RenderJob::next_id(T0);
        let b = RenderJob::next_id(T0);
        assert!(a.starts_with("job_1700000000000_"));
        assert_ne!(a, b);
    }
}
