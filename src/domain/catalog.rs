//! Built-in analysis results used when no worker is configured, plus the
//! royalty-free track list offered by music recommendations.

use serde::Serialize;

pub const DEFAULT_BPM: u32 = 130;
const BEAT_GRID_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightSegment {
    pub id: &'static str,
    pub start: f64,
    pub end: f64,
    pub label: &'static str,
    pub confidence: f64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub url: &'static str,
    pub title: &'static str,
    pub bpm: u32,
    pub mood: &'static str,
    pub energy: f64,
    pub license: &'static str,
}

pub fn demo_highlights() -> Vec<HighlightSegment> {
    vec![
        HighlightSegment {
            id: "s1",
            start: 1.0,
            end: 2.6,
            label: "dunk",
            confidence: 0.9,
            score: 0.92,
        },
        HighlightSegment {
            id: "s2",
            start: 5.2,
            end: 7.4,
            label: "three",
            confidence: 0.85,
            score: 0.88,
        },
    ]
}

/// Beat timestamps in seconds, evenly spaced at `bpm`.
pub fn beat_grid(bpm: u32) -> Vec<f64> {
    let bpm = bpm.max(1) as f64;
    (0..BEAT_GRID_LEN).map(|i| i as f64 * 60.0 / bpm).collect()
}

const TRACKS: &[Track] = &[
    Track {
        url: "https://cdn.example/hype1.mp3",
        title: "Fast Break",
        bpm: 132,
        mood: "hype",
        energy: 0.9,
        license: "royalty-free",
    },
    Track {
        url: "https://cdn.example/hype2.mp3",
        title: "Full Court Press",
        bpm: 126,
        mood: "intense",
        energy: 0.86,
        license: "royalty-free",
    },
];

/// Tracks whose title or mood contains `query` (case-insensitive), or all.
pub fn recommend_tracks(query: Option<&str>) -> Vec<Track> {
    let needle = query
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    TRACKS
        .iter()
        .filter(|t| match &needle {
            Some(q) => t.title.to_lowercase().contains(q) || t.mood.contains(q.as_str()),
            None => true,
        })
        .cloned()
        .collect()
}
