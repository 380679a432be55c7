//! YouTube caption retrieval.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

static VIDEO_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:youtube\.com/watch\?v=|youtu\.be/)([^&\n?#]+)",
        r"youtube\.com/embed/([^&\n?#]+)",
        r"youtube\.com/v/([^&\n?#]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("video id pattern must compile"))
    .collect()
});

/// Pull the video id out of any accepted URL shape.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    /// Seconds from the start of the video.
    pub start: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FetchedTranscript {
    pub segments: Vec<Segment>,
    pub language: Option<String>,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("transcripts are disabled")]
    Disabled,
    #[error("no transcript in the requested languages")]
    NotFound,
    #[error("video is unavailable")]
    Unavailable,
    #[error("{0}")]
    Request(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Request(err.to_string())
    }
}

/// External caption provider.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch(&self, video_id: &str, languages: &[String]) -> Result<FetchedTranscript, SourceError>;
}

const WATCH_URL: &str = "https://www.youtube.com/watch";

/// Reads the caption track list embedded in the watch page and downloads
/// the chosen track as `json3`.
pub struct YouTubeSource {
    client: reqwest::Client,
    watch_url: String,
}

impl YouTubeSource {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) tubechat")
            .build()?;
        Ok(Self {
            client,
            watch_url: WATCH_URL.to_string(),
        })
    }
}

#[async_trait]
impl TranscriptSource for YouTubeSource {
    async fn fetch(&self, video_id: &str, languages: &[String]) -> Result<FetchedTranscript, SourceError> {
        let page = self
            .client
            .get(&self.watch_url)
            .query(&[("v", video_id)])
            .header("Accept-Language", "en-US")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let tracks = caption_tracks(&page)?;
        debug!("Video {} offers {} caption tracks", video_id, tracks.len());

        let track = select_track(&tracks, languages).ok_or(SourceError::NotFound)?;
        let payload: Json3 = self
            .client
            .get(format!("{}&fmt=json3", track.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(FetchedTranscript {
            segments: payload.into_segments(),
            language: Some(track.language_code.clone()),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    /// `asr` marks auto-generated captions.
    #[serde(default)]
    kind: Option<String>,
}

impl CaptionTrack {
    fn generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

fn caption_tracks(page: &str) -> Result<Vec<CaptionTrack>, SourceError> {
    const MARKER: &str = "\"captionTracks\":";

    let Some(pos) = page.find(MARKER) else {
        if page.contains("\"playabilityStatus\":{\"status\":\"ERROR\"") {
            return Err(SourceError::Unavailable);
        }
        return Err(SourceError::Disabled);
    };

    // The track array is a JSON value embedded in a script; parse just it
    // and ignore the rest of the page.
    let rest = &page[pos + MARKER.len()..];
    serde_json::Deserializer::from_str(rest)
        .into_iter::<Vec<CaptionTrack>>()
        .next()
        .ok_or(SourceError::Disabled)?
        .map_err(|e| SourceError::Request(format!("unreadable caption track list: {}", e)))
}

/// First language match wins; manual tracks beat auto-generated ones.
fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    [false, true].into_iter().find_map(|generated| {
        languages.iter().find_map(|lang| {
            tracks
                .iter()
                .find(|t| t.generated() == generated && &t.language_code == lang)
        })
    })
}

#[derive(Debug, Deserialize)]
struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

impl Json3 {
    fn into_segments(self) -> Vec<Segment> {
        self.events
            .into_iter()
            .filter_map(|event| {
                let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
                let text = text.replace('\n', " ").trim().to_string();
                (!text.is_empty()).then(|| Segment {
                    text,
                    start: event.t_start_ms as f64 / 1000.0,
                    duration: event.d_duration_ms as f64 / 1000.0,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_url_shapes() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "https://youtu.be/dQw4w9WgXcQ?si=abc",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "http://youtube.com/v/dQw4w9WgXcQ#t=1",
        ] {
            assert_eq!(extract_video_id(url).as_deref(), Some("dQw4w9WgXcQ"), "{url}");
        }
    }

    #[test]
    fn every_url_pattern_compiles_and_is_used() {
        assert_eq!(VIDEO_ID_PATTERNS.len(), 3);
        let shapes = [
            "https://youtu.be/abc",
            "https://www.youtube.com/embed/abc",
            "https://www.youtube.com/v/abc",
        ];
        for (re, url) in VIDEO_ID_PATTERNS.iter().zip(shapes) {
            assert_eq!(&re.captures(url).unwrap()[1], "abc", "{url}");
        }
    }

    #[test]
    fn unrecognised_urls_yield_nothing() {
        assert_eq!(extract_video_id("https://vimeo.com/123456"), None);
        assert_eq!(extract_video_id("not a url"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn caption_tracks_are_read_from_page() {
        let page = r#"<script>var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=x&lang=en","languageCode":"en","kind":"asr"},{"baseUrl":"https://www.youtube.com/api/timedtext?v=x&lang=de","languageCode":"de"}],"audioTracks":[]}}};</script>"#;

        let tracks = caption_tracks(page).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].base_url, "https://www.youtube.com/api/timedtext?v=x&lang=en");
        assert!(tracks[0].generated());
        assert!(!tracks[1].generated());
    }

    #[test]
    fn page_without_tracks() {
        assert!(matches!(caption_tracks("<html></html>"), Err(SourceError::Disabled)));
        assert!(matches!(
            caption_tracks(r#"{"playabilityStatus":{"status":"ERROR","reason":"Video unavailable"}}"#),
            Err(SourceError::Unavailable)
        ));
    }

    fn track(lang: &str, kind: Option<&str>) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://example.test/{lang}"),
            language_code: lang.into(),
            kind: kind.map(String::from),
        }
    }

    #[test]
    fn manual_tracks_preferred_over_generated() {
        let tracks = vec![track("en", Some("asr")), track("de", None), track("en", None)];
        let langs = vec!["en".to_string()];

        let chosen = select_track(&tracks, &langs).unwrap();
        assert_eq!(chosen.language_code, "en");
        assert!(!chosen.generated());
    }

    #[test]
    fn generated_track_used_as_fallback() {
        let tracks = vec![track("fr", None), track("en", Some("asr"))];
        let langs = vec!["en".to_string()];
        assert!(select_track(&tracks, &langs).unwrap().generated());
        assert!(select_track(&tracks, &["es".to_string()]).is_none());
    }

    #[test]
    fn json3_events_become_segments() {
        let raw = r#"{"events":[
            {"tStartMs":0,"dDurationMs":1500,"segs":[{"utf8":"hello "},{"utf8":"world"}]},
            {"tStartMs":1500,"dDurationMs":500,"segs":[{"utf8":"\n"}]},
            {"tStartMs":2000},
            {"tStartMs":2000,"dDurationMs":2500,"segs":[{"utf8":"again"}]}
        ]}"#;
        let segments = serde_json::from_str::<Json3>(raw).unwrap().into_segments();
        assert_eq!(
            segments,
            vec![
                Segment {
                    text: "hello world".into(),
                    start: 0.0,
                    duration: 1.5
                },
                Segment {
                    text: "again".into(),
                    start: 2.0,
                    duration: 2.5
                },
            ]
        );
    }
}
