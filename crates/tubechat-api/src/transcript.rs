use tracing::{info, warn};
use uuid::Uuid;

use tubechat_db::{Database, is_constraint_violation, timestamp_now};
use tubechat_types::models::Transcript;

use crate::error::{ApiError, ApiResult};
use crate::youtube::{FetchedTranscript, SourceError, TranscriptSource, extract_video_id};

/// Transcript cache. The database row is the cache: once a video URL has
/// been fetched it is never fetched again.
pub struct TranscriptService<'a> {
    db: &'a Database,
    source: &'a dyn TranscriptSource,
    languages: &'a [String],
}

impl<'a> TranscriptService<'a> {
    pub fn new(db: &'a Database, source: &'a dyn TranscriptSource, languages: &'a [String]) -> Self {
        Self {
            db,
            source,
            languages,
        }
    }

    pub async fn get_or_fetch(&self, video_url: &str) -> ApiResult<Transcript> {
        if let Some(existing) = self.cached(video_url)? {
            return Ok(existing);
        }
        let transcript = self.fetch(video_url).await?;
        self.store(transcript)
    }

    /// Exact match on the stored URL.
    pub fn cached(&self, video_url: &str) -> ApiResult<Option<Transcript>> {
        Ok(self.db.repo::<Transcript>().by_video_url(video_url)?)
    }

    /// Ask the source for the video's captions and build an unsaved row.
    /// Touches no storage. An empty or zero-length result is rejected so
    /// that it never lands in the cache.
    pub async fn fetch(&self, video_url: &str) -> ApiResult<Transcript> {
        let video_id = extract_video_id(video_url).ok_or_else(|| {
            ApiError::validation(format!("Could not extract video ID from URL: {}", video_url))
        })?;

        let fetched = self
            .source
            .fetch(&video_id, self.languages)
            .await
            .map_err(|e| source_error(e, video_url))?;
        info!(
            "Fetched transcript for {} ({} segments)",
            video_id,
            fetched.segments.len()
        );

        let transcript = assemble(video_url, fetched);
        if transcript.transcript_text.as_deref().is_none_or(|t| t.trim().is_empty()) {
            warn!("Source returned no caption text for {}", video_url);
            return Err(ApiError::validation(format!(
                "No transcript found for video: {}",
                video_url
            )));
        }
        if transcript.duration.is_some_and(|d| d <= 0.0) {
            return Err(ApiError::validation("Transcript duration must be positive"));
        }
        Ok(transcript)
    }

    /// Persist a fetched row. Losing a race with a concurrent fetch of the
    /// same URL yields the row that won.
    pub fn store(&self, transcript: Transcript) -> ApiResult<Transcript> {
        let repo = self.db.repo::<Transcript>();
        let video_url = transcript.video_url.clone();
        match repo.create(transcript) {
            Ok(created) => Ok(created),
            Err(e) if is_constraint_violation(&e) => {
                warn!("Transcript for {} was stored concurrently", video_url);
                repo.by_video_url(&video_url)?.ok_or(ApiError::Internal(e))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, transcript_id: Uuid) -> ApiResult<Transcript> {
        self.db
            .repo::<Transcript>()
            .get(transcript_id)?
            .ok_or_else(|| ApiError::not_found("Transcript not found"))
    }

    pub fn list(&self, skip: u32, limit: u32) -> ApiResult<Vec<Transcript>> {
        Ok(self.db.repo::<Transcript>().get_all(skip, limit)?)
    }

    /// Chats that referenced the transcript keep existing, unanchored.
    pub fn delete(&self, transcript_id: Uuid) -> ApiResult<()> {
        if !self.db.repo::<Transcript>().delete(transcript_id)? {
            return Err(ApiError::not_found("Transcript not found"));
        }
        info!("Deleted transcript {}", transcript_id);
        Ok(())
    }
}

fn assemble(video_url: &str, fetched: FetchedTranscript) -> Transcript {
    let duration = fetched.segments.last().map(|s| s.start + s.duration);
    let text = fetched
        .segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    Transcript {
        transcript_id: Uuid::new_v4(),
        video_url: video_url.to_string(),
        transcript_text: Some(text),
        language: fetched.language,
        duration,
        created_at: timestamp_now(),
    }
}

fn source_error(err: SourceError, video_url: &str) -> ApiError {
    let msg = match err {
        SourceError::Disabled => format!("Transcripts are disabled for video: {}", video_url),
        SourceError::NotFound => format!("No transcript found for video: {}", video_url),
        SourceError::Unavailable => format!("Video is unavailable: {}", video_url),
        SourceError::Request(m) => format!("Error fetching transcript: {}", m),
    };
    warn!("{}", msg);
    ApiError::Validation(msg)
}
