use std::sync::Arc;

use tubechat_db::Database;
use tubechat_llm::Generate;

use crate::credentials::TokenIssuer;
use crate::youtube::TranscriptSource;

pub type AppState = Arc<AppStateInner>;

/// Everything a request handler needs. The LLM and transcript backends
/// sit behind traits so tests can swap in fakes.
pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenIssuer,
    pub llm: Arc<dyn Generate>,
    pub transcripts: Arc<dyn TranscriptSource>,
    pub transcript_languages: Vec<String>,
}
