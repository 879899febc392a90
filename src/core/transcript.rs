use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use yt_transcript_rs::api::YouTubeTranscriptApi;

const CANONICAL_PREFIX: &str = "https://www.youtube.com/watch?v=";
const SHORT_PREFIX: &str = "https://youtu.be/";
const MAX_VIDEO_ID_LEN: usize = 128;

/// One caption line as returned by the transcript service.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionFragment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Captions flattened into newline-joined text. Timing is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub video_id: String,
    pub text: String,
    pub fragment_count: usize,
}

#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch_fragments(&self, video_id: &str) -> Result<Vec<CaptionFragment>>;
}

#[derive(Clone)]
pub struct YouTubeSource {
    api: YouTubeTranscriptApi,
    languages: Vec<String>,
}

impl YouTubeSource {
    pub fn new(languages: Vec<String>) -> Result<Self> {
        let api = YouTubeTranscriptApi::new(None, None, None)
            .map_err(|e| Error::custom(format!("Failed to initialise transcript client: {e}")))?;
        Ok(Self { api, languages })
    }
}

#[async_trait]
impl TranscriptSource for YouTubeSource {
    async fn fetch_fragments(&self, video_id: &str) -> Result<Vec<CaptionFragment>> {
        let languages: Vec<&str> = self.languages.iter().map(String::as_str).collect();

        let fetched = self
            .api
            .fetch_transcript(video_id, &languages, false)
            .await
            .map_err(|e| Error::TranscriptUnavailable {
                video_id: video_id.to_string(),
                reason: e.to_string(),
            })?;

        Ok(fetched
            .snippets
            .into_iter()
            .map(|snippet| CaptionFragment {
                text: snippet.text,
                start: snippet.start,
                duration: snippet.duration,
            })
            .collect())
    }
}

#[derive(Clone)]
pub struct TranscriptService {
    source: Arc<dyn TranscriptSource>,
}

impl TranscriptService {
    pub fn new(config: &Config) -> Result<Self> {
        let source = YouTubeSource::new(config.languages.clone())?;
        Ok(Self::with_source(Arc::new(source)))
    }

    pub fn with_source(source: Arc<dyn TranscriptSource>) -> Self {
        Self { source }
    }

    /// Resolve `video_url` to a video ID and return its captions as one text blob.
    pub async fn fetch_transcript(&self, video_url: &str) -> Result<Transcript> {
        let video_id = extract_video_id(video_url)?;
        debug!(%video_id, "fetching transcript");

        let fragments = self.source.fetch_fragments(&video_id).await.map_err(|e| {
            warn!(%video_id, error = %e, "transcript fetch failed");
            match e {
                Error::TranscriptUnavailable { .. } => e,
                other => Error::TranscriptUnavailable {
                    video_id: video_id.clone(),
                    reason: other.to_string(),
                },
            }
        })?;

        let text = join_fragments(&fragments);
        if text.trim().is_empty() {
            return Err(Error::EmptyTranscript { video_id });
        }

        let seconds = fragments
            .last()
            .map(|last| last.start + last.duration)
            .unwrap_or_default();
        debug!(%video_id, fragments = fragments.len(), seconds, "transcript fetched");

        Ok(Transcript {
            video_id,
            fragment_count: fragments.len(),
            text,
        })
    }
}

fn join_fragments(fragments: &[CaptionFragment]) -> String {
    fragments
        .iter()
        .map(|fragment| html_escape::decode_html_entities(fragment.text.trim()).into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rewrite `https://youtu.be/<id>` links into the long `watch?v=` form.
/// Anything else, canonical URLs included, comes back unchanged.
pub fn normalize_youtube_url(url: &str) -> String {
    if url.starts_with(CANONICAL_PREFIX) {
        return url.to_string();
    }

    if let Some(rest) = url.strip_prefix(SHORT_PREFIX) {
        let video_id: String = rest
            .chars()
            .take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '-'))
            .collect();
        if !video_id.is_empty() {
            return format!("{CANONICAL_PREFIX}{video_id}");
        }
    }

    url.to_string()
}

pub fn extract_video_id(url: &str) -> Result<String> {
    let normalized = normalize_youtube_url(url.trim());

    let raw_id = match normalized.rsplit_once("v=") {
        Some((_, tail)) => tail.split(['&', '#']).next().unwrap_or(tail),
        None => normalized.as_str(),
    };

    sanitize_video_id(raw_id).map_err(|_| Error::InvalidVideoUrl {
        input: url.to_string(),
    })
}

/// Ensure a video identifier is safe for downstream use (filesystem paths, API calls, etc.).
/// Only ASCII alphanumeric characters plus `_` and `-` are allowed.
pub fn sanitize_video_id(raw: &str) -> Result<String> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(Error::custom("Video ID cannot be empty"));
    }

    if trimmed.len() > MAX_VIDEO_ID_LEN {
        return Err(Error::custom("Video ID is unexpectedly long"));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
    {
        return Err(Error::custom(
            "Video ID contains unsupported characters; expected only letters, numbers, '-' or '_'",
        ));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeSource {
        result: Mutex<Option<Result<Vec<CaptionFragment>>>>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new(result: Result<Vec<CaptionFragment>>) -> Arc<Self> {
            Arc::new(Self {
                result: Mutex::new(Some(result)),
                requested: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TranscriptSource for FakeSource {
        async fn fetch_fragments(&self, video_id: &str) -> Result<Vec<CaptionFragment>> {
            self.requested.lock().unwrap().push(video_id.to_string());
            self.result.lock().unwrap().take().expect("single fetch")
        }
    }

    fn fragment(text: &str) -> CaptionFragment {
        CaptionFragment {
            text: text.to_string(),
            start: 0.0,
            duration: 1.0,
        }
    }

    #[test]
    fn short_url_becomes_canonical() {
        assert_eq!(
            normalize_youtube_url("https://youtu.be/abc123"),
            "https://www.youtube.com/watch?v=abc123"
        );
    }

    #[test]
    fn short_url_drops_trailing_query() {
        assert_eq!(
            normalize_youtube_url("https://youtu.be/b2Qps-Ed_fk?t=30"),
            "https://www.youtube.com/watch?v=b2Qps-Ed_fk"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        for url in [
            "https://youtu.be/abc123",
            "https://www.youtube.com/watch?v=abc123&t=4",
            "https://vimeo.com/123",
            "not a url",
            "",
        ] {
            let once = normalize_youtube_url(url);
            assert_eq!(normalize_youtube_url(&once), once, "input: {url}");
        }
    }

    #[test]
    fn unknown_urls_pass_through() {
        assert_eq!(
            normalize_youtube_url("https://vimeo.com/123"),
            "https://vimeo.com/123"
        );
        assert_eq!(normalize_youtube_url("https://youtu.be/"), "https://youtu.be/");
    }

    #[test]
    fn extracts_id_before_extra_params() {
        let id = extract_video_id("https://www.youtube.com/watch?v=b2QpsIdEkfk&list=PL1")
            .expect("valid url");
        assert_eq!(id, "b2QpsIdEkfk");
        assert_eq!(extract_video_id(" https://youtu.be/xyz ").unwrap(), "xyz");
        assert_eq!(extract_video_id("dQw4w9WgXcQ").unwrap(), "dQw4w9WgXcQ");
    }

    #[test]
    fn malformed_url_is_rejected() {
        assert!(matches!(
            extract_video_id("https://vimeo.com/123"),
            Err(Error::InvalidVideoUrl { .. })
        ));
        assert!(matches!(
            extract_video_id("https://www.youtube.com/watch?v="),
            Err(Error::InvalidVideoUrl { .. })
        ));
    }

    #[test]
    fn allows_expected_characters() {
        let id = sanitize_video_id("abcDEF123-_x").expect("valid ID");
        assert_eq!(id, "abcDEF123-_x");
    }

    #[test]
    fn rejects_invalid_chars() {
        assert!(sanitize_video_id("abc/../../etc").is_err());
    }

    #[test]
    fn rejects_too_long() {
        let long = "a".repeat(MAX_VIDEO_ID_LEN + 1);
        assert!(sanitize_video_id(&long).is_err());
    }

    #[tokio::test]
    async fn joins_fragments_with_newlines() {
        let source = FakeSource::new(Ok(vec![
            fragment(" buy when RSI is low "),
            fragment("it&#39;s a MACD &amp; RSI combo"),
            fragment("   "),
        ]));
        let service = TranscriptService::with_source(source.clone());

        let transcript = service
            .fetch_transcript("https://youtu.be/abc123")
            .await
            .expect("transcript");

        assert_eq!(transcript.video_id, "abc123");
        assert_eq!(
            transcript.text,
            "buy when RSI is low\nit's a MACD & RSI combo"
        );
        assert_eq!(transcript.fragment_count, 3);
        assert_eq!(*source.requested.lock().unwrap(), vec!["abc123"]);
    }

    #[tokio::test]
    async fn service_failure_is_a_typed_error() {
        let source = FakeSource::new(Err(Error::custom("video unavailable")));
        let service = TranscriptService::with_source(source);

        let err = service
            .fetch_transcript("https://www.youtube.com/watch?v=abc123")
            .await
            .unwrap_err();

        match err {
            Error::TranscriptUnavailable { video_id, reason } => {
                assert_eq!(video_id, "abc123");
                assert!(reason.contains("video unavailable"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_captions_are_not_a_success() {
        let source = FakeSource::new(Ok(vec![fragment(""), fragment("  ")]));
        let service = TranscriptService::with_source(source);

        let err = service.fetch_transcript("abc123").await.unwrap_err();
        assert!(matches!(err, Error::EmptyTranscript { .. }));
    }
}
