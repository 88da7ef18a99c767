// THEORY:
// OCR is an external collaborator. The engine hands it the creative as PNG plus a
// language hint and only cares about the words that come back: trimmed, non-empty, and
// counted. No recognizer is bundled; `NoOcr` stands in when none is wired up, and
// `TranscriptOcr` replays text that was recognized elsewhere.

use crate::error::OcrError;

/// Language hint sent with every request (German + English creatives).
pub const DEFAULT_OCR_LANGUAGE: &str = "deu+eng";

/// A single recognized word record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrWord {
    pub text: String,
}

impl OcrWord {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Text recognition abstraction.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, png: &[u8], language: &str) -> Result<Vec<OcrWord>, OcrError>;
}

/// Keeps the trimmed, non-empty word texts.
pub fn recognized_words(words: Vec<OcrWord>) -> Vec<String> {
    words
        .into_iter()
        .map(|word| word.text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect()
}

/// An engine that never finds text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOcr;

impl OcrEngine for NoOcr {
    fn recognize(&self, _png: &[u8], _language: &str) -> Result<Vec<OcrWord>, OcrError> {
        Ok(Vec::new())
    }
}

/// Replays a transcript recognized ahead of time, one word per whitespace-separated token.
#[derive(Debug, Clone, Default)]
pub struct TranscriptOcr {
    transcript: String,
}

impl TranscriptOcr {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
        }
    }
}

impl OcrEngine for TranscriptOcr {
    fn recognize(&self, _png: &[u8], _language: &str) -> Result<Vec<OcrWord>, OcrError> {
        Ok(self.transcript.split_whitespace().map(OcrWord::new).collect())
    }
}
