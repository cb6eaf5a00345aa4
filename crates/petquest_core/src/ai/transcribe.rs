use super::MediaInput;
use crate::error::AppError;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const API_KEY_ENV_VAR: &str = "DEEPGRAM_API_KEY";
const LISTEN_URL: &str = "https://api.deepgram.com/v1/listen?model=nova-2&language=en&smart_format=true";

/// Speech-to-text provider. May return an empty string for silent audio.
pub trait Transcriber {
    fn transcribe(&self, audio: &MediaInput) -> Result<String, AppError>;
}

#[derive(Debug, Clone)]
pub struct DeepgramTranscriber {
    api_key: String,
    client: reqwest::blocking::Client,
}

impl DeepgramTranscriber {
    pub fn new(api_key: impl Into<String>, timeout_secs: u64) -> Result<Self, AppError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| AppError::unavailable(format!("http client: {err}")))?;
        Ok(Self {
            api_key: api_key.into(),
            client,
        })
    }

    pub fn from_env(timeout_secs: u64) -> Result<Self, AppError> {
        let key = std::env::var(API_KEY_ENV_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::unavailable("DEEPGRAM_API_KEY is not set"))?;
        Self::new(key.trim(), timeout_secs)
    }
}

impl Transcriber for DeepgramTranscriber {
    fn transcribe(&self, audio: &MediaInput) -> Result<String, AppError> {
        debug!(mime = %audio.mime_type, bytes = audio.data.len(), "sending audio for transcription");
        let response = self
            .client
            .post(LISTEN_URL)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", audio.mime_type.as_str())
            .body(audio.data.clone())
            .send()
            .map_err(|err| AppError::unavailable(format!("transcription request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::unavailable(format!("transcription returned {status}")));
        }

        let body: Value = response
            .json()
            .map_err(|err| AppError::unavailable(format!("transcription response unreadable: {err}")))?;
        Ok(transcript_from(&body))
    }
}

fn transcript_from(body: &Value) -> String {
    body.pointer("/results/channels/0/alternatives/0/transcript")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Transcribes and trims; silence is an input error, not an empty task.
pub fn transcript_or_error(transcriber: &dyn Transcriber, audio: &MediaInput) -> Result<String, AppError> {
    let transcript = transcriber.transcribe(audio)?;
    let transcript = transcript.trim();
    if transcript.is_empty() {
        return Err(AppError::invalid_input("no speech detected in audio"));
    }
    Ok(transcript.to_string())
}

#[cfg(test)]
mod tests {
    use super::{Transcriber, transcript_from, transcript_or_error};
    use crate::ai::MediaInput;
    use crate::error::AppError;

    struct FixedTranscriber(&'static str);

    impl Transcriber for FixedTranscriber {
        fn transcribe(&self, _audio: &MediaInput) -> Result<String, AppError> {
            Ok(self.0.to_string())
        }
    }

    fn audio() -> MediaInput {
        MediaInput {
            mime_type: "audio/wav".to_string(),
            data: vec![0; 4],
        }
    }

    #[test]
    fn silent_audio_is_rejected() {
        let err = transcript_or_error(&FixedTranscriber("   "), &audio()).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        assert!(err.message().contains("no speech"));
    }

    #[test]
    fn transcript_is_trimmed() {
        let text = transcript_or_error(&FixedTranscriber(" buy milk tomorrow \n"), &audio()).unwrap();
        assert_eq!(text, "buy milk tomorrow");
    }

    #[test]
    fn transcript_read_from_first_alternative() {
        let body = serde_json::json!({
            "results": {"channels": [{"alternatives": [{"transcript": "walk the dog"}]}]}
        });
        assert_eq!(transcript_from(&body), "walk the dog");
        assert_eq!(transcript_from(&serde_json::json!({})), "");
    }
}
