//! Audio input parameters for speech turns.
//!
//! Defaults follow the remote service's recommended capture settings: 16 kHz
//! linear PCM, single-utterance recognition. Every recognized encoding is
//! enumerated here; anything else is rejected before a request is built.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Audio encodings accepted by the Dialogflow CX speech recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioEncoding {
    #[serde(rename = "AUDIO_ENCODING_LINEAR_16")]
    Linear16,
    #[serde(rename = "AUDIO_ENCODING_FLAC")]
    Flac,
    #[serde(rename = "AUDIO_ENCODING_MULAW")]
    Mulaw,
    #[serde(rename = "AUDIO_ENCODING_AMR")]
    Amr,
    #[serde(rename = "AUDIO_ENCODING_AMR_WB")]
    AmrWb,
    #[serde(rename = "AUDIO_ENCODING_OGG_OPUS")]
    OggOpus,
    #[serde(rename = "AUDIO_ENCODING_SPEEX_WITH_HEADER_BYTE")]
    SpeexWithHeaderByte,
    #[serde(rename = "AUDIO_ENCODING_ALAW")]
    Alaw,
}

impl AudioEncoding {
    /// Wire name as the remote API spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEncoding::Linear16 => "AUDIO_ENCODING_LINEAR_16",
            AudioEncoding::Flac => "AUDIO_ENCODING_FLAC",
            AudioEncoding::Mulaw => "AUDIO_ENCODING_MULAW",
            AudioEncoding::Amr => "AUDIO_ENCODING_AMR",
            AudioEncoding::AmrWb => "AUDIO_ENCODING_AMR_WB",
            AudioEncoding::OggOpus => "AUDIO_ENCODING_OGG_OPUS",
            AudioEncoding::SpeexWithHeaderByte => "AUDIO_ENCODING_SPEEX_WITH_HEADER_BYTE",
            AudioEncoding::Alaw => "AUDIO_ENCODING_ALAW",
        }
    }

    /// All recognized wire names, for validation error messages.
    pub fn recognized() -> &'static [&'static str] {
        &[
            "AUDIO_ENCODING_LINEAR_16",
            "AUDIO_ENCODING_FLAC",
            "AUDIO_ENCODING_MULAW",
            "AUDIO_ENCODING_AMR",
            "AUDIO_ENCODING_AMR_WB",
            "AUDIO_ENCODING_OGG_OPUS",
            "AUDIO_ENCODING_SPEEX_WITH_HEADER_BYTE",
            "AUDIO_ENCODING_ALAW",
        ]
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUDIO_ENCODING_LINEAR_16" => Ok(AudioEncoding::Linear16),
            "AUDIO_ENCODING_FLAC" => Ok(AudioEncoding::Flac),
            "AUDIO_ENCODING_MULAW" => Ok(AudioEncoding::Mulaw),
            "AUDIO_ENCODING_AMR" => Ok(AudioEncoding::Amr),
            "AUDIO_ENCODING_AMR_WB" => Ok(AudioEncoding::AmrWb),
            "AUDIO_ENCODING_OGG_OPUS" => Ok(AudioEncoding::OggOpus),
            "AUDIO_ENCODING_SPEEX_WITH_HEADER_BYTE" => Ok(AudioEncoding::SpeexWithHeaderByte),
            "AUDIO_ENCODING_ALAW" => Ok(AudioEncoding::Alaw),
            other => Err(format!(
                "unrecognized audio encoding '{}', expected one of: {}",
                other,
                AudioEncoding::recognized().join(", ")
            )),
        }
    }
}

/// Input audio parameters, resolved once at the call boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    pub encoding: AudioEncoding,
    pub sample_rate_hertz: u32,
    pub single_utterance: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            encoding: AudioEncoding::Linear16,
            sample_rate_hertz: 16_000,
            single_utterance: true,
        }
    }
}

impl AudioConfig {
    /// Resolve caller-supplied overrides against the defaults.
    pub fn resolve(
        sample_rate_hertz: Option<u32>,
        encoding: Option<&str>,
    ) -> Result<Self, String> {
        let mut config = AudioConfig::default();
        if let Some(rate) = sample_rate_hertz {
            config.sample_rate_hertz = rate;
        }
        if let Some(name) = encoding {
            config.encoding = name.parse()?;
        }
        Ok(config)
    }
}
