//! kda-voice: speech endpoints for the kidney decision aid
//!
//! Wraps the OpenAI audio APIs used by `/api/transcribe` and
//! `/api/synthesize`: Whisper speech-to-text and TTS synthesis.

pub mod error;
pub mod speech;
pub mod transcribe;

pub use error::{Result, VoiceError};
pub use speech::{AudioFormat, SpeechClient, SpeechConfig, SynthesisResult};
pub use transcribe::{TranscribeClient, TranscribeConfig, TranscriptionResult};
