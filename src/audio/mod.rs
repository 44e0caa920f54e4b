//! Audio pipeline: capture, transcription, and synthesis via external
//! command-line tools.

pub mod chunk;
pub mod recorder;
pub mod tts;

pub use recorder::{Recorder, RecordingStarted};
