pub mod capture;
pub mod file;
pub mod playback;
pub mod signal;

pub use capture::{AudioCapture, AudioClip, RecordingHandle};
pub use file::{AudioFile, WavFileCapture, WAV_MIME};
pub use playback::{AudioPlayer, DiscardPlayer, FilePlayer, PlaybackOutcome, SpeechAudio};
pub use signal::{stop_pair, StopSignal, StopTrigger};
