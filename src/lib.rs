pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod meal;
pub mod patterns;
pub mod providers;
pub mod session;

pub use audio::{AudioCapture, AudioClip, AudioFile, AudioPlayer, PlaybackOutcome, WavFileCapture};
pub use config::Config;
pub use error::{SessionError, VoiceError};
pub use http::{create_router, AppState};
pub use meal::{FinalizedMeal, MealLog, MealSink, SatietyTier};
pub use patterns::{MealHistory, PatternsReport};
pub use session::{Collaborators, SessionState, StateChange, VoiceController};
