pub mod config;
pub mod server;
pub mod session;
pub mod web;

pub use config::ViewerConfig;
pub use server::{router, run, AppState, ViewerError};
pub use session::{run_frames, Session, SettingsReply};
