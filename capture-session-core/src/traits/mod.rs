pub mod audio_platform;
pub mod continuity_keeper;
pub mod interruption_source;
pub mod session_delegate;
