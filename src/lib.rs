pub mod args;
pub mod audio;
pub mod config;
pub mod pipeline;
pub mod segment;
pub mod text;
pub mod thread;
pub mod translate;
pub mod tts;
