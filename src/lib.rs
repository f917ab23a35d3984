pub mod android_jni;
pub mod camera;
pub mod command;
pub mod config;
pub mod error;
pub mod format;
pub mod geo;
pub mod gpx;
pub mod guidance;
pub mod host;
pub mod resample;
pub mod session;
pub mod simulation;
pub mod snap;
pub mod speed;

pub use error::{Error, Result, StartError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
