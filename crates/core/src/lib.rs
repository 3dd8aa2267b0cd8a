pub mod config;
pub mod image;

pub use config::{Config, ConfigError};
pub use image::ImageReference;
