pub mod environment;
pub mod loader;
pub mod settings;
