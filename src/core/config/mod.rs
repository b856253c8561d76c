pub mod defaults;
pub mod error;
pub mod paths;
pub mod service;
pub mod settings;
pub mod validation;

pub use error::ConfigError;
pub use paths::AppPaths;
pub use service::ConfigService;
pub use settings::{
    AppConfig, GeminiConfig, RagSettings, ServerConfig, ThemeSection, ThemesConfig, UploadConfig,
};
