use super::error::ConfigError;
use super::settings::{AppConfig, RagSettings};

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_non_empty_string("server.host", &config.server.host)?;
    validate_u64_field("server.port", u64::from(config.server.port), 1, 65535)?;

    validate_non_empty_string("gemini.base_url", &config.gemini.base_url)?;
    validate_non_empty_string("gemini.embedding_model", &config.gemini.embedding_model)?;
    validate_string_array_field("gemini.candidate_models", &config.gemini.candidate_models)?;
    validate_u64_field(
        "gemini.request_timeout_secs",
        config.gemini.request_timeout_secs,
        1,
        3_600,
    )?;

    validate_u64_field("upload.max_bytes", config.upload.max_bytes, 1, 1_000_000_000)?;

    validate_rag_settings("themes.legal.rag", &config.themes.legal.rag)?;
    validate_rag_settings("themes.ghost.rag", &config.themes.ghost.rag)?;

    Ok(())
}

/// Rejects chunking parameters that would stall the sliding window.
pub fn validate_rag_settings(path: &str, rag: &RagSettings) -> Result<(), ConfigError> {
    validate_u64_field(
        &format!("{}.chunk_size", path),
        rag.chunk_size as u64,
        1,
        1_000_000,
    )?;
    if rag.chunk_overlap >= rag.chunk_size {
        return Err(ConfigError::invalid(
            format!("{}.chunk_overlap", path),
            format!(
                "must be less than chunk_size ({} >= {})",
                rag.chunk_overlap, rag.chunk_size
            ),
        ));
    }
    validate_u64_field(&format!("{}.top_k", path), rag.top_k as u64, 1, 1_000)?;
    validate_f32_field(
        &format!("{}.relevance_threshold", path),
        rag.relevance_threshold,
        0.0,
        2.0,
    )?;
    Ok(())
}

fn validate_u64_field(path: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::invalid(
            path,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

fn validate_f32_field(path: &str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConfigError::invalid(
            path,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

fn validate_non_empty_string(path: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(path, "value cannot be empty"));
    }
    Ok(())
}

fn validate_string_array_field(path: &str, items: &[String]) -> Result<(), ConfigError> {
    if items.is_empty() {
        return Err(ConfigError::invalid(path, "at least one entry is required"));
    }
    for (index, item) in items.iter().enumerate() {
        validate_non_empty_string(&format!("{}[{}]", path, index), item)?;
    }
    Ok(())
}
