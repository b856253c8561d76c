pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.3;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

// 10 MiB, same ceiling the upload form enforces client side.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Generation models tried in order before falling back to discovery.
pub fn default_candidate_models() -> Vec<String> {
    [
        "gemini-2.5-flash",
        "gemini-2.0-flash",
        "gemini-1.5-flash",
        "gemini-1.5-flash-latest",
        "gemini-pro",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub fn default_local_origins() -> Vec<String> {
    [
        "http://localhost",
        "http://localhost:5000",
        "http://127.0.0.1",
        "http://127.0.0.1:5000",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
