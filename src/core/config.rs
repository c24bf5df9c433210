use std::env;

use thiserror::Error;

const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:3000",
    "http://localhost:8080",
];

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    server: ServerSettings,
    runtime: RuntimeSettings,
    api: ApiSettings,
    cors: CorsSettings,
    ai: AiSettings,
    detection: DetectionSettings,
    upload: UploadSettings,
    pipeline: PipelineSettings,
    results: ResultSettings,
    telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub(crate) struct ServerSettings {
    host: ServerHost,
    port: ServerPort,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiSettings {
    pub(crate) project_name: String,
    pub(crate) version: String,
    pub(crate) api_prefix: String,
}

#[derive(Debug, Clone)]
pub(crate) struct CorsSettings {
    pub(crate) origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct AiSettings {
    pub(crate) llm_api_key: String,
    pub(crate) llm_base_url: String,
    pub(crate) text_model: String,
    pub(crate) vision_model: String,
    pub(crate) embedding_model: String,
    pub(crate) max_tokens: u32,
    pub(crate) temperature: f64,
    pub(crate) request_timeout: u64,
    pub(crate) max_submit_retries: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct DetectionSettings {
    pub(crate) api_token: String,
    pub(crate) base_url: String,
    pub(crate) language: String,
    pub(crate) sandbox: bool,
    pub(crate) student_id: String,
    pub(crate) timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct UploadSettings {
    pub(crate) max_upload_size_mb: u64,
    pub(crate) allowed_image_extensions: Vec<String>,
    pub(crate) max_files_per_request: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct PipelineSettings {
    pub(crate) chunk_size_chars: usize,
    pub(crate) chunk_overlap_chars: usize,
    pub(crate) retrieval_top_k: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct ResultSettings {
    pub(crate) ttl_seconds: u64,
    pub(crate) max_entries: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct TelemetrySettings {
    pub(crate) log_level: String,
    pub(crate) json: bool,
    pub(crate) prometheus_enabled: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct RuntimeSettings {
    pub(crate) environment: Environment,
    pub(crate) strict_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Test => "test",
        }
    }

    fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ServerHost(String);

#[derive(Debug, Clone, Copy)]
pub(crate) struct ServerPort(u16);

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("invalid server host: {0}")]
    InvalidHost(String),
    #[error("invalid server port: {0}")]
    InvalidPort(String),
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("invalid cors origins: {0}")]
    InvalidCors(String),
    #[error("missing required secret for {0}")]
    MissingSecret(&'static str),
}

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("ESSAYMARK_HOST", "0.0.0.0");
        let port = env_or_default("ESSAYMARK_PORT", "8080");

        let environment = parse_environment(
            env_optional("ESSAYMARK_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("ESSAYMARK_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Essaymark API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_prefix = env_or_default("API_PREFIX", "/api");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let llm_api_key = env_or_default("LLM_API_KEY", "");
        let llm_base_url = env_or_default("LLM_BASE_URL", "");
        let text_model = env_or_default("LLM_TEXT_MODEL", "gpt-4o-mini");
        let vision_model = env_or_default("LLM_VISION_MODEL", "gpt-4o");
        let embedding_model = env_or_default("LLM_EMBEDDING_MODEL", "text-embedding-3-small");
        let max_tokens = parse_u32("LLM_MAX_TOKENS", env_or_default("LLM_MAX_TOKENS", "8000"))?;
        let temperature =
            parse_f64("LLM_TEMPERATURE", env_or_default("LLM_TEMPERATURE", "0.3"))?;
        let request_timeout =
            parse_u64("LLM_REQUEST_TIMEOUT", env_or_default("LLM_REQUEST_TIMEOUT", "300"))?;
        let max_submit_retries =
            parse_u32("LLM_MAX_SUBMIT_RETRIES", env_or_default("LLM_MAX_SUBMIT_RETRIES", "3"))?;

        let detection_api_token = env_or_default("DETECTION_API_TOKEN", "");
        let detection_base_url =
            env_or_default("DETECTION_BASE_URL", "https://api.copyleaks.com");
        let detection_language = env_or_default("DETECTION_LANGUAGE", "en");
        let detection_sandbox =
            env_optional("DETECTION_SANDBOX").map(|value| parse_bool(&value)).unwrap_or(false);
        let detection_student_id = env_or_default("DETECTION_STUDENT_ID", "studentid123");
        let detection_timeout_seconds = parse_u64(
            "DETECTION_TIMEOUT_SECONDS",
            env_or_default("DETECTION_TIMEOUT_SECONDS", "60"),
        )?;

        let max_upload_size_mb =
            parse_u64("MAX_UPLOAD_SIZE_MB", env_or_default("MAX_UPLOAD_SIZE_MB", "10"))?;
        let allowed_image_extensions =
            parse_string_list(env_optional("ALLOWED_IMAGE_EXTENSIONS"), &["jpg", "jpeg", "png"]);
        let max_files_per_request = parse_u64(
            "MAX_FILES_PER_REQUEST",
            env_or_default("MAX_FILES_PER_REQUEST", "10"),
        )?;

        let chunk_size_chars =
            parse_usize("CHUNK_SIZE_CHARS", env_or_default("CHUNK_SIZE_CHARS", "10000"))?;
        let chunk_overlap_chars =
            parse_usize("CHUNK_OVERLAP_CHARS", env_or_default("CHUNK_OVERLAP_CHARS", "1000"))?;
        let retrieval_top_k =
            parse_usize("RETRIEVAL_TOP_K", env_or_default("RETRIEVAL_TOP_K", "4"))?;

        let result_ttl_seconds =
            parse_u64("RESULT_TTL_SECONDS", env_or_default("RESULT_TTL_SECONDS", "1800"))?;
        let max_cached_results =
            parse_usize("MAX_CACHED_RESULTS", env_or_default("MAX_CACHED_RESULTS", "128"))?;

        let log_level = env_or_default("ESSAYMARK_LOG_LEVEL", "info");
        let json = env_optional("ESSAYMARK_LOG_JSON")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);
        let prometheus_enabled = env_optional("PROMETHEUS_ENABLED")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_prefix },
            cors: CorsSettings { origins: cors_origins },
            ai: AiSettings {
                llm_api_key,
                llm_base_url,
                text_model,
                vision_model,
                embedding_model,
                max_tokens,
                temperature,
                request_timeout,
                max_submit_retries,
            },
            detection: DetectionSettings {
                api_token: detection_api_token,
                base_url: detection_base_url,
                language: detection_language,
                sandbox: detection_sandbox,
                student_id: detection_student_id,
                timeout_seconds: detection_timeout_seconds,
            },
            upload: UploadSettings {
                max_upload_size_mb,
                allowed_image_extensions,
                max_files_per_request,
            },
            pipeline: PipelineSettings {
                chunk_size_chars,
                chunk_overlap_chars,
                retrieval_top_k,
            },
            results: ResultSettings {
                ttl_seconds: result_ttl_seconds,
                max_entries: max_cached_results,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn ai(&self) -> &AiSettings {
        &self.ai
    }

    pub(crate) fn detection(&self) -> &DetectionSettings {
        &self.detection
    }

    pub(crate) fn upload(&self) -> &UploadSettings {
        &self.upload
    }

    pub(crate) fn pipeline(&self) -> &PipelineSettings {
        &self.pipeline
    }

    pub(crate) fn results(&self) -> &ResultSettings {
        &self.results
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.allowed_image_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_IMAGE_EXTENSIONS",
                value: String::from("<empty>"),
            });
        }
        for extension in &self.upload.allowed_image_extensions {
            if !is_supported_image_extension(extension) {
                return Err(ConfigError::InvalidValue {
                    field: "ALLOWED_IMAGE_EXTENSIONS",
                    value: extension.clone(),
                });
            }
        }

        if self.pipeline.chunk_size_chars == 0 {
            return Err(ConfigError::InvalidValue {
                field: "CHUNK_SIZE_CHARS",
                value: "0".to_string(),
            });
        }

        if self.pipeline.chunk_overlap_chars >= self.pipeline.chunk_size_chars {
            return Err(ConfigError::InvalidValue {
                field: "CHUNK_OVERLAP_CHARS",
                value: self.pipeline.chunk_overlap_chars.to_string(),
            });
        }

        if self.results.ttl_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "RESULT_TTL_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.ai.llm_api_key.is_empty() {
            return Err(ConfigError::MissingSecret("LLM_API_KEY"));
        }

        if self.ai.llm_base_url.is_empty() {
            return Err(ConfigError::MissingSecret("LLM_BASE_URL"));
        }

        if self.detection.api_token.is_empty() {
            return Err(ConfigError::MissingSecret("DETECTION_API_TOKEN"));
        }

        Ok(())
    }
}

impl UploadSettings {
    pub(crate) fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}

impl ServerHost {
    fn parse(value: String) -> Result<Self, ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::InvalidHost(value));
        }
        Ok(Self(value))
    }
}

impl ServerPort {
    fn parse(value: String) -> Result<Self, ConfigError> {
        let parsed: u16 = value.parse().map_err(|_| ConfigError::InvalidPort(value.clone()))?;
        if parsed == 0 {
            return Err(ConfigError::InvalidPort(value));
        }
        Ok(Self(parsed))
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_u32(field: &'static str, value: String) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_usize(field: &'static str, value: String) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_f64(field: &'static str, value: String) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_cors_origins(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = value else {
        return Ok(default_cors_origins());
    };

    if raw.trim().is_empty() {
        return Ok(default_cors_origins());
    }

    if raw.trim_start().starts_with('[') {
        let parsed: Vec<String> =
            serde_json::from_str(&raw).map_err(|_| ConfigError::InvalidCors(raw.clone()))?;
        if parsed.is_empty() {
            return Ok(default_cors_origins());
        }
        return Ok(parsed);
    }

    let items: Vec<String> = raw
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    if items.is_empty() {
        return Ok(default_cors_origins());
    }

    Ok(items)
}

fn parse_string_list(value: Option<String>, defaults: &[&str]) -> Vec<String> {
    match value {
        Some(raw) => raw
            .split(',')
            .map(|item| item.trim().to_ascii_lowercase())
            .filter(|item| !item.is_empty())
            .collect(),
        None => defaults.iter().map(|item| item.to_string()).collect(),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref().map(|val| val.to_lowercase()) {
        Some(ref val) if val == "production" || val == "prod" => Environment::Production,
        Some(ref val) if val == "staging" => Environment::Staging,
        Some(ref val) if val == "test" || val == "testing" => Environment::Test,
        _ => Environment::Development,
    }
}

fn is_supported_image_extension(extension: &str) -> bool {
    matches!(extension, "jpg" | "jpeg" | "png" | "webp" | "gif")
}

fn default_cors_origins() -> Vec<String> {
    DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cors_origins_json() {
        let raw = "[\"http://a\",\"http://b\"]".to_string();
        let parsed = parse_cors_origins(Some(raw)).expect("cors json");
        assert_eq!(parsed, vec!["http://a".to_string(), "http://b".to_string()]);
    }

    #[test]
    fn parse_cors_origins_csv() {
        let raw = "http://a, http://b".to_string();
        let parsed = parse_cors_origins(Some(raw)).expect("cors csv");
        assert_eq!(parsed, vec!["http://a".to_string(), "http://b".to_string()]);
    }

    #[test]
    fn parse_cors_origins_defaults_on_empty() {
        let parsed = parse_cors_origins(Some(" ".to_string())).expect("cors empty");
        assert_eq!(parsed, default_cors_origins());
    }

    #[test]
    fn parse_bool_variants() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("yes"));
        assert!(parse_bool("on"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
    }

    #[test]
    fn parse_environment_variants() {
        assert_eq!(parse_environment(Some("prod".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("production".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("staging".to_string())), Environment::Staging);
        assert_eq!(parse_environment(Some("testing".to_string())), Environment::Test);
        assert_eq!(parse_environment(None), Environment::Development);
    }
}
