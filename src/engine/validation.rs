// src/engine/validation.rs
//
// Pre-flight checks for user-selected files. Never fails; returns a verdict.

use crate::engine::resource::ImageResource;
use crate::ops::MimeType;

const BYTES_PER_MB: u64 = 1024 * 1024;
const DEFAULT_MAX_UPLOAD_MB: u64 = 10;

pub const MISSING_FILE_MESSAGE: &str = "Please select an image file";

/// Allow-list and size ceiling for uploads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Declared MIME types that pass the type check, compared exactly.
    pub allowed_types: Vec<String>,
    pub max_bytes: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            allowed_types: MimeType::ALL.iter().map(|m| m.as_str().to_string()).collect(),
            max_bytes: DEFAULT_MAX_UPLOAD_MB * BYTES_PER_MB,
        }
    }
}

impl ValidationConfig {
    pub fn with_max_megabytes(mut self, megabytes: u64) -> Self {
        self.max_bytes = megabytes.saturating_mul(BYTES_PER_MB);
        self
    }

    pub fn with_allowed_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// "JPEG, PNG, WebP, GIF" for the default allow-list.
    fn allowed_labels(&self) -> String {
        self.allowed_types
            .iter()
            .map(|t| match t.parse::<MimeType>() {
                Ok(mime) => mime.label().to_string(),
                Err(_) => t.rsplit('/').next().unwrap_or(t).to_ascii_uppercase(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn max_megabytes_label(&self) -> String {
        let mb = self.max_bytes as f64 / BYTES_PER_MB as f64;
        trim_decimal(format!("{mb:.2}"))
    }
}

/// Outcome of [`validate`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Check `file` against `config`.
///
/// A missing or empty file yields exactly one error and nothing else is
/// checked. Otherwise the type and size checks both run.
pub fn validate(file: Option<&ImageResource>, config: &ValidationConfig) -> ValidationResult {
    let file = match file {
        Some(file) if !file.is_empty() => file,
        _ => return ValidationResult::from_errors(vec![MISSING_FILE_MESSAGE.to_string()]),
    };

    let mut errors = Vec::new();
    if !config.allowed_types.iter().any(|t| t == file.mime()) {
        errors.push(format!(
            "Invalid file type. Allowed types: {}",
            config.allowed_labels()
        ));
    }
    if file.size() > config.max_bytes {
        errors.push(format!(
            "File size must be less than {}MB",
            config.max_megabytes_label()
        ));
    }

    if !errors.is_empty() {
        tracing::debug!(name = file.name(), mime = file.mime(), size = file.size(), ?errors, "validation rejected file");
    }
    ValidationResult::from_errors(errors)
}

/// Human readable byte count: "0 Bytes", "500 Bytes", "1.5 KB", "2 MB".
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    let mut divisor = 1u64;
    while unit + 1 < UNITS.len() && bytes >= divisor * 1024 {
        divisor *= 1024;
        unit += 1;
    }
    let value = bytes as f64 / divisor as f64;
    format!("{} {}", trim_decimal(format!("{value:.2}")), UNITS[unit])
}

fn trim_decimal(mut s: String) -> String {
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}
