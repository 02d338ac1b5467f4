//! Provider subsystem for model completion backends.
//!
//! Each backend implements the [`Provider`] trait defined in [`traits`] and is
//! registered in the factory function [`create_provider`] by its canonical
//! string key. `custom:<URL>` selects any OpenAI-compatible endpoint.

pub mod compatible;
pub mod traits;

pub use compatible::OpenAiCompatibleProvider;
pub use traits::{ChatMessage, Provider};

const MAX_API_ERROR_CHARS: usize = 200;

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default base URL for a known provider name.
pub(crate) fn default_base_url(name: &str) -> Option<&'static str> {
    match name {
        "groq" => Some(GROQ_BASE_URL),
        "openai" => Some(OPENAI_BASE_URL),
        _ => None,
    }
}

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

fn token_end(input: &str, from: usize) -> usize {
    let mut end = from;
    for (i, c) in input[from..].char_indices() {
        if is_secret_char(c) {
            end = from + i + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

/// Scrub known secret-like token prefixes from provider error strings.
///
/// Redacts tokens with prefixes like `sk-`, `gsk_`, `ghp_`, and
/// `github_pat_` before an error is logged or shown to a user.
pub fn scrub_secret_patterns(input: &str) -> String {
    const PREFIXES: [&str; 4] = ["sk-", "gsk_", "ghp_", "github_pat_"];

    let mut scrubbed = input.to_string();

    for prefix in PREFIXES {
        let mut search_from = 0;
        loop {
            let Some(rel) = scrubbed[search_from..].find(prefix) else {
                break;
            };

            let start = search_from + rel;
            let content_start = start + prefix.len();
            let end = token_end(&scrubbed, content_start);

            if end == content_start {
                search_from = content_start;
                continue;
            }

            scrubbed.replace_range(start..end, "[REDACTED]");
            search_from = start + "[REDACTED]".len();
        }
    }

    scrubbed
}

/// Sanitize API error text by scrubbing secrets and truncating length.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let mut end = MAX_API_ERROR_CHARS;
    while end > 0 && !scrubbed.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &scrubbed[..end])
}

/// Build a sanitized provider error from a failed HTTP response.
pub async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    let sanitized = sanitize_api_error(&body);
    anyhow::anyhow!("{provider} API error ({status}): {sanitized}")
}

/// Resolve the API key for a provider from config and environment variables.
pub(crate) fn resolve_provider_credential(
    name: &str,
    credential_override: Option<&str>,
) -> Option<String> {
    if let Some(raw_override) = credential_override {
        let trimmed_override = raw_override.trim();
        if !trimmed_override.is_empty() {
            return Some(trimmed_override.to_owned());
        }
    }

    let provider_env_candidates: Vec<&str> = match name {
        "groq" => vec!["GROQ_API_KEY"],
        "openai" => vec!["OPENAI_API_KEY"],
        _ => vec![],
    };

    for env_var in provider_env_candidates {
        if let Ok(value) = std::env::var(env_var) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    for env_var in ["PARLEY_API_KEY", "API_KEY"] {
        if let Ok(value) = std::env::var(env_var) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Factory: create the right provider from config.
pub fn create_provider(name: &str, api_key: Option<&str>) -> anyhow::Result<Box<dyn Provider>> {
    create_provider_with_url(name, api_key, None)
}

/// Factory: create the right provider with an optional custom base URL.
pub fn create_provider_with_url(
    name: &str,
    api_key: Option<&str>,
    api_url: Option<&str>,
) -> anyhow::Result<Box<dyn Provider>> {
    let trimmed = name.trim();
    let normalized = trimmed.to_ascii_lowercase();
    let key = resolve_provider_credential(&normalized, api_key);
    let key = key.as_deref();

    // Preserve URL case: only the scheme prefix is matched case-insensitively.
    if normalized.starts_with("custom:") {
        let url = trimmed["custom:".len()..].trim();
        if url.is_empty() {
            anyhow::bail!("custom provider requires a URL: custom:<URL>");
        }
        return Ok(Box::new(OpenAiCompatibleProvider::new("custom", url, key)));
    }

    match normalized.as_str() {
        "groq" => Ok(Box::new(OpenAiCompatibleProvider::new(
            "groq",
            api_url.unwrap_or(GROQ_BASE_URL),
            key,
        ))),
        "openai" => Ok(Box::new(OpenAiCompatibleProvider::new(
            "openai",
            api_url.unwrap_or(OPENAI_BASE_URL),
            key,
        ))),
        other => anyhow::bail!(
            "Unknown provider: {other}. Supported: groq, openai, custom:<URL>."
        ),
    }
}

/// Information about a supported provider for display purposes.
pub struct ProviderInfo {
    /// Canonical name used in config (e.g. `"groq"`)
    pub name: &'static str,
    /// Human-readable display name
    pub display_name: &'static str,
    /// Environment variable consulted for the API key
    pub key_env: &'static str,
}

/// Return the list of all known providers for display in `parley providers`.
pub fn list_providers() -> Vec<ProviderInfo> {
    vec![
        ProviderInfo {
            name: "groq",
            display_name: "Groq",
            key_env: "GROQ_API_KEY",
        },
        ProviderInfo {
            name: "openai",
            display_name: "OpenAI",
            key_env: "OPENAI_API_KEY",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_groq() {
        assert!(create_provider("groq", Some("provider-test-credential")).is_ok());
    }

    #[test]
    fn factory_openai() {
        assert!(create_provider("openai", Some("provider-test-credential")).is_ok());
    }

    #[test]
    fn factory_custom_url() {
        let p = create_provider("custom:https://llm.example.com/v1", Some("k")).unwrap();
        assert_eq!(p.name(), "custom");
    }

    #[test]
    fn factory_custom_without_url_errors() {
        let p = create_provider("custom:", Some("k"));
        assert!(p.is_err());
    }

    #[test]
    fn factory_unknown_provider_errors() {
        let p = create_provider("nonexistent", None);
        assert!(p.is_err());
        let msg = p.err().unwrap().to_string();
        assert!(msg.contains("Unknown provider"));
    }

    #[test]
    fn factory_empty_name_errors() {
        assert!(create_provider("", None).is_err());
    }

    #[test]
    fn listed_providers_are_constructible() {
        for provider in list_providers() {
            assert!(
                create_provider(provider.name, Some("provider-test-credential")).is_ok(),
                "Canonical provider id should be constructible: {}",
                provider.name
            );
        }
    }

    // ── API error sanitization ───────────────────────────────

    #[test]
    fn sanitize_scrubs_sk_prefix() {
        let input = "request failed: sk-1234567890abcdef";
        let out = sanitize_api_error(input);
        assert!(!out.contains("sk-1234567890abcdef"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn sanitize_scrubs_groq_key_prefix() {
        let input = "401 unauthorized for gsk_abcdef123456";
        let out = sanitize_api_error(input);
        assert!(!out.contains("gsk_abcdef123456"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn sanitize_truncates_long_error() {
        let long = "a".repeat(400);
        let result = sanitize_api_error(&long);
        assert!(result.len() <= 203);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn sanitize_no_secret_no_change() {
        let input = "simple upstream timeout";
        let result = sanitize_api_error(input);
        assert_eq!(result, input);
    }

    #[test]
    fn scrub_github_fine_grained_pat() {
        let input = "failed: github_pat_11AABBC_xyzzy789";
        let result = scrub_secret_patterns(input);
        assert_eq!(result, "failed: [REDACTED]");
    }

    #[test]
    fn resolve_provider_credential_prefers_explicit_argument() {
        let resolved = resolve_provider_credential("groq", Some("  explicit-key  "));
        assert_eq!(resolved, Some("explicit-key".to_string()));
    }
}
