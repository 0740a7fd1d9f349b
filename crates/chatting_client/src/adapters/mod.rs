pub mod anthropic;
pub mod openai;

use chat_core::Role;

pub(crate) fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Resolve a configured domain override into a request base URL.
///
/// A bare host gets the https scheme; a full URL is used as-is.
pub(crate) fn base_url(domain: Option<&str>, default: &str) -> String {
    match domain {
        None => default.to_string(),
        Some(domain) if domain.contains("://") => domain.trim_end_matches('/').to_string(),
        Some(domain) => format!("https://{}", domain.trim_end_matches('/')),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_defaults_and_overrides() {
        assert_eq!(
            base_url(None, "https://api.openai.com"),
            "https://api.openai.com"
        );
        assert_eq!(
            base_url(Some("proxy.example.com"), "https://api.openai.com"),
            "https://proxy.example.com"
        );
        assert_eq!(
            base_url(Some("http://127.0.0.1:9000/"), "https://api.openai.com"),
            "http://127.0.0.1:9000"
        );
    }
}
