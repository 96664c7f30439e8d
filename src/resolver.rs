use crate::extractor::first_navigation_url;

/// Scheme and host of the script's first navigation target.
///
/// Empty when there is no literal navigation or the URL has no scheme.
pub fn resolve_base_url(script: &str) -> String {
    let Some(url) = first_navigation_url(script) else {
        return String::new();
    };
    if !url.contains("://") {
        return String::new();
    }

    let parts: Vec<&str> = url.split('/').collect();
    match (parts.first(), parts.get(2)) {
        (Some(scheme), Some(host)) => format!("{}//{}", scheme, host),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_and_host() {
        let script = r#"page.goto("https://example.com/onboarding/complex")"#;
        assert_eq!(resolve_base_url(script), "https://example.com");
    }

    #[test]
    fn test_keeps_port() {
        let script = r#"page.goto("http://localhost:3000/login?next=/")"#;
        assert_eq!(resolve_base_url(script), "http://localhost:3000");
    }

    #[test]
    fn test_bare_origin() {
        assert_eq!(
            resolve_base_url(r#"driver.get("https://shop.test")"#),
            "https://shop.test"
        );
    }

    #[test]
    fn test_relative_url_is_empty() {
        assert_eq!(resolve_base_url(r#"page.goto("/signup")"#), "");
    }

    #[test]
    fn test_no_navigation_is_empty() {
        assert_eq!(resolve_base_url("page.click(\"#go\")"), "");
    }
}
