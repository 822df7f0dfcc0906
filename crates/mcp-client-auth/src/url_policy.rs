//! # URL and Scheme Policy
//!
//! Pure predicates shared by every component that accepts a URL: AS discovery,
//! AS metadata validation, redirect URI validation (both CIMD documents and
//! [`OAuthConfig::redirect_url`](crate::config::OAuthConfig)), resource
//! indicator canonicalisation, and protected resource discovery.
//!
//! MCP requires all authorization endpoints to use HTTPS. Plain HTTP is only
//! accepted when the host is a loopback address, which covers local
//! development servers and native-app redirect listeners.
//!
//! Loopback recognition lives in exactly one place, [`is_loopback_host`].

use url::Url;

use crate::error::{AuthError, AuthResult};

/// Loopback host names accepted after brackets and port are stripped
const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1", "0:0:0:0:0:0:0:1"];

/// Check whether a host string denotes the local machine
///
/// Accepts exactly `localhost`, `127.0.0.1`, `::1` and the fully expanded
/// `0:0:0:0:0:0:0:1`, with or without IPv6 brackets and with an optional
/// numeric port (`localhost:8080`, `[::1]:3000`). Every other host is
/// rejected.
///
/// ```rust
/// use mcp_client_auth::url_policy::is_loopback_host;
///
/// assert!(is_loopback_host("localhost:8080"));
/// assert!(is_loopback_host("[::1]"));
/// assert!(!is_loopback_host("example.com"));
/// ```
pub fn is_loopback_host(host: &str) -> bool {
    match strip_port_and_brackets(host) {
        Some(bare) => LOOPBACK_HOSTS
            .iter()
            .any(|candidate| bare.eq_ignore_ascii_case(candidate)),
        None => false,
    }
}

/// Reduce `host[:port]` or `[v6][:port]` to the bare host
///
/// Returns `None` when the port part is present but not numeric, or brackets
/// are unbalanced.
fn strip_port_and_brackets(host: &str) -> Option<&str> {
    if let Some(rest) = host.strip_prefix('[') {
        let close = rest.find(']')?;
        let (inner, tail) = (&rest[..close], &rest[close + 1..]);
        return match tail.strip_prefix(':') {
            None if tail.is_empty() => Some(inner),
            Some(port) if is_port(port) => Some(inner),
            _ => None,
        };
    }

    match host.matches(':').count() {
        0 => Some(host),
        // name:port or v4:port
        1 => {
            let (name, port) = host.split_once(':')?;
            is_port(port).then_some(name)
        }
        // bare IPv6 literal, no port possible without brackets
        _ => Some(host),
    }
}

fn is_port(s: &str) -> bool {
    !s.is_empty() && s.len() <= 5 && s.bytes().all(|b| b.is_ascii_digit())
}

/// Check whether a string is an absolute `http` or `https` URL with a host
pub fn is_absolute_http_url(raw: &str) -> bool {
    parse_absolute_http_url(raw, "URL").is_ok()
}

/// Parse an absolute `http`/`https` URL with a non-empty host
///
/// # Errors
///
/// Returns [`AuthError::MalformedInput`] if the string does not parse, is
/// relative, uses another scheme, or has no host.
pub fn parse_absolute_http_url(raw: &str, what: &str) -> AuthResult<Url> {
    let url = Url::parse(raw).map_err(|e| AuthError::malformed(what, format!("{e}: {raw}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AuthError::malformed(
                what,
                format!("scheme must be http or https, got {other}"),
            ));
        }
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(AuthError::malformed(what, format!("missing host: {raw}"))),
    }
}

/// Require `https`, or `http` on a loopback host
///
/// # Errors
///
/// Returns [`AuthError::SchemeViolation`] for plain HTTP on any other host and
/// [`AuthError::MalformedInput`] for non-HTTP schemes.
pub fn require_https_except_loopback(url: &Url, what: &str) -> AuthResult<()> {
    match url.scheme() {
        "https" => Ok(()),
        "http" if url.host_str().is_some_and(is_loopback_host) => Ok(()),
        "http" => Err(AuthError::scheme(what, url.as_str())),
        other => Err(AuthError::malformed(
            what,
            format!("scheme must be http or https, got {other}"),
        )),
    }
}

/// Parse an absolute URL and apply [`require_https_except_loopback`]
///
/// # Errors
///
/// See [`parse_absolute_http_url`] and [`require_https_except_loopback`].
pub fn validate_secure_url(raw: &str, what: &str) -> AuthResult<Url> {
    let url = parse_absolute_http_url(raw, what)?;
    require_https_except_loopback(&url, what)?;
    Ok(url)
}

/// `scheme://host[:port]` of a URL, used to scope credentials to one origin
pub(crate) fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    #[test]
    fn test_loopback_forms_accepted() {
        for host in [
            "localhost",
            "localhost:8080",
            "127.0.0.1",
            "127.0.0.1:3000",
            "[::1]",
            "[::1]:3000",
            "::1",
            "0:0:0:0:0:0:0:1",
            "[0:0:0:0:0:0:0:1]",
            "[0:0:0:0:0:0:0:1]:9000",
        ] {
            assert!(is_loopback_host(host), "should accept {host}");
        }
    }

    #[test]
    fn test_non_loopback_rejected() {
        for host in [
            "example.com",
            "example.com:443",
            "localhost.example.com",
            "127.0.0.2",
            "10.0.0.1",
            "0.0.0.0",
            "[::2]",
            "localhost:",
            "localhost:http",
            "[::1",
            "[::1]x",
            "",
        ] {
            assert!(!is_loopback_host(host), "should reject {host}");
        }
    }

    #[test]
    fn test_parsed_url_hosts_are_recognised() {
        // url normalises the expanded form to [::1]
        let url = Url::parse("http://[0:0:0:0:0:0:0:1]:8080/cb").unwrap();
        assert!(require_https_except_loopback(&url, "redirect").is_ok());

        let url = Url::parse("http://localhost/cb").unwrap();
        assert!(require_https_except_loopback(&url, "redirect").is_ok());
    }

    #[test]
    fn test_http_non_loopback_is_scheme_violation() {
        let url = Url::parse("http://auth.example.com").unwrap();
        let err = require_https_except_loopback(&url, "issuer URL").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemeViolation);
    }

    #[test]
    fn test_parse_absolute_http_url() {
        assert!(parse_absolute_http_url("https://example.com/x", "u").is_ok());

        let relative = parse_absolute_http_url("/just/a/path", "u").unwrap_err();
        assert_eq!(relative.kind(), ErrorKind::MalformedInput);

        let ftp = parse_absolute_http_url("ftp://example.com", "u").unwrap_err();
        assert_eq!(ftp.kind(), ErrorKind::MalformedInput);

        assert!(!is_absolute_http_url("mailto:someone@example.com"));
        assert!(is_absolute_http_url("http://127.0.0.1:9/"));
    }

    proptest! {
        #[test]
        fn prop_dns_names_are_never_loopback(name in "[a-k]{1,12}\\.(com|net|org)", port in 1u16..) {
            prop_assert!(!is_loopback_host(&name));
            let with_port = format!("{}:{}", name, port);
            prop_assert!(!is_loopback_host(&with_port));
        }

        #[test]
        fn prop_loopback_accepts_any_port(port in 0u16..) {
            let localhost = format!("localhost:{}", port);
            let v4 = format!("127.0.0.1:{}", port);
            let v6 = format!("[::1]:{}", port);
            prop_assert!(is_loopback_host(&localhost));
            prop_assert!(is_loopback_host(&v4));
            prop_assert!(is_loopback_host(&v6));
        }
    }
}
