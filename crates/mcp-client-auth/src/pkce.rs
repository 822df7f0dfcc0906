//! PKCE capability enforcement
//!
//! MCP requires authorization servers to support PKCE with `S256`. Absence of
//! evidence is treated as non-compliance.

use tracing::warn;

use crate::discovery::{AuthorizationServerMetadata, PKCE_METHOD_S256};
use crate::error::{AuthError, AuthResult};

/// Environment variable that must be set before PKCE validation may be skipped
pub const SKIP_PKCE_ENV: &str = "MCP_OAUTH_ALLOW_PKCE_SKIP";

/// The only value of [`SKIP_PKCE_ENV`] that enables skipping
pub const SKIP_PKCE_ENV_VALUE: &str = "true";

/// Require `S256` in the server's advertised PKCE methods
///
/// With `skip_validation` set, the check is bypassed only when
/// `MCP_OAUTH_ALLOW_PKCE_SKIP=true` is present in the environment. This is
/// intended for testing against non-compliant servers.
///
/// # Errors
///
/// Returns [`AuthError::SecurityPolicy`] when no PKCE method or no `S256` is
/// advertised, or when skipping is requested without the environment toggle.
pub fn validate_pkce_support(
    metadata: &AuthorizationServerMetadata,
    skip_validation: bool,
) -> AuthResult<()> {
    let toggle = std::env::var(SKIP_PKCE_ENV).ok();
    validate_pkce_support_with_toggle(metadata, skip_validation, toggle.as_deref())
}

pub(crate) fn validate_pkce_support_with_toggle(
    metadata: &AuthorizationServerMetadata,
    skip_validation: bool,
    toggle: Option<&str>,
) -> AuthResult<()> {
    if skip_validation {
        if toggle != Some(SKIP_PKCE_ENV_VALUE) {
            return Err(AuthError::security(format!(
                "skipping PKCE validation requires {SKIP_PKCE_ENV}={SKIP_PKCE_ENV_VALUE}"
            )));
        }

        warn!(
            issuer = %metadata.issuer,
            "PKCE validation skipped; the authorization server may not support S256"
        );
        return Ok(());
    }

    if !metadata.supports_pkce() {
        return Err(AuthError::security(format!(
            "authorization server {} has no PKCE support advertised",
            metadata.issuer
        )));
    }

    if !metadata.supports_pkce_method(PKCE_METHOD_S256) {
        return Err(AuthError::security(format!(
            "authorization server {} does not advertise PKCE method S256 (S256 required)",
            metadata.issuer
        )));
    }

    Ok(())
}
