//! Scope selection

use crate::config::{OAuthConfig, ScopeSelectionMode};
use crate::resource_metadata::ProtectedResourceMetadata;

/// Choose the scopes to request
///
/// - [`ScopeSelectionMode::Auto`]: the scopes advertised by the protected
///   resource; when the resource advertises none (or has no metadata), the
///   requested scopes
/// - [`ScopeSelectionMode::Manual`]: `requested`, verbatim
///
/// Never returns a scope that is in neither input.
pub fn select_scopes(
    config: &OAuthConfig,
    requested: &[String],
    resource: Option<&ProtectedResourceMetadata>,
) -> Vec<String> {
    match config.scope_selection_mode {
        ScopeSelectionMode::Manual => requested.to_vec(),
        ScopeSelectionMode::Auto => match resource {
            Some(md) if !md.scopes_supported.is_empty() => md.scopes_supported.clone(),
            _ => requested.to_vec(),
        },
    }
}
