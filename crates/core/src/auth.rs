//! Per-request authentication context.
//!
//! An [`AuthContext`] is built once from request metadata and handed to
//! tool adapters as an explicit parameter. It is deliberately not
//! `Serialize`, its `Debug` output is redacted, and the only thing ever
//! logged is [`AuthContext::fingerprint`].

use crate::request::RequestMetadata;
use sha2::{Digest, Sha256};

const REDACTED: &str = "[REDACTED]";

/// Scoping hints that travel with the credential.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthScope {
    /// The file the user currently has open in their editor.
    pub opened_file_path: Option<String>,
    /// The workspace the user is working in.
    pub workspace_path: Option<String>,
    pub user_id: Option<String>,
    pub tenant_id: Option<String>,
}

/// Credential bundle for one request.
#[derive(Clone, Default)]
pub struct AuthContext {
    token: Option<String>,
    scope: AuthScope,
}

impl AuthContext {
    /// A context carrying no credential.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Build a context from a raw `x_auth` value (`Bearer <token>` or a bare token).
    pub fn from_header(x_auth: Option<&str>) -> Self {
        Self {
            token: x_auth.and_then(parse_bearer),
            scope: AuthScope::default(),
        }
    }

    /// Extract the credential and scoping hints from request metadata.
    pub fn from_metadata(metadata: &RequestMetadata) -> Self {
        let mut ctx = Self::from_header(metadata.x_auth.as_deref());
        ctx.scope = AuthScope {
            opened_file_path: metadata.opened_file_path.clone(),
            workspace_path: metadata.workspace_path.clone(),
            user_id: metadata.user_id.clone(),
            tenant_id: metadata.tenant_id.clone(),
        };
        ctx
    }

    /// The bare bearer token, for adapters that must forward it.
    pub fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// `Authorization` header value for outbound calls.
    pub fn authorization_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {t}"))
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn scope(&self) -> &AuthScope {
        &self.scope
    }

    /// Short, non-reversible identifier of the credential, safe to log.
    pub fn fingerprint(&self) -> String {
        match &self.token {
            Some(token) => {
                let digest = Sha256::digest(token.as_bytes());
                digest.iter().take(4).map(|b| format!("{b:02x}")).collect()
            }
            None => "anonymous".into(),
        }
    }

    /// Remove every occurrence of the credential from `text`.
    pub fn scrub(&self, text: &str) -> String {
        match &self.token {
            Some(token) if text.contains(token.as_str()) => text.replace(token.as_str(), REDACTED),
            _ => text.to_string(),
        }
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("token", &self.token.as_ref().map(|_| REDACTED))
            .field("scope", &self.scope)
            .finish()
    }
}

/// `Bearer <token>`, `bearer<ws><token>` or a bare token. A scheme with
/// nothing after it is no credential.
fn parse_bearer(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let token = match raw.get(..6) {
        Some(scheme)
            if scheme.eq_ignore_ascii_case("bearer")
                && raw[6..].chars().next().is_none_or(char::is_whitespace) =>
        {
            raw[6..].trim()
        }
        _ => raw,
    };
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
