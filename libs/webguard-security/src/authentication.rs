use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// A single permission token held by an [`Authentication`] (e.g. `ROLE_ADMIN`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantedAuthority(String);

impl GrantedAuthority {
    #[must_use]
    pub fn new(authority: impl Into<String>) -> Self {
        Self(authority.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GrantedAuthority {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for GrantedAuthority {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for GrantedAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the identity was established.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationKind {
    /// Interactive login with credentials verified in this session.
    #[default]
    Full,
    /// Identity restored from a remember-me token.
    RememberMe,
    /// Anonymous caller.
    Anonymous,
    /// Scoped substitute identity derived from `original_principal`.
    RunAs { original_principal: String },
}

/// `Authentication` represents a caller identity.
///
/// Immutable once built, except for two narrow transitions: the
/// `authenticated` flag can only move from `false` to `true`
/// ([`Authentication::into_authenticated`]), and credentials can be erased.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authentication {
    /// Principal identifier (user name, service id).
    principal: String,
    /// Opaque credential. Never serialized; `Debug` redacts the value.
    #[serde(skip)]
    credentials: Option<SecretString>,
    /// Granted authorities in grant order.
    #[serde(default)]
    authorities: Vec<GrantedAuthority>,
    #[serde(default)]
    authenticated: bool,
    #[serde(default)]
    kind: AuthenticationKind,
}

impl Authentication {
    /// Create a new `Authentication` builder for the given principal.
    #[must_use]
    pub fn builder(principal: impl Into<String>) -> AuthenticationBuilder {
        AuthenticationBuilder {
            principal: principal.into(),
            ..AuthenticationBuilder::default()
        }
    }

    /// Create an authenticated anonymous identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::builder("anonymousUser")
            .authority("ROLE_ANONYMOUS")
            .kind(AuthenticationKind::Anonymous)
            .authenticated()
            .build()
    }

    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    #[must_use]
    pub fn credentials(&self) -> Option<&SecretString> {
        self.credentials.as_ref()
    }

    #[must_use]
    pub fn authorities(&self) -> &[GrantedAuthority] {
        &self.authorities
    }

    /// Whether the authority is held verbatim.
    #[must_use]
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a.as_str() == authority)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    #[must_use]
    pub fn kind(&self) -> &AuthenticationKind {
        &self.kind
    }

    /// Mark the identity as verified. There is no way back.
    #[must_use]
    pub fn into_authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    /// Drop the credential once it is no longer needed.
    pub fn erase_credentials(&mut self) {
        self.credentials = None;
    }
}

#[derive(Debug, Default)]
pub struct AuthenticationBuilder {
    principal: String,
    credentials: Option<SecretString>,
    authorities: Vec<GrantedAuthority>,
    authenticated: bool,
    kind: AuthenticationKind,
}

impl AuthenticationBuilder {
    #[must_use]
    pub fn credentials(mut self, credentials: impl Into<SecretString>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }

    #[must_use]
    pub fn authority(mut self, authority: impl Into<GrantedAuthority>) -> Self {
        self.authorities.push(authority.into());
        self
    }

    #[must_use]
    pub fn authorities<I, A>(mut self, authorities: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<GrantedAuthority>,
    {
        self.authorities
            .extend(authorities.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: AuthenticationKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    #[must_use]
    pub fn build(self) -> Authentication {
        Authentication {
            principal: self.principal,
            credentials: self.credentials,
            authorities: self.authorities,
            authenticated: self.authenticated,
            kind: self.kind,
        }
    }
}
