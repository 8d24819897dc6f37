//! Domain models for the access-decision module.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque token naming one required permission or role (e.g. `ROLE_ADMIN`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigAttribute(String);

impl ConfigAttribute {
    #[must_use]
    pub fn new(attribute: impl Into<String>) -> Self {
        Self(attribute.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConfigAttribute {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ConfigAttribute {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ConfigAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Type tag of a [`RequestDescriptor`], used by start-up validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    Web,
    Method,
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Web => f.write_str("web"),
            Self::Method => f.write_str("method"),
        }
    }
}

/// An HTTP request as seen by the authorization layer.
///
/// `path` is application-relative (no context path, no query string) and is
/// what metadata rules match against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebRequest {
    path: String,
    method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context_path: Option<String>,
}

impl WebRequest {
    /// Build a request for `path` with the given HTTP method (upper-cased).
    #[must_use]
    pub fn new(path: impl Into<String>, method: &str) -> Self {
        Self {
            path: path.into(),
            method: method.to_ascii_uppercase(),
            query: None,
            context_path: None,
        }
    }

    /// Build a synthetic request from an application-relative URI that may
    /// carry a query string. `method` defaults to `GET`.
    #[must_use]
    pub fn synthetic(context_path: Option<&str>, uri: &str, method: Option<&str>) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query.to_owned())),
            None => (uri, None),
        };
        let path = if path.is_empty() { "/" } else { path };

        Self {
            path: path.to_owned(),
            method: method.unwrap_or("GET").to_ascii_uppercase(),
            query,
            context_path: context_path
                .filter(|p| !p.is_empty() && *p != "/")
                .map(ToOwned::to_owned),
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    #[must_use]
    pub fn context_path(&self) -> Option<&str> {
        self.context_path.as_deref()
    }

    /// Full request URI: context path followed by the application path.
    #[must_use]
    pub fn request_uri(&self) -> String {
        match &self.context_path {
            Some(ctx) => format!("{ctx}{}", self.path),
            None => self.path.clone(),
        }
    }
}

/// A method call on a protected service, identified by `Type::method`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodInvocation {
    type_name: String,
    method_name: String,
}

impl MethodInvocation {
    #[must_use]
    pub fn new(type_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            method_name: method_name.into(),
        }
    }

    #[must_use]
    pub fn signature(&self) -> String {
        format!("{}::{}", self.type_name, self.method_name)
    }
}

/// What is being accessed. Immutable; the lookup key into a metadata source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestDescriptor {
    Web(WebRequest),
    Method(MethodInvocation),
}

impl RequestDescriptor {
    /// Shorthand for a web request descriptor.
    #[must_use]
    pub fn web(path: impl Into<String>, method: &str) -> Self {
        Self::Web(WebRequest::new(path, method))
    }

    #[must_use]
    pub fn method(type_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self::Method(MethodInvocation::new(type_name, method_name))
    }

    #[must_use]
    pub fn kind(&self) -> DescriptorKind {
        match self {
            Self::Web(_) => DescriptorKind::Web,
            Self::Method(_) => DescriptorKind::Method,
        }
    }
}

impl From<WebRequest> for RequestDescriptor {
    fn from(value: WebRequest) -> Self {
        Self::Web(value)
    }
}

impl From<MethodInvocation> for RequestDescriptor {
    fn from(value: MethodInvocation) -> Self {
        Self::Method(value)
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Web(req) => write!(f, "{} {}", req.method, req.request_uri()),
            Self::Method(inv) => write!(f, "{}::{}", inv.type_name, inv.method_name),
        }
    }
}

/// A single voter's opinion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Granted,
    Abstain,
    Denied,
}

/// Notification emitted by the live authorization path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationEvent {
    Granted {
        descriptor: RequestDescriptor,
        principal: String,
        attributes: Vec<ConfigAttribute>,
    },
    Denied {
        descriptor: RequestDescriptor,
        principal: String,
        attributes: Vec<ConfigAttribute>,
        reason: String,
    },
    /// The descriptor requires no attributes.
    PublicInvocation { descriptor: RequestDescriptor },
    /// Attributes apply but no authentication was available.
    CredentialsNotFound {
        descriptor: RequestDescriptor,
        attributes: Vec<ConfigAttribute>,
    },
}

impl AuthorizationEvent {
    #[must_use]
    pub fn descriptor(&self) -> &RequestDescriptor {
        match self {
            Self::Granted { descriptor, .. }
            | Self::Denied { descriptor, .. }
            | Self::PublicInvocation { descriptor }
            | Self::CredentialsNotFound { descriptor, .. } => descriptor,
        }
    }
}
