//! Metadata sources: descriptor to required-attribute lookup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use access_decision_sdk::{
    AccessError, ConfigAttribute, DescriptorKind, MetadataSource, RequestDescriptor, WebRequest,
};
use arc_swap::ArcSwap;
use regex::Regex;
use tracing::{debug, info};

/// Matches the path of a [`WebRequest`].
#[derive(Clone)]
pub enum RequestMatcher {
    /// Matches every request.
    Any,
    /// Ant-style path pattern: `?` one character, `*` within a segment,
    /// `**` any number of segments.
    Ant { pattern: String, regex: Regex },
    /// Regular expression over the path plus `?query` when present.
    Regex(Regex),
}

impl RequestMatcher {
    /// Compile an Ant-style path pattern.
    ///
    /// # Errors
    ///
    /// - `Configuration` if the pattern cannot be compiled
    pub fn ant(pattern: &str) -> Result<Self, AccessError> {
        let regex = Regex::new(&ant_to_regex(pattern)).map_err(|e| {
            AccessError::configuration(format!("invalid path pattern '{pattern}': {e}"))
        })?;
        Ok(Self::Ant {
            pattern: pattern.to_owned(),
            regex,
        })
    }

    /// Compile a regular expression matcher.
    ///
    /// # Errors
    ///
    /// - `Configuration` if the expression is invalid
    pub fn regex(expression: &str) -> Result<Self, AccessError> {
        Regex::new(expression).map(Self::Regex).map_err(|e| {
            AccessError::configuration(format!("invalid regex '{expression}': {e}"))
        })
    }

    #[must_use]
    pub fn matches(&self, request: &WebRequest) -> bool {
        match self {
            Self::Any => true,
            Self::Ant { regex, .. } => regex.is_match(request.path()),
            Self::Regex(regex) => match request.query() {
                Some(query) => regex.is_match(&format!("{}?{query}", request.path())),
                None => regex.is_match(request.path()),
            },
        }
    }
}

impl fmt::Debug for RequestMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Ant { pattern, .. } => write!(f, "ant({pattern})"),
            Self::Regex(regex) => write!(f, "regex({})", regex.as_str()),
        }
    }
}

fn ant_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    for (i, segment) in pattern.split('/').enumerate() {
        if segment == "**" {
            out.push_str(if i == 0 { ".*" } else { "(?:/[^/]*)*" });
            continue;
        }
        if i > 0 {
            out.push('/');
        }
        for c in segment.chars() {
            match c {
                '*' => out.push_str("[^/]*"),
                '?' => out.push_str("[^/]"),
                c => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
    }
    out.push('$');
    out
}

/// One entry of a [`PathMetadataSource`].
#[derive(Debug, Clone)]
pub struct PathRule {
    matcher: RequestMatcher,
    /// Upper-case HTTP methods; empty matches every method.
    methods: Vec<String>,
    attributes: Vec<ConfigAttribute>,
}

impl PathRule {
    #[must_use]
    pub fn new(matcher: RequestMatcher, attributes: Vec<ConfigAttribute>) -> Self {
        Self {
            matcher,
            methods: Vec::new(),
            attributes,
        }
    }

    #[must_use]
    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.methods = methods
            .into_iter()
            .map(|m| m.as_ref().to_ascii_uppercase())
            .collect();
        self
    }

    #[must_use]
    pub fn matcher(&self) -> &RequestMatcher {
        &self.matcher
    }

    #[must_use]
    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    #[must_use]
    pub fn attributes(&self) -> &[ConfigAttribute] {
        &self.attributes
    }

    fn matches(&self, request: &WebRequest) -> bool {
        (self.methods.is_empty() || self.methods.iter().any(|m| m == request.method()))
            && self.matcher.matches(request)
    }
}

/// Ordered web rules, first match wins.
///
/// The rule table is an immutable snapshot; reloading swaps in a new one
/// atomically so lookups never take a lock.
pub struct PathMetadataSource {
    rules: ArcSwap<Vec<PathRule>>,
    require_match: bool,
}

impl PathMetadataSource {
    /// With `require_match`, a request no rule matches yields
    /// `NoMatchingRule`; otherwise it is treated as public.
    #[must_use]
    pub fn new(rules: Vec<PathRule>, require_match: bool) -> Self {
        Self {
            rules: ArcSwap::from_pointee(rules),
            require_match,
        }
    }

    /// Replace the rule table. Callers outside the crate go through
    /// `AccessDecision::reload`, which validates the attributes first.
    pub(crate) fn reload(&self, rules: Vec<PathRule>) {
        info!(rule_count = rules.len(), "Reloading path authorization rules");
        self.rules.store(Arc::new(rules));
    }

    /// Current rule snapshot.
    #[must_use]
    pub fn rules(&self) -> Arc<Vec<PathRule>> {
        self.rules.load_full()
    }
}

impl MetadataSource for PathMetadataSource {
    fn attributes_for(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<Vec<ConfigAttribute>, AccessError> {
        let RequestDescriptor::Web(request) = descriptor else {
            return Err(AccessError::configuration(format!(
                "path rules cannot be applied to {} descriptor {descriptor}",
                descriptor.kind()
            )));
        };

        let rules = self.rules.load();
        if let Some(rule) = rules.iter().find(|r| r.matches(request)) {
            debug!(%descriptor, matcher = ?rule.matcher, "Matched path rule");
            return Ok(rule.attributes.clone());
        }

        if self.require_match {
            Err(AccessError::NoMatchingRule {
                descriptor: descriptor.to_string(),
            })
        } else {
            Ok(Vec::new())
        }
    }

    fn all_config_attributes(&self) -> Option<Vec<ConfigAttribute>> {
        let mut all: Vec<ConfigAttribute> = Vec::new();
        for attr in self.rules.load().iter().flat_map(|r| r.attributes.iter()) {
            if !all.contains(attr) {
                all.push(attr.clone());
            }
        }
        Some(all)
    }

    fn supports_kind(&self, kind: DescriptorKind) -> bool {
        kind == DescriptorKind::Web
    }
}

impl fmt::Debug for PathMetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathMetadataSource")
            .field("rules", &self.rules.load().len())
            .field("require_match", &self.require_match)
            .finish_non_exhaustive()
    }
}

/// Attributes keyed by `Type::method` signature.
#[derive(Debug, Clone, Default)]
pub struct MethodMetadataSource {
    methods: HashMap<String, Vec<ConfigAttribute>>,
}

impl MethodMetadataSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(
        mut self,
        signature: impl Into<String>,
        attributes: impl IntoIterator<Item = ConfigAttribute>,
    ) -> Self {
        self.methods
            .insert(signature.into(), attributes.into_iter().collect());
        self
    }
}

impl MetadataSource for MethodMetadataSource {
    fn attributes_for(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<Vec<ConfigAttribute>, AccessError> {
        let RequestDescriptor::Method(invocation) = descriptor else {
            return Err(AccessError::configuration(format!(
                "method rules cannot be applied to {} descriptor {descriptor}",
                descriptor.kind()
            )));
        };

        self.methods
            .get(&invocation.signature())
            .cloned()
            .ok_or_else(|| AccessError::NoMatchingRule {
                descriptor: descriptor.to_string(),
            })
    }

    fn all_config_attributes(&self) -> Option<Vec<ConfigAttribute>> {
        let mut all: Vec<ConfigAttribute> = self.methods.values().flatten().cloned().collect();
        all.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        all.dedup();
        Some(all)
    }

    fn supports_kind(&self, kind: DescriptorKind) -> bool {
        kind == DescriptorKind::Method
    }
}
