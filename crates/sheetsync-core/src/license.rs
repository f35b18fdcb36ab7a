//! Licenses and request authorization
//!
//! A license is requested with an email and an optional list of domains,
//! then activated. Its key is the bearer credential for every API call.
//!
//! Origin rules for a verified license:
//! - no domains registered: every origin is allowed
//! - the origin host is registered exactly
//! - `*.<parent>` is registered, where `<parent>` is the host without its
//!   first label
//!
//! Unverified licenses are never allowed.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sheetsync_store::OwnerId;
use uuid::Uuid;

use crate::error::{SheetError, INVALID_LICENSE, MISSING_CREDENTIALS};

/// License identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseId(Uuid);

impl LicenseId {
    /// Generate a new random id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    #[inline]
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Owner id of documents created under this license
    #[inline]
    #[must_use]
    pub const fn owner(&self) -> OwnerId {
        OwnerId::from_uuid(self.0)
    }
}

impl Default for LicenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for LicenseId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for LicenseId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Stored license
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// License id, used in the activation link
    pub id: LicenseId,
    /// Bearer key
    pub key: String,
    /// Contact email
    pub email: String,
    /// Whether the email was confirmed
    pub verified: bool,
    /// Allowed origin hosts, exact or `*.<parent>`
    pub allowed_domains: BTreeSet<String>,
    /// Request time
    pub created_at: DateTime<Utc>,
}

/// Authorized principal of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    /// License the request was made with
    pub license_id: LicenseId,
    /// Contact email of the license
    pub email: String,
    verified: bool,
    allowed_domains: BTreeSet<String>,
}

impl Tenant {
    /// Owner id of this tenant's documents
    #[inline]
    #[must_use]
    pub fn owner(&self) -> OwnerId {
        self.license_id.owner()
    }

    /// Check if requests from `origin` may use this license
    #[must_use]
    pub fn is_origin_allowed(&self, origin: Option<&str>) -> bool {
        if !self.verified {
            return false;
        }
        if self.allowed_domains.is_empty() {
            return true;
        }
        let host = origin_host(origin.unwrap_or_default());
        let parent = host.split_once('.').map_or("", |(_, parent)| parent);
        self.allowed_domains.contains(&host) || self.allowed_domains.contains(&format!("*.{parent}"))
    }
}

impl From<&License> for Tenant {
    fn from(license: &License) -> Self {
        Self {
            license_id: license.id,
            email: license.email.clone(),
            verified: license.verified,
            allowed_domains: license.allowed_domains.clone(),
        }
    }
}

fn origin_host(origin: &str) -> String {
    let rest = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
        .unwrap_or(origin);
    rest.split(':').next().unwrap_or_default().to_ascii_lowercase()
}

/// What a request presents to be authorized
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Raw `Authorization` header
    pub authorization: Option<String>,
    /// Raw `Origin` header
    pub origin: Option<String>,
}

impl Credentials {
    /// Credentials with no headers at all
    #[inline]
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// `Authorization: Bearer <key>`
    #[must_use]
    pub fn bearer(key: &str) -> Self {
        Self {
            authorization: Some(format!("Bearer {key}")),
            origin: None,
        }
    }

    /// With `Origin` header
    #[inline]
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    fn bearer_key(&self) -> Result<&str, SheetError> {
        let header = self
            .authorization
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| SheetError::Auth(MISSING_CREDENTIALS.to_string()))?;
        let mut parts = header.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(scheme), Some(key), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(key),
            _ => Err(SheetError::Auth(INVALID_LICENSE.to_string())),
        }
    }
}

/// In-process license registry
#[derive(Debug, Default)]
pub struct LicenseRegistry {
    licenses: DashMap<LicenseId, License>,
    by_key: DashMap<String, LicenseId>,
    by_email: DashMap<String, LicenseId>,
}

impl LicenseRegistry {
    /// Create an empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new, unverified license
    ///
    /// `domains` is a comma-separated list; entries are trimmed and empty
    /// ones dropped.
    ///
    /// # Errors
    /// Returns a validation error when the email is missing or already has
    /// a license.
    pub fn request_license(&self, email: Option<&str>, domains: Option<&str>) -> Result<License, SheetError> {
        let email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| SheetError::validation("You must specify the 'email' field."))?;

        let allowed_domains = domains
            .unwrap_or_default()
            .split(',')
            .map(|d| d.trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        let license = License {
            id: LicenseId::new(),
            key: Uuid::new_v4().to_string(),
            email: email.to_string(),
            verified: false,
            allowed_domains,
            created_at: Utc::now(),
        };

        match self.by_email.entry(email.to_ascii_lowercase()) {
            Entry::Occupied(_) => Err(SheetError::validation(format!(
                "License key already created for '{email}'."
            ))),
            Entry::Vacant(slot) => {
                slot.insert(license.id);
                Ok(())
            }
        }?;
        self.by_key.insert(license.key.clone(), license.id);
        self.licenses.insert(license.id, license.clone());
        tracing::info!(license_id = %license.id, "license requested");
        Ok(license)
    }

    /// Mark a license verified
    ///
    /// # Errors
    /// Returns a not-found error for an unknown id.
    pub fn activate(&self, id: LicenseId) -> Result<License, SheetError> {
        let mut license = self
            .licenses
            .get_mut(&id)
            .ok_or_else(|| SheetError::not_found("License not found"))?;
        if !license.verified {
            license.verified = true;
            tracing::info!(license_id = %id, "license activated");
        }
        Ok(license.clone())
    }

    /// Look up a license
    #[must_use]
    pub fn get(&self, id: LicenseId) -> Option<License> {
        self.licenses.get(&id).map(|l| l.clone())
    }

    /// Number of registered licenses
    #[must_use]
    pub fn len(&self) -> usize {
        self.licenses.len()
    }

    /// Whether no license is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.licenses.is_empty()
    }

    /// Resolve the bearer key to a tenant, without checking the origin
    ///
    /// # Errors
    /// Returns [`SheetError::Auth`] for a missing, malformed or unknown key.
    pub fn resolve(&self, credentials: &Credentials) -> Result<Tenant, SheetError> {
        let key = credentials.bearer_key()?;
        let id = self
            .by_key
            .get(key)
            .map(|id| *id)
            .ok_or_else(|| SheetError::Auth(INVALID_LICENSE.to_string()))?;
        self.licenses
            .get(&id)
            .map(|license| Tenant::from(&*license))
            .ok_or_else(|| SheetError::Auth(INVALID_LICENSE.to_string()))
    }

    /// Resolve the key and check the request origin
    ///
    /// # Errors
    /// Returns [`SheetError::Auth`] from [`Self::resolve`] or
    /// [`SheetError::Authorization`] when the license is unverified or the
    /// origin is not allowed.
    pub fn authorize(&self, credentials: &Credentials) -> Result<Tenant, SheetError> {
        let tenant = self.resolve(credentials).map_err(|err| {
            tracing::warn!(error = %err, "authentication failed");
            err
        })?;
        if tenant.is_origin_allowed(credentials.origin.as_deref()) {
            Ok(tenant)
        } else {
            tracing::warn!(
                license_id = %tenant.license_id,
                origin = credentials.origin.as_deref().unwrap_or_default(),
                "origin not allowed"
            );
            Err(SheetError::Authorization(INVALID_LICENSE.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn verified(registry: &LicenseRegistry, domains: &str) -> License {
        let license = registry.request_license(Some("dev@example.com"), Some(domains)).unwrap();
        registry.activate(license.id).unwrap()
    }

    #[test]
    fn request_validates_email() {
        let registry = LicenseRegistry::new();
        assert_eq!(
            registry.request_license(None, None).unwrap_err().to_string(),
            "You must specify the 'email' field."
        );
        assert_eq!(
            registry.request_license(Some("  "), None).unwrap_err().to_string(),
            "You must specify the 'email' field."
        );

        registry.request_license(Some("a@b.com"), None).unwrap();
        assert_eq!(
            registry.request_license(Some("a@b.com"), None).unwrap_err().to_string(),
            "License key already created for 'a@b.com'."
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn domains_are_split_and_trimmed() {
        let registry = LicenseRegistry::new();
        let license = registry
            .request_license(Some("a@b.com"), Some(" app.example.com, ,*.Example.org,"))
            .unwrap();
        let domains: Vec<_> = license.allowed_domains.iter().map(String::as_str).collect();
        assert_eq!(domains, vec!["*.example.org", "app.example.com"]);
        assert!(!license.verified);
    }

    #[test]
    fn bearer_parsing() {
        let registry = LicenseRegistry::new();
        let license = verified(&registry, "");

        let err = registry.resolve(&Credentials::anonymous()).unwrap_err();
        assert_eq!(err, SheetError::Auth(MISSING_CREDENTIALS.into()));

        for header in ["Token abc", "Bearer", "Bearer a b", "Bearer unknown"] {
            let credentials = Credentials {
                authorization: Some(header.into()),
                origin: None,
            };
            assert_eq!(
                registry.resolve(&credentials).unwrap_err(),
                SheetError::Auth(INVALID_LICENSE.into()),
                "{header}"
            );
        }

        let tenant = registry.resolve(&Credentials::bearer(&license.key)).unwrap();
        assert_eq!(tenant.license_id, license.id);
        assert_eq!(tenant.owner(), license.id.owner());
    }

    #[test]
    fn unverified_license_is_not_authorized() {
        let registry = LicenseRegistry::new();
        let license = registry.request_license(Some("a@b.com"), None).unwrap();
        let err = registry.authorize(&Credentials::bearer(&license.key)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(err.to_string(), INVALID_LICENSE);
    }

    #[test]
    fn empty_domain_set_allows_any_origin() {
        let registry = LicenseRegistry::new();
        let license = verified(&registry, "");
        let credentials = Credentials::bearer(&license.key).with_origin("https://anything.test:8443");
        assert!(registry.authorize(&credentials).is_ok());
        assert!(registry.authorize(&Credentials::bearer(&license.key)).is_ok());
    }

    #[test]
    fn origin_matching() {
        let registry = LicenseRegistry::new();
        let license = verified(&registry, "app.example.com,*.example.org");
        let tenant = registry.resolve(&Credentials::bearer(&license.key)).unwrap();

        assert!(tenant.is_origin_allowed(Some("https://app.example.com")));
        assert!(tenant.is_origin_allowed(Some("http://app.example.com:3000")));
        assert!(tenant.is_origin_allowed(Some("https://www.example.org")));
        assert!(!tenant.is_origin_allowed(Some("https://example.org")));
        assert!(!tenant.is_origin_allowed(Some("https://a.b.example.org")));
        assert!(!tenant.is_origin_allowed(Some("https://other.example.com")));
        assert!(!tenant.is_origin_allowed(None));
    }

    #[test]
    fn activation() {
        let registry = LicenseRegistry::new();
        assert_eq!(
            registry.activate(LicenseId::new()).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        let license = registry.request_license(Some("a@b.com"), None).unwrap();
        assert!(registry.activate(license.id).unwrap().verified);
        assert!(registry.activate(license.id).unwrap().verified);
        assert!(registry.get(license.id).unwrap().verified);
    }
}
