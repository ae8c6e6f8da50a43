//! Host registry: logical host tags resolved to base URLs.
//!
//! Every outbound request names a [`HostTag`] rather than a URL; the
//! [`HostRegistry`] owns the tag-to-base-URL mapping. Path construction
//! (query strings, account/environment/resource segments) is the caller's
//! responsibility.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Logical name for one of the backend hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostTag {
    /// The primary management host.
    Management,
    /// The auth/token host.
    Auth,
    /// The storage-service (backup) host.
    StorageService,
    /// The AWS deployment-manager host.
    AwsDeploy,
    /// The Azure deployment-manager host.
    AzureDeploy,
    /// The GCP deployment-manager host.
    GcpDeploy,
}

impl HostTag {
    /// All known host tags.
    pub const ALL: [HostTag; 6] = [
        HostTag::Management,
        HostTag::Auth,
        HostTag::StorageService,
        HostTag::AwsDeploy,
        HostTag::AzureDeploy,
        HostTag::GcpDeploy,
    ];

    /// The stable string form of the tag, as used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HostTag::Management => "management",
            HostTag::Auth => "auth",
            HostTag::StorageService => "storage-service",
            HostTag::AwsDeploy => "aws-deploy",
            HostTag::AzureDeploy => "azure-deploy",
            HostTag::GcpDeploy => "gcp-deploy",
        }
    }
}

impl fmt::Display for HostTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from logical host tags to base URLs.
///
/// Constructed from production defaults; individual entries can be
/// overridden with [`HostRegistry::with_host`] (for staging environments or
/// tests). Resolution of a tag with no entry is a fatal configuration
/// error.
#[derive(Debug, Clone)]
pub struct HostRegistry {
    hosts: HashMap<HostTag, String>,
}

impl Default for HostRegistry {
    fn default() -> Self {
        let mut hosts = HashMap::new();
        hosts.insert(HostTag::Management, "https://api.strato.cloud".to_string());
        hosts.insert(HostTag::Auth, "https://auth.strato.cloud".to_string());
        hosts.insert(
            HostTag::StorageService,
            "https://backup.strato.cloud".to_string(),
        );
        hosts.insert(
            HostTag::AwsDeploy,
            "https://aws.deploy.strato.cloud".to_string(),
        );
        hosts.insert(
            HostTag::AzureDeploy,
            "https://azure.deploy.strato.cloud".to_string(),
        );
        hosts.insert(
            HostTag::GcpDeploy,
            "https://gcp.deploy.strato.cloud".to_string(),
        );
        Self { hosts }
    }
}

impl HostRegistry {
    /// An empty registry with no entries.
    ///
    /// Useful for tests that want every tag to resolve to a local server or
    /// to fail fast on unexpected traffic.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            hosts: HashMap::new(),
        }
    }

    /// Override (or add) the base URL for one host tag.
    ///
    /// Trailing slashes are stripped so callers can join paths with a
    /// leading `/` without producing `//`.
    #[must_use]
    pub fn with_host(mut self, tag: HostTag, base_url: impl Into<String>) -> Self {
        let url: String = base_url.into();
        self.hosts
            .insert(tag, url.trim_end_matches('/').to_string());
        self
    }

    /// Resolve a host tag to its base URL.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownHost`] if no base URL is registered for
    /// the tag.
    pub fn resolve(&self, tag: HostTag) -> Result<&str> {
        self.hosts
            .get(&tag)
            .map(String::as_str)
            .ok_or(CoreError::UnknownHost(tag))
    }
}
