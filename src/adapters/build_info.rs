//! Build identity gauge.
//!
//! Registered once at start-up as `build_info` with constant, lowercased
//! identity labels and the value 1.

use std::collections::HashMap;

use prometheus::IntGauge;

use crate::error::Result;
use crate::labels::normalize;
use crate::registry::{MetricDescriptor, MetricsRegistry};

const BUILD_INFO: MetricDescriptor =
    MetricDescriptor::gauge("build_info", "Build information of the running service.", &[]);

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub service: String,
    pub host: String,
    pub environment: String,
    pub version: String,
    pub rust_version: String,
    pub revision: String,
    pub branch: String,
}

impl BuildInfo {
    /// Identity of this process: host from the OS, version from the crate.
    pub fn from_env(service: &str, environment: &str) -> Self {
        let host = hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let rust_version = option_env!("RUSTC_VERSION")
            .and_then(compiler_version)
            .unwrap_or(UNKNOWN);

        Self {
            service: service.to_string(),
            host,
            environment: environment.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            rust_version: rust_version.to_string(),
            revision: UNKNOWN.to_string(),
            branch: UNKNOWN.to_string(),
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = revision.into();
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    fn const_labels(&self) -> HashMap<String, String> {
        [
            ("service_name", &self.service),
            ("hostname", &self.host),
            ("env", &self.environment),
            ("version", &self.version),
            ("rust_version", &self.rust_version),
            ("revision", &self.revision),
            ("branch", &self.branch),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), normalize(value)))
        .collect()
    }

    /// Register the gauge and set it to 1. Fails if already registered.
    pub fn register(&self, registry: &MetricsRegistry) -> Result<IntGauge> {
        let gauge = registry.const_gauge(&BUILD_INFO, self.const_labels())?;
        gauge.set(1);
        Ok(gauge)
    }
}

/// `"rustc 1.78.0 (9b00956e5 2024-04-29)"` -> `"1.78.0"`.
fn compiler_version(banner: &str) -> Option<&str> {
    let mut words = banner.split_whitespace();
    match (words.next(), words.next()) {
        (Some("rustc"), Some(version)) => Some(version),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricsError;

    fn info() -> BuildInfo {
        BuildInfo {
            service: "Orders".into(),
            host: "Box-1".into(),
            environment: "Production".into(),
            version: "1.2.3".into(),
            rust_version: "1.75".into(),
            revision: "ABC123".into(),
            branch: "Main".into(),
        }
    }

    #[test]
    fn registers_lowercased_identity_set_to_one() {
        let registry = MetricsRegistry::new();
        info().register(&registry).unwrap();

        let labels = [
            ("service_name", "orders"),
            ("hostname", "box-1"),
            ("env", "production"),
            ("version", "1.2.3"),
            ("rust_version", "1.75"),
            ("revision", "abc123"),
            ("branch", "main"),
        ];
        assert_eq!(registry.snapshot().gauge("build_info", &labels), Some(1.0));
    }

    #[test]
    fn second_registration_fails() {
        let registry = MetricsRegistry::new();
        info().register(&registry).unwrap();
        assert!(matches!(
            info().register(&registry),
            Err(MetricsError::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn from_env_fills_crate_version() {
        let info = BuildInfo::from_env("svc", "dev").with_revision("r1").with_branch("b1");
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(info.revision, "r1");
        assert!(!info.host.is_empty());
    }

    #[test]
    fn from_env_reports_compiler_version() {
        let info = BuildInfo::from_env("svc", "dev");
        assert_ne!(info.rust_version, UNKNOWN);
        assert!(info.rust_version.starts_with(|c: char| c.is_ascii_digit()));
        assert_eq!(info.rust_version.split('.').count(), 3);
    }

    #[test]
    fn compiler_version_parses_banner() {
        assert_eq!(compiler_version("rustc 1.78.0 (9b00956e5 2024-04-29)"), Some("1.78.0"));
        assert_eq!(compiler_version("rustc 1.80.0-nightly"), Some("1.80.0-nightly"));
        assert_eq!(compiler_version("cargo 1.78.0"), None);
        assert_eq!(compiler_version(""), None);
    }
}
