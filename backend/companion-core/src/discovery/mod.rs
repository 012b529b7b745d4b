//! Sensor discovery seam.
//!
//! How a service name becomes a host and port (mDNS, a manual entry, a test
//! fixture) is up to the [`ServiceResolver`]. The pairing flow only sees the
//! async `resolve` call, bounded by [`resolve_with_timeout`].

use std::collections::HashMap;
use std::future::Future;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{debug, warn};

/// A sensor advertised on the local network, not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorCandidate {
    pub service_name: String,
    pub display_name: String,
}

impl SensorCandidate {
    pub fn new(service_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedService {
    pub host: String,
    pub port: u16,
}

impl ResolvedService {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `http(s)://host:port`, bracketing IPv6 literals.
    pub fn base_url(&self, secure: bool) -> String {
        let scheme = if secure { "https" } else { "http" };
        match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(v6)) => format!("{scheme}://[{v6}]:{}", self.port),
            _ => format!("{scheme}://{}:{}", self.host, self.port),
        }
    }
}

pub trait ServiceResolver: Send + Sync {
    /// `None` when the name cannot be resolved.
    fn resolve(&self, service_name: &str) -> impl Future<Output = Option<ResolvedService>> + Send;
}

impl<T: ServiceResolver> ServiceResolver for Arc<T> {
    fn resolve(&self, service_name: &str) -> impl Future<Output = Option<ResolvedService>> + Send {
        (**self).resolve(service_name)
    }
}

/// Resolve, treating a timeout the same as no answer.
pub async fn resolve_with_timeout<R: ServiceResolver + ?Sized>(
    resolver: &R,
    service_name: &str,
    timeout: Duration,
) -> Option<ResolvedService> {
    match tokio::time::timeout(timeout, resolver.resolve(service_name)).await {
        Ok(Some(service)) => {
            debug!(
                "Resolved '{service_name}' to {}:{}",
                service.host, service.port
            );
            Some(service)
        }
        Ok(None) => {
            warn!("No answer resolving '{service_name}'");
            None
        }
        Err(_) => {
            warn!("Resolving '{service_name}' timed out after {timeout:?}");
            None
        }
    }
}

/// Resolver backed by a fixed table, for manually entered sensors.
#[derive(Debug, Default)]
pub struct StaticResolver {
    services: RwLock<HashMap<String, ResolvedService>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(self, service_name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        self.insert(service_name, ResolvedService::new(host, port));
        self
    }

    pub fn insert(&self, service_name: impl Into<String>, service: ResolvedService) {
        let mut services = self
            .services
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        services.insert(service_name.into(), service);
    }

    pub fn remove(&self, service_name: &str) {
        let mut services = self
            .services
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        services.remove(service_name);
    }
}

impl ServiceResolver for StaticResolver {
    async fn resolve(&self, service_name: &str) -> Option<ResolvedService> {
        let services = self
            .services
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        services.get(service_name).cloned()
    }
}
