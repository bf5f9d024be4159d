//! Access gate: admission by client network origin.
//!
//! The gate runs in front of every route. It fails closed: a request with no
//! known peer address, a reverse lookup that errors, and a lookup that
//! exceeds the configured timeout are all denied.

pub mod cache;
pub mod middleware;
pub mod resolver;

use crate::config::{AccessConfig, AccessPolicyKind};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use cache::DnsCache;
use resolver::{ReverseResolver, SystemResolver};
use std::{net::IpAddr, sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Branded page returned by the domain-aware policy on denial.
const DENIED_PAGE: &str = include_str!("../../static/access_denied.html");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPolicy {
    Open,
    AddressPrefix {
        prefixes: Vec<String>,
    },
    AddressOrDomain {
        prefixes: Vec<String>,
        /// Lowercase, without leading or trailing dots.
        domain: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
}

pub struct AccessGate {
    policy: AccessPolicy,
    resolver: Arc<dyn ReverseResolver>,
    cache: DnsCache,
    dns_timeout: Duration,
}

impl AccessGate {
    pub fn new(
        policy: AccessPolicy,
        resolver: Arc<dyn ReverseResolver>,
        cache: DnsCache,
        dns_timeout: Duration,
    ) -> Self {
        Self {
            policy,
            resolver,
            cache,
            dns_timeout,
        }
    }

    /// Gate using the system resolver, configured from `AccessConfig`.
    pub fn from_config(config: &AccessConfig) -> Self {
        let policy = match config.policy {
            AccessPolicyKind::Open => AccessPolicy::Open,
            AccessPolicyKind::Prefix => AccessPolicy::AddressPrefix {
                prefixes: config.allowed_prefixes.clone(),
            },
            AccessPolicyKind::PrefixOrDomain => AccessPolicy::AddressOrDomain {
                prefixes: config.allowed_prefixes.clone(),
                domain: config.allowed_domain.clone().unwrap_or_default(),
            },
        };
        Self::new(
            policy,
            Arc::new(SystemResolver),
            DnsCache::new(config.dns_cache_ttl, config.dns_cache_capacity),
            config.dns_timeout,
        )
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Decide whether a request from `peer` may proceed.
    ///
    /// Recomputed on every request; only reverse lookups are cached.
    pub async fn decide(&self, peer: Option<IpAddr>) -> AccessDecision {
        let (prefixes, domain) = match &self.policy {
            AccessPolicy::Open => return AccessDecision::Allow,
            AccessPolicy::AddressPrefix { prefixes } => (prefixes, None),
            AccessPolicy::AddressOrDomain { prefixes, domain } => (prefixes, Some(domain)),
        };

        let Some(ip) = peer.map(|ip| ip.to_canonical()) else {
            return AccessDecision::Deny;
        };
        if prefix_matches(prefixes, ip) {
            return AccessDecision::Allow;
        }

        match domain {
            Some(domain) if !domain.is_empty() => match self.reverse_name(ip).await {
                Some(hostname) if domain_matches(&hostname, domain) => AccessDecision::Allow,
                _ => AccessDecision::Deny,
            },
            _ => AccessDecision::Deny,
        }
    }

    /// Response sent to a denied client.
    pub fn denial_response(&self) -> Response {
        match self.policy {
            AccessPolicy::AddressOrDomain { .. } => {
                (StatusCode::FORBIDDEN, Html(DENIED_PAGE)).into_response()
            }
            _ => StatusCode::FORBIDDEN.into_response(),
        }
    }

    async fn reverse_name(&self, ip: IpAddr) -> Option<String> {
        if let Some(cached) = self.cache.get(ip) {
            return cached;
        }

        match tokio::time::timeout(self.dns_timeout, self.resolver.reverse(ip)).await {
            Ok(Ok(hostname)) => {
                self.cache.insert(ip, Some(hostname.clone()));
                debug!(%ip, %hostname, cached = self.cache.len(), "reverse lookup resolved");
                Some(hostname)
            }
            Ok(Err(err)) => {
                debug!(%ip, "reverse lookup failed: {}", err);
                self.cache.insert(ip, None);
                None
            }
            Err(_) => {
                warn!(%ip, "reverse lookup timed out after {:?}", self.dns_timeout);
                None
            }
        }
    }
}

fn prefix_matches(prefixes: &[String], ip: IpAddr) -> bool {
    let address = ip.to_string();
    prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && address.starts_with(prefix.as_str()))
}

/// True if `hostname` is `domain` or a subdomain of it.
fn domain_matches(hostname: &str, domain: &str) -> bool {
    let hostname = hostname.trim_end_matches('.').to_ascii_lowercase();
    let domain = domain.trim_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    hostname == domain
        || hostname
            .strip_suffix(domain.as_str())
            .is_some_and(|head| head.ends_with('.'))
}
