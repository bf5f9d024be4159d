//! Reverse DNS lookups used by the domain-based access policy.

use async_trait::async_trait;
use std::{io, net::IpAddr};

/// Resolves an address to its PTR hostname.
#[async_trait]
pub trait ReverseResolver: Send + Sync {
    async fn reverse(&self, ip: IpAddr) -> io::Result<String>;
}

/// Resolver backed by the operating system (`getnameinfo`).
///
/// The system call blocks, so it runs on tokio's blocking pool. Callers are
/// expected to bound it with a timeout; an abandoned lookup finishes in the
/// background and its result is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl ReverseResolver for SystemResolver {
    async fn reverse(&self, ip: IpAddr) -> io::Result<String> {
        tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&ip))
            .await
            .map_err(io::Error::other)?
    }
}
