//! # Host-resolution interceptor
//!
//! When active, name resolution for any hostname matching an active deny
//! pattern fails with an NXDOMAIN-shaped error; every other lookup passes
//! through to the original entry point, which is captured before the first
//! install. The pattern set is process-local, replaced atomically on each
//! install, and survives across invocations inside the same container.

use crate::telemetry::{self, Action};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// NXDOMAIN-shaped outcome for a denied hostname.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("getaddrinfo {code} {hostname}")]
pub struct HostNotFound {
    pub hostname: String,
    pub code: &'static str,
    pub syscall: &'static str,
}

impl HostNotFound {
    fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            code: "ENOTFOUND",
            syscall: "getaddrinfo",
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    NotFound(#[from] HostNotFound),
    #[error("lookup failed for {hostname}: {source}")]
    Lookup {
        hostname: String,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
trait HostResolver: Send + Sync {
    async fn lookup(&self, hostname: &str, port: u16) -> std::io::Result<Vec<SocketAddr>>;
}

struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn lookup(&self, hostname: &str, port: u16) -> std::io::Result<Vec<SocketAddr>> {
        Ok(tokio::net::lookup_host((hostname, port)).await?.collect())
    }
}

// The original entry point, captured before any install can swap patterns in.
static ORIGINAL: Lazy<Arc<dyn HostResolver>> = Lazy::new(|| Arc::new(SystemResolver));

struct InterceptorState {
    active: bool,
    patterns: Vec<Regex>,
}

static STATE: Lazy<RwLock<InterceptorState>> = Lazy::new(|| {
    RwLock::new(InterceptorState {
        active: false,
        patterns: Vec::new(),
    })
});

/// Activates interception with the given pattern set, replacing any previous
/// set. Invalid patterns are logged and skipped; one bad pattern does not
/// disable the others. Idempotent.
pub fn install(patterns: &[String]) {
    Lazy::force(&ORIGINAL);
    let mut compiled = Vec::with_capacity(patterns.len());
    for source in patterns {
        match Regex::new(source) {
            Ok(re) => compiled.push(re),
            Err(e) => telemetry::warn(
                Action::Config,
                json!({
                    "mode": "denylist",
                    "pattern": source,
                    "message": format!("skipping invalid pattern: {e}"),
                }),
            ),
        }
    }
    if let Ok(mut state) = STATE.write() {
        state.patterns = compiled;
        state.active = true;
    }
    telemetry::info(Action::Inject, json!({"mode": "denylist", "patterns": patterns}));
}

/// Restores the original resolution path and empties the pattern set.
pub fn clear() {
    let Ok(mut state) = STATE.write() else {
        return;
    };
    if state.active {
        telemetry::info(Action::Clear, json!({"mode": "denylist"}));
    }
    state.active = false;
    state.patterns.clear();
}

pub fn is_active() -> bool {
    STATE.read().map(|state| state.active).unwrap_or(false)
}

/// Pure predicate: does any active pattern match the hostname?
pub fn is_denied(hostname: &str) -> bool {
    STATE
        .read()
        .map(|state| state.active && state.patterns.iter().any(|re| re.is_match(hostname)))
        .unwrap_or(false)
}

/// The interceptable resolution entry point. Denied hostnames fail on a
/// later tick, so callers never observe synchronous completion when blocked.
pub async fn resolve_host(hostname: &str, port: u16) -> Result<Vec<SocketAddr>, ResolveError> {
    if is_denied(hostname) {
        tokio::task::yield_now().await;
        telemetry::info(Action::Block, json!({"mode": "denylist", "hostname": hostname}));
        return Err(HostNotFound::new(hostname).into());
    }
    ORIGINAL
        .lookup(hostname, port)
        .await
        .map_err(|source| ResolveError::Lookup {
            hostname: hostname.to_string(),
            source,
        })
}

/// Routes a reqwest client through the interceptor:
/// `Client::builder().dns_resolver(Arc::new(ChaosDnsResolver))`.
#[derive(Debug, Default, Clone)]
pub struct ChaosDnsResolver;

impl Resolve for ChaosDnsResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let hostname = name.as_str().to_string();
        Box::pin(async move {
            let addrs = resolve_host(&hostname, 0).await?;
            Ok(Box::new(addrs.into_iter()) as Addrs)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use test_log::test;

    #[test]
    #[serial]
    fn test_install_and_clear_state_machine() {
        clear();
        assert!(!is_active());

        install(&[r"s3\..*".to_string()]);
        assert!(is_active());
        assert!(is_denied("s3.us-east-1.amazonaws.com"));

        // Reinstall replaces the pattern set.
        install(&[r"dynamodb\..*".to_string()]);
        assert!(!is_denied("s3.us-east-1.amazonaws.com"));
        assert!(is_denied("dynamodb.us-east-1.amazonaws.com"));

        clear();
        assert!(!is_active());
        assert!(!is_denied("dynamodb.us-east-1.amazonaws.com"));

        // Clearing twice leaves resolution in its original state.
        clear();
        assert!(!is_active());
    }

    #[test]
    #[serial]
    fn test_invalid_pattern_does_not_disable_the_others() {
        clear();
        install(&["(unclosed".to_string(), r"s3\..*".to_string()]);
        assert!(is_denied("s3.us-east-1.amazonaws.com"));
        assert!(!is_denied("sqs.us-east-1.amazonaws.com"));
        clear();
    }

    #[test(tokio::test)]
    #[serial]
    async fn test_denied_lookup_fails_with_nxdomain_shape() {
        clear();
        install(&[r"s3\..*\.amazonaws\.com".to_string()]);

        let result = resolve_host("s3.us-east-1.amazonaws.com", 443).await;
        match result {
            Err(ResolveError::NotFound(e)) => {
                assert_eq!(e.hostname, "s3.us-east-1.amazonaws.com");
                assert_eq!(e.code, "ENOTFOUND");
                assert_eq!(e.syscall, "getaddrinfo");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        clear();
    }

    #[test(tokio::test)]
    #[serial]
    async fn test_non_matching_lookup_passes_through() {
        clear();
        install(&[r"s3\..*\.amazonaws\.com".to_string()]);

        let addrs = resolve_host("localhost", 80).await.unwrap();
        assert!(!addrs.is_empty());
        clear();
    }
}
