//! Fetch limits and URL policy.

use std::time::Duration;

/// Which URLs may be fetched at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlPolicy {
    /// Accept plain `http` in addition to `https`.
    pub allow_http: bool,
    /// Ports allowed when given explicitly. Empty means the default set.
    pub allowed_ports: Vec<u16>,
}

impl UrlPolicy {
    /// HTTPS only, port 443.
    pub fn https_only() -> Self {
        Self::default()
    }

    /// HTTP or HTTPS, ports 80 and 443.
    pub fn allowing_http() -> Self {
        Self {
            allow_http: true,
            allowed_ports: Vec::new(),
        }
    }

    /// Builder: override the allowed explicit ports.
    pub fn with_allowed_ports(mut self, ports: impl Into<Vec<u16>>) -> Self {
        self.allowed_ports = ports.into();
        self
    }

    /// Returns the ports an explicit `:port` must belong to.
    ///
    /// Defaults to `[443]`, or `[80, 443]` when http is allowed.
    pub fn effective_ports(&self) -> &[u16] {
        if !self.allowed_ports.is_empty() {
            &self.allowed_ports
        } else if self.allow_http {
            &[80, 443]
        } else {
            &[443]
        }
    }
}

/// Bounds applied to one guarded fetch.
#[derive(Debug, Clone)]
pub struct FetchLimits {
    /// Deadline for the whole exchange, redirects and body included.
    pub timeout: Duration,
    /// Largest accepted body, in bytes.
    pub max_bytes: u64,
    /// Redirects followed before giving up.
    pub max_redirects: u32,
    /// URL validation policy, applied to every hop.
    pub policy: UrlPolicy,
    /// User agent sent with each request.
    pub user_agent: String,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(Self::DEFAULT_TIMEOUT_MS),
            max_bytes: Self::DEFAULT_MAX_BYTES,
            max_redirects: Self::DEFAULT_MAX_REDIRECTS,
            policy: UrlPolicy::default(),
            user_agent: format!("icaltester/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetchLimits {
    /// Default timeout in milliseconds.
    pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

    /// Default body cap in bytes.
    pub const DEFAULT_MAX_BYTES: u64 = 2_000_000;

    /// Default redirect budget.
    pub const DEFAULT_MAX_REDIRECTS: u32 = 3;

    /// Default limits, with plain http allowed or not.
    pub fn for_http(allow_http: bool) -> Self {
        let policy = if allow_http {
            UrlPolicy::allowing_http()
        } else {
            UrlPolicy::https_only()
        };
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the body cap.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Sets the redirect budget.
    pub fn with_max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Sets the URL policy.
    pub fn with_policy(mut self, policy: UrlPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
