//! Error types for outbound fetches.
//!
//! [`UrlRejection`] explains why a URL failed validation. [`FetchError`]
//! wraps every failure of a guarded fetch behind a [`FetchErrorCode`].

use std::fmt;
use thiserror::Error;

/// Why a URL was refused before any request was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlRejection {
    /// The input does not parse as an absolute URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// The URL embeds a username or password.
    #[error("userinfo not allowed in URL")]
    CredentialsInUrl,
    /// Only https (and optionally http) is accepted.
    #[error("scheme `{0}` is not allowed")]
    SchemeNotAllowed(String),
    /// No host component.
    #[error("hostname required")]
    MissingHost,
    /// Purely numeric or non-canonical numeric IPv4 host.
    #[error("numeric hostname `{0}` is not allowed")]
    NumericHostname(String),
    /// `localhost`, `*.local`, `*.internal` and similar.
    #[error("local hostname `{0}` is not allowed")]
    LocalHostname(String),
    /// Loopback, private, link-local, multicast or reserved address literal.
    #[error("private or reserved address `{0}` is not allowed")]
    PrivateAddress(String),
    /// Explicit port zero.
    #[error("invalid port")]
    InvalidPort,
    /// Explicit port outside the allowed set.
    #[error("port {0} is not allowed")]
    PortNotAllowed(u16),
}

impl UrlRejection {
    /// Returns true for rejections that protect internal resources, as
    /// opposed to plain malformed input.
    pub fn is_ssrf(&self) -> bool {
        !matches!(self, Self::InvalidUrl(_))
    }

    /// Short machine-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid_url",
            Self::CredentialsInUrl => "credentials_in_url",
            Self::SchemeNotAllowed(_) => "scheme_not_allowed",
            Self::MissingHost => "missing_host",
            Self::NumericHostname(_) => "numeric_hostname",
            Self::LocalHostname(_) => "local_hostname",
            Self::PrivateAddress(_) => "private_address",
            Self::InvalidPort => "invalid_port",
            Self::PortNotAllowed(_) => "port_not_allowed",
        }
    }
}

/// The category of a fetch error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorCode {
    /// The URL (initial or redirect target) is malformed.
    InvalidUrl,
    /// The URL (initial or redirect target) points somewhere forbidden.
    SsrfBlocked,
    /// More redirects than `max_redirects`.
    TooManyRedirects,
    /// A redirect response without a usable `Location`.
    InvalidRedirect,
    /// Declared or received body larger than `max_bytes`.
    ResponseTooLarge,
    /// The exchange did not finish within the timeout.
    Timeout,
    /// Connection, TLS or protocol failure.
    Network,
}

impl FetchErrorCode {
    /// Returns true if retrying later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network)
    }

    /// Returns a machine-readable name for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::SsrfBlocked => "ssrf_blocked",
            Self::TooManyRedirects => "too_many_redirects",
            Self::InvalidRedirect => "invalid_redirect",
            Self::ResponseTooLarge => "response_too_large",
            Self::Timeout => "fetch_timeout",
            Self::Network => "network_error",
        }
    }
}

impl fmt::Display for FetchErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error raised by a guarded fetch.
#[derive(Debug, Error)]
pub struct FetchError {
    code: FetchErrorCode,
    message: String,
    rejection: Option<UrlRejection>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FetchError {
    /// Creates an error with the given code and message.
    pub fn new(code: FetchErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            rejection: None,
            source: None,
        }
    }

    /// Wraps a URL validation failure.
    pub fn rejected(rejection: UrlRejection) -> Self {
        let code = if rejection.is_ssrf() {
            FetchErrorCode::SsrfBlocked
        } else {
            FetchErrorCode::InvalidUrl
        };
        Self {
            code,
            message: rejection.to_string(),
            rejection: Some(rejection),
            source: None,
        }
    }

    /// Creates a redirect-limit error.
    pub fn too_many_redirects(max: u32) -> Self {
        Self::new(
            FetchErrorCode::TooManyRedirects,
            format!("more than {} redirects", max),
        )
    }

    /// Creates an invalid-redirect error.
    pub fn invalid_redirect(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::InvalidRedirect, message)
    }

    /// Creates a body-size error.
    pub fn too_large(max_bytes: u64) -> Self {
        Self::new(
            FetchErrorCode::ResponseTooLarge,
            format!("response larger than {} bytes", max_bytes),
        )
    }

    /// Creates a timeout error.
    pub fn timeout(after: std::time::Duration) -> Self {
        Self::new(
            FetchErrorCode::Timeout,
            format!("no complete response within {} ms", after.as_millis()),
        )
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FetchErrorCode::Network, message)
    }

    /// Sets the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> FetchErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the validation failure, if this error is one.
    pub fn rejection(&self) -> Option<&UrlRejection> {
        self.rejection.as_ref()
    }

    /// Returns true if retrying later may succeed.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<UrlRejection> for FetchError {
    fn from(rejection: UrlRejection) -> Self {
        Self::rejected(rejection)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            FetchErrorCode::Timeout
        } else {
            FetchErrorCode::Network
        };
        Self::new(code, format!("request failed: {}", err)).with_source(err)
    }
}

/// A specialized Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_codes() {
        assert!(FetchErrorCode::Timeout.is_retryable());
        assert!(FetchErrorCode::Network.is_retryable());
        assert!(!FetchErrorCode::SsrfBlocked.is_retryable());
        assert!(!FetchErrorCode::ResponseTooLarge.is_retryable());
    }

    #[test]
    fn rejection_maps_to_category() {
        let ssrf = FetchError::rejected(UrlRejection::PrivateAddress("10.0.0.1".into()));
        assert_eq!(ssrf.code(), FetchErrorCode::SsrfBlocked);
        assert_eq!(
            ssrf.rejection(),
            Some(&UrlRejection::PrivateAddress("10.0.0.1".into()))
        );

        let malformed: FetchError = UrlRejection::InvalidUrl("relative URL".into()).into();
        assert_eq!(malformed.code(), FetchErrorCode::InvalidUrl);
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = FetchError::too_large(2_000_000);
        assert_eq!(
            err.to_string(),
            "response_too_large: response larger than 2000000 bytes"
        );
    }

    #[test]
    fn source_is_kept() {
        use std::error::Error;
        let err = FetchError::network("reset").with_source(std::io::Error::other("eof"));
        assert!(err.source().is_some());
    }
}
