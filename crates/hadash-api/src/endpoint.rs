// Endpoint resolution.
//
// A Home Assistant instance is usually reachable through a LAN address
// and a remote address. Both are optional; the failover client asks a
// resolver for the current pair on every request, so settings changes
// take effect without rebuilding the client.

use std::fmt;

use secrecy::SecretString;

/// Which configured address an attempt went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Local,
    External,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::External => f.write_str("external"),
        }
    }
}

/// Snapshot of the configured base addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoints {
    pub local: Option<String>,
    pub external: Option<String>,
}

impl Endpoints {
    pub fn new(local: Option<String>, external: Option<String>) -> Self {
        Self { local, external }
    }

    pub fn local(url: impl Into<String>) -> Self {
        Self::new(Some(url.into()), None)
    }

    pub fn external(url: impl Into<String>) -> Self {
        Self::new(None, Some(url.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_none() && self.external.is_none()
    }

    /// Configured addresses in attempt order: local first, then external.
    pub fn candidates(&self) -> impl Iterator<Item = (EndpointKind, &str)> {
        let local = self.local.as_deref().map(|u| (EndpointKind::Local, u));
        let external = self.external.as_deref().map(|u| (EndpointKind::External, u));
        local.into_iter().chain(external)
    }
}

/// Supplies the current endpoint pair.
pub trait EndpointResolver: Send + Sync {
    fn endpoints(&self) -> Endpoints;
}

impl EndpointResolver for Endpoints {
    fn endpoints(&self) -> Endpoints {
        self.clone()
    }
}

/// Supplies the bearer token attached to every request.
///
/// `None` still sends the request; the backend answers it as unauthorized.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<SecretString>;
}

impl TokenSource for SecretString {
    fn token(&self) -> Option<SecretString> {
        Some(self.clone())
    }
}

impl TokenSource for Option<SecretString> {
    fn token(&self) -> Option<SecretString> {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_try_local_first() {
        let endpoints = Endpoints::new(
            Some("http://192.168.1.2:8123".into()),
            Some("https://ha.example.com".into()),
        );
        let kinds: Vec<_> = endpoints.candidates().map(|(k, _)| k).collect();
        assert_eq!(kinds, vec![EndpointKind::Local, EndpointKind::External]);
    }

    #[test]
    fn candidates_skip_missing_slots() {
        let endpoints = Endpoints::external("https://ha.example.com");
        let found: Vec<_> = endpoints.candidates().collect();
        assert_eq!(
            found,
            vec![(EndpointKind::External, "https://ha.example.com")]
        );
        assert!(Endpoints::default().is_empty());
    }
}
