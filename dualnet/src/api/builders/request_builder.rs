//! Network request builder with a type-safe API.
//!
//! A [`NetworkRequest`] describes what the platform should attach to:
//! transport types, required capabilities, and for scoped wireless requests
//! a [`WifiSpecifier`] naming the access point and its credential.
//!
//! # Examples
//!
//! ```rust
//! use dualnet::builders::{Credential, IdentityPattern, NetworkRequest, WifiSpecifier};
//! use dualnet::{NetCapabilities, Transports};
//!
//! let request = NetworkRequest::builder()
//!     .transport(Transports::WIFI)
//!     .remove_capability(NetCapabilities::INTERNET)
//!     .specifier(
//!         WifiSpecifier::new(IdentityPattern::prefix("FUJIFILM-"))
//!             .credential(Credential::wpa2("camera-pass")),
//!     )
//!     .build();
//!
//! assert!(!request.capabilities().contains(NetCapabilities::INTERNET));
//! assert!(request.specifier().is_some());
//! ```

use std::fmt::{Debug, Formatter};

use crate::api::models::{CapabilityError, NetCapabilities, Transports};
use crate::types::constants::credential;

/// Which access points a scoped request may attach to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityPattern {
    /// The SSID must equal this string.
    Literal(String),
    /// The SSID must start with this string.
    Prefix(String),
    /// Simple glob: `.` matches any character, `*` repeats the preceding
    /// element zero or more times, `\` escapes the next character.
    SimpleGlob(String),
}

impl IdentityPattern {
    pub fn literal(ssid: impl Into<String>) -> Self {
        Self::Literal(ssid.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    pub fn glob(pattern: impl Into<String>) -> Self {
        Self::SimpleGlob(pattern.into())
    }

    /// Returns whether `ssid` satisfies the pattern.
    pub fn matches(&self, ssid: &str) -> bool {
        match self {
            Self::Literal(s) => s == ssid,
            Self::Prefix(p) => ssid.starts_with(p.as_str()),
            Self::SimpleGlob(g) => {
                let pattern: Vec<char> = g.chars().collect();
                let text: Vec<char> = ssid.chars().collect();
                glob_match(&pattern, &text)
            }
        }
    }
}

#[derive(Clone, Copy)]
enum GlobElement {
    Any,
    Char(char),
}

impl GlobElement {
    fn accepts(self, c: char) -> bool {
        match self {
            Self::Any => true,
            Self::Char(expected) => expected == c,
        }
    }
}

fn glob_match(pattern: &[char], text: &[char]) -> bool {
    let Some(&first) = pattern.first() else {
        return text.is_empty();
    };

    let (element, rest) = match (first, pattern.get(1)) {
        ('\\', Some(&escaped)) => (GlobElement::Char(escaped), &pattern[2..]),
        ('.', _) => (GlobElement::Any, &pattern[1..]),
        (c, _) => (GlobElement::Char(c), &pattern[1..]),
    };

    if rest.first() == Some(&'*') {
        let rest = &rest[1..];
        let mut consumed = 0;
        loop {
            if glob_match(rest, &text[consumed..]) {
                return true;
            }
            match text.get(consumed) {
                Some(&c) if element.accepts(c) => consumed += 1,
                _ => return false,
            }
        }
    }

    match text.first() {
        Some(&c) if element.accepts(c) => glob_match(rest, &text[1..]),
        _ => false,
    }
}

/// Pre-shared credential for a scoped wireless request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Wpa2Passphrase(String),
}

impl Credential {
    pub fn wpa2(passphrase: impl Into<String>) -> Self {
        Self::Wpa2Passphrase(passphrase.into())
    }

    /// Rejects passphrases outside the WPA2 length limits (8 to 63 characters).
    pub fn validate(&self) -> Result<(), CapabilityError> {
        match self {
            Self::Wpa2Passphrase(p) => {
                let len = p.chars().count();
                if !(credential::MIN_PASSPHRASE_LEN..=credential::MAX_PASSPHRASE_LEN).contains(&len)
                {
                    return Err(CapabilityError::InvalidCredential(format!(
                        "WPA2 passphrase must be {}-{} characters, got {len}",
                        credential::MIN_PASSPHRASE_LEN,
                        credential::MAX_PASSPHRASE_LEN
                    )));
                }
                Ok(())
            }
        }
    }
}

// Passphrases end up in logs through request Debug output.
impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wpa2Passphrase(_) => write!(f, "Wpa2Passphrase(<redacted>)"),
        }
    }
}

/// Names the access point a scoped request is restricted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiSpecifier {
    pattern: IdentityPattern,
    credential: Option<Credential>,
}

impl WifiSpecifier {
    pub fn new(pattern: IdentityPattern) -> Self {
        Self {
            pattern,
            credential: None,
        }
    }

    /// Attaches a pre-shared credential.
    #[must_use]
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    #[must_use]
    pub fn with_credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential;
        self
    }

    pub fn pattern(&self) -> &IdentityPattern {
        &self.pattern
    }

    pub fn get_credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }
}

/// Description of the network the platform should attach to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRequest {
    transports: Transports,
    capabilities: NetCapabilities,
    specifier: Option<WifiSpecifier>,
}

impl NetworkRequest {
    pub fn builder() -> NetworkRequestBuilder {
        NetworkRequestBuilder::new()
    }

    pub fn transports(&self) -> Transports {
        self.transports
    }

    pub fn capabilities(&self) -> NetCapabilities {
        self.capabilities
    }

    pub fn specifier(&self) -> Option<&WifiSpecifier> {
        self.specifier.as_ref()
    }

    /// Returns whether a network with this SSID satisfies the specifier.
    ///
    /// Unscoped requests accept any SSID.
    pub fn accepts_ssid(&self, ssid: &str) -> bool {
        self.specifier
            .as_ref()
            .is_none_or(|s| s.pattern.matches(ssid))
    }
}

/// Builder for [`NetworkRequest`].
///
/// Starts from the platform's default capability set (internet, not
/// restricted, trusted, not VPN) with no transport restriction, so a
/// local-only request has to remove [`NetCapabilities::INTERNET`] explicitly.
#[derive(Debug, Clone)]
pub struct NetworkRequestBuilder {
    transports: Transports,
    capabilities: NetCapabilities,
    specifier: Option<WifiSpecifier>,
}

impl Default for NetworkRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkRequestBuilder {
    pub fn new() -> Self {
        Self {
            transports: Transports::empty(),
            capabilities: NetCapabilities::INTERNET
                | NetCapabilities::NOT_RESTRICTED
                | NetCapabilities::TRUSTED
                | NetCapabilities::NOT_VPN,
            specifier: None,
        }
    }

    #[must_use]
    pub fn transport(mut self, transport: Transports) -> Self {
        self.transports.insert(transport);
        self
    }

    #[must_use]
    pub fn add_capability(mut self, capability: NetCapabilities) -> Self {
        self.capabilities.insert(capability);
        self
    }

    #[must_use]
    pub fn remove_capability(mut self, capability: NetCapabilities) -> Self {
        self.capabilities.remove(capability);
        self
    }

    #[must_use]
    pub fn specifier(mut self, specifier: WifiSpecifier) -> Self {
        self.specifier = Some(specifier);
        self
    }

    pub fn build(self) -> NetworkRequest {
        NetworkRequest {
            transports: self.transports,
            capabilities: self.capabilities,
            specifier: self.specifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_pattern() {
        let p = IdentityPattern::literal("CAMERA");
        assert!(p.matches("CAMERA"));
        assert!(!p.matches("CAMERA2"));
    }

    #[test]
    fn prefix_pattern() {
        let p = IdentityPattern::prefix("FUJIFILM-");
        assert!(p.matches("FUJIFILM-X-T4-1234"));
        assert!(!p.matches("fujifilm-x"));
    }

    #[test]
    fn glob_any_and_repeat() {
        assert!(IdentityPattern::glob(".*").matches(""));
        assert!(IdentityPattern::glob(".*").matches("anything"));
        assert!(IdentityPattern::glob("FUJIFILM-.*").matches("FUJIFILM-X-S10"));
        assert!(!IdentityPattern::glob("FUJIFILM-.*").matches("CANON-R5"));
        assert!(IdentityPattern::glob("a*b").matches("b"));
        assert!(IdentityPattern::glob("a*b").matches("aaab"));
        assert!(!IdentityPattern::glob("a*b").matches("aaxb"));
        assert!(IdentityPattern::glob("x.y").matches("xzy"));
        assert!(!IdentityPattern::glob("x.y").matches("xy"));
    }

    #[test]
    fn glob_escape() {
        let p = IdentityPattern::glob("a\\.b");
        assert!(p.matches("a.b"));
        assert!(!p.matches("axb"));
        assert!(IdentityPattern::glob("\\*").matches("*"));
    }

    #[test]
    fn credential_length_limits() {
        assert!(Credential::wpa2("12345678").validate().is_ok());
        assert!(Credential::wpa2("a".repeat(63)).validate().is_ok());
        assert!(matches!(
            Credential::wpa2("short").validate(),
            Err(CapabilityError::InvalidCredential(_))
        ));
        assert!(Credential::wpa2("a".repeat(64)).validate().is_err());
    }

    #[test]
    fn credential_debug_is_redacted() {
        let c = Credential::wpa2("super-secret");
        let out = format!("{c:?}");
        assert!(!out.contains("super-secret"));
        assert!(out.contains("redacted"));
    }

    #[test]
    fn builder_defaults_include_internet() {
        let req = NetworkRequest::builder().transport(Transports::WIFI).build();
        assert!(req.capabilities().contains(NetCapabilities::INTERNET));
        assert_eq!(req.transports(), Transports::WIFI);
        assert!(req.specifier().is_none());
        assert!(req.accepts_ssid("whatever"));
    }

    #[test]
    fn local_only_request() {
        let req = NetworkRequest::builder()
            .transport(Transports::WIFI)
            .remove_capability(NetCapabilities::INTERNET)
            .specifier(WifiSpecifier::new(IdentityPattern::literal("CAM")))
            .build();
        assert!(!req.capabilities().contains(NetCapabilities::INTERNET));
        assert!(req.capabilities().contains(NetCapabilities::TRUSTED));
        assert!(req.accepts_ssid("CAM"));
        assert!(!req.accepts_ssid("CAM2"));
    }

    #[test]
    fn specifier_credential() {
        let spec = WifiSpecifier::new(IdentityPattern::literal("CAM"))
            .with_credential(Some(Credential::wpa2("password")));
        assert_eq!(spec.get_credential(), Some(&Credential::wpa2("password")));
        assert_eq!(spec.pattern(), &IdentityPattern::literal("CAM"));
    }
}
