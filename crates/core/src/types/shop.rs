//! Shopify shop domain type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ShopDomain`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShopDomainError {
    /// The input string is empty.
    #[error("shop domain cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("shop domain must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The domain is not a `myshopify.com` subdomain.
    #[error("shop domain must end with .{suffix}")]
    WrongSuffix {
        /// Required domain suffix.
        suffix: &'static str,
    },
    /// The shop handle contains characters outside `[a-z0-9-]`.
    #[error("shop domain contains invalid characters")]
    InvalidCharacters,
}

/// A validated Shopify shop domain, e.g. `my-store.myshopify.com`.
///
/// Outbound URLs (token exchange, Admin API calls) are built from this value,
/// so only a bare `myshopify.com` host is accepted. Anything that could
/// redirect those calls elsewhere (schemes, ports, paths, userinfo, extra
/// subdomains) is rejected.
///
/// ## Constraints
///
/// - Length: 1-255 characters
/// - Lowercased and trimmed before validation
/// - Shape: `<handle>.myshopify.com`, handle made of `[a-z0-9-]`, not starting
///   with a hyphen
///
/// ## Examples
///
/// ```
/// use autodiscount_core::ShopDomain;
///
/// assert!(ShopDomain::parse("my-store.myshopify.com").is_ok());
/// assert!(ShopDomain::parse("My-Store.MyShopify.com").is_ok());
///
/// assert!(ShopDomain::parse("").is_err());
/// assert!(ShopDomain::parse("evil.example.com").is_err());
/// assert!(ShopDomain::parse("evil.com/x.myshopify.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ShopDomain(String);

impl ShopDomain {
    /// Maximum length of a DNS name.
    pub const MAX_LENGTH: usize = 255;

    /// Domain every shop lives under.
    pub const SUFFIX: &'static str = "myshopify.com";

    /// Parse a `ShopDomain` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, not under
    /// `myshopify.com`, or has a malformed shop handle.
    pub fn parse(s: &str) -> Result<Self, ShopDomainError> {
        let normalized = s.trim().to_ascii_lowercase();

        if normalized.is_empty() {
            return Err(ShopDomainError::Empty);
        }

        if normalized.len() > Self::MAX_LENGTH {
            return Err(ShopDomainError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let handle = normalized
            .strip_suffix(Self::SUFFIX)
            .and_then(|rest| rest.strip_suffix('.'))
            .ok_or(ShopDomainError::WrongSuffix {
                suffix: Self::SUFFIX,
            })?;

        let valid_handle = !handle.is_empty()
            && !handle.starts_with('-')
            && handle
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');

        if !valid_handle {
            return Err(ShopDomainError::InvalidCharacters);
        }

        Ok(Self(normalized))
    }

    /// Returns the domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ShopDomain {
    type Err = ShopDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShopDomain {
    type Error = ShopDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShopDomain> for String {
    fn from(shop: ShopDomain) -> Self {
        shop.0
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
