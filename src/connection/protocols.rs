//! Supported protocol strings.

use rustc_hash::FxHashSet;

use crate::accessory::Accessory;

/// The protocol strings the application declared at initialization.
///
/// Keeps declaration order for reporting and a hash set for lookup.
/// Duplicates are dropped.
#[derive(Debug, Clone, Default)]
pub struct SupportedProtocols {
    ordered: Vec<String>,
    lookup: FxHashSet<String>,
}

impl SupportedProtocols {
    /// Builds the set from declared protocol strings.
    pub fn new<I, S>(protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut supported = Self::default();
        for protocol in protocols {
            let protocol = protocol.into();
            if supported.lookup.insert(protocol.clone()) {
                supported.ordered.push(protocol);
            }
        }
        supported
    }

    /// Returns `true` if `protocol` was declared.
    #[inline]
    #[must_use]
    pub fn contains(&self, protocol: &str) -> bool {
        self.lookup.contains(protocol)
    }

    /// Returns the declared protocols in declaration order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.ordered
    }

    /// Picks the protocol to open on `accessory`.
    ///
    /// The accessory's own order wins: the first protocol it advertises that
    /// is also supported.
    #[must_use]
    pub fn select<'a>(&self, accessory: &'a Accessory) -> Option<&'a str> {
        accessory
            .protocol_strings
            .iter()
            .map(String::as_str)
            .find(|protocol| self.contains(protocol))
    }
}
