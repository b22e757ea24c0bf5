//! Capability registration.
//!
//! The agent only serves products the client subscribes to, and uses the
//! capability bits to decide which configuration features the client
//! understands. Bits are sent as a base64 token of their big-endian bytes.

use crate::dispatcher::Receiver;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

/// Well-known product names.
pub mod products {
    /// Security feature toggles.
    pub const ASM_FEATURES: &str = "ASM_FEATURES";
    /// Security rule sets shipped by the vendor.
    pub const ASM_DD: &str = "ASM_DD";
    /// User-provided security data (blocked ips, users).
    pub const ASM_DATA: &str = "ASM_DATA";
    /// User-provided security overrides and exclusions.
    pub const ASM: &str = "ASM";
}

/// A set of capability bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CapabilityFlags(u64);

impl CapabilityFlags {
    /// No capability.
    pub const NONE: Self = Self(0);
    /// Remote activation of the security product.
    pub const ASM_ACTIVATION: Self = Self(1 << 1);
    /// IP blocking.
    pub const ASM_IP_BLOCKING: Self = Self(1 << 2);
    /// Vendor rule updates.
    pub const ASM_DD_RULES: Self = Self(1 << 3);
    /// Exclusion filters.
    pub const ASM_EXCLUSIONS: Self = Self(1 << 4);
    /// Request blocking.
    pub const ASM_REQUEST_BLOCKING: Self = Self(1 << 5);
    /// Response blocking.
    pub const ASM_RESPONSE_BLOCKING: Self = Self(1 << 6);
    /// User blocking.
    pub const ASM_USER_BLOCKING: Self = Self(1 << 7);
    /// Custom rules.
    pub const ASM_CUSTOM_RULES: Self = Self(1 << 8);
    /// Custom blocking responses.
    pub const ASM_CUSTOM_BLOCKING_RESPONSE: Self = Self(1 << 9);

    /// Creates a set from raw bits.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Encodes the bits as the agent token.
    ///
    /// The bytes are big-endian with leading zero bytes stripped; an empty
    /// set encodes as a single zero byte.
    pub fn to_base64(self) -> String {
        let bytes = self.0.to_be_bytes();
        let first = bytes
            .iter()
            .position(|b| *b != 0)
            .unwrap_or(bytes.len() - 1);
        STANDARD.encode(&bytes[first..])
    }
}

impl BitOr for CapabilityFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CapabilityFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// What the client subscribes to, and who consumes it.
#[derive(Clone)]
pub struct Capabilities {
    products: Vec<String>,
    flags: CapabilityFlags,
    receivers: Vec<Arc<dyn Receiver>>,
    token: String,
}

impl Capabilities {
    /// Starts a builder.
    pub fn builder() -> CapabilitiesBuilder {
        CapabilitiesBuilder::default()
    }

    /// Subscribed products, deduplicated in registration order.
    pub fn products(&self) -> &[String] {
        &self.products
    }

    /// Union of the registered flags.
    pub fn flags(&self) -> CapabilityFlags {
        self.flags
    }

    /// Token sent in the `capabilities` field of a request.
    pub fn base64_capabilities(&self) -> &str {
        &self.token
    }

    /// Registered receivers, in registration order.
    pub fn receivers(&self) -> &[Arc<dyn Receiver>] {
        &self.receivers
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("products", &self.products)
            .field("flags", &self.flags)
            .field("receivers", &self.receivers.len())
            .field("token", &self.token)
            .finish()
    }
}

/// Builder for [`Capabilities`].
#[derive(Default)]
pub struct CapabilitiesBuilder {
    products: Vec<String>,
    flags: CapabilityFlags,
    receivers: Vec<Arc<dyn Receiver>>,
}

impl CapabilitiesBuilder {
    /// Registers flags, products and receivers for one feature.
    pub fn register<I, S>(
        mut self,
        flags: CapabilityFlags,
        products: I,
        receivers: impl IntoIterator<Item = Arc<dyn Receiver>>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags |= flags;
        for product in products {
            self = self.product(product);
        }
        self.receivers.extend(receivers);
        self
    }

    /// Adds flags.
    pub fn flags(mut self, flags: CapabilityFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Subscribes to a product.
    pub fn product(mut self, product: impl Into<String>) -> Self {
        let product = product.into();
        if !self.products.contains(&product) {
            self.products.push(product);
        }
        self
    }

    /// Adds a receiver.
    pub fn receiver(mut self, receiver: Arc<dyn Receiver>) -> Self {
        self.receivers.push(receiver);
        self
    }

    /// Builds the capabilities.
    pub fn build(self) -> Capabilities {
        Capabilities {
            token: self.flags.to_base64(),
            products: self.products,
            flags: self.flags,
            receivers: self.receivers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::ProductReceiver;
    use crate::error::ReceiverError;
    use confsync_core::{Change, RepositoryState};

    fn noop(products: &[&str]) -> Arc<dyn Receiver> {
        let products: Vec<String> = products.iter().map(|p| p.to_string()).collect();
        Arc::new(ProductReceiver::new(
            products,
            |_: &[&Change], _: &RepositoryState| -> Result<(), ReceiverError> { Ok(()) },
        ))
    }

    #[test]
    fn empty_set_encodes_single_zero_byte() {
        assert_eq!(CapabilityFlags::NONE.to_base64(), "AA==");
        assert_eq!(Capabilities::default().base64_capabilities(), "AA==");
    }

    #[test]
    fn encoding_strips_leading_zero_bytes() {
        assert_eq!(CapabilityFlags::ASM_ACTIVATION.to_base64(), "Ag==");
        // 0x02 0x00
        assert_eq!(CapabilityFlags::ASM_CUSTOM_BLOCKING_RESPONSE.to_base64(), "AgA=");
        // 0x03 0xfe
        let all = CapabilityFlags::ASM_ACTIVATION
            | CapabilityFlags::ASM_IP_BLOCKING
            | CapabilityFlags::ASM_DD_RULES
            | CapabilityFlags::ASM_EXCLUSIONS
            | CapabilityFlags::ASM_REQUEST_BLOCKING
            | CapabilityFlags::ASM_RESPONSE_BLOCKING
            | CapabilityFlags::ASM_USER_BLOCKING
            | CapabilityFlags::ASM_CUSTOM_RULES
            | CapabilityFlags::ASM_CUSTOM_BLOCKING_RESPONSE;
        assert_eq!(all.bits(), 0x3fe);
        assert_eq!(all.to_base64(), "A/4=");
    }

    #[test]
    fn register_accumulates() {
        let capabilities = Capabilities::builder()
            .register(
                CapabilityFlags::ASM_ACTIVATION,
                [products::ASM_FEATURES],
                [noop(&[products::ASM_FEATURES])],
            )
            .register(
                CapabilityFlags::ASM_DD_RULES | CapabilityFlags::ASM_IP_BLOCKING,
                [products::ASM_DD, products::ASM_DATA, products::ASM_FEATURES],
                [noop(&[products::ASM_DD, products::ASM_DATA])],
            )
            .build();

        assert_eq!(
            capabilities.products(),
            &["ASM_FEATURES", "ASM_DD", "ASM_DATA"]
        );
        assert_eq!(capabilities.flags().bits(), 0b1110);
        assert!(capabilities
            .flags()
            .contains(CapabilityFlags::ASM_IP_BLOCKING));
        assert!(!capabilities
            .flags()
            .contains(CapabilityFlags::ASM_USER_BLOCKING));
        assert_eq!(capabilities.receivers().len(), 2);
        assert_eq!(capabilities.base64_capabilities(), "Dg==");
    }
}
