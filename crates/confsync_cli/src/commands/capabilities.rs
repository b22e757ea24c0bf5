//! Capabilities command implementation.

use clap::ValueEnum;
use confsync_engine::CapabilityFlags;

/// A capability flag selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Flag {
    /// Remote activation
    AsmActivation,
    /// IP blocking
    AsmIpBlocking,
    /// Vendor rule updates
    AsmDdRules,
    /// Exclusion filters
    AsmExclusions,
    /// Request blocking
    AsmRequestBlocking,
    /// Response blocking
    AsmResponseBlocking,
    /// User blocking
    AsmUserBlocking,
    /// Custom rules
    AsmCustomRules,
    /// Custom blocking responses
    AsmCustomBlockingResponse,
}

impl From<Flag> for CapabilityFlags {
    fn from(flag: Flag) -> Self {
        match flag {
            Flag::AsmActivation => CapabilityFlags::ASM_ACTIVATION,
            Flag::AsmIpBlocking => CapabilityFlags::ASM_IP_BLOCKING,
            Flag::AsmDdRules => CapabilityFlags::ASM_DD_RULES,
            Flag::AsmExclusions => CapabilityFlags::ASM_EXCLUSIONS,
            Flag::AsmRequestBlocking => CapabilityFlags::ASM_REQUEST_BLOCKING,
            Flag::AsmResponseBlocking => CapabilityFlags::ASM_RESPONSE_BLOCKING,
            Flag::AsmUserBlocking => CapabilityFlags::ASM_USER_BLOCKING,
            Flag::AsmCustomRules => CapabilityFlags::ASM_CUSTOM_RULES,
            Flag::AsmCustomBlockingResponse => CapabilityFlags::ASM_CUSTOM_BLOCKING_RESPONSE,
        }
    }
}

/// Combines the selected flags.
pub fn combine(flags: &[Flag], all: bool) -> CapabilityFlags {
    let selected: Vec<Flag> = if all {
        Flag::value_variants().to_vec()
    } else {
        flags.to_vec()
    };
    selected
        .into_iter()
        .fold(CapabilityFlags::NONE, |acc, flag| acc | CapabilityFlags::from(flag))
}

/// Runs the capabilities command.
pub fn run(flags: &[Flag], all: bool) {
    let combined = combine(flags, all);
    println!("bits:  {:#x}", combined.bits());
    println!("token: {}", combined.to_base64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flag_is_zero() {
        assert_eq!(combine(&[], false), CapabilityFlags::NONE);
    }

    #[test]
    fn all_covers_every_known_flag() {
        assert_eq!(combine(&[], true).bits(), 0x3fe);
        assert_eq!(combine(&[Flag::AsmIpBlocking], true).bits(), 0x3fe);
    }

    #[test]
    fn selected_flags_are_ored() {
        let combined = combine(&[Flag::AsmActivation, Flag::AsmDdRules], false);
        assert_eq!(combined.to_base64(), "Cg==");
    }
}
