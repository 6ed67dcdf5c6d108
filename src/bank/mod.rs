//! Bank addressing
//!
//! A bank shifts the channel and/or address of a control so that one physical
//! button can reach many MIDI targets. Resolution is a pure function of the
//! base address, the current offset and the bank configuration; the offset is
//! always passed in by the caller.

mod lock;

pub use self::lock::{AddressLock, BankableAddress, LockState};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Number of MIDI channels
pub const CHANNELS: u8 = 16;
/// Number of 7-bit addresses (notes, controllers)
pub const ADDRESSES: u8 = 128;

/// Errors from building addresses and banks out of user input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BankError {
    #[error("channel {0} out of range (0-15)")]
    ChannelOutOfRange(u8),
    #[error("address {0} out of range (0-127)")]
    AddressOutOfRange(u8),
    #[error("bank {setting} out of range ({count} banks)")]
    SettingOutOfRange { setting: u8, count: u8 },
    #[error("a bank needs at least one bank")]
    NoBanks,
}

/// A resolved MIDI target: channel (0-15) and note/controller number (0-127)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    channel: u8,
    address: u8,
}

impl Address {
    pub fn new(channel: u8, address: u8) -> Result<Self, BankError> {
        if channel >= CHANNELS {
            return Err(BankError::ChannelOutOfRange(channel));
        }
        if address >= ADDRESSES {
            return Err(BankError::AddressOutOfRange(address));
        }
        Ok(Self { channel, address })
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn address(&self) -> u8 {
        self.address
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ch:{} addr:{}", self.channel + 1, self.address)
    }
}

/// Signed shift applied by the active bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BankOffset(pub i32);

/// Which half of the address a bank shifts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BankTarget {
    Channel,
    #[default]
    Address,
    #[serde(alias = "channel_and_address")]
    Both,
}

/// How an offset that leaves the valid range is brought back into it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Modulo the range size; negative results wrap from the top
    #[default]
    Wrap,
    /// Saturate at the range bounds
    Clamp,
}

impl OverflowPolicy {
    fn apply(self, base: u8, offset: i32, size: u8) -> u8 {
        let shifted = base as i64 + offset as i64;
        let size = size as i64;
        let value = match self {
            OverflowPolicy::Wrap => shifted.rem_euclid(size),
            OverflowPolicy::Clamp => shifted.clamp(0, size - 1),
        };
        value as u8
    }
}

/// Static bank behaviour of a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct BankConfig {
    #[serde(default)]
    pub target: BankTarget,
    #[serde(default)]
    pub channel_overflow: OverflowPolicy,
    #[serde(default)]
    pub address_overflow: OverflowPolicy,
}

impl BankConfig {
    pub fn new(target: BankTarget) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn with_overflow(mut self, channel: OverflowPolicy, address: OverflowPolicy) -> Self {
        self.channel_overflow = channel;
        self.address_overflow = address;
        self
    }
}

/// Apply a bank offset to a base address
///
/// Out-of-range results are wrapped or clamped per axis according to
/// `config`; this never fails.
pub fn resolve(base: Address, offset: BankOffset, config: &BankConfig) -> Address {
    let shift_channel = matches!(config.target, BankTarget::Channel | BankTarget::Both);
    let shift_address = matches!(config.target, BankTarget::Address | BankTarget::Both);

    let channel = if shift_channel {
        config.channel_overflow.apply(base.channel, offset.0, CHANNELS)
    } else {
        base.channel
    };
    let address = if shift_address {
        config.address_overflow.apply(base.address, offset.0, ADDRESSES)
    } else {
        base.address
    };

    Address { channel, address }
}

/// Bank selector: the active setting times the number of tracks per bank
/// gives the offset handed to every control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bank {
    tracks_per_bank: u8,
    bank_count: u8,
    setting: u8,
}

impl Bank {
    pub fn new(tracks_per_bank: u8, bank_count: u8) -> Result<Self, BankError> {
        if bank_count == 0 {
            return Err(BankError::NoBanks);
        }
        Ok(Self {
            tracks_per_bank,
            bank_count,
            setting: 0,
        })
    }

    pub fn setting(&self) -> u8 {
        self.setting
    }

    pub fn bank_count(&self) -> u8 {
        self.bank_count
    }

    pub fn tracks_per_bank(&self) -> u8 {
        self.tracks_per_bank
    }

    /// Current offset to pass to [`resolve`]
    pub fn offset(&self) -> BankOffset {
        BankOffset(self.setting as i32 * self.tracks_per_bank as i32)
    }

    /// Select a bank by index
    pub fn select(&mut self, setting: u8) -> Result<(), BankError> {
        if setting >= self.bank_count {
            return Err(BankError::SettingOutOfRange {
                setting,
                count: self.bank_count,
            });
        }
        self.setting = setting;
        info!("Active bank: {} (offset {})", setting, self.offset().0);
        Ok(())
    }

    /// Navigate to the next bank (circular)
    pub fn next(&mut self) {
        self.setting = (self.setting + 1) % self.bank_count;
        info!("Next bank → {}", self.setting);
    }

    /// Navigate to the previous bank (circular)
    pub fn previous(&mut self) {
        self.setting = if self.setting == 0 {
            self.bank_count - 1
        } else {
            self.setting - 1
        };
        info!("Previous bank → {}", self.setting);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(channel: u8, address: u8) -> Address {
        Address::new(channel, address).unwrap()
    }

    #[test]
    fn test_address_validation() {
        assert!(Address::new(15, 127).is_ok());
        assert_eq!(Address::new(16, 0), Err(BankError::ChannelOutOfRange(16)));
        assert_eq!(Address::new(0, 128), Err(BankError::AddressOutOfRange(128)));
    }

    #[test]
    fn test_resolve_address_only() {
        let config = BankConfig::new(BankTarget::Address);
        assert_eq!(resolve(addr(0, 36), BankOffset(2), &config), addr(0, 38));
    }

    #[test]
    fn test_resolve_channel_only() {
        let config = BankConfig::new(BankTarget::Channel);
        assert_eq!(resolve(addr(1, 36), BankOffset(3), &config), addr(4, 36));
    }

    #[test]
    fn test_resolve_both() {
        let config = BankConfig::new(BankTarget::Both);
        assert_eq!(resolve(addr(1, 36), BankOffset(3), &config), addr(4, 39));
    }

    #[test]
    fn test_resolve_zero_offset_is_identity() {
        let config = BankConfig::new(BankTarget::Both);
        assert_eq!(resolve(addr(7, 99), BankOffset(0), &config), addr(7, 99));
    }

    #[test]
    fn test_wrap_overflow() {
        let config = BankConfig::new(BankTarget::Both);
        assert_eq!(resolve(addr(14, 126), BankOffset(4), &config), addr(2, 2));
    }

    #[test]
    fn test_wrap_negative_offset() {
        let config = BankConfig::new(BankTarget::Both);
        assert_eq!(resolve(addr(1, 1), BankOffset(-3), &config), addr(14, 126));
    }

    #[test]
    fn test_clamp_overflow() {
        let config = BankConfig::new(BankTarget::Both)
            .with_overflow(OverflowPolicy::Clamp, OverflowPolicy::Clamp);
        assert_eq!(resolve(addr(14, 126), BankOffset(4), &config), addr(15, 127));
        assert_eq!(resolve(addr(1, 1), BankOffset(-3), &config), addr(0, 0));
    }

    #[test]
    fn test_mixed_policies() {
        let config = BankConfig::new(BankTarget::Both)
            .with_overflow(OverflowPolicy::Clamp, OverflowPolicy::Wrap);
        assert_eq!(resolve(addr(15, 127), BankOffset(1), &config), addr(15, 0));
    }

    #[test]
    fn test_huge_offset_does_not_overflow() {
        let config = BankConfig::new(BankTarget::Both);
        let resolved = resolve(addr(15, 127), BankOffset(i32::MAX), &config);
        assert!(resolved.channel() < CHANNELS);
        assert!(resolved.address() < ADDRESSES);
    }

    #[test]
    fn test_bank_offset() {
        let mut bank = Bank::new(8, 4).unwrap();
        assert_eq!(bank.offset(), BankOffset(0));
        bank.select(2).unwrap();
        assert_eq!(bank.offset(), BankOffset(16));
    }

    #[test]
    fn test_bank_select_out_of_range() {
        let mut bank = Bank::new(8, 4).unwrap();
        assert_eq!(
            bank.select(4),
            Err(BankError::SettingOutOfRange { setting: 4, count: 4 })
        );
        assert_eq!(bank.setting(), 0);
    }

    #[test]
    fn test_bank_navigation_wraps() {
        let mut bank = Bank::new(1, 3).unwrap();
        bank.next();
        bank.next();
        assert_eq!(bank.setting(), 2);
        bank.next(); // Wrap around
        assert_eq!(bank.setting(), 0);
        bank.previous(); // Wrap around backwards
        assert_eq!(bank.setting(), 2);
    }

    #[test]
    fn test_bank_needs_banks() {
        assert_eq!(Bank::new(4, 0), Err(BankError::NoBanks));
    }
}
