//! Address locking for in-flight gestures
//!
//! A control latches its resolved address when a gesture starts and releases
//! it when the gesture ends, so that a bank change in between cannot send the
//! "off" message somewhere else than the "on" message.

use tracing::debug;

use super::{resolve, Address, BankConfig, BankOffset};

/// Latch state, owned by exactly one control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    #[default]
    Unlocked,
    Locked(Address),
}

/// Per-control address latch
#[derive(Debug, Clone, Default)]
pub struct AddressLock {
    state: LockState,
}

impl AddressLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    /// Locked address, if any
    pub fn locked(&self) -> Option<Address> {
        match self.state {
            LockState::Locked(address) => Some(address),
            LockState::Unlocked => None,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked().is_some()
    }

    /// Latch `address`; returns false (keeping the old value) when already locked
    pub fn lock(&mut self, address: Address) -> bool {
        if let LockState::Locked(current) = self.state {
            debug!("Already locked at {}, ignoring lock to {}", current, address);
            return false;
        }
        self.state = LockState::Locked(address);
        true
    }

    /// Release the latch, returning the address it held
    pub fn unlock(&mut self) -> Option<Address> {
        let released = self.locked();
        if released.is_none() {
            debug!("Unlock while unlocked, ignoring");
        }
        self.state = LockState::Unlocked;
        released
    }
}

/// A base address together with its bank behaviour and lock
#[derive(Debug, Clone)]
pub struct BankableAddress {
    base: Address,
    config: BankConfig,
    lock: AddressLock,
}

impl BankableAddress {
    pub fn new(base: Address, config: BankConfig) -> Self {
        Self {
            base,
            config,
            lock: AddressLock::new(),
        }
    }

    pub fn base(&self) -> Address {
        self.base
    }

    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    pub fn lock_state(&self) -> LockState {
        self.lock.state()
    }

    /// Address to use right now: the latched one while locked
    pub fn current(&self, offset: BankOffset) -> Address {
        self.lock
            .locked()
            .unwrap_or_else(|| resolve(self.base, offset, &self.config))
    }

    /// Resolve at `offset` and latch; `None` when already locked
    pub fn lock(&mut self, offset: BankOffset) -> Option<Address> {
        let address = resolve(self.base, offset, &self.config);
        self.lock.lock(address).then_some(address)
    }

    /// Release the latch, returning the address it held
    pub fn unlock(&mut self) -> Option<Address> {
        self.lock.unlock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::BankTarget;

    fn addr(channel: u8, address: u8) -> Address {
        Address::new(channel, address).unwrap()
    }

    #[test]
    fn test_lock_unlock() {
        let mut lock = AddressLock::new();
        assert_eq!(lock.state(), LockState::Unlocked);

        assert!(lock.lock(addr(0, 38)));
        assert_eq!(lock.state(), LockState::Locked(addr(0, 38)));

        assert_eq!(lock.unlock(), Some(addr(0, 38)));
        assert_eq!(lock.state(), LockState::Unlocked);
    }

    #[test]
    fn test_double_lock_keeps_first_value() {
        let mut lock = AddressLock::new();
        assert!(lock.lock(addr(0, 38)));
        assert!(!lock.lock(addr(0, 41)));
        assert_eq!(lock.locked(), Some(addr(0, 38)));
    }

    #[test]
    fn test_unlock_while_unlocked_is_noop() {
        let mut lock = AddressLock::new();
        assert_eq!(lock.unlock(), None);
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_bankable_address_ignores_offset_while_locked() {
        let mut bankable = BankableAddress::new(addr(0, 36), BankConfig::new(BankTarget::Address));

        assert_eq!(bankable.current(BankOffset(2)), addr(0, 38));
        assert_eq!(bankable.lock(BankOffset(2)), Some(addr(0, 38)));

        // Bank changes while held
        assert_eq!(bankable.current(BankOffset(5)), addr(0, 38));
        assert_eq!(bankable.lock(BankOffset(5)), None);

        assert_eq!(bankable.unlock(), Some(addr(0, 38)));
        assert_eq!(bankable.current(BankOffset(5)), addr(0, 41));
    }
}
