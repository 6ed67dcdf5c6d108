//! Configuration management for MIDI Surface
//!
//! Handles loading, validating and hot-reloading of YAML configuration files.

pub mod watcher;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use tokio::fs;

use crate::bank::{Address, Bank, BankConfig};
use crate::control::{ControlChangeSender, MidiButton, NoteSender, Sender};
use crate::parser::{ParserConfig, SystemCommonPolicy, DEFAULT_SYSEX_CHUNK_LEN};

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub bank: BankSettings,
    #[serde(default)]
    pub controls: Vec<ControlConfig>,
}

/// Wire format of the incoming byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    #[default]
    Binary,
    Hex,
}

/// Incoming stream parsing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub format: WireFormat,
    #[serde(default = "default_true")]
    pub running_status: bool,
    #[serde(default)]
    pub system_common: SystemCommonPolicy,
    #[serde(default = "default_sysex_chunk_len")]
    pub sysex_chunk_len: usize,
}

impl InputConfig {
    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            running_status: self.running_status,
            system_common: self.system_common,
            sysex_chunk_len: self.sysex_chunk_len,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            format: WireFormat::default(),
            running_status: true,
            system_common: SystemCommonPolicy::default(),
            sysex_chunk_len: DEFAULT_SYSEX_CHUNK_LEN,
        }
    }
}

/// Format of messages emitted by controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Binary,
    #[default]
    Debug,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Omit repeated status bytes (binary output only)
    #[serde(default)]
    pub running_status: bool,
}

/// Bank selector and bank behaviour shared by all controls
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BankSettings {
    #[serde(default = "default_tracks_per_bank")]
    pub tracks_per_bank: u8,
    #[serde(default = "default_banks")]
    pub banks: u8,
    /// Bank selected at startup (and after a reload)
    #[serde(default)]
    pub initial: u8,
    #[serde(flatten)]
    pub behaviour: BankConfig,
}

impl Default for BankSettings {
    fn default() -> Self {
        Self {
            tracks_per_bank: default_tracks_per_bank(),
            banks: default_banks(),
            initial: 0,
            behaviour: BankConfig::default(),
        }
    }
}

impl BankSettings {
    pub fn build(&self) -> Result<Bank> {
        let mut bank = Bank::new(self.tracks_per_bank, self.banks)?;
        bank.select(self.initial)?;
        Ok(bank)
    }
}

/// Message kind a control sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Note,
    Cc,
}

/// A bankable push button
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControlConfig {
    pub name: String,
    pub kind: ControlKind,
    /// MIDI channel, 1-16
    pub channel: u8,
    /// Note or controller number, 0-127
    pub address: u8,
    /// Note velocity (note controls)
    #[serde(default)]
    pub velocity: Option<u8>,
    /// Values sent on press/release (cc controls)
    #[serde(default)]
    pub on_value: Option<u8>,
    #[serde(default)]
    pub off_value: Option<u8>,
}

impl ControlConfig {
    /// Zero-based base address
    pub fn base_address(&self) -> Result<Address> {
        if self.channel == 0 || self.channel > 16 {
            anyhow::bail!(
                "Control '{}' has invalid MIDI channel {} (must be 1-16)",
                self.name,
                self.channel
            );
        }
        Address::new(self.channel - 1, self.address)
            .with_context(|| format!("Invalid address in control '{}'", self.name))
    }

    pub fn sender(&self) -> Box<dyn Sender> {
        match self.kind {
            ControlKind::Note => {
                let mut sender = NoteSender::default();
                if let Some(velocity) = self.velocity {
                    sender.velocity = velocity;
                }
                Box::new(sender)
            }
            ControlKind::Cc => {
                let mut sender = ControlChangeSender::default();
                if let Some(on) = self.on_value {
                    sender.on_value = on;
                }
                if let Some(off) = self.off_value {
                    sender.off_value = off;
                }
                Box::new(sender)
            }
        }
    }

    pub fn build(&self, bank: BankConfig) -> Result<MidiButton<Box<dyn Sender>>> {
        Ok(MidiButton::new(
            self.name.clone(),
            self.base_address()?,
            bank,
            self.sender(),
        ))
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_yaml(&contents).with_context(|| format!("Invalid config file: {}", path))
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.input.sysex_chunk_len == 0 {
            anyhow::bail!("input.sysex_chunk_len must be at least 1");
        }

        if self.bank.banks == 0 {
            anyhow::bail!("bank.banks must be at least 1");
        }
        if self.bank.initial >= self.bank.banks {
            anyhow::bail!(
                "bank.initial {} out of range ({} banks)",
                self.bank.initial,
                self.bank.banks
            );
        }

        let mut names = HashSet::new();
        for (idx, control) in self.controls.iter().enumerate() {
            if control.name.is_empty() {
                anyhow::bail!("Control {} name cannot be empty", idx);
            }
            if !names.insert(control.name.as_str()) {
                anyhow::bail!("Duplicate control name '{}'", control.name);
            }
            control.base_address()?;

            let values = [control.velocity, control.on_value, control.off_value];
            if values.iter().flatten().any(|v| *v > 127) {
                anyhow::bail!(
                    "Control '{}' has a value out of range (must be 0-127)",
                    control.name
                );
            }
        }

        Ok(())
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_sysex_chunk_len() -> usize { DEFAULT_SYSEX_CHUNK_LEN }
fn default_tracks_per_bank() -> u8 { 1 }
fn default_banks() -> u8 { 1 }
