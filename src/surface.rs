//! Control surface: the bank selector and the configured buttons
//!
//! The host loop owns one `Surface`. Gestures come in by control name (from a
//! script, the REPL or hardware polling), bank changes come from commands or
//! config reloads, and every message goes to the output handed in per call.

use anyhow::{anyhow, Result};
use tracing::{info, warn};

use crate::bank::{Bank, BankConfig, BankOffset};
use crate::config::AppConfig;
use crate::control::{ControlState, MidiButton, Sender};
use crate::interface::MidiOutput;

type Control = MidiButton<Box<dyn Sender>>;

/// Bank navigation requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankCommand {
    Select(u8),
    Next,
    Previous,
}

/// One line of a gesture script or REPL session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Press(String),
    Release(String),
    Bank(BankCommand),
    Status,
    Quit,
}

impl Command {
    /// Parse a command line; blank lines and `#` comments give `None`
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.split('#').next().unwrap_or_default().trim();
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        let command = match (verb.to_ascii_lowercase().as_str(), arg) {
            ("press", Some(name)) => Command::Press(name.to_string()),
            ("release", Some(name)) => Command::Release(name.to_string()),
            ("bank", Some("next")) => Command::Bank(BankCommand::Next),
            ("bank", Some("prev" | "previous")) => Command::Bank(BankCommand::Previous),
            ("bank", Some(n)) => {
                let setting = n
                    .parse::<u8>()
                    .map_err(|_| anyhow!("Invalid bank '{}'", n))?;
                Command::Bank(BankCommand::Select(setting))
            }
            ("status", None) => Command::Status,
            ("quit" | "exit", None) => Command::Quit,
            _ => return Err(anyhow!("Unknown command: {}", line)),
        };
        Ok(Some(command))
    }
}

pub struct Surface {
    bank: Bank,
    bank_config: BankConfig,
    controls: Vec<Control>,
    config: AppConfig,
}

impl Surface {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let bank_config = config.bank.behaviour;
        Ok(Self {
            bank: config.bank.build()?,
            bank_config,
            controls: build_controls(config, bank_config)?,
            config: config.clone(),
        })
    }

    pub fn bank(&self) -> &Bank {
        &self.bank
    }

    pub fn offset(&self) -> BankOffset {
        self.bank.offset()
    }

    pub fn control_names(&self) -> impl Iterator<Item = &str> {
        self.controls.iter().map(|c| c.name())
    }

    /// Names of the controls currently held down
    pub fn held(&self) -> Vec<&str> {
        self.controls
            .iter()
            .filter(|c| c.state() == ControlState::Pressed)
            .map(|c| c.name())
            .collect()
    }

    fn control_mut(&mut self, name: &str) -> Result<&mut Control> {
        self.controls
            .iter_mut()
            .find(|c| c.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| anyhow!("Control '{}' not found", name))
    }

    pub fn press(&mut self, name: &str, out: &mut dyn MidiOutput) -> Result<()> {
        let offset = self.offset();
        self.control_mut(name)?.press(offset, out)?;
        Ok(())
    }

    pub fn release(&mut self, name: &str, out: &mut dyn MidiOutput) -> Result<()> {
        self.control_mut(name)?.release(out)?;
        Ok(())
    }

    pub fn apply_bank(&mut self, command: BankCommand) -> Result<()> {
        match command {
            BankCommand::Select(setting) => self.bank.select(setting)?,
            BankCommand::Next => self.bank.next(),
            BankCommand::Previous => self.bank.previous(),
        }
        Ok(())
    }

    /// Run one command; `Status` returns a printable summary
    pub fn execute(
        &mut self,
        command: &Command,
        out: &mut dyn MidiOutput,
    ) -> Result<Option<String>> {
        match command {
            Command::Press(name) => self.press(name, out)?,
            Command::Release(name) => self.release(name, out)?,
            Command::Bank(bank) => self.apply_bank(*bank)?,
            Command::Status => return Ok(Some(self.status())),
            Command::Quit => {}
        }
        Ok(None)
    }

    pub fn status(&self) -> String {
        let offset = self.offset();
        let mut lines = vec![format!(
            "bank {}/{} (offset {})",
            self.bank.setting(),
            self.bank.bank_count(),
            offset.0
        )];
        for control in &self.controls {
            let held = if control.state() == ControlState::Pressed {
                " [held]"
            } else {
                ""
            };
            lines.push(format!(
                "  {:<12} {}{}",
                control.name(),
                control.current_address(offset),
                held
            ));
        }
        lines.join("\n")
    }

    /// Apply a reloaded configuration
    ///
    /// The bank is re-selected right away, even with buttons held. Controls
    /// are only rebuilt when none is held, so no pending "off" gets lost.
    pub fn update_config(&mut self, config: AppConfig) -> Result<()> {
        if config.bank != self.config.bank {
            self.bank = config.bank.build()?;
            info!("Bank settings reloaded, active bank {}", self.bank.setting());
        }

        let controls_changed = config.controls != self.config.controls
            || config.bank.behaviour != self.bank_config;
        if controls_changed {
            let held = self.held();
            if held.is_empty() {
                self.bank_config = config.bank.behaviour;
                self.controls = build_controls(&config, self.bank_config)?;
                info!("Controls reloaded ({})", self.controls.len());
            } else {
                warn!(
                    "Controls {:?} are held, keeping current control layout",
                    held
                );
                // The bank is already applied; a later reload must not select it again
                self.config.bank = config.bank;
                return Err(anyhow!("Control layout not reloaded while controls are held"));
            }
        }

        self.config = config;
        Ok(())
    }
}

fn build_controls(config: &AppConfig, bank: BankConfig) -> Result<Vec<Control>> {
    config.controls.iter().map(|c| c.build(bank)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{MessageKind, MidiMessage};

    const CONFIG: &str = r#"
bank:
  tracks_per_bank: 2
  banks: 4
controls:
  - { name: kick, kind: note, channel: 1, address: 36 }
  - { name: snare, kind: note, channel: 1, address: 38 }
"#;

    fn surface() -> Surface {
        Surface::new(&AppConfig::from_yaml(CONFIG).unwrap()).unwrap()
    }

    fn note(kind: MessageKind, note: u8) -> MidiMessage {
        MidiMessage::channel_message(kind, 0, note, 127)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("press kick").unwrap(),
            Some(Command::Press("kick".into()))
        );
        assert_eq!(
            Command::parse("  RELEASE kick  # done").unwrap(),
            Some(Command::Release("kick".into()))
        );
        assert_eq!(
            Command::parse("bank 2").unwrap(),
            Some(Command::Bank(BankCommand::Select(2)))
        );
        assert_eq!(
            Command::parse("bank prev").unwrap(),
            Some(Command::Bank(BankCommand::Previous))
        );
        assert_eq!(Command::parse("quit").unwrap(), Some(Command::Quit));
        assert_eq!(Command::parse("   ").unwrap(), None);
        assert_eq!(Command::parse("# comment").unwrap(), None);
        assert!(Command::parse("bank x").is_err());
        assert!(Command::parse("jump").is_err());
    }

    #[test]
    fn test_bank_change_while_held() {
        let mut surface = surface();
        let mut out: Vec<MidiMessage> = Vec::new();

        surface.apply_bank(BankCommand::Select(1)).unwrap(); // offset +2
        surface.press("kick", &mut out).unwrap();
        surface.apply_bank(BankCommand::Next).unwrap(); // offset +4
        surface.release("kick", &mut out).unwrap();

        assert_eq!(
            out,
            vec![note(MessageKind::NoteOn, 38), note(MessageKind::NoteOff, 38)]
        );
    }

    #[test]
    fn test_unknown_control() {
        let mut surface = surface();
        let mut out: Vec<MidiMessage> = Vec::new();
        assert!(surface.press("cowbell", &mut out).is_err());
    }

    #[test]
    fn test_status_lists_held_controls() {
        let mut surface = surface();
        let mut out: Vec<MidiMessage> = Vec::new();
        surface.press("snare", &mut out).unwrap();

        let status = surface.status();
        assert!(status.starts_with("bank 0/4 (offset 0)"));
        assert!(status.contains("snare"));
        assert!(status.contains("[held]"));
        assert_eq!(surface.held(), vec!["snare"]);
    }

    #[test]
    fn test_reload_moves_bank_but_keeps_lock() {
        let mut surface = surface();
        let mut out: Vec<MidiMessage> = Vec::new();
        surface.press("kick", &mut out).unwrap();

        let mut config = AppConfig::from_yaml(CONFIG).unwrap();
        config.bank.initial = 3;
        surface.update_config(config).unwrap();
        assert_eq!(surface.offset(), BankOffset(6));

        surface.release("kick", &mut out).unwrap();
        assert_eq!(out[1], note(MessageKind::NoteOff, 36));
    }

    #[test]
    fn test_reload_controls_refused_while_held() {
        let mut surface = surface();
        let mut out: Vec<MidiMessage> = Vec::new();
        surface.press("kick", &mut out).unwrap();

        let mut config = AppConfig::from_yaml(CONFIG).unwrap();
        config.controls.pop();
        assert!(surface.update_config(config.clone()).is_err());
        assert_eq!(surface.control_names().count(), 2);

        surface.release("kick", &mut out).unwrap();
        surface.update_config(config).unwrap();
        assert_eq!(surface.control_names().collect::<Vec<_>>(), vec!["kick"]);
    }

    #[test]
    fn test_refused_reload_then_same_reload_keeps_bank() {
        let mut surface = surface();
        let mut out: Vec<MidiMessage> = Vec::new();
        surface.press("kick", &mut out).unwrap();

        let mut config = AppConfig::from_yaml(CONFIG).unwrap();
        config.bank.initial = 1;
        config.controls.pop();
        assert!(surface.update_config(config.clone()).is_err());
        assert_eq!(surface.offset(), BankOffset(2));

        surface.release("kick", &mut out).unwrap();
        surface.apply_bank(BankCommand::Select(3)).unwrap();

        // Same file saved again: layout applies, bank selection stays
        surface.update_config(config).unwrap();
        assert_eq!(surface.offset(), BankOffset(6));
        assert_eq!(surface.control_names().collect::<Vec<_>>(), vec!["kick"]);
    }
}
