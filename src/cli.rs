//! Command-line interface and REPL

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use midi_surface::interface::MidiOutput;
use midi_surface::surface::{Command, Surface};

/// What the host loop should do after a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Status(String),
    Quit,
}

/// Parse and run one script/REPL line against the surface
pub fn execute_line(surface: &mut Surface, line: &str, out: &mut dyn MidiOutput) -> Result<Outcome> {
    let Some(command) = Command::parse(line)? else {
        return Ok(Outcome::Done);
    };
    debug!("Executing {:?}", command);

    if command == Command::Quit {
        return Ok(Outcome::Quit);
    }
    Ok(match surface.execute(&command, out)? {
        Some(status) => Outcome::Status(status),
        None => Outcome::Done,
    })
}

/// Read a gesture script, one command per line
pub async fn read_script(path: &str) -> Result<Vec<String>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read script: {}", path))?;
    Ok(contents.lines().map(str::to_string).collect())
}

/// Start the interactive prompt on its own thread
///
/// Lines are delivered through the returned channel, which closes on
/// `quit`, Ctrl+C or Ctrl+D.
pub fn spawn_repl() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                warn!("Failed to start REPL: {}", e);
                return;
            }
        };

        loop {
            match rl.readline("midi> ") {
                Ok(line) => {
                    let _ = rl.add_history_entry(line.as_str());
                    let quit = matches!(Command::parse(&line), Ok(Some(Command::Quit)));
                    if tx.blocking_send(line).is_err() || quit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => {
                    warn!("Readline error: {}", e);
                    break;
                }
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use midi_surface::config::AppConfig;
    use midi_surface::midi::MidiMessage;
    use tempfile::NamedTempFile;

    fn surface() -> Surface {
        let config = AppConfig::from_yaml(
            "controls:\n  - { name: mute, kind: cc, channel: 2, address: 20 }\n",
        )
        .unwrap();
        Surface::new(&config).unwrap()
    }

    #[test]
    fn test_execute_lines() {
        let mut surface = surface();
        let mut out: Vec<MidiMessage> = Vec::new();

        assert_eq!(execute_line(&mut surface, "press mute", &mut out).unwrap(), Outcome::Done);
        assert_eq!(execute_line(&mut surface, "", &mut out).unwrap(), Outcome::Done);
        assert!(matches!(
            execute_line(&mut surface, "status", &mut out).unwrap(),
            Outcome::Status(_)
        ));
        assert_eq!(execute_line(&mut surface, "release mute", &mut out).unwrap(), Outcome::Done);
        assert_eq!(execute_line(&mut surface, "quit", &mut out).unwrap(), Outcome::Quit);

        assert_eq!(out[0].encode(), vec![0xB1, 20, 127]);
        assert_eq!(out[1].encode(), vec![0xB1, 20, 0]);
    }

    #[test]
    fn test_execute_unknown_command() {
        let mut surface = surface();
        let mut out: Vec<MidiMessage> = Vec::new();
        assert!(execute_line(&mut surface, "twist mute", &mut out).is_err());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_read_script() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "press mute\n# held\nrelease mute\n").unwrap();

        let lines = read_script(&file.path().to_string_lossy()).await.unwrap();
        assert_eq!(lines, vec!["press mute", "# held", "release mute"]);
    }
}
