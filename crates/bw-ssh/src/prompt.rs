//! Credential sources
//!
//! Anything that can hand over a secret string: the interactive terminal
//! (masked entry) or a value supplied up front.

use crossterm::cursor::MoveToColumn;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{execute, queue};
use std::io::{self, Write};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Something that can supply a secret on request
pub trait CredentialSource {
    /// Obtain the secret, showing `prompt` if the source is interactive
    fn obtain(&self, prompt: &str) -> Result<Zeroizing<String>>;
}

/// A secret known before it is asked for
pub struct Preseeded(Zeroizing<String>);

impl Preseeded {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// Read the secret from an environment variable, if set and non-empty
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var)
            .ok()
            .filter(|value| !value.is_empty())
            .map(Self::new)
    }
}

impl CredentialSource for Preseeded {
    fn obtain(&self, _prompt: &str) -> Result<Zeroizing<String>> {
        Ok(self.0.clone())
    }
}

/// Masked entry on the interactive terminal.
///
/// Each keystroke redraws the whole line as the prompt followed by one `*`
/// per character entered. Ctrl+C aborts with [`Error::UserAborted`].
pub struct TerminalPrompt;

impl CredentialSource for TerminalPrompt {
    fn obtain(&self, prompt: &str) -> Result<Zeroizing<String>> {
        let mut out = io::stdout();
        let _raw = RawModeGuard::enable()?;

        let mut input = Zeroizing::new(String::new());
        redraw(&mut out, prompt, 0)?;

        loop {
            let Event::Key(key) = event::read().map_err(Error::Terminal)? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }

            match apply_key(&mut input, key) {
                KeyOutcome::Edited => redraw(&mut out, prompt, input.chars().count())?,
                KeyOutcome::Ignored => {}
                KeyOutcome::Submit => {
                    finish_line(&mut out)?;
                    return Ok(input);
                }
                KeyOutcome::Abort => {
                    finish_line(&mut out)?;
                    return Err(Error::UserAborted);
                }
            }
        }
    }
}

/// Restores cooked mode when dropped, on every exit path
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode().map_err(Error::Terminal)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyOutcome {
    Edited,
    Ignored,
    Submit,
    Abort,
}

fn apply_key(input: &mut String, key: KeyEvent) -> KeyOutcome {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => KeyOutcome::Submit,
        KeyCode::Char('c') if ctrl => KeyOutcome::Abort,
        KeyCode::Char(_) if ctrl => KeyOutcome::Ignored,
        KeyCode::Char(c) => {
            input.push(c);
            KeyOutcome::Edited
        }
        KeyCode::Backspace => {
            if input.pop().is_some() {
                KeyOutcome::Edited
            } else {
                KeyOutcome::Ignored
            }
        }
        _ => KeyOutcome::Ignored,
    }
}

fn masked_line(prompt: &str, len: usize) -> String {
    format!("{prompt}{}", "*".repeat(len))
}

fn redraw(out: &mut impl Write, prompt: &str, len: usize) -> Result<()> {
    queue!(
        out,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(masked_line(prompt, len))
    )
    .map_err(Error::Terminal)?;
    out.flush().map_err(Error::Terminal)
}

fn finish_line(out: &mut impl Write) -> Result<()> {
    // Raw mode: a bare \n would not return the carriage.
    execute!(out, Print("\r\n")).map_err(Error::Terminal)
}
