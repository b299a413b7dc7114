use std::io::{self, Write};

use crossterm::{
    event::{self, Event, KeyEventKind},
    style::Stylize,
    terminal,
};

const RULE_WIDTH: usize = 50;

pub fn rule<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", "=".repeat(RULE_WIDTH).cyan())
}

pub fn banner<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out)?;
    rule(out)?;
    writeln!(out, "{}", title.cyan())?;
    rule(out)
}

/// Blocks until a key is pressed.
pub fn wait_for_keypress<W: Write>(out: &mut W, prompt: &str) -> io::Result<()> {
    write!(out, "{}", prompt)?;
    out.flush()?;

    terminal::enable_raw_mode()?;
    let pressed = loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => break Ok(()),
            Ok(_) => continue,
            Err(e) => break Err(e),
        }
    };
    terminal::disable_raw_mode()?;

    writeln!(out)?;
    pressed
}
