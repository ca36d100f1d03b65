use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};

/// Line-oriented questions for `who new`.
pub(crate) struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub(crate) fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub(crate) fn note(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{line}")?;
        Ok(())
    }

    /// Ask until a non-blank answer arrives.
    pub(crate) fn ask(&mut self, prompt: &str) -> Result<String> {
        loop {
            write!(self.output, "{prompt}: ")?;
            let answer = self.read_answer(prompt)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            writeln!(self.output, "  (required)")?;
        }
    }

    pub(crate) fn ask_default(&mut self, prompt: &str, default: &str) -> Result<String> {
        if default.is_empty() {
            write!(self.output, "{prompt}: ")?;
        } else {
            write!(self.output, "{prompt} [{default}]: ")?;
        }
        let answer = self.read_answer(prompt)?;
        if answer.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(answer)
        }
    }

    /// Numbered menu; accepts the 1-based index or the literal value.
    pub(crate) fn ask_choice<T: Copy>(
        &mut self,
        title: &str,
        prompt: &str,
        choices: &[T],
        label: fn(T) -> &'static str,
    ) -> Result<T> {
        writeln!(self.output, "\n{title}:")?;
        for (index, choice) in choices.iter().enumerate() {
            writeln!(self.output, "  {}. {}", index + 1, label(*choice))?;
        }

        loop {
            write!(self.output, "{prompt} (1-{}): ", choices.len())?;
            let answer = self.read_answer(prompt)?;
            let picked = choices.iter().enumerate().find(|(index, choice)| {
                answer == (index + 1).to_string() || answer == label(**choice)
            });
            if let Some((_, choice)) = picked {
                return Ok(*choice);
            }
            writeln!(self.output, "  (invalid choice)")?;
        }
    }

    fn read_answer(&mut self, prompt: &str) -> Result<String> {
        self.output.flush()?;
        let mut line = String::new();
        let read = self.input.read_line(&mut line).context("failed to read from stdin")?;
        if read == 0 {
            bail!("input ended while waiting for `{prompt}`");
        }
        Ok(line.trim().to_string())
    }
}
