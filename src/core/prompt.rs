//! Terminal prompting.

use std::io::{self, BufRead, Write};

use crate::error::{Error, Result};

/// Source of answers to interactive questions.
pub trait Prompter {
    /// Show `message` and return the trimmed reply.
    fn ask(&self, message: &str) -> Result<String>;
}

/// Prompts on stderr and reads one line from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&self, message: &str) -> Result<String> {
        eprint!("{}: ", message);
        io::stderr().flush().ok();

        let stdin = io::stdin();
        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .map_err(|e| Error::internal_io(e.to_string(), Some("read prompt reply".to_string())))?;

        if read == 0 {
            return Err(Error::internal_io(
                "stdin closed before a reply was given",
                Some("read prompt reply".to_string()),
            ));
        }

        Ok(line.trim().to_string())
    }
}
