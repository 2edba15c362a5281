//! Yes/no/skip confirmation for risky steps.
//!
//! The mode is fixed once per run from `--assume-yes`, `--assume-no` and
//! `--assume-skip`. A "no" is fatal: [`Gate::confirm`] returns
//! `user.declined` and the run stops.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::prompt::Prompter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmMode {
    AssumeYes,
    AssumeNo,
    AssumeSkip,
    Interactive,
}

impl ConfirmMode {
    /// Resolve the mode from the three mutually exclusive flags.
    pub fn from_flags(assume_yes: bool, assume_no: bool, assume_skip: bool) -> Result<Self> {
        let set: Vec<String> = [
            (assume_yes, "--assume-yes"),
            (assume_no, "--assume-no"),
            (assume_skip, "--assume-skip"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| name.to_string())
        .collect();

        if set.len() > 1 {
            return Err(Error::validation_conflicting_flags(set));
        }

        Ok(match (assume_yes, assume_no, assume_skip) {
            (true, _, _) => ConfirmMode::AssumeYes,
            (_, true, _) => ConfirmMode::AssumeNo,
            (_, _, true) => ConfirmMode::AssumeSkip,
            _ => ConfirmMode::Interactive,
        })
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, ConfirmMode::Interactive)
    }

    pub fn flag(&self) -> Option<&'static str> {
        match self {
            ConfirmMode::AssumeYes => Some("--assume-yes"),
            ConfirmMode::AssumeNo => Some("--assume-no"),
            ConfirmMode::AssumeSkip => Some("--assume-skip"),
            ConfirmMode::Interactive => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Yes,
    No,
    Skip,
}

impl Answer {
    /// Match a reply: `y`/`yes`, `n`/`no`, `s`/`skip`, any case.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Some(Answer::Yes),
            "n" | "no" => Some(Answer::No),
            "s" | "skip" => Some(Answer::Skip),
            _ => None,
        }
    }
}

pub struct Gate {
    mode: ConfirmMode,
    prompter: Box<dyn Prompter>,
}

impl Gate {
    pub fn new(mode: ConfirmMode, prompter: Box<dyn Prompter>) -> Self {
        Self { mode, prompter }
    }

    pub fn mode(&self) -> ConfirmMode {
        self.mode
    }

    /// Ask whether to proceed. Returns `Yes` or `Skip`; a "no" is an error.
    pub fn confirm(&self, question: &str) -> Result<Answer> {
        match self.mode {
            ConfirmMode::AssumeYes => {
                crate::log_status!("confirm", "--assume-yes has been set. Continuing.");
                Ok(Answer::Yes)
            }
            ConfirmMode::AssumeNo => {
                crate::log_status!("confirm", "--assume-no has been set. Exiting.");
                Err(Error::user_declined(question))
            }
            ConfirmMode::AssumeSkip => {
                crate::log_status!("confirm", "--assume-skip has been set. Skipping.");
                Ok(Answer::Skip)
            }
            ConfirmMode::Interactive => loop {
                let reply = self
                    .prompter
                    .ask(&format!("{} (y=yes, n=no, s=skip)", question))?;
                match Answer::parse(&reply) {
                    Some(Answer::No) => {
                        crate::log_status!("confirm", "Execution terminated by user");
                        return Err(Error::user_declined(question));
                    }
                    Some(answer) => return Ok(answer),
                    None => crate::log_status!("confirm", "WARNING! Please enter a valid response"),
                }
            },
        }
    }

    /// Ask for a free-form value, re-asking until something non-blank is given.
    pub fn prompt_value(&self, question: &str) -> Result<String> {
        loop {
            let reply = self.prompter.ask(question)?;
            if !reply.trim().is_empty() {
                return Ok(reply.trim().to_string());
            }
            crate::log_status!("confirm", "A value must be provided.");
        }
    }
}
