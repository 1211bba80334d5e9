//! Extension name grammar.
//!
//! # Invariants
//! - A name is accepted only when the whole string matches
//!   `[A-Za-z_][A-Za-z_0-9]+`. The grammar is ASCII-only.
//! - Names shorter than two characters are rejected.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EXTENSION_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z_0-9]+$").expect("valid extension name regex"));

/// Validates one advertised extension name before it is bound.
pub fn validate_extension_name(name: &str) -> Result<(), InvalidNameError> {
    if EXTENSION_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(InvalidNameError {
            name: name.to_string(),
        })
    }
}

/// Returns whether `name` is usable as an extension binding name.
pub fn is_valid_extension_name(name: &str) -> bool {
    validate_extension_name(name).is_ok()
}

/// Name rejected by the extension name grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidNameError {
    pub name: String,
}

impl Display for InvalidNameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid extension name `{}`: names must start with a letter or an underscore \
             and continue with letters, numbers, and underscores",
            self.name
        )
    }
}

impl Error for InvalidNameError {}
