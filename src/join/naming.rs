//! Output column naming for joins
//!
//! Left columns keep their names. A right column keeps its name too unless the
//! name is already taken, in which case it gets a suffix. The default suffix
//! escalates when the suffixed name is itself taken, so progressively joined
//! tables produce `time`, `time_right`, `time_rright`, ...

use std::collections::HashSet;

use crate::error::{Error, Result};

/// How right-side columns are renamed on collision
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Suffix {
    /// `_right`, then `_rright`, `_rrright`, ...
    #[default]
    Escalating,
    /// A fixed token; a collision after applying it is an error
    Token(String),
}

/// Escalating suffix for the given depth (1 => `_right`, 2 => `_rright`)
pub fn escalating_suffix(depth: usize) -> String {
    format!("_{}ight", "r".repeat(depth.max(1)))
}

/// Tracks names already used by the output of one join
#[derive(Debug, Default)]
pub(crate) struct ColumnNamer {
    taken: HashSet<String>,
}

impl ColumnNamer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Claim a left-side name as is
    pub(crate) fn claim(&mut self, name: &str) -> Result<String> {
        if !self.taken.insert(name.to_string()) {
            return Err(Error::DuplicateColumnName(name.to_string()));
        }
        Ok(name.to_string())
    }

    /// Claim a right-side name, suffixing it on collision
    pub(crate) fn claim_right(&mut self, name: &str, suffix: &Suffix) -> Result<String> {
        if !self.taken.contains(name) {
            return self.claim(name);
        }
        match suffix {
            Suffix::Token(token) => self.claim(&format!("{}{}", name, token)),
            Suffix::Escalating => {
                // at most `taken.len()` candidates can collide
                let limit = self.taken.len() + 1;
                for depth in 1..=limit {
                    let candidate = format!("{}{}", name, escalating_suffix(depth));
                    if !self.taken.contains(&candidate) {
                        return self.claim(&candidate);
                    }
                }
                Err(Error::DuplicateColumnName(name.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalates_on_repeated_collisions() {
        let mut namer = ColumnNamer::new();
        namer.claim("time").unwrap();
        assert_eq!(namer.claim_right("time", &Suffix::Escalating).unwrap(), "time_right");
        assert_eq!(namer.claim_right("time", &Suffix::Escalating).unwrap(), "time_rright");
        assert_eq!(namer.claim_right("value", &Suffix::Escalating).unwrap(), "value");
    }

    #[test]
    fn fixed_token_does_not_escalate() {
        let mut namer = ColumnNamer::new();
        namer.claim("size").unwrap();
        let token = Suffix::Token("_2".to_string());
        assert_eq!(namer.claim_right("size", &token).unwrap(), "size_2");
        assert!(matches!(
            namer.claim_right("size", &token),
            Err(Error::DuplicateColumnName(_))
        ));
    }

    #[test]
    fn suffix_depths() {
        assert_eq!(escalating_suffix(1), "_right");
        assert_eq!(escalating_suffix(3), "_rrright");
    }
}
