//! Trusted process names, exempt from auditing, scoring, and termination.
//!
//! Built once at startup from a comma-separated string. Tokenization
//! deliberately mirrors C's `strtok_r(str, ",", ...)`: consecutive commas
//! collapse rather than producing empty entries, and whitespace around a
//! token is kept as-is (no trimming) so a config author who writes
//! `WHITELIST=bash, sshd` gets a literal `" sshd"` entry, not `"sshd"`.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct Whitelist {
    entries: HashSet<String>,
}

impl Whitelist {
    pub fn from_csv(csv: &str) -> Self {
        let entries = csv
            .split(',')
            .filter(|tok| !tok.is_empty())
            .map(|tok| tok.to_string())
            .collect();
        Whitelist { entries }
    }

    pub fn contains(&self, comm: &str) -> bool {
        self.entries.contains(comm)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_on_comma() {
        let wl = Whitelist::from_csv("bash,sshd,systemd");
        assert!(wl.contains("bash"));
        assert!(wl.contains("sshd"));
        assert!(wl.contains("systemd"));
        assert!(!wl.contains("nc"));
        assert_eq!(wl.len(), 3);
    }

    #[test]
    fn collapses_consecutive_commas_without_empty_entries() {
        let wl = Whitelist::from_csv("bash,,sshd,");
        assert_eq!(wl.len(), 2);
        assert!(!wl.contains(""));
    }

    #[test]
    fn does_not_trim_whitespace() {
        let wl = Whitelist::from_csv("bash, sshd");
        assert!(wl.contains("bash"));
        assert!(!wl.contains("sshd"));
        assert!(wl.contains(" sshd"));
    }

    #[test]
    fn empty_string_yields_empty_whitelist() {
        let wl = Whitelist::from_csv("");
        assert!(wl.is_empty());
    }
}
