//! Email allow-list.
//!
//! Entries come from a comma separated list (usually `ALLOWED_EMAILS`) and an
//! optional file with one email per line. Matching is case-insensitive.
//! Changes made through [`EmailAllowList::add`] and [`EmailAllowList::remove`]
//! are written back to the file when one is configured.

use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct EmailAllowList {
    emails: RwLock<BTreeSet<String>>,
    file: Option<PathBuf>,
}

/// Split a comma separated list into normalized emails.
pub fn parse_email_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(normalize)
        .filter(|email| !email.is_empty())
        .collect()
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn parse_file_contents(contents: &str) -> impl Iterator<Item = String> + '_ {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(normalize)
}

impl EmailAllowList {
    /// Build from inline entries plus the file, if it exists.
    pub fn load(inline: &[String], file: Option<PathBuf>) -> io::Result<Self> {
        let mut emails: BTreeSet<String> = inline.iter().map(|e| normalize(e)).collect();
        emails.retain(|e| !e.is_empty());

        if let Some(path) = file.as_deref()
            && path.exists()
        {
            let contents = std::fs::read_to_string(path)?;
            let before = emails.len();
            emails.extend(parse_file_contents(&contents));
            debug!(
                path = %path.display(),
                added = emails.len() - before,
                "Loaded allow-list file"
            );
        }

        info!(entries = emails.len(), "Email allow-list loaded");
        Ok(Self {
            emails: RwLock::new(emails),
            file,
        })
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn is_allowed(&self, email: &str) -> bool {
        self.emails.read().contains(&normalize(email))
    }

    /// Add an email. Returns `false` if it was already present.
    pub fn add(&self, email: &str) -> io::Result<bool> {
        let email = normalize(email);
        if email.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty email"));
        }
        let mut emails = self.emails.write();
        if !emails.insert(email) {
            return Ok(false);
        }
        self.persist(&emails)?;
        Ok(true)
    }

    /// Remove an email. Returns `false` if it was not present.
    pub fn remove(&self, email: &str) -> io::Result<bool> {
        let mut emails = self.emails.write();
        if !emails.remove(&normalize(email)) {
            return Ok(false);
        }
        self.persist(&emails)?;
        Ok(true)
    }

    /// Sorted snapshot of all entries
    pub fn emails(&self) -> Vec<String> {
        self.emails.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.emails.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.read().is_empty()
    }

    fn persist(&self, emails: &BTreeSet<String>) -> io::Result<()> {
        let Some(path) = self.file.as_deref() else {
            return Ok(());
        };
        let mut contents = emails.iter().cloned().collect::<Vec<_>>().join("\n");
        contents.push('\n');
        std::fs::write(path, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_email_list() {
        assert_eq!(
            parse_email_list(" A@Example.com, ,b@example.com,"),
            vec!["a@example.com", "b@example.com"]
        );
        assert!(parse_email_list("").is_empty());
    }

    #[test]
    fn test_case_insensitive_match() {
        let list = EmailAllowList::load(&["User@Example.com".to_string()], None).unwrap();
        assert!(list.is_allowed("user@example.com"));
        assert!(list.is_allowed("USER@EXAMPLE.COM"));
        assert!(!list.is_allowed("other@example.com"));
    }

    #[test]
    fn test_file_loading_skips_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("allowed.txt");
        std::fs::write(&path, "# team\nalice@example.com\n\n  Bob@Example.com \n").unwrap();

        let list = EmailAllowList::load(&[], Some(path)).unwrap();
        assert_eq!(list.emails(), vec!["alice@example.com", "bob@example.com"]);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let list = EmailAllowList::load(&[], Some(dir.path().join("nope.txt"))).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_add_and_remove_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("allowed.txt");
        let list = EmailAllowList::load(&[], Some(path.clone())).unwrap();

        assert!(list.add("Carol@Example.com").unwrap());
        assert!(!list.add("carol@example.com").unwrap());
        assert!(list.add("dave@example.com").unwrap());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "carol@example.com\ndave@example.com\n"
        );

        assert!(list.remove("CAROL@example.com").unwrap());
        assert!(!list.remove("carol@example.com").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "dave@example.com\n");

        let reloaded = EmailAllowList::load(&[], Some(path)).unwrap();
        assert_eq!(reloaded.emails(), vec!["dave@example.com"]);
    }

    #[test]
    fn test_add_without_file_stays_in_memory() {
        let list = EmailAllowList::default();
        assert!(list.add("x@example.com").unwrap());
        assert_eq!(list.len(), 1);
        assert!(list.add("  ").is_err());
    }
}
