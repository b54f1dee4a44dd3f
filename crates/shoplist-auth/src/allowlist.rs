//! Origins permitted to reach unauthenticated sensitive endpoints.
//!
//! The file is a JSON array of IP literals. An IPv4 entry whose last two
//! octets are zero (`10.1.0.0`) matches the whole `10.1.x.y` range.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use crate::error::{AuthError, Result};

/// A static set of allowed addresses and `/16` prefixes.
#[derive(Debug, Clone, Default)]
pub struct IpAllowList {
    entries: HashSet<IpAddr>,
}

impl IpAllowList {
    /// Load the allow-list file.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AllowList` if the file is missing, is not a JSON
    /// array of strings, or contains an entry that is not an IP address.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)
            .map_err(|e| AuthError::AllowList(format!("{}: {e}", path.display())))?;
        let entries: Vec<String> = serde_json::from_slice(&raw)
            .map_err(|e| AuthError::AllowList(format!("{}: {e}", path.display())))?;

        let list = Self::from_entries(entries.iter().map(String::as_str))?;
        tracing::info!(path = %path.display(), entries = list.len(), "IP allow-list loaded");
        Ok(list)
    }

    /// Build a list from IP literals.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AllowList` on the first entry that does not parse.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let entries = entries
            .into_iter()
            .map(|entry| {
                entry
                    .trim()
                    .parse::<IpAddr>()
                    .map(canonical)
                    .map_err(|e| AuthError::AllowList(format!("{entry:?}: {e}")))
            })
            .collect::<Result<HashSet<_>>>()?;
        Ok(Self { entries })
    }

    /// Returns `true` if `ip` or its `/16` reduction is listed.
    #[must_use]
    pub fn is_allowed(&self, ip: IpAddr) -> bool {
        let ip = canonical(ip);
        if self.entries.contains(&ip) {
            return true;
        }
        match ip {
            IpAddr::V4(v4) => {
                let [a, b, _, _] = v4.octets();
                self.entries.contains(&IpAddr::V4(Ipv4Addr::new(a, b, 0, 0)))
            }
            IpAddr::V6(_) => false,
        }
    }

    /// Like [`IpAllowList::is_allowed`] for a textual address. Unparseable
    /// input is never allowed.
    #[must_use]
    pub fn is_allowed_str(&self, ip: &str) -> bool {
        ip.trim().parse().is_ok_and(|ip| self.is_allowed(ip))
    }

    /// Require `ip` to be allowed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IpNotAllowed` otherwise.
    pub fn check(&self, ip: IpAddr) -> Result<()> {
        if self.is_allowed(ip) {
            Ok(())
        } else {
            Err(AuthError::IpNotAllowed(ip))
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is allowed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// IPv4-mapped IPv6 addresses compare as IPv4.
fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
        IpAddr::V4(_) => ip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn prefix_entry_matches_range() {
        let list = IpAllowList::from_entries(["10.1.0.0"]).unwrap();
        assert!(list.is_allowed_str("10.1.2.3"));
        assert!(list.is_allowed_str("10.1.255.255"));
        assert!(!list.is_allowed_str("10.2.2.3"));
    }

    #[test]
    fn exact_entry_matches_only_itself() {
        let list = IpAllowList::from_entries(["10.1.2.3"]).unwrap();
        assert!(list.is_allowed_str("10.1.2.3"));
        assert!(!list.is_allowed_str("10.1.2.4"));
    }

    #[test]
    fn ipv6_entries_are_exact() {
        let list = IpAllowList::from_entries(["::1"]).unwrap();
        assert!(list.is_allowed_str("::1"));
        assert!(!list.is_allowed_str("::2"));
    }

    #[test]
    fn mapped_ipv4_is_normalised() {
        let list = IpAllowList::from_entries(["127.0.0.1"]).unwrap();
        assert!(list.is_allowed_str("::ffff:127.0.0.1"));
    }

    #[test]
    fn garbage_input_is_denied() {
        let list = IpAllowList::from_entries(["10.1.0.0"]).unwrap();
        assert!(!list.is_allowed_str("not-an-ip"));
        assert!(!list.is_allowed_str(""));
    }

    #[test]
    fn check_reports_address() {
        let list = IpAllowList::default();
        let ip: IpAddr = "192.168.1.1".parse().unwrap();
        assert!(matches!(list.check(ip), Err(AuthError::IpNotAllowed(a)) if a == ip));
    }

    #[test]
    fn load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ip_whitelist.json");
        std::fs::write(&path, r#"["127.0.0.1", "10.1.0.0", " 192.168.5.6 "]"#).unwrap();

        let list = IpAllowList::load(&path).unwrap();
        assert_eq!(list.len(), 3);
        assert!(list.is_allowed_str("192.168.5.6"));
    }

    #[test]
    fn bad_files_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            IpAllowList::load(&dir.path().join("missing.json")),
            Err(AuthError::AllowList(_))
        ));

        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"["10.1.0.0", "ten.one"]"#).unwrap();
        assert!(matches!(IpAllowList::load(&path), Err(AuthError::AllowList(_))));
    }
}
