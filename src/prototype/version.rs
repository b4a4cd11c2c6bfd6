// SPDX-License-Identifier: GPL-3.0-or-later

//! Dotted-triple package versions, packed into a single integer:
//! `major*2^42 + minor*2^21 + patch`. Packing into one comparable integer is
//! what lets the loader gate on `{min, current}` with a single comparison
//! instead of a three-way tuple compare.

use crate::error::LoadError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Version { major, minor, patch }
    }

    /// Pack into the `major*2^42 + minor*2^21 + patch` integer.
    pub fn packed(&self) -> u64 {
        ((self.major as u64) << 42) + ((self.minor as u64) << 21) + (self.patch as u64)
    }

    pub fn parse(s: &str) -> Result<Self, LoadError> {
        let mut parts = s.trim().split('.');
        let mut next = || {
            parts
                .next()
                .and_then(|p| p.parse::<u32>().ok())
                .ok_or_else(|| LoadError::ManifestInvalid(format!("bad version string {s:?}")))
        };
        let major = next()?;
        let minor = next()?;
        let patch = next()?;
        Ok(Version::new(major, minor, patch))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// The compile-time supported version window.
pub const MIN_SUPPORTED: Version = Version::new(1, 0, 0);
pub const CURRENT: Version = Version::new(1, 2, 0);

/// Gate a manifest's declared version against the compile-time window.
pub fn check_version(found: Version) -> Result<(), LoadError> {
    if found.packed() < MIN_SUPPORTED.packed() {
        return Err(LoadError::VersionTooOld {
            found: found.to_string(),
            min: MIN_SUPPORTED.to_string(),
        });
    }
    if found.packed() > CURRENT.packed() {
        return Err(LoadError::VersionTooNew {
            found: found.to_string(),
            current: CURRENT.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_in_major_minor_patch_order() {
        let a = Version::new(1, 0, 0);
        let b = Version::new(0, 99, 99);
        assert!(a.packed() > b.packed());
    }

    #[test]
    fn rejects_out_of_window_versions() {
        assert!(check_version(Version::new(0, 9, 0)).is_err());
        assert!(check_version(Version::new(9, 0, 0)).is_err());
        assert!(check_version(Version::new(1, 1, 0)).is_ok());
    }
}
