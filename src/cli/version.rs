use std::fmt;

/// Build information, logged at startup and printed by `--version`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Version {
    pub version: String,
    pub commit: String,
    pub date: String,
}

impl Version {
    pub fn new(
        version: impl Into<String>,
        commit: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            commit: commit.into(),
            date: date.into(),
        }
    }

    /// True if at least one field is set.
    pub fn any(&self) -> bool {
        !self.version.is_empty() || !self.commit.is_empty() || !self.date.is_empty()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.version, self.commit, self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_display() {
        let version = Version::new("v1.2.0", "3f2a9c1", "2026-10-01");
        assert!(version.any());
        assert_eq!(version.to_string(), "v1.2.0 3f2a9c1 2026-10-01");
        assert!(!Version::default().any());
    }
}
