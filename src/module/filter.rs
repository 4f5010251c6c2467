//! Module enable/disable filter.
//!
//! Decides, per callback name, whether the callback runs. Rules are checked
//! in order and the first that matches decides:
//!
//! 1. `--enable` lists the name: enabled
//! 2. `--disable` lists the name: disabled
//! 3. the module is disabled by default: disabled
//! 4. `--only` is set: enabled only if listed
//! 5. `--except` is set: disabled only if listed
//! 6. otherwise enabled

use std::collections::HashSet;

use clap::Args;

use crate::config::ConfigError;
use crate::lifecycle::callback::Callback;

/// Module selection flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct Selection {
    /// Modules to enable
    #[arg(long = "enable", value_name = "MODULE", value_delimiter = ',')]
    pub enables: Vec<String>,

    /// Modules to disable
    #[arg(long = "disable", value_name = "MODULE", value_delimiter = ',')]
    pub disables: Vec<String>,

    /// Enable only these modules
    #[arg(long = "only", value_name = "MODULE", value_delimiter = ',')]
    pub onlys: Vec<String>,

    /// Disable only these modules
    #[arg(long = "except", value_name = "MODULE", value_delimiter = ',')]
    pub excepts: Vec<String>,
}

/// Immutable filter built from a [`Selection`] and the default-disabled set.
#[derive(Debug, Clone, Default)]
pub struct ModuleFilter {
    enables: HashSet<String>,
    disables: HashSet<String>,
    default_disabled: HashSet<String>,
    onlys: HashSet<String>,
    excepts: HashSet<String>,
}

impl ModuleFilter {
    pub fn new(selection: &Selection, default_disabled: &[String]) -> Result<Self, ConfigError> {
        if !selection.onlys.is_empty() && !selection.excepts.is_empty() {
            return Err(ConfigError::ExclusiveFilters);
        }

        let set = |names: &[String]| names.iter().cloned().collect::<HashSet<_>>();

        Ok(Self {
            enables: set(&selection.enables),
            disables: set(&selection.disables),
            default_disabled: set(default_disabled),
            onlys: set(&selection.onlys),
            excepts: set(&selection.excepts),
        })
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        if self.enables.contains(name) {
            return true;
        }

        if self.disables.contains(name) || self.default_disabled.contains(name) {
            return false;
        }

        if !self.onlys.is_empty() {
            return self.onlys.contains(name);
        }

        if !self.excepts.is_empty() {
            return !self.excepts.contains(name);
        }

        true
    }

    /// Split callbacks into (enabled, disabled), preserving order.
    pub fn partition<'a>(&self, callbacks: &'a [Callback]) -> (Vec<&'a Callback>, Vec<&'a Callback>) {
        callbacks.iter().partition(|cb| self.is_enabled(cb.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn filter(selection: Selection, default_disabled: &[&str]) -> ModuleFilter {
        ModuleFilter::new(&selection, &names(default_disabled)).unwrap()
    }

    #[test]
    fn test_enable_beats_disable() {
        let f = filter(
            Selection {
                enables: names(&["a"]),
                disables: names(&["a"]),
                ..Default::default()
            },
            &[],
        );
        assert!(f.is_enabled("a"));
    }

    #[test]
    fn test_enable_overrides_default_disabled() {
        let selection = Selection {
            enables: names(&["x"]),
            ..Default::default()
        };
        assert!(filter(selection, &["x"]).is_enabled("x"));
        assert!(!filter(Selection::default(), &["x"]).is_enabled("x"));
    }

    #[test]
    fn test_only() {
        let f = filter(
            Selection {
                onlys: names(&["a", "b"]),
                ..Default::default()
            },
            &[],
        );
        assert!(f.is_enabled("a"));
        assert!(!f.is_enabled("c"));
    }

    #[test]
    fn test_except() {
        let f = filter(
            Selection {
                excepts: names(&["a"]),
                ..Default::default()
            },
            &[],
        );
        assert!(!f.is_enabled("a"));
        assert!(f.is_enabled("b"));
    }

    #[test]
    fn test_disable_beats_only() {
        let f = filter(
            Selection {
                onlys: names(&["a"]),
                disables: names(&["a"]),
                ..Default::default()
            },
            &[],
        );
        assert!(!f.is_enabled("a"));
    }

    #[test]
    fn test_only_and_except_are_exclusive() {
        let selection = Selection {
            onlys: names(&["a"]),
            excepts: names(&["b"]),
            ..Default::default()
        };
        assert!(matches!(
            ModuleFilter::new(&selection, &[]),
            Err(ConfigError::ExclusiveFilters)
        ));
    }

    #[test]
    fn test_partition_preserves_order() {
        let callbacks: Vec<Callback> = ["a", "cache", "b", "cache", "c"]
            .into_iter()
            .map(|name| Callback::new(name, || async {}))
            .collect();
        let f = filter(
            Selection {
                excepts: names(&["cache"]),
                ..Default::default()
            },
            &[],
        );

        let (enabled, disabled) = f.partition(&callbacks);
        let enabled: Vec<_> = enabled.iter().map(|cb| cb.name()).collect();
        assert_eq!(enabled, vec!["a", "b", "c"]);
        assert_eq!(disabled.len(), 2);
    }
}
