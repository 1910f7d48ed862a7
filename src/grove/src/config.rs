use serde::{Deserialize, Serialize};

/// When configuration errors in bindings are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Duplicate declarations and unsatisfied declared dependencies are
    /// rejected when bindings are installed, and an inconsistent parent chain
    /// is rejected when scopes are opened.
    Strict,
    /// Errors surface at the first resolution that runs into them. The first
    /// of several duplicate declarations wins.
    #[default]
    Lenient,
}

impl Strictness {
    pub fn is_strict(self) -> bool {
        self == Self::Strict
    }
}

/// Whether a forest may hold more than one root scope at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootPolicy {
    #[default]
    AllowMultiple,
    SingleRoot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub strictness: Strictness,
    pub root_policy: RootPolicy,
}

impl Configuration {
    /// Checks everything as early as possible.
    pub fn development() -> Self {
        Self {
            strictness: Strictness::Strict,
            root_policy: RootPolicy::SingleRoot,
        }
    }

    /// Skips eager validation. This is the default.
    pub fn production() -> Self {
        Self {
            strictness: Strictness::Lenient,
            root_policy: RootPolicy::AllowMultiple,
        }
    }

    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn with_root_policy(mut self, root_policy: RootPolicy) -> Self {
        self.root_policy = root_policy;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strictness.is_strict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_presets_succeed() {
        assert_eq!(Configuration::default(), Configuration::production());
        assert!(Configuration::development().is_strict());
        assert_eq!(
            Configuration::development().root_policy,
            RootPolicy::SingleRoot
        );
        assert_eq!(
            Configuration::production()
                .with_strictness(Strictness::Strict)
                .with_root_policy(RootPolicy::SingleRoot),
            Configuration::development()
        );
    }

    #[test]
    fn configuration_deserialize_succeeds() {
        let config: Configuration =
            serde_json::from_str(r#"{ "strictness": "strict", "root_policy": "single_root" }"#)
                .unwrap();
        assert_eq!(config, Configuration::development());

        let config: Configuration = serde_json::from_str(r#"{ "strictness": "strict" }"#).unwrap();
        assert_eq!(config.root_policy, RootPolicy::AllowMultiple);

        let config: Configuration = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Configuration::production());
    }

    #[test]
    fn configuration_deserialize_fails_when_strictness_is_unknown() {
        let res: Result<Configuration, _> = serde_json::from_str(r#"{ "strictness": "paranoid" }"#);
        assert!(res.is_err());
    }
}
