//! The guard registry.

use crate::core::{ConfigError, ConfigResult};
use crate::events::GuardListener;
use crate::guard::{CallGuard, GuardConfig, GuardSettings, GuardSnapshot};
use crate::registry::dependency::Dependency;

use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Guard settings keyed by guard name, as loaded from configuration.
///
/// ```json
/// {
///   "guards": {
///     "payment": { "call_timeout_ms": 10000, "failure_threshold": 5, "reset_timeout_ms": 30000 }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Settings per guard.
    #[serde(default)]
    pub guards: BTreeMap<String, GuardSettings>,
}

impl RegistrySettings {
    /// Parses settings from JSON.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Settings equivalent to [`GuardRegistry::standard`].
    pub fn standard() -> Self {
        let guards = Dependency::ALL
            .into_iter()
            .map(|dep| (dep.name().to_string(), GuardSettings::from(&dep.profile())))
            .collect();
        Self { guards }
    }
}

/// Builder for creating a [`GuardRegistry`].
pub struct GuardRegistryBuilder {
    entries: Vec<(String, GuardConfig)>,
    listeners: Vec<Arc<dyn GuardListener>>,
}

impl GuardRegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Registers a guard under `name`.
    pub fn register(mut self, name: impl Into<String>, config: GuardConfig) -> Self {
        self.entries.push((name.into(), config));
        self
    }

    /// Registers a known dependency with its default profile.
    pub fn dependency(self, dependency: Dependency) -> Self {
        self.register(dependency.name(), dependency.profile())
    }

    /// Attaches a listener to every guard in the registry.
    pub fn with_listener(mut self, listener: Arc<dyn GuardListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Builds the registry.
    ///
    /// Fails if any configuration is invalid or a name is registered twice.
    pub fn build(self) -> ConfigResult<GuardRegistry> {
        let mut guards = BTreeMap::new();

        for (name, config) in self.entries {
            match guards.entry(name) {
                Entry::Occupied(entry) => {
                    return Err(ConfigError::DuplicateGuard {
                        name: entry.key().clone(),
                    });
                }
                Entry::Vacant(entry) => {
                    let guard = self
                        .listeners
                        .iter()
                        .cloned()
                        .fold(CallGuard::new(entry.key().as_str(), config)?, |guard, listener| {
                            guard.with_listener(listener)
                        });
                    entry.insert(Arc::new(guard));
                }
            }
        }

        tracing::debug!(guards = guards.len(), "Guard registry built");
        Ok(GuardRegistry { guards })
    }
}

impl Default for GuardRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixed set of named guards, one per external dependency.
///
/// Built once at startup and handed to the services that need it. Each guard
/// is independent; the registry only looks them up.
#[derive(Debug)]
pub struct GuardRegistry {
    guards: BTreeMap<String, Arc<CallGuard>>,
}

impl GuardRegistry {
    /// Creates a builder.
    pub fn builder() -> GuardRegistryBuilder {
        GuardRegistryBuilder::new()
    }

    /// Creates a registry with the payment, push and email guards.
    ///
    /// Every profile goes through the builder's validation, so an invalid
    /// profile is reported instead of leaving its guard out.
    pub fn standard() -> ConfigResult<Self> {
        Dependency::ALL
            .into_iter()
            .fold(Self::builder(), |builder, dep| builder.dependency(dep))
            .build()
    }

    /// Creates a registry from loaded settings.
    pub fn from_settings(settings: RegistrySettings) -> ConfigResult<Self> {
        settings
            .guards
            .into_iter()
            .fold(Self::builder(), |builder, (name, guard)| {
                builder.register(name, GuardConfig::from(guard))
            })
            .build()
    }

    /// Creates a registry from JSON settings.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Self::from_settings(RegistrySettings::from_json(json)?)
    }

    /// Returns the guard registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<CallGuard>> {
        self.guards.get(name).cloned()
    }

    /// Returns the guard for a known dependency.
    pub fn dependency(&self, dependency: Dependency) -> Option<Arc<CallGuard>> {
        self.get(dependency.name())
    }

    /// Returns the registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.guards.keys().map(String::as_str).collect()
    }

    /// Returns the number of guards.
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Returns `true` if no guard is registered.
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Iterates over all guards.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CallGuard>> {
        self.guards.values()
    }

    /// Returns a snapshot of every guard.
    pub fn snapshots(&self) -> Vec<GuardSnapshot> {
        self.guards.values().map(|guard| guard.snapshot()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::GuardState;
    use crate::mock::{MockDependency, RecordingListener};
    use std::time::Duration;

    #[test]
    fn test_standard_registry() {
        let registry = GuardRegistry::standard().unwrap();
        assert_eq!(registry.len(), Dependency::ALL.len());
        assert_eq!(registry.names(), vec!["email", "payment", "push"]);

        let payment = registry.dependency(Dependency::Payment).unwrap();
        assert_eq!(payment.name(), "payment");
        assert_eq!(payment.config(), &Dependency::Payment.profile());
        assert!(registry.get("sms").is_none());
    }

    #[test]
    fn test_lookups_share_one_guard() {
        let registry = GuardRegistry::standard().unwrap();
        let first = registry.get("push").unwrap();
        let second = registry.dependency(Dependency::Push).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let result = GuardRegistry::builder()
            .dependency(Dependency::Email)
            .register("email", GuardConfig::default())
            .build();
        assert!(matches!(result, Err(ConfigError::DuplicateGuard { name }) if name == "email"));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = GuardRegistry::builder()
            .register("sms", GuardConfig::default().with_failure_threshold(0))
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidThreshold { .. })));
    }

    #[test]
    fn test_from_json() {
        let registry = GuardRegistry::from_json(
            r#"{
                "guards": {
                    "payment": { "call_timeout_ms": 8000, "failure_threshold": 4, "reset_timeout_ms": 20000 },
                    "email": { "call_timeout_ms": 3000, "failure_threshold": 2, "reset_timeout_ms": 90000 }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        let email = registry.get("email").unwrap();
        assert_eq!(email.config().call_timeout, Duration::from_secs(3));
        assert_eq!(email.config().failure_threshold, 2);
        assert_eq!(email.config().reset_timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            GuardRegistry::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_standard_settings_match_standard_registry() {
        let registry = GuardRegistry::from_settings(RegistrySettings::standard()).unwrap();
        assert_eq!(registry.len(), GuardRegistry::standard().unwrap().len());
        for dep in Dependency::ALL {
            assert_eq!(registry.dependency(dep).unwrap().config(), &dep.profile());
        }
    }

    #[tokio::test]
    async fn test_guards_are_independent() {
        let listener = Arc::new(RecordingListener::new());
        let registry = GuardRegistry::builder()
            .register("payment", GuardConfig::default().with_failure_threshold(1))
            .register("email", GuardConfig::default().with_failure_threshold(1))
            .with_listener(listener.clone())
            .build()
            .unwrap();

        let failing = MockDependency::new_failing();
        let payment = registry.get("payment").unwrap();
        let _ = payment.execute(|| failing.call()).await;

        assert_eq!(payment.state(), GuardState::Open);
        assert_eq!(registry.get("email").unwrap().state(), GuardState::Closed);
        assert_eq!(listener.len(), 1);
        assert_eq!(listener.events()[0].guard, "payment");

        let states: Vec<_> = registry.snapshots().into_iter().map(|s| (s.name, s.state)).collect();
        assert_eq!(
            states,
            vec![
                ("email".to_string(), GuardState::Closed),
                ("payment".to_string(), GuardState::Open),
            ]
        );
    }
}
