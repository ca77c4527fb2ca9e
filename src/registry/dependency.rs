//! Known external dependencies and their tolerance profiles.

use crate::guard::GuardConfig;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// An external dependency the backend calls out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dependency {
    /// Payment gateway.
    Payment,
    /// Push-notification gateway.
    Push,
    /// Transactional email gateway.
    Email,
}

impl Dependency {
    /// All known dependencies.
    pub const ALL: [Dependency; 3] = [Self::Payment, Self::Push, Self::Email];

    /// Returns the canonical guard name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Push => "push",
            Self::Email => "email",
        }
    }

    /// Returns the guard configuration suited to this dependency.
    ///
    /// Payments tolerate more failures and recover quickly; push and email
    /// open sooner and wait longer before probing.
    pub fn profile(&self) -> GuardConfig {
        match self {
            Self::Payment => GuardConfig::new(Duration::from_secs(10), 5, Duration::from_secs(30)),
            Self::Push => GuardConfig::new(Duration::from_secs(5), 3, Duration::from_secs(60)),
            Self::Email => GuardConfig::new(Duration::from_secs(10), 3, Duration::from_secs(60)),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dependency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|dep| dep.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown dependency: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_are_valid() {
        for dep in Dependency::ALL {
            assert!(dep.profile().validate(dep.name()).is_ok());
        }
    }

    #[test]
    fn test_push_opens_sooner_than_payment() {
        let push = Dependency::Push.profile();
        let payment = Dependency::Payment.profile();
        assert!(push.failure_threshold < payment.failure_threshold);
        assert!(push.call_timeout < payment.call_timeout);
    }

    #[test]
    fn test_parse_dependency() {
        assert_eq!("payment".parse::<Dependency>(), Ok(Dependency::Payment));
        assert_eq!(" EMAIL ".parse::<Dependency>(), Ok(Dependency::Email));
        assert!("sms".parse::<Dependency>().is_err());
        assert_eq!(Dependency::Push.to_string(), "push");
    }
}
