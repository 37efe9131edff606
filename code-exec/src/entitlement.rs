use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Language;

pub const DENIED_REASON: &str = "entitlement required for this language";

/// Subscription state for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub user_id: String,
    pub is_pro: bool,
    #[serde(default)]
    pub pro_since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
}

impl Entitlement {
    /// Record created at first sign-in
    pub fn free(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_pro: false,
            pro_since: None,
            customer_id: None,
            order_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Allowed,
    Denied { reason: &'static str },
}

impl Authorization {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Authorization::Allowed)
    }
}

/// Decides which languages a user may execute.
///
/// Pro users may run anything; everyone else is limited to the free-tier
/// language. A missing entitlement is treated as free tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitlementGate {
    free_tier: Language,
}

impl EntitlementGate {
    pub fn new(free_tier: Language) -> Self {
        Self { free_tier }
    }

    pub fn free_tier(&self) -> Language {
        self.free_tier
    }

    pub fn authorize(&self, requested: &str, entitlement: Option<&Entitlement>) -> Authorization {
        if entitlement.is_some_and(|e| e.is_pro) || requested == self.free_tier.as_str() {
            Authorization::Allowed
        } else {
            Authorization::Denied {
                reason: DENIED_REASON,
            }
        }
    }
}

impl Default for EntitlementGate {
    fn default() -> Self {
        Self::new(Language::JavaScript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pro(user_id: &str) -> Entitlement {
        Entitlement {
            is_pro: true,
            pro_since: Some(Utc::now()),
            ..Entitlement::free(user_id)
        }
    }

    #[test]
    fn test_free_tier_language_always_allowed() {
        let gate = EntitlementGate::default();
        assert!(gate.authorize("javascript", None).is_allowed());
        assert!(gate
            .authorize("javascript", Some(&Entitlement::free("u1")))
            .is_allowed());
    }

    #[test]
    fn test_non_pro_denied_other_languages() {
        let gate = EntitlementGate::default();
        for language in Language::ALL
            .into_iter()
            .filter(|l| *l != Language::JavaScript)
        {
            assert_eq!(
                gate.authorize(language.as_str(), Some(&Entitlement::free("u1"))),
                Authorization::Denied {
                    reason: DENIED_REASON
                }
            );
            assert!(!gate.authorize(language.as_str(), None).is_allowed());
        }
    }

    #[test]
    fn test_pro_allowed_everything() {
        let gate = EntitlementGate::default();
        let entitlement = pro("u1");
        for language in Language::ALL {
            assert!(gate
                .authorize(language.as_str(), Some(&entitlement))
                .is_allowed());
        }
        assert!(gate.authorize("brainfuck", Some(&entitlement)).is_allowed());
    }

    #[test]
    fn test_configurable_free_tier() {
        let gate = EntitlementGate::new(Language::Python);
        assert!(gate.authorize("python", None).is_allowed());
        assert!(!gate.authorize("javascript", None).is_allowed());
    }

    #[test]
    fn test_authorize_is_pure() {
        let gate = EntitlementGate::default();
        let entitlement = Entitlement::free("u1");
        let first = gate.authorize("go", Some(&entitlement));
        let second = gate.authorize("go", Some(&entitlement));
        assert_eq!(first, second);
    }
}
