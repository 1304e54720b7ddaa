use std::fmt;
use std::sync::Arc;

use crate::auth::Caller;
use crate::config::CountingConfig;
use crate::period::BreakdownPeriods;

/// Decides whether a caller's reads are skipped on purpose.
pub type PolicyPredicate = Arc<dyn Fn(&Caller) -> bool + Send + Sync>;

/// Everything a host can tune about counting, fixed at service construction.
#[derive(Clone)]
pub struct CounterOptions {
    pub policy_excluded: PolicyPredicate,
    pub eligible_types: Vec<String>,
    pub cooldown_ms: u64,
    pub breakdown_periods: BreakdownPeriods,
}

impl CounterOptions {
    pub fn from_config(config: &CountingConfig) -> Self {
        Self {
            policy_excluded: default_policy(
                config.exclude_authenticated,
                config.excluded_capability.clone(),
            ),
            eligible_types: config
                .eligible_types
                .iter()
                .map(|kind| kind.to_ascii_lowercase())
                .collect(),
            cooldown_ms: config.cooldown_ms,
            breakdown_periods: BreakdownPeriods::from_names(&config.breakdown_periods),
        }
    }

    pub fn with_policy<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Caller) -> bool + Send + Sync + 'static,
    {
        self.policy_excluded = Arc::new(predicate);
        self
    }

    pub fn is_excluded(&self, caller: &Caller) -> bool {
        (self.policy_excluded)(caller)
    }

    pub fn is_eligible(&self, kind: &str) -> bool {
        self.eligible_types
            .iter()
            .any(|eligible| eligible.eq_ignore_ascii_case(kind))
    }
}

impl Default for CounterOptions {
    fn default() -> Self {
        Self::from_config(&CountingConfig::default())
    }
}

impl fmt::Debug for CounterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CounterOptions")
            .field("policy_excluded", &"<predicate>")
            .field("eligible_types", &self.eligible_types)
            .field("cooldown_ms", &self.cooldown_ms)
            .field("breakdown_periods", &self.breakdown_periods)
            .finish()
    }
}

/// Signed-in callers (optionally) and holders of one capability are not counted.
pub fn default_policy(
    exclude_authenticated: bool,
    excluded_capability: Option<String>,
) -> PolicyPredicate {
    Arc::new(move |caller: &Caller| {
        if exclude_authenticated && caller.is_authenticated() {
            return true;
        }
        excluded_capability
            .as_deref()
            .is_some_and(|capability| caller.has_capability(capability))
    })
}
