//! The ordered checks a "record a read" request passes before it may count.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{Caller, ReadTokenSigner};
use crate::options::CounterOptions;
use crate::store::operations::contents::ContentItem;
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Auth,
    NotFound,
    PolicyExcluded,
    Ineligible,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::NotFound => "not_found",
            Self::PolicyExcluded => "policy_excluded",
            Self::Ineligible => "ineligible",
        }
    }

    /// Deliberate skips are acknowledged to the client like a success.
    pub fn is_silent(self) -> bool {
        matches!(self, Self::PolicyExcluded | Self::Ineligible)
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadRequest {
    pub content_id: u64,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Accept,
    Reject(RejectReason),
}

/// Token, existence, caller policy, eligibility; the first failure wins.
#[derive(Debug, Clone)]
pub struct ReadGate {
    signer: ReadTokenSigner,
    options: CounterOptions,
}

impl ReadGate {
    pub fn new(signer: ReadTokenSigner, options: CounterOptions) -> Self {
        Self { signer, options }
    }

    pub fn signer(&self) -> &ReadTokenSigner {
        &self.signer
    }

    pub fn options(&self) -> &CounterOptions {
        &self.options
    }

    /// `lookup` is only consulted once the token has passed.
    pub fn admit<F>(
        &self,
        request: &ReadRequest,
        caller: &Caller,
        now: DateTime<Utc>,
        lookup: F,
    ) -> Result<GateDecision, StoreError>
    where
        F: FnOnce(u64) -> Result<Option<ContentItem>, StoreError>,
    {
        let token_ok = request
            .token
            .as_deref()
            .is_some_and(|token| self.signer.verify(request.content_id, token, now));
        if !token_ok {
            return Ok(GateDecision::Reject(RejectReason::Auth));
        }

        let Some(item) = lookup(request.content_id)? else {
            return Ok(GateDecision::Reject(RejectReason::NotFound));
        };

        Ok(match self.screen(&item, caller) {
            Some(reason) => GateDecision::Reject(reason),
            None => GateDecision::Accept,
        })
    }

    /// The checks that depend on an existing item; shared with ticket issue.
    pub fn screen(&self, item: &ContentItem, caller: &Caller) -> Option<RejectReason> {
        if self.options.is_excluded(caller) {
            return Some(RejectReason::PolicyExcluded);
        }
        if !self.options.is_eligible(&item.kind) {
            return Some(RejectReason::Ineligible);
        }
        None
    }
}
