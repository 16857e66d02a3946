//! Relay router: delivers envelopes to the workflow webhooks.
//!
//! Delivery is fire-and-forget. One attempt per envelope; failures are
//! logged and never retried or propagated.

use std::fmt;
use std::str::FromStr;

use relay_models::MessageEnvelope;
use tracing::{debug, info, warn};
use url::Url;

/// What happens to envelopes built from self-sent messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelfSentRouting {
    /// Deliver to the human-takeover webhook.
    #[default]
    Takeover,
    /// Do not relay them at all.
    Drop,
}

impl FromStr for SelfSentRouting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "takeover" => Ok(SelfSentRouting::Takeover),
            "drop" => Ok(SelfSentRouting::Drop),
            other => Err(format!(
                "invalid self-sent routing '{}', expected takeover or drop",
                other
            )),
        }
    }
}

/// Webhook an envelope is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayTarget {
    /// The primary inbound webhook.
    Primary,
    /// The human-takeover webhook.
    HumanTakeover,
}

impl fmt::Display for RelayTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayTarget::Primary => f.write_str("primary"),
            RelayTarget::HumanTakeover => f.write_str("human_takeover"),
        }
    }
}

/// Picks the single target for an envelope, or none when self-sent
/// envelopes are dropped.
pub fn route(envelope: &MessageEnvelope, routing: SelfSentRouting) -> Option<RelayTarget> {
    match (envelope.is_self_sent(), routing) {
        (false, _) => Some(RelayTarget::Primary),
        (true, SelfSentRouting::Takeover) => Some(RelayTarget::HumanTakeover),
        (true, SelfSentRouting::Drop) => None,
    }
}

/// Posts envelopes to their webhook.
#[derive(Debug, Clone)]
pub struct RelayRouter {
    http: reqwest::Client,
    primary: Option<Url>,
    takeover: Option<Url>,
    routing: SelfSentRouting,
}

impl RelayRouter {
    /// `http` should carry the relay timeout.
    pub fn new(
        http: reqwest::Client,
        primary: Option<Url>,
        takeover: Option<Url>,
        routing: SelfSentRouting,
    ) -> Self {
        Self {
            http,
            primary,
            takeover,
            routing,
        }
    }

    fn endpoint(&self, target: RelayTarget) -> Option<&Url> {
        match target {
            RelayTarget::Primary => self.primary.as_ref(),
            RelayTarget::HumanTakeover => self.takeover.as_ref(),
        }
    }

    /// Delivers the envelope once. Returns the target that accepted it.
    pub async fn deliver(&self, envelope: &MessageEnvelope) -> Option<RelayTarget> {
        let Some(target) = route(envelope, self.routing) else {
            debug!(message_id = %envelope.message_id, "self-sent envelope dropped");
            return None;
        };
        let Some(url) = self.endpoint(target) else {
            warn!(
                message_id = %envelope.message_id,
                target = %target,
                "no webhook configured for target, envelope not relayed"
            );
            return None;
        };

        match self.http.post(url.clone()).json(envelope).send().await {
            Ok(response) if response.status().is_success() => {
                info!(
                    message_id = %envelope.message_id,
                    target = %target,
                    kind = envelope.content.kind(),
                    "envelope relayed"
                );
                Some(target)
            }
            Ok(response) => {
                warn!(
                    message_id = %envelope.message_id,
                    target = %target,
                    status = %response.status(),
                    "webhook rejected envelope"
                );
                None
            }
            Err(e) => {
                warn!(
                    message_id = %envelope.message_id,
                    target = %target,
                    error = %e,
                    "webhook unreachable"
                );
                None
            }
        }
    }
}
