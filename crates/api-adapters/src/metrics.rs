//! # Metrics
//!
//! Prometheus counters exposed on `/metrics` in the text exposition format.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabels {
    pub method: String,
    pub status: String,
}

/// Transition target label for slugs missing from the catalog.
pub const UNKNOWN_TARGET: &str = "unknown";

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct TransitionLabels {
    /// A catalog slug or `UNKNOWN_TARGET`, never raw client input
    pub target: String,
    /// `ok` or the error kind
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ModerationLabels {
    pub action: String,
}

pub struct Metrics {
    registry: Registry,
    http_requests: Family<HttpLabels, Counter>,
    transitions: Family<TransitionLabels, Counter>,
    moderation: Family<ModerationLabels, Counter>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("rusty_press");
        let http_requests = Family::<HttpLabels, Counter>::default();
        let transitions = Family::<TransitionLabels, Counter>::default();
        let moderation = Family::<ModerationLabels, Counter>::default();

        registry.register("http_requests", "HTTP requests by method and status", http_requests.clone());
        registry.register("post_transitions", "Post status transitions by target and outcome", transitions.clone());
        registry.register("comment_moderations", "Comment moderation decisions", moderation.clone());

        Self { registry, http_requests, transitions, moderation }
    }

    pub fn record_request(&self, method: &str, status: u16) {
        self.http_requests
            .get_or_create(&HttpLabels { method: method.to_string(), status: status.to_string() })
            .inc();
    }

    pub fn record_transition(&self, target: &str, outcome: &str) {
        self.transitions
            .get_or_create(&TransitionLabels { target: target.to_string(), outcome: outcome.to_string() })
            .inc();
    }

    pub fn record_moderation(&self, action: &str) {
        self.moderation.get_or_create(&ModerationLabels { action: action.to_string() }).inc();
    }

    pub fn render(&self) -> String {
        let mut body = String::new();
        if let Err(e) = encode(&mut body, &self.registry) {
            tracing::error!(error = %e, "failed to encode metrics");
        }
        body
    }
}
