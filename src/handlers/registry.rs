//! Handler registry — the static `Intent → Handler` table.
//!
//! Provides:
//! - Lookup by intent (exact match; the router never guesses)
//! - Allowlist filtering from the `enabled_intents` config
//! - The list of served intents, used to build the classifier prompt

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::Handler;
use crate::agent_core::types::Intent;

// ─── HandlerRegistry ────────────────────────────────────────────────────────

/// Registered handlers keyed by the intent they serve.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<Intent, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own intent, replacing any previous one.
    ///
    /// `Unknown` and `Error` are routing outcomes, not operations, and are
    /// refused.
    pub fn register(&mut self, handler: Arc<dyn Handler>) {
        let intent = handler.intent();
        if matches!(intent, Intent::Unknown | Intent::Error) {
            tracing::warn!(%intent, "refusing to register handler for routing-only intent");
            return;
        }
        if self.handlers.insert(intent, handler).is_some() {
            tracing::debug!(%intent, "replaced existing handler");
        }
    }

    pub fn get(&self, intent: Intent) -> Option<&Arc<dyn Handler>> {
        self.handlers.get(&intent)
    }

    pub fn contains(&self, intent: Intent) -> bool {
        self.handlers.contains_key(&intent)
    }

    /// Served intents in declaration order.
    pub fn intents(&self) -> Vec<Intent> {
        self.handlers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Retain only handlers whose intent label appears in the allowlist.
    ///
    /// Unrecognised labels in the allowlist are logged and ignored.
    pub fn retain_intents(&mut self, allowed: &HashSet<String>) {
        for label in allowed {
            if Intent::parse(label).is_none() {
                tracing::warn!(label = %label, "enabled_intents names an unknown intent");
            }
        }
        let before = self.handlers.len();
        self.handlers
            .retain(|intent, _| allowed.contains(intent.as_str()));
        let after = self.handlers.len();
        tracing::info!(
            before,
            after,
            "filtered handler registry by enabled_intents allowlist"
        );
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_core::types::Parameters;
    use crate::handlers::HandlerError;
    use async_trait::async_trait;
    use serde_json::Value;

    struct Stub(Intent);

    #[async_trait]
    impl Handler for Stub {
        fn intent(&self) -> Intent {
            self.0
        }
        fn description(&self) -> &'static str {
            "stub"
        }
        async fn call(&self, _params: &Parameters) -> Result<Value, HandlerError> {
            Ok(Value::Null)
        }
    }

    fn registry() -> HandlerRegistry {
        let mut r = HandlerRegistry::new();
        r.register(Arc::new(Stub(Intent::UserInfo)));
        r.register(Arc::new(Stub(Intent::Vote)));
        r.register(Arc::new(Stub(Intent::SubredditPosts)));
        r
    }

    #[test]
    fn test_register_and_lookup() {
        let r = registry();
        assert_eq!(r.len(), 3);
        assert!(r.contains(Intent::Vote));
        assert!(r.get(Intent::RedditSearch).is_none());
        assert_eq!(
            r.intents(),
            vec![Intent::UserInfo, Intent::SubredditPosts, Intent::Vote]
        );
    }

    #[test]
    fn test_routing_only_intents_refused() {
        let mut r = HandlerRegistry::new();
        r.register(Arc::new(Stub(Intent::Unknown)));
        r.register(Arc::new(Stub(Intent::Error)));
        assert!(r.is_empty());
    }

    #[test]
    fn test_retain_intents() {
        let mut r = registry();
        let allowed: HashSet<String> = ["user_info", "vote", "bogus"]
            .into_iter()
            .map(String::from)
            .collect();
        r.retain_intents(&allowed);
        assert_eq!(r.intents(), vec![Intent::UserInfo, Intent::Vote]);
    }
}
