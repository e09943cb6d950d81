//! Turning human-entered references into typed ones.

use crate::{coordinate::Coordinate, event::is_hex, item::TypedReference, PublicKey};
use async_trait::async_trait;
use std::collections::HashMap;

/// Decodes user input and looks up identity claims.
#[async_trait]
pub trait IdentifierResolver: Send + Sync {
    /// Decode `input` into a reference, or `None` when it is not recognized.
    async fn resolve(&self, input: &str) -> Option<TypedReference>;

    /// Look up the key behind an identity claim such as `bob@example.com`.
    async fn resolve_identity_claim(&self, identifier: &str) -> Option<PublicKey>;
}

/// Resolves plain identifiers without any network access.
///
/// Understands
/// - `kind:pubkey:d` coordinates,
/// - 64-char hex keys (as profiles) and `e:<hex>` / `p:<hex>` prefixed forms,
/// - `name@domain` identity claims, answered from a fixed table.
///
/// A leading `nostr:` is ignored.
#[derive(Debug, Clone, Default)]
pub struct DirectResolver {
    claims: HashMap<String, PublicKey>,
}

impl DirectResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer lookups of `identifier` with `pubkey`.
    pub fn with_claim(mut self, identifier: impl Into<String>, pubkey: impl Into<PublicKey>) -> Self {
        self.claims
            .insert(identifier.into().to_lowercase(), pubkey.into());
        self
    }

    fn decode(input: &str) -> Option<TypedReference> {
        let input = input.strip_prefix("nostr:").unwrap_or(input);

        if let Some(id) = input.strip_prefix("e:").filter(|v| is_hex(v, 64)) {
            return Some(TypedReference::Event {
                id: id.to_string(),
                relay_hint: None,
                kind: None,
            });
        }
        if let Some(pubkey) = input.strip_prefix("p:").filter(|v| is_hex(v, 64)) {
            return Some(TypedReference::Profile {
                pubkey: pubkey.to_string(),
                relay_hint: None,
            });
        }
        if is_hex(input, 64) {
            return Some(TypedReference::Profile {
                pubkey: input.to_string(),
                relay_hint: None,
            });
        }
        if let Ok(coordinate) = Coordinate::parse(input) {
            return Some(TypedReference::Address {
                coordinate,
                relay_hint: None,
            });
        }
        if let Some((name, domain)) = input.split_once('@') {
            if !name.is_empty() && domain.contains('.') && !domain.contains('@') {
                return Some(TypedReference::IdentityClaim {
                    identifier: input.to_lowercase(),
                });
            }
        }
        None
    }
}

#[async_trait]
impl IdentifierResolver for DirectResolver {
    async fn resolve(&self, input: &str) -> Option<TypedReference> {
        Self::decode(input.trim())
    }

    async fn resolve_identity_claim(&self, identifier: &str) -> Option<PublicKey> {
        self.claims.get(&identifier.trim().to_lowercase()).cloned()
    }
}
