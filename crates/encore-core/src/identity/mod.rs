//! Identity domain types shared by the authentication flows.

mod secret;

pub use secret::Secret;

use std::fmt;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Protocol public identity, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pubkey(String);

impl Pubkey {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into().to_lowercase())
    }

    /// Random identity; used by tests and in-memory adapters.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Pubkey {
    fn from(hex: &str) -> Self {
        Self::new(hex)
    }
}

/// Account handle at the centralized identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalUser {
    /// Stable provider-side account id.
    pub uid: String,
    pub email: String,
}

/// User profile as staged during a flow and published afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    pub name: String,
    pub display_name: Option<String>,
    pub about: Option<String>,
    pub picture: Option<String>,
    pub lightning_address: Option<String>,
}

/// Durable association between an external account and a protocol keypair.
///
/// Persisted by the link directory; read-only from the state machines'
/// perspective except for the explicit "create link" side effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedKeypair {
    pub pubkey: Pubkey,
    pub profile: Option<ProfileData>,
    #[serde(default)]
    pub is_primary: bool,
    pub linked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_most_recently_linked: bool,
}

impl LinkedKeypair {
    pub fn new(pubkey: Pubkey) -> Self {
        Self {
            pubkey,
            profile: None,
            is_primary: false,
            linked_at: None,
            is_most_recently_linked: false,
        }
    }

    /// Select the entry the user is expected to authenticate with.
    ///
    /// Prefers the directory's own most-recent marker, falls back to the
    /// newest `linked_at`, then to the last entry returned.
    pub fn most_recently_linked(keys: &[LinkedKeypair]) -> Option<&LinkedKeypair> {
        if let Some(marked) = keys.iter().find(|key| key.is_most_recently_linked) {
            return Some(marked);
        }
        if let Some(newest) = keys
            .iter()
            .filter(|key| key.linked_at.is_some())
            .max_by_key(|key| key.linked_at)
        {
            return Some(newest);
        }
        keys.last()
    }
}

/// Authenticated protocol account. The signer stays behind the
/// authentication port; only the public identity travels through flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NostrAccount {
    pub pubkey: Pubkey,
    pub profile: Option<ProfileData>,
}

/// Generated keypair-backed identity that is not yet the active session.
///
/// Must not be treated as an authenticated session until an explicit
/// activation call runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCredential {
    pub id: Uuid,
    pub pubkey: Pubkey,
    pub generated_name: String,
}

/// Signed assertion of keypair control, bound to an external account id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkingProof {
    pub pubkey: Pubkey,
    pub external_account_id: String,
    pub signature: String,
    pub signed_at: DateTime<Utc>,
}

/// Credential methods the keypair authenticator may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    /// Browser-extension-mediated signing.
    Extension,
    /// Raw private key supplied by the user.
    RawKey,
    /// Remote-signer ("bunker") delegation.
    RemoteSigner,
}

/// Credentials matching an [`AuthMethod`].
#[derive(Debug, Clone)]
pub enum AuthCredentials {
    Extension,
    RawKey(Secret),
    RemoteSigner { uri: String },
}

/// Which flow branch a generated display name is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameHint {
    Listener,
    SoloArtist,
    Band,
    /// Identity generated while migrating a legacy account.
    Migrated,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn pubkey_normalizes_to_lowercase() {
        let key = Pubkey::new("ABCDEF012345");
        assert_eq!(key.as_hex(), "abcdef012345");
    }

    #[test]
    fn generated_pubkeys_are_distinct() {
        assert_ne!(Pubkey::generate(), Pubkey::generate());
    }

    #[test]
    fn most_recently_linked_prefers_directory_marker() {
        let mut a = LinkedKeypair::new(Pubkey::new("aa"));
        a.linked_at = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let mut b = LinkedKeypair::new(Pubkey::new("bb"));
        b.is_most_recently_linked = true;

        let keypairs = [a, b];
        let picked = LinkedKeypair::most_recently_linked(&keypairs).unwrap();
        assert_eq!(picked.pubkey, Pubkey::new("bb"));
    }

    #[test]
    fn most_recently_linked_falls_back_to_newest_timestamp() {
        let mut a = LinkedKeypair::new(Pubkey::new("aa"));
        a.linked_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let mut b = LinkedKeypair::new(Pubkey::new("bb"));
        b.linked_at = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());

        let keypairs = [a, b];
        let picked = LinkedKeypair::most_recently_linked(&keypairs).unwrap();
        assert_eq!(picked.pubkey, Pubkey::new("bb"));
    }

    #[test]
    fn most_recently_linked_of_empty_is_none() {
        assert!(LinkedKeypair::most_recently_linked(&[]).is_none());
    }

    #[test]
    fn profile_data_serializes_with_camel_case_keys() {
        let profile = ProfileData {
            name: "alice".to_string(),
            display_name: Some("Alice".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["name"], "alice");
        assert_eq!(json["displayName"], "Alice");
    }
}
