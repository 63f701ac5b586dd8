//! # jedi-core
//!
//! The client-side engine of the JEDI hierarchical end-to-end encryption
//! protocol: URI+timestamp pattern matching, a delta-attribute-reusing
//! WKD-IBE encapsulation cache, a delegation builder computing the minimal
//! covering set of time-range keys, and deterministic wire marshalling.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use jedi_core::{
//!     Cancellation, ClientConfig, ClientState, DefaultPatternEncoder,
//!     InMemoryKeyStore, MockWkdIbeProvider, Permissions, WkdIbeProvider,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let provider = Arc::new(MockWkdIbeProvider::new());
//! let store = Arc::new(InMemoryKeyStore::new());
//!
//! let hierarchy = b"example.org";
//! let params = provider.setup(hierarchy).unwrap();
//! store.seed_params(hierarchy, params.clone()).await;
//!
//! let client = ClientState::new(
//!     ClientConfig::default(),
//!     Arc::new(DefaultPatternEncoder::new(8)),
//!     store,
//!     provider,
//! );
//!
//! let cancel = Cancellation::new();
//! let now = chrono::Utc::now();
//! let ciphertext = client
//!     .encrypt(&cancel, hierarchy, "building1/floor2/temp", now, b"21C")
//!     .await;
//! assert!(ciphertext.is_ok());
//! # let _ = Permissions::DECRYPT;
//! # }
//! ```
//!
//! ## What's NOT provided
//!
//! - A real WKD-IBE/pairing implementation — consumed only through
//!   [`WkdIbeProvider`]. [`MockWkdIbeProvider`] is a test double, not
//!   suitable for production use.
//! - A persistent key store — consumed only through [`KeyStoreReader`].
//!   [`InMemoryKeyStore`] is a test double.
//! - Transport/pub-sub plumbing, signing-key management, or revocation.

#![deny(unsafe_code)]

mod cache;
mod cancel;
mod client;
mod config;
mod delegation;
mod encoder;
mod entry;
mod error;
mod ibe;
mod keystore;
mod pattern;
mod symmetric;
mod time;
mod uri;
pub mod wire;

pub use cancel::Cancellation;
pub use client::ClientState;
pub use config::{ClientConfig, EntryByteCosts};
pub use delegation::{build_pattern_list, Delegation};
pub use encoder::{DefaultPatternEncoder, PatternEncoder, PermissionKind, Permissions};
pub use error::{JediError, Result, TimeError, UriError};
pub use ibe::{
    Encapsulation, GroupElement, MockWkdIbeProvider, PreparedAttributeList, PublicParams,
    SecretKey, WkdIbeProvider, ENCRYPTED_KEY_SIZE, SYMMETRIC_KEY_LEN,
};
pub use keystore::{InMemoryKeyStore, KeyStoreReader};
pub use pattern::{Attribute, Pattern, Slot};
pub use time::{range, TimeComponent, TimePath};
pub use uri::UriPath;
