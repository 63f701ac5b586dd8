//! Client configuration: cache capacity and byte-accounting constants
//! (spec §5, §9 "Cache byte accounting").

use crate::encoder::Permissions;

/// Conservative, fixed per-kind byte costs used for LRU accounting. Spec
/// §9: "Entry sizes are fixed at allocation time ... no attempt is made
/// to update accounting when entries are populated."
#[derive(Debug, Clone, Copy)]
pub struct EntryByteCosts {
    pub params_entry: u64,
    pub encryption_entry: u64,
    pub decryption_entry: u64,
}

impl Default for EntryByteCosts {
    fn default() -> Self {
        // Conservative fixed sizes for the mutable entry wrappers,
        // generous enough to cover a populated entry's embedded crypto
        // objects without ever needing to be revised mid-lifetime.
        EntryByteCosts {
            params_entry: 256,
            encryption_entry: 512,
            decryption_entry: 128,
        }
    }
}

/// Per-process configuration for a [`crate::client::ClientState`].
#[derive(Debug, Clone, Copy)]
pub struct ClientConfig {
    /// Total LRU capacity, in bytes, shared by all three key families.
    pub cache_capacity_bytes: u64,
    pub entry_byte_costs: EntryByteCosts,
    /// Permission set used when a caller doesn't specify one explicitly.
    pub default_permissions: Permissions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            cache_capacity_bytes: 64 * 1024 * 1024,
            entry_byte_costs: EntryByteCosts::default(),
            default_permissions: Permissions::DECRYPT,
        }
    }
}
