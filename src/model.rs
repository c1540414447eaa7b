//! Domain model: capability tokens and swap records.
//!
//! Both [`TokenRecord`] and [`SwapRecord`] derive `borsh` for the
//! canonical on-disk encoding (see `src/kv.rs`) and `serde` for the
//! handful of places the coordinator reaches directly into a field for
//! an HTTP response.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Role a capability token has been assigned, if any.
///
/// Declaration order is significant: `borsh` encodes enum variants by
/// declaration index, and that index must match the wire values
/// `NOT_USED=0, INITIATOR=1, PARTICIPATOR=2` from the specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum TokenStatus {
    NotUsed,
    Initiator,
    Participator,
}

/// Status of a swap record, monotone along the success path.
///
/// Declaration order again doubles as the wire/borsh discriminant:
/// `REGISTERED=0 .. CANCELED=5`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum SwapStatus {
    Registered,
    Initiated,
    Participated,
    Redeemed,
    Completed,
    /// Reachable only through an out-of-band administrative path; no
    /// endpoint in this server transitions a swap into this state.
    Canceled,
}

/// Record stored under a hashed token in the `tokens` tree.
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Unix seconds at issuance.
    pub created_at: i64,
    pub status: TokenStatus,
}

impl TokenRecord {
    pub fn new(created_at: i64) -> Self {
        Self {
            created_at,
            status: TokenStatus::NotUsed,
        }
    }
}

/// Record stored under a swap key (the participator's hashed token) in
/// the `swaps` tree.
///
/// Field naming follows the specification's inversion: a field
/// prefixed `i_` belongs to the initiator, `p_` to the participator.
/// At registration the participator declares what it *wants* (which
/// becomes the initiator's side) and what it *sends* (its own side),
/// so e.g. `i_currency` is populated from the participator's
/// `wantCurrency` even though no initiator has shown up yet.
#[derive(Debug, Clone, Default, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct SwapRecord {
    pub i_currency: Option<String>,
    pub i_receive_amount: Option<i64>,
    pub i_addr: Option<String>,
    pub i_token_hash: Option<[u8; 32]>,
    pub i_contract: Option<String>,
    pub i_raw_tx: Option<String>,
    pub i_redeem_raw_tx: Option<String>,

    pub p_currency: Option<String>,
    pub p_receive_amount: Option<i64>,
    pub p_addr: Option<String>,
    pub p_contract: Option<String>,
    pub p_raw_tx: Option<String>,
    pub p_redeem_raw_tx: Option<String>,

    pub status: SwapStatus,
}

impl Default for SwapStatus {
    fn default() -> Self {
        SwapStatus::Registered
    }
}

impl SwapRecord {
    /// Build the REGISTERED record written by `register_swap`.
    ///
    /// `want_currency`/`send_amount` land on the initiator side and
    /// `send_currency`/`want_amount` on the participator side. This is
    /// the naming inversion from §3.2.
    pub fn register(
        want_currency: String,
        want_amount: i64,
        send_currency: String,
        send_amount: i64,
        receive_address: String,
    ) -> Self {
        Self {
            i_currency: Some(want_currency),
            i_receive_amount: Some(send_amount),
            p_currency: Some(send_currency),
            p_receive_amount: Some(want_amount),
            p_addr: Some(receive_address),
            status: SwapStatus::Registered,
            ..Default::default()
        }
    }
}
