//! Token lifecycle, swap state machine, authorization and per-key
//! locking. This is the core of the server. Everything here operates
//! on the domain model in `src/model.rs` over the two stores in
//! `src/kv.rs`; `src/http.rs` is the only caller and owns all
//! wire-format framing.

use crate::error::{Error, Result};
use crate::hashing::{decode_token, encode_token, generate_raw_token, sha256d};
use crate::kv::Stores;
use crate::model::{SwapRecord, SwapStatus, TokenRecord, TokenStatus};
use borsh::BorshDeserialize;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, OwnedMutexGuard};

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn parse_swap_key(hex_str: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_str).map_err(|_| Error::SwapInvalid)?;
    <[u8; 32]>::try_from(bytes).map_err(|_| Error::SwapInvalid)
}

fn get_token_record(stores: &Stores, key: &[u8; 32]) -> Result<Option<TokenRecord>> {
    match stores.tokens.get(key)? {
        None => Ok(None),
        Some(bytes) => Ok(Some(
            TokenRecord::try_from_slice(&bytes).map_err(|e| Error::Storage(e.to_string()))?,
        )),
    }
}

fn get_swap_record(stores: &Stores, key: &[u8; 32]) -> Result<Option<SwapRecord>> {
    match stores.swaps.get(key)? {
        None => Ok(None),
        Some(bytes) => Ok(Some(
            SwapRecord::try_from_slice(&bytes).map_err(|e| Error::Storage(e.to_string()))?,
        )),
    }
}

fn put_token_record(stores: &Stores, key: &[u8; 32], record: &TokenRecord) -> Result<()> {
    let bytes = borsh::to_vec(record).map_err(|e| Error::UpdateToken(e.to_string()))?;
    stores
        .tokens
        .put(key, &bytes)
        .map_err(|e| Error::UpdateToken(e.to_string()))
}

fn put_swap_record(stores: &Stores, key: &[u8; 32], record: &SwapRecord) -> Result<()> {
    let bytes = borsh::to_vec(record).map_err(|e| Error::UpdateSwap(e.to_string()))?;
    stores
        .swaps
        .put(key, &bytes)
        .map_err(|e| Error::UpdateSwap(e.to_string()))
}

/// Response shape for `/get_initiator_info`.
pub struct InitiatorInfo {
    pub initiator_address: Option<String>,
    pub initiate_contract: Option<String>,
    pub initiate_raw_transaction: Option<String>,
    pub token_hash: [u8; 32],
}

/// Response shape for `/get_participator_info`.
pub struct ParticipatorInfo {
    pub participate_contract: Option<String>,
    pub participate_raw_transaction: Option<String>,
}

/// One entry of `/get_swap_list`, keyed by the swap key's hex encoding.
pub struct SwapListing {
    pub key_hex: String,
    pub initiator_currency: Option<String>,
    pub initiator_receive_amount: Option<i64>,
    pub participator_currency: Option<String>,
    pub participator_receive_amount: Option<i64>,
    pub participator_address: Option<String>,
}

/// Token lifecycle, swap state machine and pre-image extraction over
/// two shared [`Stores`], guarded by a per-swap-key lock table.
pub struct Coordinator {
    stores: Stores,
    locks: DashMap<[u8; 32], Arc<Mutex<()>>>,
}

impl Coordinator {
    pub fn new(stores: Stores) -> Self {
        Self {
            stores,
            locks: DashMap::new(),
        }
    }

    fn lock_handle(&self, key: [u8; 32]) -> Arc<Mutex<()>> {
        self.locks.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    async fn lock_one(&self, key: [u8; 32]) -> OwnedMutexGuard<()> {
        self.lock_handle(key).lock_owned().await
    }

    /// Acquire the locks for both `a` and `b` in ascending byte order,
    /// so a concurrent call racing on the same pair never deadlocks.
    async fn lock_two(&self, a: [u8; 32], b: [u8; 32]) -> (OwnedMutexGuard<()>, OwnedMutexGuard<()>) {
        if a == b {
            let only = self.lock_one(a).await;
            // The caller only needs mutual exclusion on the single key;
            // a second guard on the same mutex would deadlock, so hand
            // back a guard on a private placeholder lock instead.
            let placebo = Arc::new(Mutex::new(()));
            let placebo_guard = placebo.lock_owned().await;
            return (only, placebo_guard);
        }
        if a < b {
            let first = self.lock_one(a).await;
            let second = self.lock_one(b).await;
            (first, second)
        } else {
            let second = self.lock_one(b).await;
            let first = self.lock_one(a).await;
            (first, second)
        }
    }

    /// Decode and hash `token`, look it up, and check its role and use
    /// state. Returns the hashed token on success.
    fn check_token(
        &self,
        token: &str,
        expected_roles: &[TokenStatus],
        used_is_error: bool,
    ) -> Result<[u8; 32]> {
        let raw = decode_token(token)?;
        let hashed = sha256d(&raw);
        let record = get_token_record(&self.stores, &hashed)?.ok_or(Error::TokenInvalid)?;

        if !expected_roles.contains(&record.status) {
            return Err(Error::TokenStatusInvalid);
        }

        if used_is_error && get_swap_record(&self.stores, &hashed)?.is_some() {
            return Err(Error::TokenUsed);
        }

        Ok(hashed)
    }

    fn require_swap(&self, key: &[u8; 32], required: SwapStatus) -> Result<SwapRecord> {
        let record = get_swap_record(&self.stores, key)?.ok_or(Error::SwapInvalid)?;
        if record.status != required {
            return Err(Error::SwapProgress);
        }
        Ok(record)
    }

    fn set_token_role(&self, hashed: &[u8; 32], role: TokenStatus) -> Result<()> {
        let mut record = get_token_record(&self.stores, hashed)?.ok_or(Error::TokenInvalid)?;
        record.status = role;
        put_token_record(&self.stores, hashed, &record)
    }

    /// `GET /get_token/`: mint a fresh capability token.
    pub fn get_token(&self) -> Result<(String, i64)> {
        let raw = generate_raw_token();
        let hashed = sha256d(&raw);
        let created_at = now();
        put_token_record(&self.stores, &hashed, &TokenRecord::new(created_at))?;
        Ok((encode_token(&raw), created_at))
    }

    /// `POST /verify_token/`: never fails. An undecodable or unknown
    /// token simply reports `exists: false`.
    pub fn verify_token(&self, token: &str) -> (bool, Option<i64>) {
        let Ok(raw) = decode_token(token) else {
            return (false, None);
        };
        let hashed = sha256d(&raw);
        match get_token_record(&self.stores, &hashed) {
            Ok(Some(record)) => (true, Some(record.created_at)),
            _ => (false, None),
        }
    }

    /// `POST /register_swap/`.
    pub async fn register_swap(
        &self,
        token: &str,
        want_currency: String,
        want_amount: i64,
        send_currency: String,
        send_amount: i64,
        receive_address: String,
    ) -> Result<()> {
        let hashed = self.check_token(token, &[TokenStatus::NotUsed], true)?;
        let _guard = self.lock_one(hashed).await;

        // Re-check under the lock: another request may have consumed
        // this token between `check_token` and the lock being granted.
        self.check_token(token, &[TokenStatus::NotUsed], true)?;

        self.set_token_role(&hashed, TokenStatus::Participator)?;
        let record = SwapRecord::register(
            want_currency,
            want_amount,
            send_currency,
            send_amount,
            receive_address,
        );
        put_swap_record(&self.stores, &hashed, &record)?;
        log::info!("swap {}: REGISTERED", hex::encode(hashed));
        Ok(())
    }

    /// `POST /initiate_swap/`.
    pub async fn initiate_swap(
        &self,
        token: &str,
        selected_swap_hex: &str,
        contract: String,
        raw_transaction: String,
        receive_address: String,
    ) -> Result<()> {
        let hashed = self.check_token(token, &[TokenStatus::NotUsed], true)?;
        let swap_key = parse_swap_key(selected_swap_hex)?;
        let (_g1, _g2) = self.lock_two(hashed, swap_key).await;

        self.check_token(token, &[TokenStatus::NotUsed], true)?;
        let mut record = self.require_swap(&swap_key, SwapStatus::Registered)?;

        self.set_token_role(&hashed, TokenStatus::Initiator)?;
        record.status = SwapStatus::Initiated;
        record.i_contract = Some(contract);
        record.i_raw_tx = Some(raw_transaction);
        record.i_addr = Some(receive_address);
        record.i_token_hash = Some(hashed);
        put_swap_record(&self.stores, &swap_key, &record)?;
        log::info!(
            "swap {}: REGISTERED -> INITIATED (initiator {})",
            hex::encode(swap_key),
            hex::encode(hashed)
        );
        Ok(())
    }

    /// `POST /get_initiator_info/`.
    pub fn get_initiator_info(&self, token: &str) -> Result<InitiatorInfo> {
        let hashed = self.check_token(token, &[TokenStatus::Participator], false)?;
        let record = get_swap_record(&self.stores, &hashed)?.ok_or(Error::SwapInvalid)?;
        if record.status == SwapStatus::Registered {
            return Err(Error::SwapProgress);
        }
        let token_hash = record.i_token_hash.ok_or(Error::SwapProgress)?;
        Ok(InitiatorInfo {
            initiator_address: record.i_addr,
            initiate_contract: record.i_contract,
            initiate_raw_transaction: record.i_raw_tx,
            token_hash,
        })
    }

    /// `POST /participate_swap/`.
    pub async fn participate_swap(
        &self,
        token: &str,
        raw_transaction: String,
        contract: String,
    ) -> Result<()> {
        let hashed = self.check_token(token, &[TokenStatus::Participator], false)?;
        let _guard = self.lock_one(hashed).await;

        let mut record = self.require_swap(&hashed, SwapStatus::Initiated)?;
        record.status = SwapStatus::Participated;
        record.p_contract = Some(contract);
        record.p_raw_tx = Some(raw_transaction);
        put_swap_record(&self.stores, &hashed, &record)?;
        log::info!("swap {}: INITIATED -> PARTICIPATED", hex::encode(hashed));
        Ok(())
    }

    /// `GET /get_participator_info/`.
    pub fn get_participator_info(&self, token: &str, selected_swap_hex: &str) -> Result<ParticipatorInfo> {
        self.check_token(token, &[TokenStatus::Initiator], false)?;
        let swap_key = parse_swap_key(selected_swap_hex)?;
        let record = get_swap_record(&self.stores, &swap_key)?.ok_or(Error::SwapInvalid)?;
        if record.status < SwapStatus::Participated {
            return Err(Error::SwapProgress);
        }
        Ok(ParticipatorInfo {
            participate_contract: record.p_contract,
            participate_raw_transaction: record.p_raw_tx,
        })
    }

    /// `POST /redeem_swap/`.
    pub async fn redeem_swap(
        &self,
        token: &str,
        selected_swap_hex: &str,
        raw_transaction: String,
    ) -> Result<()> {
        self.check_token(token, &[TokenStatus::Initiator], false)?;
        let swap_key = parse_swap_key(selected_swap_hex)?;
        let _guard = self.lock_one(swap_key).await;

        let mut record = self.require_swap(&swap_key, SwapStatus::Participated)?;
        record.status = SwapStatus::Redeemed;
        record.i_redeem_raw_tx = Some(raw_transaction);
        put_swap_record(&self.stores, &swap_key, &record)?;
        log::info!("swap {}: PARTICIPATED -> REDEEMED", hex::encode(swap_key));
        Ok(())
    }

    /// `POST /get_redeem_token/`: extract the initiator's raw token
    /// from the redeem transaction it revealed on-chain.
    pub fn get_redeem_token(&self, token: &str) -> Result<String> {
        let hashed = self.check_token(token, &[TokenStatus::Participator], false)?;
        let record = self.require_swap(&hashed, SwapStatus::Redeemed)?;
        let redeem_raw_tx = record.i_redeem_raw_tx.ok_or(Error::FatalError)?;
        let token_hash = record.i_token_hash.ok_or(Error::FatalError)?;
        let preimage = crate::script::extract_preimage(&redeem_raw_tx, &token_hash)?;
        Ok(hex::encode(preimage))
    }

    /// `POST /complete_swap/`.
    pub async fn complete_swap(&self, token: &str, raw_transaction: String) -> Result<()> {
        let hashed = self.check_token(token, &[TokenStatus::Participator], false)?;
        let _guard = self.lock_one(hashed).await;

        let mut record = self.require_swap(&hashed, SwapStatus::Redeemed)?;
        record.status = SwapStatus::Completed;
        record.p_redeem_raw_tx = Some(raw_transaction);
        put_swap_record(&self.stores, &hashed, &record)?;
        log::info!("swap {}: REDEEMED -> COMPLETED", hex::encode(hashed));
        Ok(())
    }

    /// `GET /get_swap_list/`: every REGISTERED swap, keyed by hex.
    pub fn get_swap_list(&self) -> Result<Vec<SwapListing>> {
        let mut out = Vec::new();
        for (key, value) in self.stores.swaps.scan_all()? {
            let record =
                SwapRecord::try_from_slice(&value).map_err(|e| Error::Storage(e.to_string()))?;
            if record.status != SwapStatus::Registered {
                continue;
            }
            out.push(SwapListing {
                key_hex: hex::encode(&key),
                initiator_currency: record.i_currency,
                initiator_receive_amount: record.i_receive_amount,
                participator_currency: record.p_currency,
                participator_receive_amount: record.p_receive_amount,
                participator_address: record.p_addr,
            });
        }
        Ok(out)
    }

    /// Startup reconciliation: the token-role flip and the swap write
    /// it gates are not committed atomically (§9), so a crash between
    /// the two can leave a token's role behind what its swap record
    /// implies. Walk every swap and correct any drift found.
    pub fn reconcile(&self) -> Result<()> {
        for (key, value) in self.stores.swaps.scan_all()? {
            let participator_key: [u8; 32] = match key.as_slice().try_into() {
                Ok(k) => k,
                Err(_) => continue,
            };
            let record =
                SwapRecord::try_from_slice(&value).map_err(|e| Error::Storage(e.to_string()))?;

            self.reconcile_role(&participator_key, TokenStatus::Participator)?;
            if let Some(initiator_key) = record.i_token_hash {
                self.reconcile_role(&initiator_key, TokenStatus::Initiator)?;
            }
        }
        Ok(())
    }

    fn reconcile_role(&self, key: &[u8; 32], expected: TokenStatus) -> Result<()> {
        match get_token_record(&self.stores, key)? {
            None => {
                log::warn!("reconcile: swap references unknown token {}", hex::encode(key));
                put_token_record(&self.stores, key, &TokenRecord { created_at: now(), status: expected })
            }
            Some(record) if record.status != expected => {
                log::warn!(
                    "reconcile: token {} had status {:?}, forcing {:?}",
                    hex::encode(key),
                    record.status,
                    expected
                );
                put_token_record(&self.stores, key, &TokenRecord { status: expected, ..record })
            }
            Some(_) => Ok(()),
        }
    }
}
