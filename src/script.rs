//! HTLC redeem pre-image extraction.
//!
//! Mirrors the on-chain HTLC redeem path: the redeemer reveals the
//! pre-image (the initiator's raw token) in the input that spends the
//! contract output, either as a literal `scriptSig` push (legacy) or
//! as a witness stack element (segwit). No script is evaluated and no
//! signature is checked. Only a hash comparison over candidate pushes,
//! exactly as specified in §4.5.

use crate::error::{Error, Result};
use crate::hashing::sha256d;
use bitcoin::consensus::deserialize;
use bitcoin::{ScriptBuf, Transaction};

/// Find the raw token hidden in `redeem_tx`'s unlocking data whose
/// `sha256d` equals `committed_hash`.
///
/// Scans every input's `scriptSig` (as a sequence of pushed data
/// items) and every input's witness stack (each element taken as a
/// candidate directly). Returns the first match found, scanning inputs
/// in order and, within an input, `scriptSig` pushes before witness
/// elements.
pub fn extract_preimage(redeem_tx_hex: &str, committed_hash: &[u8; 32]) -> Result<Vec<u8>> {
    let raw = hex::decode(redeem_tx_hex)
        .map_err(|e| Error::Bitcoin(format!("invalid redeem transaction hex: {e}")))?;
    let tx: Transaction =
        deserialize(&raw).map_err(|e| Error::Bitcoin(format!("invalid redeem transaction: {e}")))?;

    for input in &tx.input {
        for candidate in script_sig_pushes(&input.script_sig) {
            if sha256d(&candidate) == *committed_hash {
                return Ok(candidate);
            }
        }
        for element in input.witness.iter() {
            if sha256d(element) == *committed_hash {
                return Ok(element.to_vec());
            }
        }
    }

    Err(Error::FatalError)
}

/// Enumerate the literal data pushes in a `scriptSig`, skipping opcodes.
///
/// Corresponds to the original server's `ScriptTools.opcode_list`
/// walk, which filters for items written as `[...]` (a bracketed hex
/// literal) in its textual opcode-list representation. Here that's
/// simply `Instruction::PushBytes`.
fn script_sig_pushes(script: &ScriptBuf) -> Vec<Vec<u8>> {
    script
        .instructions()
        .filter_map(|instruction| match instruction {
            Ok(bitcoin::script::Instruction::PushBytes(bytes)) => Some(bytes.as_bytes().to_vec()),
            _ => None,
        })
        .collect()
}
