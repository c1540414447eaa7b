//! Request and response bodies for the HTTP surface.
//!
//! Every response carries a `status` field; failures add `error`
//! (either a plain string or, for request validation, a list of
//! `{message, target}` entries. See [`crate::error::ValidationError`]).

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Success,
    Failed,
}

#[derive(Debug, Serialize)]
pub struct ServerInfoResponse {
    pub status: Status,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct GetTokenResponse {
    pub status: Status,
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyTokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyTokenResponse {
    pub status: Status,
    pub exist: bool,
    pub create_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSwapRequest {
    pub token: String,
    pub want_currency: String,
    pub want_amount: i64,
    pub send_currency: String,
    pub send_amount: i64,
    pub receive_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapListEntry {
    pub initiator_currency: Option<String>,
    pub initiator_receive_amount: Option<i64>,
    pub participator_currency: Option<String>,
    pub participator_receive_amount: Option<i64>,
    pub participator_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GetSwapListResponse {
    pub status: Status,
    pub data: BTreeMap<String, SwapListEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateSwapRequest {
    pub token: String,
    pub selected_swap: String,
    pub contract: String,
    pub raw_transaction: String,
    pub receive_address: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetInitiatorInfoResponse {
    pub status: Status,
    pub initiator_address: Option<String>,
    pub initiate_contract: Option<String>,
    pub initiate_raw_transaction: Option<String>,
    pub token_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipateSwapRequest {
    pub token: String,
    pub raw_transaction: String,
    pub contract: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetParticipatorInfoRequest {
    pub token: String,
    pub selected_swap: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetParticipatorInfoResponse {
    pub status: Status,
    pub participate_contract: Option<String>,
    pub participate_raw_transaction: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemSwapRequest {
    pub token: String,
    pub selected_swap: String,
    pub raw_transaction: String,
}

#[derive(Debug, Serialize)]
pub struct GetRedeemTokenResponse {
    pub status: Status,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSwapRequest {
    pub token: String,
    pub raw_transaction: String,
}

/// The plain success/failure envelope used by every write endpoint.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self { status: Status::Success, error: None }
    }
}

/// Either a single error string or an aggregated list of field errors.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Message(String),
    Fields(Vec<ValidationError>),
}
