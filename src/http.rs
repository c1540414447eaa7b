//! Routing, request parsing and response rendering.
//!
//! Request bodies are parsed by hand from raw bytes instead of via
//! `axum::Json`'s extractor so that a malformed body renders the same
//! `{status, error}` envelope as every other failure, with the invalid
//! field named in `ValidationError::target` the way the original
//! server's validation-exception handler aggregated FastAPI's
//! per-field errors.

use crate::coordinator::Coordinator;
use crate::error::{Error, ValidationError};
use crate::wire::*;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;

pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/", get(server_info))
        .route("/get_token/", get(get_token))
        .route("/verify_token/", post(verify_token))
        .route("/register_swap/", post(register_swap))
        .route("/get_swap_list/", get(get_swap_list))
        .route("/initiate_swap/", post(initiate_swap))
        .route("/get_initiator_info/", post(get_initiator_info))
        .route("/participate_swap/", post(participate_swap))
        .route("/get_participator_info/", get(get_participator_info))
        .route("/redeem_swap/", post(redeem_swap))
        .route("/get_redeem_token/", post(get_redeem_token))
        .route("/complete_swap/", post(complete_swap))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(coordinator)
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| {
        let response = StatusResponse {
            status: Status::Failed,
            error: Some(ErrorBody::Fields(vec![ValidationError {
                message: e.to_string(),
                target: vec!["body".to_string()],
            }])),
        };
        (StatusCode::BAD_REQUEST, Json(response)).into_response()
    })
}

fn fail(status: StatusCode, err: Error) -> Response {
    match err {
        Error::UpdateToken(_) | Error::UpdateSwap(_) | Error::Storage(_) => {
            log::error!("request failed: {err}");
        }
        _ => log::debug!("request failed: {err}"),
    }
    let body = StatusResponse {
        status: Status::Failed,
        error: Some(ErrorBody::Message(err.to_string())),
    };
    (status, Json(body)).into_response()
}

async fn server_info() -> impl IntoResponse {
    Json(ServerInfoResponse {
        status: Status::Success,
        message: "This server is working.".to_string(),
    })
}

async fn get_token(State(coordinator): State<Arc<Coordinator>>) -> Response {
    match coordinator.get_token() {
        Ok((token, _created_at)) => Json(GetTokenResponse {
            status: Status::Success,
            token: Some(token),
            error: None,
        })
        .into_response(),
        Err(err) => {
            log::error!("get_token failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(GetTokenResponse {
                    status: Status::Failed,
                    token: None,
                    error: Some(err.to_string()),
                }),
            )
                .into_response()
        }
    }
}

async fn verify_token(State(coordinator): State<Arc<Coordinator>>, body: Bytes) -> Response {
    let request: VerifyTokenRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    let (exist, create_at) = coordinator.verify_token(&request.token);
    Json(VerifyTokenResponse {
        status: Status::Success,
        exist,
        create_at,
    })
    .into_response()
}

async fn register_swap(State(coordinator): State<Arc<Coordinator>>, body: Bytes) -> Response {
    let request: RegisterSwapRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    match coordinator
        .register_swap(
            &request.token,
            request.want_currency,
            request.want_amount,
            request.send_currency,
            request.send_amount,
            request.receive_address,
        )
        .await
    {
        Ok(()) => Json(StatusResponse::ok()).into_response(),
        Err(err) => fail(StatusCode::BAD_REQUEST, err),
    }
}

async fn get_swap_list(State(coordinator): State<Arc<Coordinator>>) -> Response {
    match coordinator.get_swap_list() {
        Ok(listings) => {
            let data: BTreeMap<String, SwapListEntry> = listings
                .into_iter()
                .map(|listing| {
                    (
                        listing.key_hex,
                        SwapListEntry {
                            initiator_currency: listing.initiator_currency,
                            initiator_receive_amount: listing.initiator_receive_amount,
                            participator_currency: listing.participator_currency,
                            participator_receive_amount: listing.participator_receive_amount,
                            participator_address: listing.participator_address,
                        },
                    )
                })
                .collect();
            Json(GetSwapListResponse { status: Status::Success, data }).into_response()
        }
        Err(err) => {
            log::error!("get_swap_list failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(GetSwapListResponse { status: Status::Failed, data: BTreeMap::new() }),
            )
                .into_response()
        }
    }
}

async fn initiate_swap(State(coordinator): State<Arc<Coordinator>>, body: Bytes) -> Response {
    let request: InitiateSwapRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    match coordinator
        .initiate_swap(
            &request.token,
            &request.selected_swap,
            request.contract,
            request.raw_transaction,
            request.receive_address,
        )
        .await
    {
        Ok(()) => Json(StatusResponse::ok()).into_response(),
        Err(err) => fail(StatusCode::BAD_REQUEST, err),
    }
}

async fn get_initiator_info(State(coordinator): State<Arc<Coordinator>>, body: Bytes) -> Response {
    let request: TokenRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    match coordinator.get_initiator_info(&request.token) {
        Ok(info) => Json(GetInitiatorInfoResponse {
            status: Status::Success,
            initiator_address: info.initiator_address,
            initiate_contract: info.initiate_contract,
            initiate_raw_transaction: info.initiate_raw_transaction,
            token_hash: Some(hex::encode(info.token_hash)),
        })
        .into_response(),
        Err(err) => fail(StatusCode::BAD_REQUEST, err),
    }
}

async fn participate_swap(State(coordinator): State<Arc<Coordinator>>, body: Bytes) -> Response {
    let request: ParticipateSwapRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    match coordinator
        .participate_swap(&request.token, request.raw_transaction, request.contract)
        .await
    {
        Ok(()) => Json(StatusResponse::ok()).into_response(),
        Err(err) => fail(StatusCode::BAD_REQUEST, err),
    }
}

async fn get_participator_info(State(coordinator): State<Arc<Coordinator>>, body: Bytes) -> Response {
    let request: GetParticipatorInfoRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    match coordinator.get_participator_info(&request.token, &request.selected_swap) {
        Ok(info) => Json(GetParticipatorInfoResponse {
            status: Status::Success,
            participate_contract: info.participate_contract,
            participate_raw_transaction: info.participate_raw_transaction,
        })
        .into_response(),
        Err(err) => fail(StatusCode::BAD_REQUEST, err),
    }
}

async fn redeem_swap(State(coordinator): State<Arc<Coordinator>>, body: Bytes) -> Response {
    let request: RedeemSwapRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    match coordinator
        .redeem_swap(&request.token, &request.selected_swap, request.raw_transaction)
        .await
    {
        Ok(()) => Json(StatusResponse::ok()).into_response(),
        Err(err) => fail(StatusCode::BAD_REQUEST, err),
    }
}

async fn get_redeem_token(State(coordinator): State<Arc<Coordinator>>, body: Bytes) -> Response {
    let request: TokenRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    match coordinator.get_redeem_token(&request.token) {
        Ok(token) => Json(GetRedeemTokenResponse { status: Status::Success, token: Some(token) }).into_response(),
        Err(err) => fail(StatusCode::BAD_REQUEST, err),
    }
}

async fn complete_swap(State(coordinator): State<Arc<Coordinator>>, body: Bytes) -> Response {
    let request: CompleteSwapRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    match coordinator.complete_swap(&request.token, request.raw_transaction).await {
        Ok(()) => Json(StatusResponse::ok()).into_response(),
        Err(err) => fail(StatusCode::BAD_REQUEST, err),
    }
}
