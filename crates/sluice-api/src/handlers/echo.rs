//! /echo handler — the request body relayed straight back as the response.

use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse, Response};

use sluice_services::TransferKind;

use super::{body_source, relay_to_body, ApiState};

pub async fn handle_echo(State(state): State<ApiState>, body: Body) -> Response {
    let source = body_source(body, state.relay.max_upload_bytes);
    relay_to_body(&state, source, TransferKind::Echo, "echo").into_response()
}
