use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;

#[derive(Debug, Serialize)]
pub struct GateStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub max_concurrent: usize,
    pub slots_in_use: usize,
    pub max_requests_per_second: u32,
    pub rate_period_ms: u64,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<GateStatus> {
    let slots = state.gate.slots();
    Json(GateStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        max_concurrent: slots.capacity(),
        slots_in_use: slots.in_use(),
        max_requests_per_second: state.max_requests_per_second,
        rate_period_ms: state.gate.ticker().period().as_millis() as u64,
    })
}
