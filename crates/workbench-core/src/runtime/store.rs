//! Per-run store state.
//!
//! Every guest run gets a fresh [`Store`] holding a [`GuestState`]. Nothing
//! survives between runs except the compiled module.

use wasmtime::{Store, Trap};
use wasmtime_wasi::preview1::WasiP1Ctx;

use super::WasmEngine;
use workbench_common::EngineError;

/// State reachable from WASI host calls during one run.
pub struct GuestState {
    pub wasi: WasiP1Ctx,
}

impl GuestState {
    pub fn new(wasi: WasiP1Ctx) -> Self {
        Self { wasi }
    }
}

/// Create a store for one run.
///
/// `fuel` is only applied when the engine meters fuel.
///
/// # Errors
///
/// Returns an error if fuel cannot be set on the store.
pub fn create_store(
    engine: &WasmEngine,
    state: GuestState,
    fuel: Option<u64>,
) -> Result<Store<GuestState>, EngineError> {
    let mut store = Store::new(engine.inner(), state);

    if let (true, Some(fuel)) = (engine.is_fuel_metered(), fuel) {
        store
            .set_fuel(fuel)
            .map_err(|e| EngineError::invalid_config(format!("Failed to set fuel: {e}")))?;
    }

    Ok(store)
}

/// Fuel burned since the store was given `initial_fuel`.
pub fn fuel_consumed(initial_fuel: u64, store: &Store<GuestState>) -> Option<u64> {
    store
        .get_fuel()
        .ok()
        .map(|remaining| initial_fuel.saturating_sub(remaining))
}

/// Returns `true` if `error` is (or wraps) an out-of-fuel trap.
pub fn is_out_of_fuel(error: &wasmtime::Error) -> bool {
    matches!(error.downcast_ref::<Trap>(), Some(Trap::OutOfFuel))
}
