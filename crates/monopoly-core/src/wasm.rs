//! WebAssembly bindings for the Monopoly turn engine.
//!
//! The engine is stateless, so the browser keeps the game state and passes
//! it back in (as JSON) on every call.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
use crate::actions::GameAction;
#[cfg(feature = "wasm")]
use crate::catalog::Catalog;
#[cfg(feature = "wasm")]
use crate::game::{Engine, GameError, GameState};

/// Initialize panic hook for better error messages in browser console
#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

#[cfg(feature = "wasm")]
fn parse<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> Result<T, JsValue> {
    serde_json::from_str(json).map_err(|e| JsValue::from_str(&format!("Invalid {what} JSON: {e}")))
}

#[cfg(feature = "wasm")]
fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[cfg(feature = "wasm")]
fn game_error(err: GameError) -> JsValue {
    JsValue::from_str(&format!("Action failed: {err}"))
}

/// WASM-exposed engine wrapper
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub struct WasmEngine {
    engine: Engine,
}

#[cfg(feature = "wasm")]
#[wasm_bindgen]
impl WasmEngine {
    /// Engine over the standard board
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmEngine {
        WasmEngine {
            engine: Engine::standard(),
        }
    }

    /// Engine over a custom catalog document
    #[wasm_bindgen(js_name = withCatalog)]
    pub fn with_catalog(catalog_json: &str) -> Result<WasmEngine, JsValue> {
        let catalog = Catalog::from_json(catalog_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid catalog: {e}")))?;
        Ok(WasmEngine {
            engine: Engine::new(catalog),
        })
    }

    /// Start a game; takes a JSON array of player ids, returns the state JSON
    #[wasm_bindgen(js_name = newGame)]
    pub fn new_game(&self, players_json: &str) -> Result<String, JsValue> {
        let players: Vec<String> = parse(players_json, "player list")?;
        let state = self.engine.new_game(&players).map_err(game_error)?;
        to_json(&state)
    }

    /// Apply an action; returns a JSON array of snapshots, the last one authoritative
    pub fn apply(&self, state_json: &str, action_json: &str) -> Result<String, JsValue> {
        let state: GameState = parse(state_json, "state")?;
        let action: GameAction = parse(action_json, "action")?;
        let snapshots = self.engine.apply(state, action).map_err(game_error)?;
        to_json(&snapshots)
    }

    /// Why an action would be ignored, or `None` if it would take effect
    pub fn validate(&self, state_json: &str, action_json: &str) -> Result<Option<String>, JsValue> {
        let state: GameState = parse(state_json, "state")?;
        let action: GameAction = parse(action_json, "action")?;
        match self.engine.validate(&state, &action) {
            Ok(()) => Ok(None),
            Err(GameError::Rejected(reason)) => Ok(Some(reason.to_string())),
            Err(err) => Err(game_error(err)),
        }
    }

    /// Get the static catalog as JSON (for rendering)
    pub fn catalog(&self) -> Result<String, JsValue> {
        to_json(self.engine.catalog())
    }
}

#[cfg(feature = "wasm")]
impl Default for WasmEngine {
    fn default() -> Self {
        Self::new()
    }
}
