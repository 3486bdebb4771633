use super::ToolHandler;
use crate::error::Result;
use crate::remote::FunctionDeclaration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Last known device position, refreshed outside the session manager
pub trait LocationProvider: Send + Sync {
    /// Never waits for a fresh fix
    fn last_known(&self) -> Option<Coordinates>;
}

/// Location slot the host writes to whenever it gets a new fix
#[derive(Debug, Clone, Default)]
pub struct SharedLocation {
    inner: Arc<RwLock<Option<Coordinates>>>,
}

impl SharedLocation {
    pub fn update(&self, coordinates: Option<Coordinates>) {
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *slot = coordinates;
    }
}

impl LocationProvider for SharedLocation {
    fn last_known(&self) -> Option<Coordinates> {
        *self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// `getCurrentLocation`: no arguments
pub struct CurrentLocationTool {
    provider: Arc<dyn LocationProvider>,
}

impl CurrentLocationTool {
    pub fn new(provider: Arc<dyn LocationProvider>) -> Self {
        Self { provider }
    }
}

impl ToolHandler for CurrentLocationTool {
    fn name(&self) -> &str {
        "getCurrentLocation"
    }

    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: self.name().to_string(),
            description: "Get the user's current GPS location.".to_string(),
            parameters: serde_json::json!({ "type": "OBJECT", "properties": {} }),
        }
    }

    fn activity(&self, _args: &Value) -> String {
        "Consulting maps...".to_string()
    }

    fn call(&self, _args: &Value) -> Result<Value> {
        Ok(match self.provider.last_known() {
            Some(coords) => Value::String(serde_json::to_string(&coords)?),
            None => Value::String("Location not available.".to_string()),
        })
    }
}
