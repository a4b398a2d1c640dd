use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct UnitRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct UnitsResponse {
    pub units: Vec<String>,
}
