use garde::Validate;
use serde::{Deserialize, Serialize};

/// Query string the provider sends back to the redirect URI. Both fields
/// are optional at the wire level; the handler decides what a missing one
/// means.
#[derive(Debug, Deserialize, Validate)]
pub struct CallbackQuery {
    #[garde(inner(length(min = 1, max = 512)))]
    pub code: Option<String>,
    #[garde(inner(length(min = 1, max = 128)))]
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub access_token: String,
    pub refresh_token: String,
}
