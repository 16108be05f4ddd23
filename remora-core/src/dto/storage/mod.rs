//! Object storage DTOs

use serde::{Deserialize, Serialize};

/// One page of an object listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListObjectsResponse {
    /// Full object keys under the requested prefix
    pub keys: Vec<String>,
    /// Token for the next page, absent on the last page
    #[serde(default)]
    pub next_token: Option<String>,
}
