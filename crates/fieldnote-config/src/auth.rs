use serde::{Deserialize, Serialize};

/// Where the API key travels on each request
///
/// Exactly one mode is active at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuthMode {
    /// Named header carrying the raw key (see `auth_header`)
    #[default]
    Header,
    /// `Authorization: Bearer <key>`
    Bearer,
    /// Query parameter carrying the raw key (see `auth_query_param`)
    Query,
}

pub(crate) fn default_header() -> String {
    "X-API-Key".to_string()
}

pub(crate) fn default_query_param() -> String {
    "api_key".to_string()
}
