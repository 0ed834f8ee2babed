use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct APIResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> APIResponse<T> {
    pub fn new(msg: &str, data: T) -> Self {
        APIResponse {
            status: msg.to_owned(),
            data: Some(data),
        }
    }
}

impl APIResponse<()> {
    pub fn message(msg: &str) -> Self {
        APIResponse {
            status: msg.to_owned(),
            data: None,
        }
    }
}
