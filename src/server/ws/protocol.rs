use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Default)]
pub struct WsIncomingMessage {
    #[serde(rename = "type")]
    pub msg_type: Option<String>,
    pub collection: Option<String>,
    pub query: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsOutgoingMessage {
    Progress { progress: String },
    Result { report: String },
    Done,
    Error { message: String },
}
