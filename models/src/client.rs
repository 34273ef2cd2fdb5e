use serde::{Deserialize, Serialize};

/// Installation state of an MCP client application (editor, chat app, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStatus {
    pub client_type: String,
    #[serde(default)]
    pub installed: bool,
    #[serde(default)]
    pub registered: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStatusList {
    #[serde(default)]
    pub clients: Vec<ClientStatus>,
}
