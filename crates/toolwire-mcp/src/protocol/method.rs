//! The closed set of methods the server understands.

/// Request methods. Anything else is `Unknown` and answered with MethodNotFound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Initialize,
    ToolsList,
    ToolsCall,
    ResourcesList,
    ResourcesRead,
    Unknown(String),
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method {
            "initialize" => Method::Initialize,
            "tools/list" => Method::ToolsList,
            "tools/call" => Method::ToolsCall,
            "resources/list" => Method::ResourcesList,
            "resources/read" => Method::ResourcesRead,
            other => Method::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Initialize => "initialize",
            Method::ToolsList => "tools/list",
            Method::ToolsCall => "tools/call",
            Method::ResourcesList => "resources/list",
            Method::ResourcesRead => "resources/read",
            Method::Unknown(other) => other,
        }
    }

    /// Whether the method may only run after the handshake completed.
    pub fn requires_ready(&self) -> bool {
        matches!(
            self,
            Method::ToolsList | Method::ToolsCall | Method::ResourcesList | Method::ResourcesRead
        )
    }
}

/// Notification methods. Unknown ones are logged and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationMethod {
    Initialized,
    Cancelled,
    Unknown(String),
}

impl NotificationMethod {
    pub fn parse(method: &str) -> Self {
        match method {
            "initialized" | "notifications/initialized" => NotificationMethod::Initialized,
            "notifications/cancelled" | "$/cancelRequest" => NotificationMethod::Cancelled,
            other => NotificationMethod::Unknown(other.to_string()),
        }
    }
}
