use auth_services::types::Principal;
use serde::{Deserialize, Serialize};

/// Messages queued for display on the next rendered page.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    /// Error banners
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error: Vec<String>,
    /// Success banners
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub success: Vec<String>,
}

impl Flash {
    /// Queues an error banner.
    pub fn error(&mut self, message: impl Into<String>) {
        self.error.push(message.into());
    }

    /// Queues a success banner.
    pub fn success(&mut self, message: impl Into<String>) {
        self.success.push(message.into());
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.error.is_empty() && self.success.is_empty()
    }
}

/// Everything a workflow needs to know about the request it serves.
#[derive(Debug, Default)]
pub struct RequestContext {
    /// The signed-in user, if any
    pub principal: Option<Principal>,
    /// Messages produced while handling the request
    pub flash: Flash,
}

impl RequestContext {
    /// Context for a request made by `principal`.
    pub fn new(principal: Option<Principal>) -> Self {
        Self {
            principal,
            flash: Flash::default(),
        }
    }
}
