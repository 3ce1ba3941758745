//! Shield render requests and content

use crate::SelectionToken;
use serde::{Deserialize, Serialize};

/// What the restriction engine is about to cover with a shield
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShieldTarget {
    Application {
        token: SelectionToken,
    },
    ApplicationInCategory {
        token: SelectionToken,
        category: SelectionToken,
    },
    WebDomain {
        token: SelectionToken,
    },
    WebDomainInCategory {
        token: SelectionToken,
        category: SelectionToken,
    },
}

impl ShieldTarget {
    pub fn token(&self) -> &SelectionToken {
        match self {
            ShieldTarget::Application { token }
            | ShieldTarget::ApplicationInCategory { token, .. }
            | ShieldTarget::WebDomain { token }
            | ShieldTarget::WebDomainInCategory { token, .. } => token,
        }
    }
}

/// Labels shown on the shield
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldContent {
    pub title: String,
    pub subtitle: String,
    pub primary_button: String,
    /// Seconds left in the block, zero once the break is complete
    pub remaining_secs: u64,
}
