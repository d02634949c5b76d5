//! Healthcare provider submitting claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::ProviderId;

/// A provider, identified for intake by its exact name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Provider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ProviderId::new_v7(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}
