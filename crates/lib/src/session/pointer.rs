use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{account::Slot, events::TabId};

/// Shared record of the most recent login on this device.
///
/// Informational only: it is never used to restore authentication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPointer {
    pub account_id: String,
    pub slot: Slot,
    pub login_at: DateTime<Utc>,
    pub tab_id: TabId,
}
