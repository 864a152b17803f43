//! Change notification system for broadcasting database updates to WebSocket clients.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Messages broadcast when team data is created, updated, or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum UpdateMessage {
    // Teams
    TeamUpdated { team_id: String },
    TeamDeleted { team_id: String },
    MemberAdded { user_id: String },
    MemberUpdated { user_id: String },
    MemberRemoved { user_id: String },

    // Projects
    ProjectCreated { project_id: String },
    ProjectUpdated { project_id: String },
    ProjectDeleted { project_id: String },

    // Documents
    DocumentCreated { document_id: String },
    DocumentUpdated { document_id: String, version: i64 },
    DocumentMoved { document_id: String, parent_id: Option<String> },
    DocumentDeleted { document_id: String },

    // CRM
    CrmTagCreated { tag_id: String },
    CrmTagUpdated { tag_id: String },
    CrmTagDeleted { tag_id: String },
    CrmClientCreated { client_id: String },
    CrmClientUpdated { client_id: String },
    CrmClientDeleted { client_id: String },

    // Time tracking
    TimeEntryStarted { time_entry_id: String, user_id: String },
    TimeEntryStopped { time_entry_id: String, user_id: String },
    TimeEntryDeleted { time_entry_id: String },
    ScreenshotCaptured { screenshot_id: String, time_entry_id: String },
    ScreenshotDeleted { screenshot_id: String },
}

/// An update together with the team it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamUpdate {
    pub team_id: String,
    pub message: UpdateMessage,
}

/// Pub/sub notifier for broadcasting database changes to all subscribers.
///
/// Every update is tagged with its team; subscribers filter on it.
#[derive(Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<TeamUpdate>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    /// Create a new ChangeNotifier with a buffer of 100 messages.
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self { tx }
    }

    /// Subscribe to receive update notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<TeamUpdate> {
        self.tx.subscribe()
    }

    /// Broadcast an update for `team_id` to all subscribers.
    pub fn notify(&self, team_id: &str, message: UpdateMessage) {
        let _ = self.tx.send(TeamUpdate {
            team_id: team_id.to_string(),
            message,
        });
    }
}
