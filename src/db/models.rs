//! Domain models for the DocuFlow database.
//!
//! These models are storage-agnostic and represent the core entities
//! used throughout the application. Every entity except [`User`] and
//! [`Session`] belongs to exactly one [`Team`].

use serde::{Deserialize, Serialize};

// =============================================================================
// Query Types for Pagination and Sorting
// =============================================================================

/// Sort order for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Base pagination and sorting options - composed into entity-specific queries.
#[derive(Debug, Clone, Default)]
pub struct PageSort {
    /// Maximum number of items to return.
    pub limit: Option<usize>,
    /// Number of items to skip.
    pub offset: Option<usize>,
    /// Field to sort by (validated per entity type).
    pub sort_by: Option<String>,
    /// Sort order (ascending or descending).
    pub sort_order: Option<SortOrder>,
}

/// Query for Projects - pagination + tags/search filters.
#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
    pub page: PageSort,
    /// Filter by tags (OR logic - matches if ANY tag matches).
    pub tags: Option<Vec<String>>,
    /// Substring match on title or description.
    pub search: Option<String>,
}

/// Parent filter for document listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentFilter {
    /// Only top-level documents.
    Root,
    /// Direct children of the given document.
    Parent(Id),
}

/// Query for Documents - pagination + project/parent/search filters.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    pub page: PageSort,
    pub project_id: Option<Id>,
    pub parent: Option<ParentFilter>,
    /// Substring match on title or content.
    pub search: Option<String>,
}

/// Query for CRM clients - pagination + tag/search filters.
#[derive(Debug, Clone, Default)]
pub struct ClientQuery {
    pub page: PageSort,
    pub tag_id: Option<Id>,
    /// Substring match on name, email or company.
    pub search: Option<String>,
}

/// Query for time entries.
#[derive(Debug, Clone, Default)]
pub struct TimeEntryQuery {
    pub page: PageSort,
    pub user_id: Option<Id>,
    pub project_id: Option<Id>,
    /// Entries started at or after this timestamp.
    pub from: Option<String>,
    /// Entries started before this timestamp.
    pub to: Option<String>,
}

/// Result of a paginated list query.
#[derive(Debug, Clone)]
pub struct ListResult<T> {
    /// The items in this page.
    pub items: Vec<T>,
    /// Total count of all matching items (before pagination).
    pub total: usize,
    /// Limit that was applied.
    pub limit: Option<usize>,
    /// Offset that was applied.
    pub offset: usize,
}

/// 8-character hex ID type used for all entities.
pub type Id = String;

// =============================================================================
// Users, sessions and teams
// =============================================================================

/// A registered account. The password hash never leaves the db layer
/// except for verification during login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A login session keyed by the sha256 hash of its bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token_hash: String,
    pub user_id: Id,
    pub created_at: String,
    pub expires_at: String,
}

/// A tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: Id,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A team together with the caller's role in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMembership {
    pub team: Team,
    pub role: TeamRole,
}

/// A member row joined with its user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMember {
    pub team_id: Id,
    pub user: User,
    pub role: TeamRole,
    pub joined_at: String,
}

/// Role of a user inside a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Owner,
    Admin,
    #[default]
    Member,
}

impl TeamRole {
    fn rank(self) -> u8 {
        match self {
            TeamRole::Owner => 2,
            TeamRole::Admin => 1,
            TeamRole::Member => 0,
        }
    }

    /// True when this role grants at least the privileges of `other`.
    pub fn at_least(self, other: TeamRole) -> bool {
        self.rank() >= other.rank()
    }
}

impl std::fmt::Display for TeamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamRole::Owner => write!(f, "owner"),
            TeamRole::Admin => write!(f, "admin"),
            TeamRole::Member => write!(f, "member"),
        }
    }
}

impl std::str::FromStr for TeamRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(TeamRole::Owner),
            "admin" => Ok(TeamRole::Admin),
            "member" => Ok(TeamRole::Member),
            _ => Err(format!("Unknown team role: {}", s)),
        }
    }
}

// =============================================================================
// Wiki
// =============================================================================

/// A project groups documents and time entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Id,
    pub team_id: Id,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A wiki page. Pages form a forest through `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: Id,
    pub team_id: Id,
    pub project_id: Option<Id>,
    pub parent_id: Option<Id>,
    pub title: String,
    pub content: String,
    pub icon: Option<String>,
    /// Position among siblings (lower first, missing last).
    pub idx: Option<i64>,
    /// Incremented on every content/metadata save.
    pub version: i64,
    pub created_by: Option<Id>,
    pub updated_by: Option<Id>,
    /// Ids of users mentioned in `content`, in order of first appearance.
    #[serde(default)]
    pub mentions: Vec<Id>,
    pub created_at: String,
    pub updated_at: String,
}

// =============================================================================
// CRM
// =============================================================================

/// A label attached to CRM clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmTag {
    pub id: Id,
    pub team_id: Id,
    pub name: String,
    pub color: String,
    pub created_at: String,
}

/// A customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmClient {
    pub id: Id,
    pub team_id: Id,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
    /// Linked tag IDs (M:N relationship via crm_client_tag)
    #[serde(default)]
    pub tag_ids: Vec<Id>,
    pub created_at: String,
    pub updated_at: String,
}

// =============================================================================
// Time tracking
// =============================================================================

/// A tracked work session. Running while `ended_at` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: Id,
    pub team_id: Id,
    pub user_id: Id,
    pub project_id: Option<Id>,
    pub description: Option<String>,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub last_activity_at: String,
    pub idle_seconds: i64,
    pub created_at: String,
}

impl TimeEntry {
    pub fn is_running(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Metadata for a captured screen image. The bytes live in the screenshot store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screenshot {
    pub id: Id,
    pub team_id: Id,
    pub time_entry_id: Id,
    pub user_id: Id,
    pub content_type: String,
    pub byte_size: i64,
    pub captured_at: String,
    pub created_at: String,
}
