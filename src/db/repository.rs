//! Repository traits for data access abstraction.
//!
//! These traits define the contract for data access, allowing different
//! storage backends to be swapped without changing business logic.
//!
//! Every tenant-owned lookup takes the `team_id` explicitly: an id that
//! exists in another team is reported as `NotFound`.

use std::future::Future;

use crate::db::{
    DbResult,
    models::{
        ClientQuery, CrmClient, CrmTag, Document, DocumentQuery, ListResult, Project,
        ProjectQuery, Screenshot, Session, Team, TeamMember, TeamMembership, TeamRole, TimeEntry,
        TimeEntryQuery, User,
    },
};

/// Repository for User operations.
pub trait UserRepository {
    /// Create a new user. Generates ID and timestamps; lowercases the email.
    fn create(&self, user: &User) -> impl Future<Output = DbResult<User>> + Send;

    /// Get a user by ID.
    fn get(&self, id: &str) -> impl Future<Output = DbResult<User>> + Send;

    /// Look up a user by (case-insensitive) email.
    fn get_by_email(&self, email: &str) -> impl Future<Output = DbResult<Option<User>>> + Send;

    /// Update name and avatar.
    fn update(&self, user: &User) -> impl Future<Output = DbResult<User>> + Send;

    /// Members of a team whose name or email starts with `prefix`.
    fn search_members(
        &self,
        team_id: &str,
        prefix: &str,
        limit: usize,
    ) -> impl Future<Output = DbResult<Vec<User>>> + Send;
}

/// Repository for login sessions.
pub trait SessionRepository {
    /// Store a new session.
    fn create(&self, session: &Session) -> impl Future<Output = DbResult<()>> + Send;

    /// Resolve a token hash to its user if the session has not expired at `now`.
    fn find_user(
        &self,
        token_hash: &str,
        now: &str,
    ) -> impl Future<Output = DbResult<Option<User>>> + Send;

    /// Delete a session by token hash.
    fn delete(&self, token_hash: &str) -> impl Future<Output = DbResult<()>> + Send;

    /// Remove sessions that expired before `now`, returning how many were removed.
    fn delete_expired(&self, now: &str) -> impl Future<Output = DbResult<u64>> + Send;
}

/// Repository for Team operations, including membership.
pub trait TeamRepository {
    /// Create a team and make `owner_id` its owner.
    fn create(&self, team: &Team, owner_id: &str) -> impl Future<Output = DbResult<Team>> + Send;

    /// Get a team by ID.
    fn get(&self, id: &str) -> impl Future<Output = DbResult<Team>> + Send;

    /// Teams the user belongs to, with the user's role.
    fn list_for_user(
        &self,
        user_id: &str,
    ) -> impl Future<Output = DbResult<Vec<TeamMembership>>> + Send;

    /// Rename a team.
    fn update(&self, team: &Team) -> impl Future<Output = DbResult<Team>> + Send;

    /// Delete a team and everything it owns.
    fn delete(&self, id: &str) -> impl Future<Output = DbResult<()>> + Send;

    /// Role of a user in a team, `None` if not a member.
    fn get_role(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> impl Future<Output = DbResult<Option<TeamRole>>> + Send;

    /// All members of a team.
    fn list_members(&self, team_id: &str)
    -> impl Future<Output = DbResult<Vec<TeamMember>>> + Send;

    /// Add a member. `AlreadyExists` if the user is already in the team.
    fn add_member(
        &self,
        team_id: &str,
        user_id: &str,
        role: TeamRole,
    ) -> impl Future<Output = DbResult<TeamMember>> + Send;

    /// Change a member's role. `Conflict` when demoting the last owner.
    fn set_role(
        &self,
        team_id: &str,
        user_id: &str,
        role: TeamRole,
    ) -> impl Future<Output = DbResult<TeamMember>> + Send;

    /// Remove a member. `Conflict` when removing the last owner.
    fn remove_member(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> impl Future<Output = DbResult<()>> + Send;
}

/// Repository for Project operations.
pub trait ProjectRepository {
    /// Create a new project.
    fn create(&self, project: &Project) -> impl Future<Output = DbResult<Project>> + Send;

    /// Get a project by ID.
    fn get(&self, team_id: &str, id: &str) -> impl Future<Output = DbResult<Project>> + Send;

    /// List projects with optional filtering, sorting, and pagination.
    fn list(
        &self,
        team_id: &str,
        query: Option<&ProjectQuery>,
    ) -> impl Future<Output = DbResult<ListResult<Project>>> + Send;

    /// Update an existing project.
    fn update(&self, project: &Project) -> impl Future<Output = DbResult<Project>> + Send;

    /// Delete a project by ID.
    fn delete(&self, team_id: &str, id: &str) -> impl Future<Output = DbResult<()>> + Send;
}

/// Repository for wiki documents.
pub trait DocumentRepository {
    /// Create a document. The parent, when given, must live in the same team.
    fn create(&self, document: &Document) -> impl Future<Output = DbResult<Document>> + Send;

    /// Get a document (with mentions) by ID.
    fn get(&self, team_id: &str, id: &str) -> impl Future<Output = DbResult<Document>> + Send;

    /// List documents with filtering, sorting, and pagination.
    fn list(
        &self,
        team_id: &str,
        query: Option<&DocumentQuery>,
    ) -> impl Future<Output = DbResult<ListResult<Document>>> + Send;

    /// Every document of a team (optionally one project), for tree building.
    fn list_all(
        &self,
        team_id: &str,
        project_id: Option<&str>,
    ) -> impl Future<Output = DbResult<Vec<Document>>> + Send;

    /// Save title/content/icon/project and mentions, bumping the version.
    ///
    /// When `expected_version` is given and differs from the stored
    /// version, nothing is written and `Conflict` is returned.
    fn update(
        &self,
        document: &Document,
        expected_version: Option<i64>,
    ) -> impl Future<Output = DbResult<Document>> + Send;

    /// Re-parent and/or reorder a document.
    fn set_parent(
        &self,
        team_id: &str,
        id: &str,
        parent_id: Option<&str>,
        idx: Option<i64>,
        updated_by: &str,
    ) -> impl Future<Output = DbResult<Document>> + Send;

    /// Delete a document and its subtree.
    fn delete(&self, team_id: &str, id: &str) -> impl Future<Output = DbResult<()>> + Send;
}

/// Repository for CRM tags.
pub trait CrmTagRepository {
    fn create(&self, tag: &CrmTag) -> impl Future<Output = DbResult<CrmTag>> + Send;

    fn get(&self, team_id: &str, id: &str) -> impl Future<Output = DbResult<CrmTag>> + Send;

    /// All tags of a team ordered by name.
    fn list(&self, team_id: &str) -> impl Future<Output = DbResult<Vec<CrmTag>>> + Send;

    fn update(&self, tag: &CrmTag) -> impl Future<Output = DbResult<CrmTag>> + Send;

    fn delete(&self, team_id: &str, id: &str) -> impl Future<Output = DbResult<()>> + Send;
}

/// Repository for CRM clients.
pub trait CrmClientRepository {
    /// Create a client. Every tag id must belong to the client's team.
    fn create(&self, client: &CrmClient) -> impl Future<Output = DbResult<CrmClient>> + Send;

    fn get(&self, team_id: &str, id: &str) -> impl Future<Output = DbResult<CrmClient>> + Send;

    fn list(
        &self,
        team_id: &str,
        query: Option<&ClientQuery>,
    ) -> impl Future<Output = DbResult<ListResult<CrmClient>>> + Send;

    /// Update fields and replace tag links.
    fn update(&self, client: &CrmClient) -> impl Future<Output = DbResult<CrmClient>> + Send;

    fn delete(&self, team_id: &str, id: &str) -> impl Future<Output = DbResult<()>> + Send;
}

/// Repository for time entries.
pub trait TimeEntryRepository {
    /// Start a new running entry. `Conflict` if the user already has one in the team.
    fn start(&self, entry: &TimeEntry) -> impl Future<Output = DbResult<TimeEntry>> + Send;

    fn get(&self, team_id: &str, id: &str) -> impl Future<Output = DbResult<TimeEntry>> + Send;

    /// The user's running entry in the team, if any.
    fn get_running(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> impl Future<Output = DbResult<Option<TimeEntry>>> + Send;

    /// List entries, newest first by default.
    fn list(
        &self,
        team_id: &str,
        query: Option<&TimeEntryQuery>,
    ) -> impl Future<Output = DbResult<ListResult<TimeEntry>>> + Send;

    /// Record activity and add idle seconds to a running entry.
    fn record_activity(
        &self,
        team_id: &str,
        id: &str,
        last_activity_at: &str,
        idle_seconds_to_add: i64,
    ) -> impl Future<Output = DbResult<TimeEntry>> + Send;

    /// Stop a running entry. `Conflict` if already stopped.
    fn stop(
        &self,
        team_id: &str,
        id: &str,
        ended_at: &str,
    ) -> impl Future<Output = DbResult<TimeEntry>> + Send;

    /// Running entries (any team) whose last activity is before `cutoff`.
    fn list_stale_running(
        &self,
        cutoff: &str,
    ) -> impl Future<Output = DbResult<Vec<TimeEntry>>> + Send;

    fn delete(&self, team_id: &str, id: &str) -> impl Future<Output = DbResult<()>> + Send;
}

/// Repository for screenshot metadata.
pub trait ScreenshotRepository {
    /// Store metadata for a screenshot of a running entry. `NotFound` if the
    /// entry is missing, `Conflict` if it has been stopped.
    fn create(&self, screenshot: &Screenshot)
    -> impl Future<Output = DbResult<Screenshot>> + Send;

    fn get(&self, team_id: &str, id: &str) -> impl Future<Output = DbResult<Screenshot>> + Send;

    /// Screenshots of one time entry ordered by capture time.
    fn list_for_entry(
        &self,
        team_id: &str,
        time_entry_id: &str,
    ) -> impl Future<Output = DbResult<Vec<Screenshot>>> + Send;

    fn delete(&self, team_id: &str, id: &str) -> impl Future<Output = DbResult<()>> + Send;
}

/// Combined database interface.
///
/// Repositories are exposed through associated types, avoiding dynamic dispatch.
pub trait Database: Send + Sync {
    type Users<'a>: UserRepository + Send + Sync
    where
        Self: 'a;
    type Sessions<'a>: SessionRepository + Send + Sync
    where
        Self: 'a;
    type Teams<'a>: TeamRepository + Send + Sync
    where
        Self: 'a;
    type Projects<'a>: ProjectRepository + Send + Sync
    where
        Self: 'a;
    type Documents<'a>: DocumentRepository + Send + Sync
    where
        Self: 'a;
    type CrmTags<'a>: CrmTagRepository + Send + Sync
    where
        Self: 'a;
    type CrmClients<'a>: CrmClientRepository + Send + Sync
    where
        Self: 'a;
    type TimeEntries<'a>: TimeEntryRepository + Send + Sync
    where
        Self: 'a;
    type Screenshots<'a>: ScreenshotRepository + Send + Sync
    where
        Self: 'a;

    /// Run pending migrations.
    fn migrate(&self) -> impl Future<Output = DbResult<()>> + Send;

    fn users(&self) -> Self::Users<'_>;
    fn sessions(&self) -> Self::Sessions<'_>;
    fn teams(&self) -> Self::Teams<'_>;
    fn projects(&self) -> Self::Projects<'_>;
    fn documents(&self) -> Self::Documents<'_>;
    fn crm_tags(&self) -> Self::CrmTags<'_>;
    fn crm_clients(&self) -> Self::CrmClients<'_>;
    fn time_entries(&self) -> Self::TimeEntries<'_>;
    fn screenshots(&self) -> Self::Screenshots<'_>;
}
