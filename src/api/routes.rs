//! API route configuration.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, patch, post, put};
use tower_http::cors::{Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::{Scalar, Servable};

use super::state::AppState;
use super::v1::{self, *};
use super::websocket::ws_handler;
use crate::db::Database;
use crate::storage::ScreenshotStore;
use crate::tracking::{DayTotal, ProjectTotal, TimeSummary};
use crate::wiki::DocumentNode;

/// Build routes with generic database and store types.
///
/// This macro reduces boilerplate when registering handlers that are generic
/// over the Database and ScreenshotStore traits. It applies the turbofish
/// operator automatically.
macro_rules! routes {
    ($D:ty, $S:ty => {
        $($method:ident $path:literal => $($handler:ident)::+),* $(,)?
    }) => {{
        let router = Router::new();
        $(
            let router = router.route($path, $method($($handler)::+::<$D, $S>));
        )*
        router
    }};
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "DocuFlow API",
        version = "0.1.0",
        description = "Multi-tenant document wiki, CRM and time tracking. Team-scoped routes take the team in the X-Team-Id header.",
        license(name = "GPL-2.0")
    ),
    modifiers(&BearerAuth),
    paths(
        v1::root,
        v1::health,
        v1::register,
        v1::login,
        v1::logout,
        v1::me,
        v1::patch_me,
        v1::search_users,
        v1::create_team,
        v1::list_teams,
        v1::get_team,
        v1::update_team,
        v1::delete_team,
        v1::list_members,
        v1::add_member,
        v1::update_member,
        v1::remove_member,
        v1::list_projects,
        v1::get_project,
        v1::create_project,
        v1::update_project,
        v1::patch_project,
        v1::delete_project,
        v1::list_documents,
        v1::document_tree,
        v1::create_document,
        v1::get_document,
        v1::list_children,
        v1::patch_document,
        v1::move_document,
        v1::delete_document,
        v1::list_tags,
        v1::create_tag,
        v1::get_tag,
        v1::patch_tag,
        v1::delete_tag,
        v1::list_clients,
        v1::create_client,
        v1::get_client,
        v1::patch_client,
        v1::delete_client,
        v1::start_timer,
        v1::stop_timer,
        v1::current_timer,
        v1::heartbeat,
        v1::list_entries,
        v1::time_summary,
        v1::delete_entry,
        v1::upload_screenshot,
        v1::list_screenshots,
        v1::get_screenshot,
        v1::delete_screenshot,
    ),
    components(
        schemas(
            ServiceInfo,
            HealthResponse,
            ErrorResponse,
            RegisterRequest,
            LoginRequest,
            SessionResponse,
            UserResponse,
            PatchUserRequest,
            TeamResponse,
            TeamRequest,
            MemberResponse,
            AddMemberRequest,
            UpdateMemberRequest,
            ProjectResponse,
            ProjectRequest,
            PatchProjectRequest,
            PaginatedProjects,
            DocumentResponse,
            CreateDocumentRequest,
            PatchDocumentRequest,
            MoveDocumentRequest,
            PaginatedDocuments,
            DocumentNode,
            TagResponse,
            CreateTagRequest,
            PatchTagRequest,
            ClientResponse,
            CreateClientRequest,
            PatchClientRequest,
            PaginatedClients,
            TimeEntryResponse,
            StartTimerRequest,
            PaginatedTimeEntries,
            TimeSummary,
            ProjectTotal,
            DayTotal,
            ScreenshotResponse,
        )
    ),
    tags(
        (name = "system", description = "System health and status endpoints"),
        (name = "auth", description = "Registration and sessions"),
        (name = "users", description = "Profiles and mention autocomplete"),
        (name = "teams", description = "Teams and membership"),
        (name = "projects", description = "Project management endpoints"),
        (name = "documents", description = "Wiki pages, page tree and autosave"),
        (name = "crm", description = "CRM tags and clients"),
        (name = "time", description = "Time tracking and activity heartbeats"),
        (name = "screenshots", description = "Screenshots captured during time entries")
    )
)]
pub struct ApiDoc;

/// Create the API router, optionally serving OpenAPI docs at `/docs`.
pub fn create_router<D, S>(state: AppState<D, S>, enable_docs: bool) -> Router
where
    D: Database + 'static,
    S: ScreenshotStore + Send + Sync + 'static,
{
    let screenshot_limit = state.config().max_screenshot_bytes;

    // System routes (non-generic)
    let system_routes: Router<AppState<D, S>> = Router::new()
        .route("/", get(v1::root))
        .route("/health", get(v1::health))
        .route("/api/v1/auth/me", get(v1::me));

    let auth_routes = routes!(D, S => {
        post "/api/v1/auth/register" => v1::register,
        post "/api/v1/auth/login" => v1::login,
        post "/api/v1/auth/logout" => v1::logout,
        patch "/api/v1/users/me" => v1::patch_me,
        get "/api/v1/users/search" => v1::search_users,
    });

    let team_routes = routes!(D, S => {
        get "/api/v1/teams" => v1::list_teams,
        post "/api/v1/teams" => v1::create_team,
        get "/api/v1/teams/{id}" => v1::get_team,
        patch "/api/v1/teams/{id}" => v1::update_team,
        delete "/api/v1/teams/{id}" => v1::delete_team,
        get "/api/v1/teams/{id}/members" => v1::list_members,
        post "/api/v1/teams/{id}/members" => v1::add_member,
        patch "/api/v1/teams/{id}/members/{user_id}" => v1::update_member,
        delete "/api/v1/teams/{id}/members/{user_id}" => v1::remove_member,
    });

    let project_routes = routes!(D, S => {
        get "/api/v1/projects" => v1::list_projects,
        post "/api/v1/projects" => v1::create_project,
        get "/api/v1/projects/{id}" => v1::get_project,
        put "/api/v1/projects/{id}" => v1::update_project,
        patch "/api/v1/projects/{id}" => v1::patch_project,
        delete "/api/v1/projects/{id}" => v1::delete_project,
    });

    let document_routes = routes!(D, S => {
        get "/api/v1/documents" => v1::list_documents,
        post "/api/v1/documents" => v1::create_document,
        get "/api/v1/documents/tree" => v1::document_tree,
        get "/api/v1/documents/{id}" => v1::get_document,
        patch "/api/v1/documents/{id}" => v1::patch_document,
        delete "/api/v1/documents/{id}" => v1::delete_document,
        get "/api/v1/documents/{id}/children" => v1::list_children,
        post "/api/v1/documents/{id}/move" => v1::move_document,
    });

    let crm_routes = routes!(D, S => {
        get "/api/v1/crm/tags" => v1::list_tags,
        post "/api/v1/crm/tags" => v1::create_tag,
        get "/api/v1/crm/tags/{id}" => v1::get_tag,
        patch "/api/v1/crm/tags/{id}" => v1::patch_tag,
        delete "/api/v1/crm/tags/{id}" => v1::delete_tag,
        get "/api/v1/crm/clients" => v1::list_clients,
        post "/api/v1/crm/clients" => v1::create_client,
        get "/api/v1/crm/clients/{id}" => v1::get_client,
        patch "/api/v1/crm/clients/{id}" => v1::patch_client,
        delete "/api/v1/crm/clients/{id}" => v1::delete_client,
    });

    let time_routes = routes!(D, S => {
        post "/api/v1/time/start" => v1::start_timer,
        post "/api/v1/time/stop" => v1::stop_timer,
        get "/api/v1/time/current" => v1::current_timer,
        post "/api/v1/time/heartbeat" => v1::heartbeat,
        get "/api/v1/time/entries" => v1::list_entries,
        get "/api/v1/time/summary" => v1::time_summary,
        delete "/api/v1/time/entries/{id}" => v1::delete_entry,
        get "/api/v1/screenshots/{id}" => v1::get_screenshot,
        delete "/api/v1/screenshots/{id}" => v1::delete_screenshot,
    });

    // Uploads get their own body limit instead of the 2 MB default
    let upload_routes = Router::new().route(
        "/api/v1/time/entries/{id}/screenshots",
        get(v1::list_screenshots::<D, S>)
            .post(v1::upload_screenshot::<D, S>)
            .layer(DefaultBodyLimit::max(screenshot_limit)),
    );

    let ws_routes = Router::new().route("/ws", get(ws_handler::<D, S>));

    let mut router = system_routes
        .merge(auth_routes)
        .merge(team_routes)
        .merge(project_routes)
        .merge(document_routes)
        .merge(crm_routes)
        .merge(time_routes)
        .merge(upload_routes)
        .merge(ws_routes);

    if enable_docs {
        router = router.merge(Scalar::with_url("/docs", ApiDoc::openapi()));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router.layer(cors).with_state(state)
}
