use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use initiative_access_application::{
    InitiativeDirectory, ResourceCommand, ResourceCommandGateway,
};
use initiative_access_core::{AppError, GuildId};
use initiative_access_domain::{
    AccessLevel, GuildRole, InitiativeId, PermissionKey, Principal, ResourceGrant, ResourceId,
    ResourceKind, ResourceRef, RoleId, TagId, UserId,
};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use url::Url;

use super::{HttpInitiativeApi, HttpInitiativeApiConfig};

const TOKEN: &str = "test-token";

#[derive(Clone, Default)]
struct Backend {
    calls: Arc<Mutex<Vec<String>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
    role_failures_left: Arc<AtomicUsize>,
}

fn authorized(headers: &HeaderMap) -> Result<(), StatusCode> {
    let expected = format!("Bearer {TOKEN}");
    match headers.get("authorization").and_then(|value| value.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn initiative(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(initiative_id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    backend
        .calls
        .lock()
        .await
        .push(format!("GET /initiatives/{initiative_id}"));
    if initiative_id != 10 {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(json!({
        "id": 10,
        "guild_id": 1,
        "name": "Platform",
        "members": [
            {
                "user": { "id": 7, "email": "Ada@Example.com", "full_name": "Ada" },
                "role_id": 4,
                "role": "project_manager"
            },
            {
                "user": { "id": 8, "email": "bob@example.com" },
                "role_id": null,
                "can_view_docs": false,
                "can_create_docs": true
            }
        ]
    })))
}

async fn roles(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(initiative_id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    backend
        .calls
        .lock()
        .await
        .push(format!("GET /initiatives/{initiative_id}/roles"));

    let failures_left = backend.role_failures_left.load(Ordering::SeqCst);
    if failures_left > 0 {
        backend
            .role_failures_left
            .store(failures_left - 1, Ordering::SeqCst);
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(json!([
        {
            "id": 4,
            "initiative_id": initiative_id,
            "name": "project_manager",
            "display_name": "Project manager",
            "is_manager": true,
            "can_view_docs": true,
            "can_create_docs": true,
            "can_view_projects": true,
            "can_create_projects": true
        }
    ])))
}

async fn my_permissions(
    headers: HeaderMap,
    Path(_initiative_id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    Ok(Json(json!({ "can_view_docs": true, "can_create_docs": false })))
}

async fn guild_member(
    headers: HeaderMap,
    Path((guild_id, user_id)): Path<(i64, i64)>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    if user_id != 9 {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(json!({ "guild_id": guild_id, "user_id": user_id, "role": "admin" })))
}

async fn document(
    headers: HeaderMap,
    Path(document_id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    let role_level = if document_id == 66 { "owner" } else { "write" };

    Ok(Json(json!({
        "id": document_id,
        "initiative_id": 10,
        "permissions": [{ "user_id": 7, "level": "read" }],
        "role_permissions": [{ "role_id": 4, "level": role_level }],
        "tags": [{ "id": 3 }]
    })))
}

async fn add_member(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(document_id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<StatusCode, StatusCode> {
    authorized(&headers)?;
    backend
        .calls
        .lock()
        .await
        .push(format!("POST /documents/{document_id}/members"));
    backend.bodies.lock().await.push(body);
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_role_permission(
    headers: HeaderMap,
    Path((_document_id, role_id)): Path<(i64, i64)>,
) -> Result<StatusCode, StatusCode> {
    authorized(&headers)?;
    if role_id == 13 {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn me(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    Ok(Json(json!({ "id": 7, "email": "ada@example.com", "full_name": "Ada" })))
}

fn router(backend: Backend) -> Router {
    Router::new()
        .route("/users/me", get(me))
        .route("/initiatives/{initiative_id}", get(initiative))
        .route("/initiatives/{initiative_id}/roles", get(roles))
        .route(
            "/initiatives/{initiative_id}/my-permissions",
            get(my_permissions),
        )
        .route("/guilds/{guild_id}/members/{user_id}", get(guild_member))
        .route("/documents/{document_id}", get(document))
        .route("/documents/{document_id}/members", post(add_member))
        .route(
            "/documents/{document_id}/role-permissions/{role_id}",
            delete(remove_role_permission),
        )
        .with_state(backend)
}

async fn spawn_backend(backend: Backend) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap_or_else(|_| unreachable!());
    let address = listener.local_addr().unwrap_or_else(|_| unreachable!());
    tokio::spawn(async move {
        let _ = axum::serve(listener, router(backend)).await;
    });
    address
}

fn client(address: SocketAddr, token: &str) -> HttpInitiativeApi {
    HttpInitiativeApi::new(HttpInitiativeApiConfig {
        base_url: Url::parse(&format!("http://{address}/")).unwrap_or_else(|_| unreachable!()),
        api_token: token.to_owned(),
        timeout: Duration::from_secs(5),
        max_attempts: 3,
        retry_backoff_ms: 50,
    })
    .unwrap_or_else(|_| unreachable!())
}

fn document_ref(id: i64) -> ResourceRef {
    ResourceRef::new(
        ResourceKind::Document,
        ResourceId::new(id),
        InitiativeId::new(10),
    )
}

#[tokio::test]
async fn initiative_payload_is_validated_into_domain_types() {
    let api = client(spawn_backend(Backend::default()).await, TOKEN);

    let initiative = api
        .fetch_initiative(InitiativeId::new(10))
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(initiative.members().len(), 2);
    let ada = initiative
        .member(UserId::new(7))
        .unwrap_or_else(|| unreachable!());
    assert_eq!(ada.role_ids(), &[RoleId::new(4)]);
    assert_eq!(ada.user().email().as_str(), "ada@example.com");

    let bob = initiative
        .member(UserId::new(8))
        .unwrap_or_else(|| unreachable!());
    assert!(bob.role_ids().is_empty());
    assert_eq!(bob.legacy_flags().can_view_docs, Some(false));
    assert_eq!(bob.legacy_flags().can_view_projects, None);
    assert_eq!(bob.user().display_name(), "bob@example.com");
}

#[tokio::test]
async fn role_flags_are_taken_verbatim() {
    let api = client(spawn_backend(Backend::default()).await, TOKEN);

    let roles = api
        .list_roles(InitiativeId::new(10))
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(roles.len(), 1);
    assert!(roles[0].is_manager());
    assert!(roles[0].permissions().get(PermissionKey::CreateDocs));
    assert!(!roles[0].permissions().get(PermissionKey::ViewQueues));
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let backend = Backend::default();
    backend.role_failures_left.store(2, Ordering::SeqCst);
    let api = client(spawn_backend(backend.clone()).await, TOKEN);

    let roles = api.list_roles(InitiativeId::new(10)).await;

    assert!(roles.is_ok());
    let calls = backend.calls.lock().await;
    assert_eq!(
        calls
            .iter()
            .filter(|call| call.ends_with("/roles"))
            .count(),
        3
    );
}

#[tokio::test]
async fn exhausted_retries_are_unavailable() {
    let backend = Backend::default();
    backend.role_failures_left.store(5, Ordering::SeqCst);
    let api = client(spawn_backend(backend).await, TOKEN);

    let roles = api.list_roles(InitiativeId::new(10)).await;

    assert!(matches!(roles, Err(AppError::Unavailable(_))));
}

#[tokio::test]
async fn status_codes_map_to_error_kinds() {
    let address = spawn_backend(Backend::default()).await;

    let unauthorized = client(address, "wrong")
        .fetch_initiative(InitiativeId::new(10))
        .await;
    let missing = client(address, TOKEN)
        .fetch_initiative(InitiativeId::new(11))
        .await;

    assert!(matches!(unauthorized, Err(AppError::Unauthorized(_))));
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn missing_guild_membership_is_none() {
    let api = client(spawn_backend(Backend::default()).await, TOKEN);

    let stranger = api
        .fetch_guild_membership(GuildId::new(1), UserId::new(7))
        .await;
    let admin = api
        .fetch_guild_membership(GuildId::new(1), UserId::new(9))
        .await;

    assert_eq!(stranger, Ok(None));
    assert!(matches!(admin, Ok(Some(membership)) if membership.role == GuildRole::Admin));
}

#[tokio::test]
async fn server_permissions_default_missing_flags_to_denied() {
    let api = client(spawn_backend(Backend::default()).await, TOKEN);

    let permissions = api
        .fetch_my_permissions(InitiativeId::new(10))
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(permissions.get(PermissionKey::ViewDocs));
    assert!(!permissions.get(PermissionKey::ViewProjects));
}

#[tokio::test]
async fn resource_snapshot_collects_both_grant_kinds_and_tags() {
    let api = client(spawn_backend(Backend::default()).await, TOKEN);

    let snapshot = api
        .fetch_resource(document_ref(5))
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(snapshot.grants.len(), 2);
    assert_eq!(
        snapshot.level_for(Principal::Role(RoleId::new(4))),
        Some(AccessLevel::Write)
    );
    assert!(snapshot.tag_ids.contains(&TagId::new(3)));
}

#[tokio::test]
async fn owner_role_grant_in_payload_is_rejected() {
    let api = client(spawn_backend(Backend::default()).await, TOKEN);

    let snapshot = api.fetch_resource(document_ref(66)).await;

    assert!(matches!(snapshot, Err(AppError::Internal(_))));
}

#[tokio::test]
async fn user_grant_is_posted_with_level() {
    let backend = Backend::default();
    let api = client(spawn_backend(backend.clone()).await, TOKEN);
    let grant = ResourceGrant::new(Principal::User(UserId::new(7)), AccessLevel::Write)
        .unwrap_or_else(|_| unreachable!());

    let result = api
        .execute(ResourceCommand::PutGrant {
            resource: document_ref(5),
            grant,
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(
        *backend.bodies.lock().await,
        vec![json!({ "user_id": 7, "level": "write" })]
    );
}

#[tokio::test]
async fn rejected_mutation_is_forbidden() {
    let api = client(spawn_backend(Backend::default()).await, TOKEN);

    let result = api
        .execute(ResourceCommand::DeleteGrant {
            resource: document_ref(5),
            principal: Principal::Role(RoleId::new(13)),
        })
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn current_user_becomes_identity() {
    let api = client(spawn_backend(Backend::default()).await, TOKEN);

    let identity = api
        .fetch_current_user(GuildId::new(1))
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(identity.user_id(), 7);
    assert_eq!(identity.display_name(), "Ada");
    assert_eq!(identity.guild_id(), GuildId::new(1));
}
