use axum::{
    extract::State,
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    error::{AppError, AppResult},
    extract::{AppJson, AppQuery, UserId},
    state::AppState,
    users::{
        dto::{
            ChangePasswordRequest, CreateUserRequest, LoginRequest, LoginResponse,
            MessageResponse, SearchParams, UpdateUserRequest,
        },
        password,
        repo::{self, RepoError},
        repo_types::{PublicUser, UserChanges},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/user/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/user/:id/password", put(change_password))
        .route("/search", get(search_users))
        .route("/login", post(login))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<PublicUser>>> {
    let mut conn = state.conn().await?;
    let users = repo::list_all(&mut conn).await?;
    Ok(Json(users))
}

#[instrument(skip(state, id), fields(user_id = id.0))]
pub async fn get_user(
    State(state): State<AppState>,
    id: UserId,
) -> AppResult<Json<PublicUser>> {
    let mut conn = state.conn().await?;
    let user = repo::get_by_id(&mut conn, id.0).await?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<PublicUser>)> {
    let new_user = payload.validate()?;
    let hash = password::hash_in_background(new_user.password).await?;

    let mut conn = state.conn().await?;
    let user = match repo::create(&mut conn, &new_user.name, &new_user.email, &hash).await {
        Ok(u) => u,
        Err(RepoError::EmailTaken) => {
            warn!(email = %new_user.email, "email already registered");
            return Err(AppError::Conflict);
        }
        Err(e) => return Err(e.into()),
    };

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/user/{}", user.id)) {
        headers.insert(LOCATION, location);
    }

    info!(user_id = user.id, "user created");
    Ok((StatusCode::CREATED, headers, Json(user)))
}

#[instrument(skip(state, id, payload), fields(user_id = id.0))]
pub async fn update_user(
    State(state): State<AppState>,
    id: UserId,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> AppResult<Json<PublicUser>> {
    let update = payload.validate()?;
    let changes = UserChanges {
        name: update.name.as_deref(),
        email: update.email.as_deref(),
    };

    let mut conn = state.conn().await?;
    let user = match repo::update(&mut conn, id.0, changes).await {
        Ok(u) => u,
        Err(RepoError::EmailTaken) => {
            warn!("update rejected: email belongs to another user");
            return Err(AppError::Conflict);
        }
        Err(e) => return Err(e.into()),
    };

    info!("user updated");
    Ok(Json(user))
}

#[instrument(skip(state, id, payload), fields(user_id = id.0))]
pub async fn change_password(
    State(state): State<AppState>,
    id: UserId,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let change = payload.validate()?;

    let mut conn = state.conn().await?;
    let user = repo::find_by_id(&mut conn, id.0)
        .await?
        .ok_or_else(AppError::user_not_found)?;

    if !password::verify_in_background(change.current, user.password_hash).await? {
        warn!("password change with wrong current password");
        return Err(AppError::InvalidCredentials);
    }

    let hash = password::hash_in_background(change.new).await?;
    repo::update_password(&mut conn, user.id, &hash).await?;

    info!("password changed");
    Ok(Json(MessageResponse {
        message: "Password updated successfully",
    }))
}

#[instrument(skip(state, id), fields(user_id = id.0))]
pub async fn delete_user(
    State(state): State<AppState>,
    id: UserId,
) -> AppResult<Json<MessageResponse>> {
    let mut conn = state.conn().await?;
    repo::delete(&mut conn, id.0).await?;

    info!("user deleted");
    Ok(Json(MessageResponse {
        message: "User deleted successfully",
    }))
}

#[instrument(skip(state, params))]
pub async fn search_users(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<SearchParams>,
) -> AppResult<Json<Vec<PublicUser>>> {
    let term = params.term()?;

    let mut conn = state.conn().await?;
    let users = repo::search_by_name(&mut conn, &term).await?;
    Ok(Json(users))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let creds = payload.validate()?;

    let user = {
        let mut conn = state.conn().await?;
        repo::find_by_email(&mut conn, &creds.email).await?
    };

    let Some(user) = user else {
        password::verify_against_dummy_in_background(creds.password).await;
        warn!(email = %creds.email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !password::verify_in_background(creds.password, user.password_hash).await? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = user.id, "user logged in");
    Ok(Json(LoginResponse {
        status: "success",
        user_id: user.id,
    }))
}
