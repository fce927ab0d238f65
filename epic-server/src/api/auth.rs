//! Token authentication for epic-server
//!
//! `POST /api/token-auth` exchanges username + password for the user's
//! token. Every other `/api` route runs [`auth_middleware`], which resolves
//! `Authorization: Token <key>` to a [`CurrentUser`] request extension.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use epic_common::api::auth::{
    authenticate_credentials, get_or_create_token, parse_authorization_header,
    user_id_for_token, ApiAuthError,
};
use epic_common::api::{ErrorResponse, TokenRequest, TokenResponse};
use epic_common::db::EpicUser;
use tracing::{debug, info, warn};

use super::ApiJson;
use crate::db::users;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Authenticated user of the current request
#[derive(Debug, Clone)]
pub struct CurrentUser(pub EpicUser);

impl CurrentUser {
    /// Fail with 403 unless the user is staff
    pub fn require_staff(&self) -> ApiResult<()> {
        if self.0.is_staff {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "You do not have permission to perform this action".to_string(),
            ))
        }
    }
}

/// Authentication middleware
///
/// Returns 401 when the header is missing, malformed or names an unknown
/// token. Applied to protected routes only.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError(ApiAuthError::MissingToken))?
        .to_str()
        .map_err(|_| {
            AuthError(ApiAuthError::MalformedHeader(
                "header is not valid ASCII".to_string(),
            ))
        })?;

    let key = parse_authorization_header(header).map_err(AuthError)?;
    let user_id = user_id_for_token(&state.db, key).await.map_err(AuthError)?;

    let user = users::get_user(&state.db, user_id)
        .await
        .map_err(|e| AuthError(ApiAuthError::DatabaseError(e.to_string())))?
        .ok_or(AuthError(ApiAuthError::InvalidToken))?;

    debug!("Authenticated request from '{}'", user.username);
    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

/// POST /api/token-auth
///
/// Bad credentials are a 400, not a 401: the request itself is what failed.
pub async fn obtain_auth_token(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let user_id = match authenticate_credentials(&state.db, &request.username, &request.password).await
    {
        Ok(id) => id,
        Err(ApiAuthError::InvalidCredentials) => {
            warn!("Failed login for '{}'", request.username);
            return Err(ApiError::BadRequest(
                ApiAuthError::InvalidCredentials.to_string(),
            ));
        }
        Err(e) => return Err(ApiError::Internal(e.to_string())),
    };

    let token = get_or_create_token(&state.db, user_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!("Issued token for '{}'", request.username);
    Ok(Json(TokenResponse { token }))
}

/// Authentication failure rendered as a JSON error response
#[derive(Debug)]
pub struct AuthError(pub ApiAuthError);

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match self.0 {
            ApiAuthError::DatabaseError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR")
            }
            _ => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
        };

        if status.is_server_error() {
            warn!("Authentication check failed: {}", self.0);
        }

        let mut response =
            (status, Json(ErrorResponse::new(code, self.0.to_string()))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Token"),
            );
        }
        response
    }
}
