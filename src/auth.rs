use axum::{
    extract::{FromRequestParts, Path, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{collections::HashMap, sync::Arc};

use crate::{
    access::{
        ADMIN_ONLY, AUTHENTICATED, AccessError, Decision, Gate, GateContext, Principal,
        SELF_OR_ADMIN, evaluate,
    },
    error::AppError,
    token::TokenService,
};

/// The header clients send their bearer token in.
pub const TOKEN_HEADER: &str = "token";

/// Path parameters a self-or-admin gate compares the principal against, in order.
const TARGET_PARAMS: &[&str] = &["id", "user_id"];

/// Reads the credential header: `token`, falling back to `Authorization`.
fn credential(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(TOKEN_HEADER)
        .or_else(|| headers.get(header::AUTHORIZATION))
        .map(|value| value.to_str().unwrap_or_default())
}

/// Runs `gates` for one request and, on success, stores the Principal in the request
/// extensions before handing over to the route.
async fn guard(
    gates: &[Gate],
    tokens: &TokenService,
    target_id: Option<&str>,
    mut request: Request,
    next: Next,
) -> Response {
    let ctx = GateContext::new(credential(request.headers()), target_id);
    match evaluate(gates, ctx, tokens) {
        Decision::Allow(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Decision::Deny(reason) => AppError::Access(reason).into_response(),
    }
}

/// require_token
///
/// Middleware for routes open to any authenticated caller.
pub async fn require_token(
    State(tokens): State<Arc<TokenService>>,
    request: Request,
    next: Next,
) -> Response {
    guard(AUTHENTICATED, &tokens, None, request, next).await
}

/// require_self_or_admin
///
/// Middleware for routes addressing one account: the caller must be that account
/// (the `id` or `user_id` path parameter) or an administrator.
pub async fn require_self_or_admin(
    State(tokens): State<Arc<TokenService>>,
    Path(params): Path<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Response {
    let target = TARGET_PARAMS
        .iter()
        .find_map(|name| params.get(*name))
        .map(String::as_str);
    guard(SELF_OR_ADMIN, &tokens, target, request, next).await
}

/// require_admin
///
/// Middleware for administrator-only routes.
pub async fn require_admin(
    State(tokens): State<Arc<TokenService>>,
    request: Request,
    next: Next,
) -> Response {
    guard(ADMIN_ONLY, &tokens, None, request, next).await
}

/// Principal Extractor Implementation
///
/// Handlers behind a gate take `Principal` as an argument. The gate middleware has
/// already verified the token; the extractor only reads the result back out of the
/// request extensions. Without a gate in front there is no principal, and the request
/// is answered as unauthenticated.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AppError::Access(AccessError::Unauthenticated))
    }
}
