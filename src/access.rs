//! Access gates.
//!
//! Every protected route runs an ordered list of gates before its handler. Gates are
//! evaluated in sequence against a [`GateContext`]; the first failing gate ends the
//! evaluation with [`Decision::Deny`]. A list that never authenticates the caller
//! cannot allow a request.

use thiserror::Error;

use crate::token::{TokenError, TokenService};

/// The scheme prefix a credential header must carry.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Principal
///
/// The authenticated identity derived from a verified token. Lives in the request
/// extensions for the duration of one request and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub account_id: String,
    pub is_admin: bool,
}

impl Principal {
    /// True when this principal owns `target_id` or is an administrator.
    pub fn may_act_on(&self, target_id: &str) -> bool {
        self.is_admin || self.account_id == target_id
    }
}

/// AccessError
///
/// The reasons a gate can deny a request. The kinds stay distinct here even though
/// `InvalidToken`, `Expired` and `Forbidden` share a status code on the wire.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AccessError {
    /// No credential header was presented.
    #[error("no credential presented")]
    Unauthenticated,
    #[error("credential is not valid")]
    InvalidToken,
    #[error("credential has expired")]
    Expired,
    /// Authenticated, but not permitted to perform this action.
    #[error("not permitted")]
    Forbidden,
}

impl From<TokenError> for AccessError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AccessError::Expired,
            _ => AccessError::InvalidToken,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// A valid, unexpired bearer token must be presented.
    Authenticated,
    /// The principal must own the targeted resource id, or be an admin.
    SelfOrAdmin,
    AdminOnly,
}

/// Any caller holding a valid token.
pub const AUTHENTICATED: &[Gate] = &[Gate::Authenticated];
/// The account named by the path, or an admin.
pub const SELF_OR_ADMIN: &[Gate] = &[Gate::Authenticated, Gate::SelfOrAdmin];
pub const ADMIN_ONLY: &[Gate] = &[Gate::Authenticated, Gate::AdminOnly];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(Principal),
    Deny(AccessError),
}

/// GateContext
///
/// What the gates can see of a request: the raw credential header value, if one was
/// sent, and the resource id the route targets, if any.
#[derive(Debug, Default, Clone)]
pub struct GateContext<'a> {
    pub credential: Option<&'a str>,
    pub target_id: Option<&'a str>,
    principal: Option<Principal>,
}

impl<'a> GateContext<'a> {
    pub fn new(credential: Option<&'a str>, target_id: Option<&'a str>) -> Self {
        Self {
            credential,
            target_id,
            principal: None,
        }
    }
}

impl Gate {
    fn check(self, ctx: &mut GateContext<'_>, tokens: &TokenService) -> Result<(), AccessError> {
        match self {
            Gate::Authenticated => {
                let header = ctx.credential.ok_or(AccessError::Unauthenticated)?;
                let token = header
                    .strip_prefix(BEARER_PREFIX)
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or(AccessError::InvalidToken)?;
                ctx.principal = Some(tokens.verify(token)?);
                Ok(())
            }
            Gate::SelfOrAdmin => {
                let principal = ctx.principal.as_ref().ok_or(AccessError::Unauthenticated)?;
                match ctx.target_id {
                    Some(target) if principal.may_act_on(target) => Ok(()),
                    None if principal.is_admin => Ok(()),
                    _ => Err(AccessError::Forbidden),
                }
            }
            Gate::AdminOnly => {
                let principal = ctx.principal.as_ref().ok_or(AccessError::Unauthenticated)?;
                if principal.is_admin {
                    Ok(())
                } else {
                    Err(AccessError::Forbidden)
                }
            }
        }
    }
}

/// evaluate
///
/// Runs `gates` in order, stopping at the first denial.
pub fn evaluate(gates: &[Gate], mut ctx: GateContext<'_>, tokens: &TokenService) -> Decision {
    for gate in gates {
        if let Err(reason) = gate.check(&mut ctx, tokens) {
            tracing::debug!(?gate, ?reason, "access denied");
            return Decision::Deny(reason);
        }
    }

    match ctx.principal {
        Some(principal) => Decision::Allow(principal),
        None => Decision::Deny(AccessError::Unauthenticated),
    }
}
