//! Route handlers.
//!
//! Every handler is a thin step between the HTTP boundary and either the
//! `AccountDirectory` or the record store. Access control has already run by the
//! time a handler sees the request; handlers that need the caller take `Principal`.

pub mod auth;
pub mod carts;
pub mod orders;
pub mod products;
pub mod users;

use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;

/// ListFilter
///
/// `?new` restricts a listing to the most recently created records. Any value,
/// including an empty one, counts as set.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilter {
    pub new: Option<String>,
}

impl ListFilter {
    pub fn newest(&self) -> bool {
        self.new.is_some()
    }
}

/// The confirmation body delete routes answer with.
pub(crate) fn deleted(what: &str) -> Json<String> {
    Json(format!("{} has been deleted...", what))
}
