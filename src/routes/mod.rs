/// Router Module Index
///
/// One router per resource. Each resource router splits its endpoints into access
/// groups (public, authenticated, self-or-admin, admin-only) and wraps every group
/// except the public one in the matching gate middleware via `route_layer`, so a
/// protected endpoint can never be registered without its gate.

/// Registration and login. Entirely public.
pub mod auth;

/// Account maintenance and sign-up statistics.
pub mod users;

/// The catalog: public reads, admin writes.
pub mod products;

/// Shopping carts, owned by the authenticated caller.
pub mod carts;

/// Orders and the income report.
pub mod orders;
