/// Router Module Index
///
/// Routes are split by who may reach them. `create_router` wraps each group in the
/// matching gate, so a handler never has to repeat the role check of its group.
///
/// Groups may declare different methods on the same path (GET for everyone, PATCH for
/// admins); `Router::merge` combines them and each method keeps its own gate.

/// Routes reachable without credentials.
pub mod public;

/// Routes for any authenticated, active user.
pub mod authenticated;

/// Routes for staff (admin, teacher).
pub mod staff;

/// Routes for administrators only.
pub mod admin;
