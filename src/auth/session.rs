//! The identity of the user making a request.

use crate::user::{Email, Role, User, UserID};

/// Who is logged in, inserted into each protected request by the auth middleware.
///
/// Handlers take it as `Extension(session): Extension<SessionContext>`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub user_id: UserID,
    pub email: Email,
    pub role: Role,
}

impl SessionContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for SessionContext {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}
