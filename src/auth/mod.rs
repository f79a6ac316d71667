//! User authentication: passwords, the session cookie, the auth middleware and
//! the log-in, log-out and registration pages.

mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod redirect;
mod register;
mod session;
mod token;

pub use cookie::{
    COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, extend_auth_cookie_duration_if_needed,
    get_token_from_cookies, invalidate_auth_cookie, set_auth_cookie,
};
pub use log_in::{LoginState, get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{AuthState, admin_guard, auth_guard, auth_guard_hx};
pub use password::{PasswordHash, ValidatedPassword};
pub use redirect::normalize_redirect_url;
pub use register::{PASSWORD_INPUT_MIN_LENGTH, get_register_page, register_user};
pub use session::SessionContext;
pub use token::Token;
