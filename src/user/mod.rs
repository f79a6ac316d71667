//! User accounts: identity, roles, storage and the profile page.

mod db;
mod domain;
mod profile;

pub use db::{
    count_search_users, count_users, create_user, create_user_table, get_user_by_email,
    get_user_by_id, search_users, set_user_role, set_user_status, update_password,
    update_profile,
};
pub use domain::{Email, Role, User, UserID, UserStatus};
pub use profile::{
    ProfileState, change_password_endpoint, get_profile_page, update_profile_endpoint,
};
