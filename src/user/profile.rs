//! The profile page and the endpoints for editing contact details and changing the password.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    alert::Alert,
    auth::{PASSWORD_INPUT_MIN_LENGTH, PasswordHash, SessionContext, ValidatedPassword},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        PAGE_CONTAINER_STYLE, base, loading_spinner, password_input,
    },
    navigation::NavBar,
    user::{User, get_user_by_id, update_password, update_profile},
};

/// The state needed for the profile page and its endpoints.
#[derive(Debug, Clone)]
pub struct ProfileState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProfileState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn text_input(name: &str, label: &str, input_type: &str, value: &str) -> Markup {
    let id = name.replace('_', "-");

    html! {
        div
        {
            label for=(id) class=(FORM_LABEL_STYLE) { (label) }

            input
                type=(input_type)
                name=(name)
                id=(id)
                value=(value)
                class=(FORM_TEXT_INPUT_STYLE);
        }
    }
}

fn profile_view(user: &User, nav_bar: NavBar) -> Markup {
    html! {
        (nav_bar.into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class=(FORM_CONTAINER_STYLE)
            {
                h2 class="text-xl font-bold mb-4" { "Profile" }

                form
                    hx-put=(endpoints::PROFILE_API)
                    hx-target-error="#alert-container"
                    hx-swap="none"
                    class="space-y-4 mb-8"
                {
                    div
                    {
                        label for="email" class=(FORM_LABEL_STYLE) { "Email" }
                        input
                            type="email"
                            id="email"
                            value=(user.email)
                            disabled
                            class=(FORM_TEXT_INPUT_STYLE);
                    }

                    (text_input("full_name", "Full name", "text", &user.full_name))
                    (text_input("phone", "Phone", "tel", &user.phone))

                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save" }
                }

                h2 class="text-xl font-bold mb-4" { "Change password" }

                form
                    hx-put=(endpoints::PASSWORD_API)
                    hx-target-error="#alert-container"
                    hx-swap="none"
                    hx-on--after-request="if (event.detail.successful) this.reset()"
                    hx-indicator="#indicator"
                    class="space-y-4"
                {
                    (password_input("current_password", "Current password", 0, None))
                    (password_input("new_password", "New password", PASSWORD_INPUT_MIN_LENGTH, None))
                    (password_input(
                        "confirm_password",
                        "Confirm new password",
                        PASSWORD_INPUT_MIN_LENGTH,
                        None,
                    ))

                    button type="submit" class=(BUTTON_PRIMARY_STYLE)
                    {
                        span class="inline htmx-indicator" id="indicator" { (loading_spinner()) }
                        "Change password"
                    }
                }
            }
        }
    }
}

/// Display the logged-in user's profile.
pub async fn get_profile_page(
    State(state): State<ProfileState>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("Could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match get_user_by_id(session.user_id, &connection) {
            Ok(user) => user,
            Err(error) => {
                tracing::error!("Could not load profile for user {}: {error}", session.user_id);
                return Error::RetrievalFailed("your profile".to_owned()).into_response();
            }
        }
    };

    let nav_bar = NavBar::for_role(endpoints::PROFILE_VIEW, session.is_admin());
    base("Profile", &[], &profile_view(&user, nav_bar)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
}

/// Save the full name and phone number.
pub async fn update_profile_endpoint(
    State(state): State<ProfileState>,
    Extension(session): Extension<SessionContext>,
    Form(form): Form<ProfileForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_profile(session.user_id, &form.full_name, &form.phone, &connection) {
        Ok(()) => Alert::SuccessSimple {
            message: "Profile saved".to_owned(),
        }
        .into_response(),
        Err(error) => {
            tracing::error!("Could not update profile for user {}: {error}", session.user_id);
            error.into_alert_response()
        }
    }
}

#[derive(Deserialize)]
pub struct PasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

fn change_password(
    session: &SessionContext,
    form: &PasswordForm,
    connection: &Connection,
) -> Result<(), Error> {
    let user = get_user_by_id(session.user_id, connection)?;

    match user.password_hash.verify(&form.current_password) {
        Ok(true) => {}
        Ok(false) => return Err(Error::InvalidCredentials),
        Err(error) => return Err(Error::HashingError(error.to_string())),
    }

    let password = ValidatedPassword::new(&form.new_password, &[user.email.as_ref()])?;

    if form.new_password != form.confirm_password {
        return Err(Error::PasswordMismatch);
    }

    let password_hash = PasswordHash::new(password, PasswordHash::DEFAULT_COST)?;
    update_password(user.id, &password_hash, connection)
}

/// Replace the password after checking the current one.
pub async fn change_password_endpoint(
    State(state): State<ProfileState>,
    Extension(session): Extension<SessionContext>,
    Form(form): Form<PasswordForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match change_password(&session, &form, &connection) {
        Ok(()) => {
            tracing::info!("User {} changed their password", session.user_id);
            Alert::SuccessSimple {
                message: "Password changed".to_owned(),
            }
            .into_response()
        }
        Err(error) => {
            if !matches!(
                error,
                Error::InvalidCredentials | Error::TooWeak(_) | Error::PasswordMismatch
            ) {
                tracing::error!("Could not change password for user {}: {error}", session.user_id);
            }

            error.into_alert_response()
        }
    }
}
