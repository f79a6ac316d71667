//! Middleware that authenticates requests, slides the session expiry and
//! restricts the admin area.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        SessionContext, extend_auth_cookie_duration_if_needed, get_token_from_cookies,
        invalidate_auth_cookie,
        redirect::{build_log_in_redirect_url, log_in_url_with_redirect},
    },
    endpoints,
    not_found::NotFoundError,
    timezone::get_local_offset,
    user::{User, UserID, get_user_by_id},
};

/// How far each authenticated request pushes out the session expiry.
const SESSION_EXTENSION: Duration = Duration::minutes(5);

/// The state needed for the auth middleware.
#[derive(Clone)]
pub struct AuthState {
    pub cookie_key: Key,
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Copy the `Set-Cookie` headers from `jar` onto `response`.
fn with_cookies(response: Response, jar: PrivateCookieJar) -> Response {
    let (mut parts, body) = response.into_parts();

    for (key, value) in jar.into_response().headers().iter() {
        if key == SET_COOKIE {
            parts.headers.append(key, value.to_owned());
        }
    }

    Response::from_parts(parts, body)
}

fn load_user(state: &AuthState, user_id: UserID) -> Result<User, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("Could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_user_by_id(user_id, &connection)
}

async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let log_in_redirect_url = build_log_in_redirect_url(&request).unwrap_or_else(|| {
        log_in_url_with_redirect(endpoints::DASHBOARD_VIEW)
            .unwrap_or_else(|| endpoints::LOG_IN_VIEW.to_owned())
    });

    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!(
            "Invalid timezone {}. Redirecting to log in page.",
            state.local_timezone
        );
        return get_redirect(&log_in_redirect_url);
    };

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("Could not get cookie jar: {error:?}. Redirecting to log in page.");
            return get_redirect(&log_in_redirect_url);
        }
    };

    let token = match get_token_from_cookies(&jar) {
        Ok(token) => token,
        Err(error) => {
            tracing::debug!("Rejecting request to {}: {error}", parts.uri.path());
            return get_redirect(&log_in_redirect_url);
        }
    };

    let user = match load_user(&state, token.user_id) {
        Ok(user) => user,
        Err(Error::NotFound) => {
            tracing::warn!("Token for missing user {}", token.user_id);
            return with_cookies(
                get_redirect(&log_in_redirect_url),
                invalidate_auth_cookie(jar),
            );
        }
        Err(error) => return error.into_response(),
    };

    if user.is_blocked() {
        tracing::info!("Blocked user {} was logged out", user.id);
        return with_cookies(
            get_redirect(&log_in_redirect_url),
            invalidate_auth_cookie(jar),
        );
    }

    parts.extensions.insert(SessionContext::from(&user));
    let response = next.run(Request::from_parts(parts, body)).await;

    let jar = match extend_auth_cookie_duration_if_needed(
        jar.clone(),
        SESSION_EXTENSION,
        local_offset,
    ) {
        Ok(updated_jar) => updated_jar,
        Err(error) => {
            tracing::error!("Could not extend session: {error}. Keeping the old cookie.");
            jar
        }
    };

    with_cookies(response, jar)
}

/// Only let logged-in, active users through to page routes, redirecting
/// everyone else to the log-in page.
///
/// Handlers behind this layer can take `Extension<SessionContext>`.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// The same as [auth_guard], but for HTMX endpoints, which need an
/// `HX-Redirect` instead of a 303.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}

/// Hide admin routes from anyone who is not an admin.
///
/// Must be layered inside [auth_guard] or [auth_guard_hx].
pub async fn admin_guard(request: Request, next: Next) -> Response {
    let is_admin = request
        .extensions()
        .get::<SessionContext>()
        .is_some_and(SessionContext::is_admin);

    if !is_admin {
        return NotFoundError.into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod auth_guard_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Router,
        extract::{Path, State},
        http::StatusCode,
        middleware,
        routing::{get, post},
    };
    use axum_extra::extract::{
        PrivateCookieJar,
        cookie::{Cookie, Key, SameSite},
    };
    use axum_test::TestServer;
    use rusqlite::Connection;
    use sha2::Digest;
    use time::{Duration, OffsetDateTime, UtcOffset};

    use crate::{
        Error,
        auth::{
            AuthState, COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, SessionContext, admin_guard,
            auth_guard, auth_guard_hx, set_auth_cookie,
        },
        endpoints::{self, format_endpoint},
        test_utils::{get_test_connection, insert_test_user},
        user::{Role, UserID, UserStatus, set_user_role, set_user_status},
    };

    async fn whoami(Extension(session): Extension<SessionContext>) -> String {
        session.email.to_string()
    }

    async fn stub_log_in_route(
        State(state): State<AuthState>,
        Path(user_id): Path<i64>,
        jar: PrivateCookieJar,
    ) -> Result<PrivateCookieJar, Error> {
        set_auth_cookie(
            jar,
            UserID::new(user_id),
            state.cookie_duration,
            UtcOffset::UTC,
        )
    }

    const TEST_LOG_IN_ROUTE: &str = "/log_in/{user_id}";
    const TEST_PROTECTED_ROUTE: &str = "/protected";
    const TEST_ADMIN_ROUTE: &str = "/admin_only";
    const TEST_API_ROUTE: &str = "/api/protected";

    fn get_state(connection: Connection, cookie_duration: Duration) -> AuthState {
        AuthState {
            cookie_key: Key::from(&sha2::Sha512::digest("nafstenoas")),
            cookie_duration,
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn get_test_server(state: AuthState) -> TestServer {
        let admin_routes = Router::new()
            .route(TEST_ADMIN_ROUTE, get(whoami))
            .route_layer(middleware::from_fn(admin_guard))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

        let app = Router::new()
            .route(TEST_PROTECTED_ROUTE, get(whoami))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard))
            .merge(admin_routes)
            .route(
                TEST_API_ROUTE,
                get(whoami).route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_guard_hx,
                )),
            )
            .route(TEST_LOG_IN_ROUTE, post(stub_log_in_route))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    fn expected_log_in_location(target: &str) -> String {
        let query = serde_urlencoded::to_string([("redirect_url", target)]).unwrap();
        format!("{}?{query}", endpoints::LOG_IN_VIEW)
    }

    #[tokio::test]
    async fn valid_cookie_passes_session_to_handler() {
        let connection = get_test_connection();
        let user = insert_test_user("someone@example.com", &connection);
        let server = get_test_server(get_state(connection, DEFAULT_COOKIE_DURATION));
        let log_in = server
            .post(&format_endpoint(TEST_LOG_IN_ROUTE, user.id.as_i64()))
            .await;
        log_in.assert_status_ok();

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(log_in.cookie(COOKIE_TOKEN))
            .await;

        response.assert_status_ok();
        response.assert_text("someone@example.com");
    }

    #[track_caller]
    fn assert_date_time_close(left: OffsetDateTime, right: OffsetDateTime) {
        assert!(
            (left - right).abs() < Duration::seconds(1),
            "got date time {left:?}, want {right:?}"
        );
    }

    #[tokio::test]
    async fn auth_guard_slides_session_expiry() {
        let connection = get_test_connection();
        let user = insert_test_user("someone@example.com", &connection);
        let server = get_test_server(get_state(connection, Duration::seconds(5)));
        let log_in = server
            .post(&format_endpoint(TEST_LOG_IN_ROUTE, user.id.as_i64()))
            .await;

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(log_in.cookie(COOKIE_TOKEN))
            .await;

        let cookie = response.cookie(COOKIE_TOKEN);
        assert_date_time_close(
            cookie.expires_datetime().unwrap(),
            OffsetDateTime::now_utc() + Duration::minutes(5),
        );
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    }

    #[tokio::test]
    async fn missing_cookie_redirects_to_log_in() {
        let server = get_test_server(get_state(get_test_connection(), DEFAULT_COOKIE_DURATION));

        let response = server.get(TEST_PROTECTED_ROUTE).await;

        response.assert_status_see_other();
        assert_eq!(
            response.header("location"),
            expected_log_in_location(TEST_PROTECTED_ROUTE)
        );
    }

    #[tokio::test]
    async fn garbage_cookie_redirects_to_log_in() {
        let server = get_test_server(get_state(get_test_connection(), DEFAULT_COOKIE_DURATION));

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(Cookie::build((COOKIE_TOKEN, "FOOBAR")).build())
            .await;

        response.assert_status_see_other();
        assert_eq!(
            response.header("location"),
            expected_log_in_location(TEST_PROTECTED_ROUTE)
        );
    }

    #[tokio::test]
    async fn expired_token_redirects_to_log_in() {
        let connection = get_test_connection();
        let user = insert_test_user("someone@example.com", &connection);
        let server = get_test_server(get_state(connection, Duration::seconds(-10)));
        let log_in = server
            .post(&format_endpoint(TEST_LOG_IN_ROUTE, user.id.as_i64()))
            .await;

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(log_in.cookie(COOKIE_TOKEN))
            .await;

        response.assert_status_see_other();
    }

    #[tokio::test]
    async fn blocked_user_is_logged_out() {
        let connection = get_test_connection();
        let user = insert_test_user("someone@example.com", &connection);
        set_user_status(user.id, UserStatus::Blocked, &connection).unwrap();
        let server = get_test_server(get_state(connection, DEFAULT_COOKIE_DURATION));
        let log_in = server
            .post(&format_endpoint(TEST_LOG_IN_ROUTE, user.id.as_i64()))
            .await;

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(log_in.cookie(COOKIE_TOKEN))
            .await;

        response.assert_status_see_other();
        let cookie = response.cookie(COOKIE_TOKEN);
        assert_eq!(cookie.expires_datetime(), Some(OffsetDateTime::UNIX_EPOCH));
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn token_for_deleted_user_redirects_to_log_in() {
        let server = get_test_server(get_state(get_test_connection(), DEFAULT_COOKIE_DURATION));
        let log_in = server.post(&format_endpoint(TEST_LOG_IN_ROUTE, 99)).await;

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(log_in.cookie(COOKIE_TOKEN))
            .await;

        response.assert_status_see_other();
    }

    #[tokio::test]
    async fn api_route_redirects_back_to_current_page() {
        let server = get_test_server(get_state(get_test_connection(), DEFAULT_COOKIE_DURATION));
        let current_url = "/dashboard?month=2025-10";

        let response = server
            .get(TEST_API_ROUTE)
            .add_header("HX-Request", "true")
            .add_header("HX-Current-URL", current_url)
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.header("hx-redirect"),
            expected_log_in_location(current_url)
        );
    }

    #[tokio::test]
    async fn admin_route_is_hidden_from_users() {
        let connection = get_test_connection();
        let user = insert_test_user("someone@example.com", &connection);
        let server = get_test_server(get_state(connection, DEFAULT_COOKIE_DURATION));
        let log_in = server
            .post(&format_endpoint(TEST_LOG_IN_ROUTE, user.id.as_i64()))
            .await;

        let response = server
            .get(TEST_ADMIN_ROUTE)
            .add_cookie(log_in.cookie(COOKIE_TOKEN))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_route_allows_admins() {
        let connection = get_test_connection();
        let admin = insert_test_user("admin@example.com", &connection);
        set_user_role(admin.id, Role::Admin, &connection).unwrap();
        let server = get_test_server(get_state(connection, DEFAULT_COOKIE_DURATION));
        let log_in = server
            .post(&format_endpoint(TEST_LOG_IN_ROUTE, admin.id.as_i64()))
            .await;

        let response = server
            .get(TEST_ADMIN_ROUTE)
            .add_cookie(log_in.cookie(COOKIE_TOKEN))
            .await;

        response.assert_status_ok();
        response.assert_text("admin@example.com");
    }

    #[tokio::test]
    async fn admin_route_without_cookie_redirects_to_log_in() {
        let server = get_test_server(get_state(get_test_connection(), DEFAULT_COOKIE_DURATION));

        let response = server.get(TEST_ADMIN_ROUTE).await;

        response.assert_status_see_other();
    }
}
