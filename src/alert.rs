//! Alert fragments for displaying success and error messages to users.
//!
//! Error alerts are swapped into `#alert-container` by forms that set
//! `hx-target-error="#alert-container"`. Success alerts are sent as an
//! out-of-band swap so they can accompany any other swap, e.g. deleting a
//! table row.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

/// An alert message with optional details.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Success { message: String, details: String },
    SuccessSimple { message: String },
    Error { message: String, details: String },
    ErrorSimple { message: String },
}

const SUCCESS_ALERT_STYLE: &str = "p-4 mb-4 text-sm rounded-lg border \
    text-green-800 bg-green-50 border-green-300 \
    dark:bg-gray-800 dark:text-green-400 dark:border-green-800";

const ERROR_ALERT_STYLE: &str = "p-4 mb-4 text-sm rounded-lg border \
    text-red-800 bg-red-50 border-red-300 \
    dark:bg-gray-800 dark:text-red-400 dark:border-red-800";

impl Alert {
    fn is_success(&self) -> bool {
        matches!(self, Alert::Success { .. } | Alert::SuccessSimple { .. })
    }

    /// Render the alert without the surrounding container.
    pub fn into_html(self) -> Markup {
        let style = if self.is_success() {
            SUCCESS_ALERT_STYLE
        } else {
            ERROR_ALERT_STYLE
        };

        let (message, details) = match self {
            Alert::Success { message, details } | Alert::Error { message, details } => {
                (message, Some(details))
            }
            Alert::SuccessSimple { message } | Alert::ErrorSimple { message } => (message, None),
        };

        html! {
            div
                role="alert"
                class=(style)
                onclick="this.remove()"
            {
                p class="font-semibold" { (message) }

                @if let Some(details) = details {
                    p { (details) }
                }
            }
        }
    }

    /// Render the alert inside an `#alert-container` that replaces the page's
    /// container out-of-band, so it can ride along with another fragment.
    pub fn into_oob_html(self) -> Markup {
        html! {
            div
                id="alert-container"
                hx-swap-oob="true"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                (self.into_html())
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        if self.is_success() {
            self.into_oob_html().into_response()
        } else {
            self.into_html().into_response()
        }
    }
}
