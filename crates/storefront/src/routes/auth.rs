//! Authentication route handlers.
//!
//! Handles login, logout and registration with username/password accounts.
//! Failed submissions re-render the form with its errors.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{
    CurrentCart, Flashes, OptionalAuth, clear_current_user, push_flash, set_current_user,
};
use crate::models::{CurrentUser, Flash, User};
use crate::routes::PageContext;
use crate::services::auth::RegistrationInput;
use crate::services::{AuthError, AuthService, FormErrors};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub username: String,
    pub error: Option<String>,
}

/// Registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub form: RegistrationInput,
    pub errors: FormErrors,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip_all)]
pub async fn login_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    CurrentCart(cart): CurrentCart,
    flashes: Flashes,
) -> Result<LoginTemplate> {
    Ok(LoginTemplate {
        page: PageContext::load(&state, user, &cart, flashes).await?,
        username: String::new(),
        error: None,
    })
}

/// Handle login form submission.
#[instrument(skip_all, fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    CurrentCart(cart): CurrentCart,
    flashes: Flashes,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let auth = AuthService::new(state.pool(), &state.config().blocked_email_domains);

    match auth.login(&form.username, &form.password).await {
        Ok(account) => {
            start_session(&session, &account).await?;
            tracing::info!(user_id = %account.id, "User logged in");
            Ok(Redirect::to("/").into_response())
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("Login failed");
            Ok(LoginTemplate {
                page: PageContext::load(&state, user, &cart, flashes).await?,
                username: form.username,
                error: Some(INVALID_CREDENTIALS.to_string()),
            }
            .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Log the visitor out and return to the home page.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    push_flash(&session, Flash::info("You have been logged out")).await?;
    Ok(Redirect::to("/"))
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
#[instrument(skip_all)]
pub async fn registration_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    CurrentCart(cart): CurrentCart,
    flashes: Flashes,
) -> Result<RegisterTemplate> {
    Ok(RegisterTemplate {
        page: PageContext::load(&state, user, &cart, flashes).await?,
        form: RegistrationInput::default(),
        errors: FormErrors::new(),
    })
}

/// Handle registration form submission.
///
/// Creates the account and its customer profile, then logs the new user in.
#[instrument(skip_all, fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    CurrentCart(cart): CurrentCart,
    flashes: Flashes,
    Form(form): Form<RegistrationInput>,
) -> Result<Response> {
    let auth = AuthService::new(state.pool(), &state.config().blocked_email_domains);

    match auth.register(&form).await {
        Ok((account, customer)) => {
            start_session(&session, &account).await?;
            push_flash(&session, Flash::success("Registration complete. Welcome!")).await?;
            tracing::info!(user_id = %account.id, customer_id = %customer.id, "User registered");
            Ok(Redirect::to("/").into_response())
        }
        Err(AuthError::Validation(errors)) => {
            tracing::debug!(%errors, "Registration rejected");
            Ok(RegisterTemplate {
                page: PageContext::load(&state, user, &cart, flashes).await?,
                form: without_passwords(form),
                errors,
            }
            .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Store the user in the session and tag Sentry events with them.
async fn start_session(session: &Session, account: &User) -> Result<()> {
    let current = CurrentUser {
        id: account.id,
        username: account.username.clone(),
    };
    set_current_user(session, &current).await?;
    set_sentry_user(&account.id, Some(account.username.as_str()));
    Ok(())
}

/// Passwords are never echoed back into the form.
fn without_passwords(form: RegistrationInput) -> RegistrationInput {
    RegistrationInput {
        password: String::new(),
        confirm_password: String::new(),
        ..form
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_passwords_keeps_other_fields() {
        let form = RegistrationInput {
            username: "ann".to_owned(),
            email: "ann@example.com".to_owned(),
            password: "hunter2hunter2".to_owned(),
            confirm_password: "hunter2hunter2".to_owned(),
            ..RegistrationInput::default()
        };
        let cleared = without_passwords(form);
        assert_eq!(cleared.username, "ann");
        assert_eq!(cleared.email, "ann@example.com");
        assert!(cleared.password.is_empty());
        assert!(cleared.confirm_password.is_empty());
    }
}
