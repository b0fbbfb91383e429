//! Extractor resolving the visitor's open cart.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{Cart, CurrentUser, session_keys};
use crate::services::CartService;
use crate::state::AppState;

/// The visitor's open cart.
///
/// Logged-in users get their customer's cart; anonymous visitors get the
/// cart remembered in their session, or an unsaved empty one.
pub struct CurrentCart(pub Cart);

impl FromRequestParts<AppState> for CurrentCart {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let user: Option<CurrentUser> = session.get(session_keys::CURRENT_USER).await?;

        let cart = CartService::new(state.pool())
            .resolve(&session, user.as_ref())
            .await?;

        Ok(Self(cart))
    }
}
