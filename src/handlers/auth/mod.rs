// handlers/auth/mod.rs - Session authentication endpoints
//
// All four routes are public at the router level; `me` and `logout` read the
// session token themselves.

use axum::{routing::{get, post}, Router};

use crate::handlers::AppState;

pub mod login;    // POST /next_api/auth/login
pub mod logout;   // POST /next_api/auth/logout
pub mod me;       // GET /next_api/auth/me
pub mod register; // POST /next_api/auth/register

pub use login::login_post;
pub use logout::logout_post;
pub use me::me_get;
pub use register::register_post;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/next_api/auth/register", post(register_post))
        .route("/next_api/auth/login", post(login_post))
        .route("/next_api/auth/me", get(me_get))
        .route("/next_api/auth/logout", post(logout_post))
}
