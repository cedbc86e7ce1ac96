//! Stateless JWT authentication.
//!
//! Login issues a short-lived access token (15 min) and a long-lived refresh
//! token (24 h). The access token travels in the `Authorization` header; the
//! refresh token travels in a host-locked cookie or a form field and is
//! exchanged for a new pair near the end of its life. Nothing is stored
//! server-side: validity is signature plus expiry.

mod cookie;
mod errors;
mod issuer;
mod middleware;
mod refresh;
mod state;
mod verifier;

pub use cookie::{
    REFRESH_COOKIE_NAME, REFRESH_FORM_FIELD, RefreshForm, clear_refresh_cookie, refresh_cookie,
    refresh_token_from_jar,
};
pub use errors::{AuthError, Unauthorized, too_early};
pub use middleware::{Auth, AuthenticatedUser, require_auth};
pub use refresh::{
    EARLY_REFRESH_WINDOW_SECS, RefreshPolicy, RefreshSource, is_too_early, refresh,
    refresh_with_policy,
};
pub use state::AuthSettings;
pub use verifier::BEARER_SCHEME;
