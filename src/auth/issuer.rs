//! Access/refresh token pair issuance.

use super::state::AuthSettings;
use crate::db::User;
use crate::jwt::{
    ACCESS_TOKEN_DURATION_SECS, AccessClaims, JwtError, REFRESH_TOKEN_DURATION_SECS,
    RefreshClaims, TokenPair, now_secs,
};

impl AuthSettings {
    /// Issue a fresh token pair for a user.
    /// Fails only if signing fails; there is no business-rule rejection here.
    pub fn issue(&self, user: &User) -> Result<TokenPair, JwtError> {
        self.issue_at(user, now_secs())
    }

    /// Issue a token pair as if the current time were `now`.
    pub fn issue_at(&self, user: &User, now: u64) -> Result<TokenPair, JwtError> {
        let subject = user.id.to_string();

        let access = AccessClaims {
            sub: subject.clone(),
            name: user.full_name(),
            iss: self.domain.clone(),
            aud: self.domain.clone(),
            admin: user.is_admin,
            iat: now,
            exp: now + ACCESS_TOKEN_DURATION_SECS,
        };

        let refresh = RefreshClaims {
            sub: subject,
            exp: now + REFRESH_TOKEN_DURATION_SECS,
        };

        Ok(TokenPair {
            access_token: self.jwt.sign(&access)?,
            refresh_token: self.jwt.sign(&refresh)?,
        })
    }
}
