//! Bearer access-token verification.

use super::errors::AuthError;
use super::state::AuthSettings;
use crate::jwt::AccessClaims;

/// The only authorization scheme accepted.
pub const BEARER_SCHEME: &str = "Bearer";

impl AuthSettings {
    /// Verify the value of an `Authorization` header.
    ///
    /// Each step is a hard gate: header shape, scheme, signature and expiry,
    /// then issuer. The issuer is read only after the MAC has been checked.
    pub fn verify_access(&self, header: Option<&str>) -> Result<AccessClaims, AuthError> {
        let header = header.ok_or(AuthError::MalformedHeader)?;

        let parts: Vec<&str> = header.split(' ').collect();
        let [scheme, token] = parts.as_slice() else {
            return Err(AuthError::MalformedHeader);
        };

        if *scheme != BEARER_SCHEME {
            return Err(AuthError::UnsupportedScheme);
        }

        let claims: AccessClaims = self.jwt.verify(token)?;

        if claims.iss != self.domain {
            return Err(AuthError::WrongIssuer);
        }

        Ok(claims)
    }
}
