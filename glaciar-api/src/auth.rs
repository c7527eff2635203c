use axum_extra::headers::{authorization::Bearer, Authorization};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

pub fn decode_claims(bearer: &Authorization<Bearer>, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::AuthenticationError(e.to_string()))?;

    Ok(token_data.claims)
}

/// Admin-only endpoints check the role claim on top of token validity.
pub fn require_admin(bearer: &Authorization<Bearer>, secret: &str) -> Result<Claims, AppError> {
    let claims = decode_claims(bearer, secret)?;
    if claims.role != "ADMIN" {
        return Err(AppError::AuthorizationError(
            "Admin role required".to_string(),
        ));
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(role: &str, secret: &str) -> Authorization<Bearer> {
        let claims = Claims {
            sub: "user-1".into(),
            role: role.into(),
            exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        Authorization::bearer(&token).unwrap()
    }

    #[test]
    fn admin_token_passes() {
        let bearer = token("ADMIN", "s3cret");
        assert!(require_admin(&bearer, "s3cret").is_ok());
    }

    #[test]
    fn guest_token_is_forbidden() {
        let bearer = token("GUEST", "s3cret");
        assert!(matches!(
            require_admin(&bearer, "s3cret"),
            Err(AppError::AuthorizationError(_))
        ));
    }

    #[test]
    fn wrong_secret_is_unauthenticated() {
        let bearer = token("ADMIN", "other");
        assert!(matches!(
            decode_claims(&bearer, "s3cret"),
            Err(AppError::AuthenticationError(_))
        ));
    }
}
