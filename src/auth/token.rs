use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

pub struct TokenService;

impl TokenService {
    pub fn issue(user_id: Uuid, session_id: Uuid, secret: &str) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(crate::auth::session::Session::LIFETIME_HOURS);

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            jti: session_id.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
            .expect("failed to encode access token")
    }

    pub fn verify(token: &str, secret: &str) -> Option<AccessTokenClaims> {
        decode::<AccessTokenClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .ok()
        .map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify_round_trips() {
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        let token = TokenService::issue(user_id, session_id, "test-secret");

        let claims = TokenService::verify(&token, "test-secret").expect("token should verify");
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.jti, session_id.to_string());
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let token = TokenService::issue(Uuid::new_v4(), Uuid::new_v4(), "test-secret");
        assert!(TokenService::verify(&token, "other-secret").is_none());
    }
}
