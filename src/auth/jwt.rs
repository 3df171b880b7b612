use crate::models::Claims;
use jsonwebtoken::{DecodingKey, Validation, decode};

/// Tokens are issued by the identity service; this side only verifies them.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
pub(crate) fn issue_token(
    user_id: u64,
    role: u8,
    company_id: u64,
    employee_id: Option<u64>,
    token_type: crate::models::TokenType,
    secret: &str,
) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let claims = Claims {
        user_id,
        sub: format!("user{user_id}"),
        role,
        company_id,
        exp: now + 900,
        jti: uuid::Uuid::new_v4().to_string(),
        token_type,
        employee_id,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
