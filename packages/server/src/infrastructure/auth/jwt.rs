//! JWT (HS256) によるトークン検証
//!
//! クレーム: `{sub, username?, role?, exp}`。`sub` はユーザー ID で、
//! 数値・数値文字列のどちらでも受け付けます。

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::domain::{AuthError, AuthenticatedUser, TokenVerifier, UserId};

/// `sub` クレーム
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Subject {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Subject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: UserId, username: Option<String>, exp: i64) -> Self {
        Self {
            sub: Subject::Number(user_id.value()),
            username,
            role: None,
            exp,
        }
    }

    fn user_id(&self) -> Result<UserId, AuthError> {
        let parsed = match &self.sub {
            Subject::Number(raw) => UserId::new(*raw),
            Subject::Text(raw) => raw.parse(),
        };
        parsed.map_err(|e| AuthError::Invalid(format!("invalid subject: {}", e)))
    }
}

/// 共有シークレットで署名された JWT の検証器
pub struct JwtTokenVerifier {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            encoding_key: EncodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// トークンを発行する（テスト・開発用）
    pub fn issue(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Invalid(e.to_string()))
    }
}

impl TokenVerifier for JwtTokenVerifier {
    fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::Expired,
                    _ => AuthError::Invalid(e.to_string()),
                }
            })?;
        Ok(AuthenticatedUser {
            user_id: data.claims.user_id()?,
            username: data.claims.username,
        })
    }
}
