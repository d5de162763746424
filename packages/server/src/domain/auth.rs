//! 認証のインターフェース

use super::{UserId, error::AuthError};

/// トークン検証に成功したユーザー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: Option<String>,
}

/// アクセストークンの検証器
///
/// 接続時に一度だけ呼ばれます。検証に失敗した接続は匿名として扱われます。
#[cfg_attr(test, mockall::automock)]
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
