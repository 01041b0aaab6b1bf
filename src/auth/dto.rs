use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::repo::User;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public user shape. Register and login attach a freshly issued token;
/// `/users/me` omits it.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl UserResponse {
    pub fn from_user(user: User, token: Option<String>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            created_at: user.created_at,
            token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 1,
            email: "a@b.co".into(),
            password_hash: "secret-hash".into(),
            display_name: Some("A".into()),
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn token_is_omitted_when_absent() {
        let json =
            serde_json::to_string(&UserResponse::from_user(sample_user(), None)).unwrap();
        assert!(!json.contains("token"));
        assert!(json.contains("a@b.co"));
    }

    #[test]
    fn token_is_present_when_issued() {
        let json =
            serde_json::to_string(&UserResponse::from_user(sample_user(), Some("t0k".into())))
                .unwrap();
        assert!(json.contains("\"token\":\"t0k\""));
    }

    #[test]
    fn password_hash_never_serializes() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
