use serde::{Deserialize, Serialize};

use super::token_store::TokenPair;

/// Login request body.
#[derive(Serialize, Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Registration request body.
#[derive(Serialize, Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// The authenticated user as the backend reports it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Payload of a successful login: user plus a full token pair.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub user: AuthUser,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// Payload of a successful registration. Tokens are present only when the
/// backend auto-logs the new account in.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub user: AuthUser,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// An established session, as handed back by `login`.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: AuthUser,
    pub tokens: TokenPair,
}

/// Result of `register`: the new account, and a session when the backend
/// auto-logged it in.
#[derive(Debug, Clone)]
pub struct RegisteredAccount {
    pub user: AuthUser,
    pub tokens: Option<TokenPair>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_payload_parses_camel_case_wire_names() {
        let json = r#"{
            "user": {"id": "u1", "email": "ada@example.com", "name": "Ada", "avatarUrl": "https://cdn/a.png"},
            "accessToken": "a1",
            "refreshToken": "b1",
            "expiresAt": 1735689600000
        }"#;
        let payload: SessionPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.user.id, "u1");
        assert_eq!(payload.user.avatar_url.as_deref(), Some("https://cdn/a.png"));
        assert_eq!(payload.access_token, "a1");
        assert_eq!(payload.expires_at, Some(1735689600000));
    }

    #[test]
    fn test_session_payload_expiry_is_optional() {
        let json = r#"{
            "user": {"id": "u1", "email": "ada@example.com"},
            "accessToken": "a1",
            "refreshToken": "b1"
        }"#;
        let payload: SessionPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.expires_at, None);
        assert_eq!(payload.user.name, None);
    }

    #[test]
    fn test_register_payload_without_tokens() {
        let json = r#"{"user": {"id": "u2", "email": "new@example.com"}}"#;
        let payload: RegisterPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.access_token, None);
        assert_eq!(payload.refresh_token, None);
    }

    #[test]
    fn test_change_password_request_serializes_camel_case() {
        let body = ChangePasswordRequest {
            current_password: "old".to_string(),
            new_password: "new".to_string(),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains(r#""currentPassword":"old""#));
        assert!(json.contains(r#""newPassword":"new""#));
    }
}
