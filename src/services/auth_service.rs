use async_trait::async_trait;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::auth::{AuthToken, LoginRequest, TOKEN_TYPE};
use crate::models::user::{CreateUserRequest, User};
use crate::repositories::RepositoryError;
use crate::repositories::user_repository::UserRepository;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user_id
    exp: i64,    // expiration timestamp
}

/// Token and registration settings
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    /// Maximum number of registered users. `None` means unlimited.
    pub max_users: Option<u64>,
}

impl AuthSettings {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl: Duration::hours(2),
            max_users: None,
        }
    }
}

/// Authentication service errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Registration is closed: user limit reached")]
    RegistrationClosed,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Administrator privileges required")]
    Forbidden,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Trait defining authentication service operations
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new user
    async fn register(&self, request: CreateUserRequest) -> Result<User, AuthError>;

    /// Authenticate user and return JWT token
    async fn login(&self, request: LoginRequest) -> Result<AuthToken, AuthError>;

    /// Validate JWT token and return user_id
    async fn validate_token(&self, token: &str) -> Result<Uuid, AuthError>;

    /// Every registered user. Only administrators may call it.
    async fn list_users(&self, requester_id: Uuid) -> Result<Vec<User>, AuthError>;
}

/// Implementation of AuthService
pub struct AuthServiceImpl {
    user_repository: Arc<dyn UserRepository>,
    settings: AuthSettings,
}

impl AuthServiceImpl {
    pub fn new(user_repository: Arc<dyn UserRepository>, settings: AuthSettings) -> Self {
        Self {
            user_repository,
            settings,
        }
    }

    fn hash_password(password: &str) -> Result<String, AuthError> {
        hash(password, DEFAULT_COST)
            .map_err(|e| AuthError::DatabaseError(format!("Password hashing failed: {}", e)))
    }

    fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
        verify(password, hash)
            .map_err(|e| AuthError::DatabaseError(format!("Password verification failed: {}", e)))
    }

    async fn ensure_registration_open(&self) -> Result<(), AuthError> {
        let Some(max_users) = self.settings.max_users else {
            return Ok(());
        };

        let registered = self
            .user_repository
            .count()
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        if registered >= max_users {
            warn!(registered, max_users, "Registration rejected: user limit reached");
            return Err(AuthError::RegistrationClosed);
        }
        Ok(())
    }

    fn generate_jwt(&self, user_id: Uuid, is_admin: bool) -> Result<AuthToken, AuthError> {
        let expiration = Utc::now() + self.settings.token_ttl;

        let claims = Claims {
            sub: user_id.to_string(),
            exp: expiration.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::DatabaseError(format!("Token generation failed: {}", e)))?;

        Ok(AuthToken {
            token,
            token_type: TOKEN_TYPE.to_string(),
            expires_at: expiration,
            user_id,
            is_admin,
        })
    }

    fn decode_jwt(&self, token: &str) -> Result<Uuid, AuthError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.settings.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

        Uuid::parse_str(&token_data.claims.sub).map_err(|_| AuthError::InvalidToken)
    }
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    async fn register(&self, request: CreateUserRequest) -> Result<User, AuthError> {
        self.ensure_registration_open().await?;

        let password_hash = Self::hash_password(&request.password)?;

        let user = self
            .user_repository
            .create(request, password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::ConstraintViolation(_) => AuthError::DuplicateEmail,
                RepositoryError::DatabaseError(msg) => AuthError::DatabaseError(msg),
                RepositoryError::NotFound => {
                    AuthError::DatabaseError("Unexpected error".to_string())
                }
            })?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    async fn login(&self, request: LoginRequest) -> Result<AuthToken, AuthError> {
        let user = self
            .user_repository
            .find_by_email(&request.email)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        let is_valid = Self::verify_password(&request.password, &user.password_hash)?;
        if !is_valid {
            return Err(AuthError::InvalidCredentials);
        }

        self.generate_jwt(user.id, user.is_admin)
    }

    async fn validate_token(&self, token: &str) -> Result<Uuid, AuthError> {
        self.decode_jwt(token)
    }

    async fn list_users(&self, requester_id: Uuid) -> Result<Vec<User>, AuthError> {
        let requester = self
            .user_repository
            .find_by_id(requester_id)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        if !requester.is_some_and(|user| user.is_admin) {
            warn!(user_id = %requester_id, "User listing denied");
            return Err(AuthError::Forbidden);
        }

        self.user_repository
            .find_all()
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::InMemoryUserRepository;

    fn service() -> AuthServiceImpl {
        AuthServiceImpl::new(
            Arc::new(InMemoryUserRepository::new()),
            AuthSettings::new("test_secret"),
        )
    }

    fn register_request(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: "Test User".to_string(),
            email: email.to_string(),
            password: "Password123".to_string(),
            default_currency: None,
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_success() {
        let service = service();

        let user = service
            .register(register_request("test@example.com"))
            .await
            .unwrap();

        assert_eq!(user.name, "Test User");
        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.default_currency, "EUR");
        assert_ne!(user.password_hash, "Password123");
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let service = service();

        service
            .register(register_request("test@example.com"))
            .await
            .unwrap();
        let result = service.register(register_request("Test@Example.com")).await;

        assert!(matches!(result, Err(AuthError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_register_respects_user_limit() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let settings = AuthSettings {
            max_users: Some(1),
            ..AuthSettings::new("test_secret")
        };
        let service = AuthServiceImpl::new(repo, settings);

        service
            .register(register_request("first@example.com"))
            .await
            .unwrap();
        let result = service.register(register_request("second@example.com")).await;

        assert!(matches!(result, Err(AuthError::RegistrationClosed)));
    }

    #[tokio::test]
    async fn test_login_success() {
        let service = service();
        let user = service
            .register(register_request("test@example.com"))
            .await
            .unwrap();

        let token = service
            .login(login_request("test@example.com", "Password123"))
            .await
            .unwrap();

        let parts: Vec<&str> = token.token.split('.').collect();
        assert_eq!(parts.len(), 3, "JWT should have 3 parts");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.user_id, user.id);
        assert!(!token.is_admin);
        assert_eq!(service.validate_token(&token.token).await.unwrap(), user.id);
    }

    #[tokio::test]
    async fn test_login_invalid_credentials() {
        let service = service();
        service
            .register(register_request("test@example.com"))
            .await
            .unwrap();

        let wrong_password = service
            .login(login_request("test@example.com", "Wrongpass123"))
            .await;
        let unknown_user = service
            .login(login_request("nobody@example.com", "Password123"))
            .await;

        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown_user, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_token_expiration_follows_ttl() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let settings = AuthSettings {
            token_ttl: Duration::hours(6),
            ..AuthSettings::new("test_secret")
        };
        let service = AuthServiceImpl::new(repo, settings);
        service
            .register(register_request("test@example.com"))
            .await
            .unwrap();

        let token = service
            .login(login_request("test@example.com", "Password123"))
            .await
            .unwrap();

        let expected = Utc::now() + Duration::hours(6);
        let diff = (token.expires_at - expected).num_seconds().abs();
        assert!(diff < 60, "Token should expire in about 6 hours (diff: {} seconds)", diff);
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let settings = AuthSettings {
            token_ttl: Duration::hours(-1),
            ..AuthSettings::new("test_secret")
        };
        let service = AuthServiceImpl::new(repo, settings);

        let token = service.generate_jwt(Uuid::new_v4(), false).unwrap();

        let result = service.validate_token(&token.token).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_token_with_different_secrets_are_invalid() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let service1 = AuthServiceImpl::new(repo.clone(), AuthSettings::new("secret1"));
        let service2 = AuthServiceImpl::new(repo, AuthSettings::new("secret2"));

        let token = service1.generate_jwt(Uuid::new_v4(), false).unwrap();

        let result = service2.validate_token(&token.token).await;
        assert!(
            matches!(result, Err(AuthError::InvalidToken)),
            "Token signed with different secret should be invalid"
        );
    }

    #[tokio::test]
    async fn test_list_users_requires_admin() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let service = AuthServiceImpl::new(repo.clone(), AuthSettings::new("test_secret"));
        let member = service
            .register(register_request("member@example.com"))
            .await
            .unwrap();
        let admin = service
            .register(register_request("admin@example.com"))
            .await
            .unwrap();
        repo.grant_admin(admin.id);

        let denied = service.list_users(member.id).await;
        let unknown = service.list_users(Uuid::new_v4()).await;
        let users = service.list_users(admin.id).await.unwrap();

        assert!(matches!(denied, Err(AuthError::Forbidden)));
        assert!(matches!(unknown, Err(AuthError::Forbidden)));
        let emails: Vec<&str> = users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["admin@example.com", "member@example.com"]);
    }

    #[tokio::test]
    async fn test_admin_login_token_carries_flag() {
        let repo = Arc::new(InMemoryUserRepository::new());
        let service = AuthServiceImpl::new(repo.clone(), AuthSettings::new("test_secret"));
        let admin = service
            .register(register_request("admin@example.com"))
            .await
            .unwrap();
        repo.grant_admin(admin.id);

        let token = service
            .login(login_request("admin@example.com", "Password123"))
            .await
            .unwrap();

        assert!(token.is_admin);
    }

    #[tokio::test]
    async fn test_malformed_token_is_rejected() {
        let service = service();

        for token in ["not.a.token", "invalid", "", "header.payload", "a.b.c.d"] {
            let result = service.validate_token(token).await;
            assert!(
                matches!(result, Err(AuthError::InvalidToken)),
                "Malformed token '{}' should be rejected",
                token
            );
        }
    }
}
