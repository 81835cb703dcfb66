//! Authentication service - signup, login, tokens and password changes.
//!
//! Argon2 work runs on the blocking pool so it never stalls the reactor.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{NewUser, Password, User, UserRole};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;

pub const INCORRECT_CREDENTIALS: &str = "Incorrect email or password";
pub const USER_NO_LONGER_EXISTS: &str = "The user belonging to this token no longer exists.";
pub const PASSWORD_CHANGED_SINCE_LOGIN: &str =
    "User recently changed password. Please log in again.";
pub const INCORRECT_CURRENT_PASSWORD: &str = "Your current password is incorrect";

/// JWT claims payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    /// Issue time in unix microseconds, compared against `password_changed_at`
    pub iat_us: i64,
}

/// Signup data after request validation
#[derive(Debug, Clone)]
pub struct Signup {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Freshly authenticated user and its token
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new user (always with the `user` role) and sign them in
    async fn signup(&self, signup: Signup) -> AppResult<AuthSession>;

    /// Check credentials and issue a token
    async fn login(&self, email: &str, password: &str) -> AppResult<AuthSession>;

    /// Resolve a bearer token to a live user
    async fn authenticate(&self, token: &str) -> AppResult<User>;

    /// Replace the password of `user_id` after checking the current one
    async fn update_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<AuthSession>;

    /// Sign a token for `user`
    fn issue_token(&self, user: &User) -> AppResult<String>;

    /// Verify JWT token and extract claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;
}

/// Lowercased, trimmed email used as the lookup key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn hash_password(plain: String) -> AppResult<Password> {
    tokio::task::spawn_blocking(move || Password::new(&plain))
        .await
        .map_err(|e| AppError::internal(format!("Password hashing task failed: {}", e)))?
}

async fn verify_password(password: Password, plain: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || password.verify(&plain))
        .await
        .map_err(|e| AppError::internal(format!("Password verification task failed: {}", e)))
}

/// AuthService backed by a Unit of Work.
pub struct Authenticator<U: UnitOfWork> {
    uow: Arc<U>,
    config: Config,
}

impl<U: UnitOfWork + 'static> Authenticator<U> {
    pub fn new(uow: Arc<U>, config: Config) -> Self {
        Self { uow, config }
    }

    fn session(&self, user: User) -> AppResult<AuthSession> {
        let token = self.issue_token(&user)?;
        Ok(AuthSession { token, user })
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> AuthService for Authenticator<U> {
    async fn signup(&self, signup: Signup) -> AppResult<AuthSession> {
        let email = normalize_email(&signup.email);

        if self.uow.users().find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict(format!(
                "Duplicate field value: {}. Please use another value for email.",
                email
            )));
        }

        let password = hash_password(signup.password).await?;
        let user = self
            .uow
            .users()
            .create(NewUser {
                name: signup.name.trim().to_string(),
                email,
                password_hash: password.into_string(),
                role: UserRole::User,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User signed up");
        self.session(user)
    }

    async fn login(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let user = self.uow.users().find_by_email(&normalize_email(email)).await?;

        // Verify against a real hash even for unknown emails so both failure
        // paths cost the same.
        let stored = match &user {
            Some(user) => Password::from_hash(user.password_hash.clone()),
            None => Password::dummy(),
        };
        let password_valid = verify_password(stored, password.to_string()).await?;

        match user {
            Some(user) if password_valid => {
                tracing::info!(user_id = %user.id, "User logged in");
                self.session(user)
            }
            _ => Err(AppError::unauthorized(INCORRECT_CREDENTIALS)),
        }
    }

    async fn authenticate(&self, token: &str) -> AppResult<User> {
        let claims = self.verify_token(token).map_err(AppError::classify)?;

        let user = self
            .uow
            .users()
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized(USER_NO_LONGER_EXISTS))?;

        if user.changed_password_after(claims.iat_us) {
            return Err(AppError::unauthorized(PASSWORD_CHANGED_SINCE_LOGIN));
        }

        Ok(user)
    }

    async fn update_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<AuthSession> {
        let user = self
            .uow
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized(USER_NO_LONGER_EXISTS))?;

        let stored = Password::from_hash(user.password_hash.clone());
        if !verify_password(stored, current_password.to_string()).await? {
            return Err(AppError::unauthorized(INCORRECT_CURRENT_PASSWORD));
        }

        let password = hash_password(new_password.to_string()).await?;
        let changed_at = Utc::now();
        let user = self
            .uow
            .users()
            .update_password(user.id, password.into_string(), changed_at)
            .await?;

        tracing::info!(user_id = %user.id, "Password updated");
        self.session(user)
    }

    fn issue_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let lifetime = Duration::from_std(self.config.jwt_expires_in)
            .map_err(|e| AppError::internal(format!("Invalid token lifetime: {}", e)))?;

        let expires = now
            .checked_add_signed(lifetime)
            .ok_or_else(|| AppError::internal("Token lifetime out of range"))?;

        let claims = Claims {
            sub: user.id,
            iat: now.timestamp(),
            exp: expires.timestamp(),
            iat_us: now.timestamp_micros(),
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret_bytes()),
        )?)
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::config::Environment;
    use crate::infra::{MockCallRepository, MockUserRepository, Repositories};

    const SECRET: &str = "test-secret-key-minimum-32-chars!!";

    fn authenticator(users: MockUserRepository) -> Authenticator<Repositories> {
        let uow = Repositories::new(Arc::new(users), Arc::new(MockCallRepository::new()));
        Authenticator::new(
            Arc::new(uow),
            Config::for_environment(Environment::Development, SECRET),
        )
    }

    fn stored_user(password: &str) -> User {
        let hash = Password::new(password).unwrap().into_string();
        User::new(Uuid::new_v4(), "Jane".into(), "jane@example.com".into(), hash)
    }

    #[tokio::test]
    async fn test_signup_normalizes_email_and_forces_user_role() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .withf(|email| email == "jane@example.com")
            .returning(|_| Ok(None));
        users
            .expect_create()
            .withf(|new_user| {
                new_user.email == "jane@example.com"
                    && new_user.role == UserRole::User
                    && new_user.password_hash.starts_with("$argon2")
            })
            .returning(|new_user| {
                Ok(User::new(
                    Uuid::new_v4(),
                    new_user.name,
                    new_user.email,
                    new_user.password_hash,
                ))
            });

        let session = authenticator(users)
            .signup(Signup {
                name: "Jane".into(),
                email: "  Jane@Example.COM ".into(),
                password: "Secret12!".into(),
            })
            .await
            .unwrap();

        assert_eq!(session.user.role, UserRole::User);
        assert!(!session.token.is_empty());
    }

    #[tokio::test]
    async fn test_signup_duplicate_email_conflicts() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(stored_user("Secret12!"))));
        users.expect_create().never();

        let err = authenticator(users)
            .signup(Signup {
                name: "Jane".into(),
                email: "jane@example.com".into(),
                password: "Secret12!".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let user = stored_user("Secret12!");
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .withf(|email| email == "jane@example.com")
            .returning(move |_| Ok(Some(user.clone())));
        users
            .expect_find_by_email()
            .withf(|email| email == "nobody@example.com")
            .returning(|_| Ok(None));
        let auth = authenticator(users);

        let wrong_password = auth.login("jane@example.com", "Wrong123!").await.unwrap_err();
        let unknown_email = auth.login("nobody@example.com", "Secret12!").await.unwrap_err();

        assert_eq!(wrong_password.status(), unknown_email.status());
        assert_eq!(wrong_password.to_string(), INCORRECT_CREDENTIALS);
        assert_eq!(unknown_email.to_string(), INCORRECT_CREDENTIALS);
    }

    #[tokio::test]
    async fn test_token_round_trip() {
        let user = stored_user("Secret12!");
        let auth = authenticator(MockUserRepository::new());

        let token = auth.issue_token(&user).unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_absurd_lifetime_is_an_error_not_a_panic() {
        let mut config = Config::for_environment(Environment::Development, SECRET);
        config.jwt_expires_in = std::time::Duration::from_secs(9_000_000_000_000);
        let uow = Repositories::new(
            Arc::new(MockUserRepository::new()),
            Arc::new(MockCallRepository::new()),
        );
        let auth = Authenticator::new(Arc::new(uow), config);

        assert!(auth.issue_token(&stored_user("Secret12!")).is_err());
    }

    #[tokio::test]
    async fn test_authenticate_rejects_token_older_than_password_change() {
        let mut user = stored_user("Secret12!");
        user.password_changed_at = Some(Utc::now());
        let id = user.id;

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .with(eq(id))
            .returning(move |_| Ok(Some(user.clone())));
        let auth = authenticator(users);

        let issued = Utc::now() - Duration::hours(1);
        let claims = Claims {
            sub: id,
            iat: issued.timestamp(),
            exp: (issued + Duration::days(1)).timestamp(),
            iat_us: issued.timestamp_micros(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let err = auth.authenticate(&token).await.unwrap_err();
        assert_eq!(err.to_string(), PASSWORD_CHANGED_SINCE_LOGIN);
    }

    #[tokio::test]
    async fn test_authenticate_rejects_deleted_user() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));
        let auth = authenticator(users);

        let token = auth.issue_token(&stored_user("Secret12!")).unwrap();
        let err = auth.authenticate(&token).await.unwrap_err();
        assert_eq!(err.to_string(), USER_NO_LONGER_EXISTS);
    }

    #[tokio::test]
    async fn test_authenticate_classifies_garbage_token() {
        let auth = authenticator(MockUserRepository::new());
        let err = auth.authenticate("not-a-jwt").await.unwrap_err();
        assert!(err.is_operational());
        assert_eq!(err.to_string(), "Invalid token. Please log in again.");
    }

    #[tokio::test]
    async fn test_update_password_requires_current_password() {
        let user = stored_user("Secret12!");
        let id = user.id;
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        users.expect_update_password().never();

        let err = authenticator(users)
            .update_password(id, "Wrong123!", "NewSecret1!")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), INCORRECT_CURRENT_PASSWORD);
    }

    #[tokio::test]
    async fn test_update_password_invalidates_earlier_tokens() {
        let user = stored_user("Secret12!");
        let id = user.id;
        let auth_before = authenticator(MockUserRepository::new());
        let old_token = auth_before.issue_token(&user).unwrap();

        let stamped = Arc::new(std::sync::Mutex::new(user.clone()));
        let mut users = MockUserRepository::new();
        let found = stamped.clone();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.lock().unwrap().clone())));
        let store = stamped.clone();
        users
            .expect_update_password()
            .withf(move |uid, _, _| *uid == id)
            .returning(move |_, hash, changed_at| {
                let mut updated = store.lock().unwrap();
                updated.password_hash = hash;
                updated.password_changed_at = Some(changed_at);
                Ok(updated.clone())
            });
        let auth = authenticator(users);

        let session = auth
            .update_password(id, "Secret12!", "NewSecret1!")
            .await
            .unwrap();

        let err = auth.authenticate(&old_token).await.unwrap_err();
        assert_eq!(err.to_string(), PASSWORD_CHANGED_SINCE_LOGIN);
        assert_eq!(auth.authenticate(&session.token).await.unwrap().id, id);
    }
}
