//! Authentication - identity provider, sign-in sessions and the admin role.
//!
//! Credentials live behind the [`IdentityProvider`] trait. The gateway layers
//! partner profiles, the admin role, in-memory sessions and per-email sign-in
//! throttling on top of whichever provider it is given.

use crate::{
    config::marketplace::AuthConfig,
    core::partner::{self as partner_core, PartnerProfile, normalize_email},
    entities::{Admin, Identity, admin, identity, partner},
    errors::{Error, Result},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, distributions::Alphanumeric, rngs::OsRng};
use sea_orm::{Set, prelude::*};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Shortest accepted password
pub const MIN_PASSWORD_LENGTH: usize = 6;
/// Length of session bearer tokens
pub const SESSION_TOKEN_LENGTH: usize = 48;

/// Stores credentials and checks them.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Registers a new identity. Fails with `EmailAlreadyRegistered` on a duplicate.
    async fn create_identity(&self, email: &str, password: &str) -> Result<identity::Model>;

    /// Returns the identity when the password matches.
    async fn verify_credentials(&self, email: &str, password: &str) -> Result<identity::Model>;

    /// Looks an identity up without checking a password.
    async fn find_identity(&self, email: &str) -> Result<Option<identity::Model>>;

    /// Deletes an identity. Used to undo a sign-up whose profile could not be stored.
    async fn remove_identity(&self, identity_id: i64) -> Result<()>;
}

/// [`IdentityProvider`] backed by the `identities` table with argon2 hashes.
#[derive(Debug, Clone)]
pub struct DatabaseIdentityProvider {
    db: DatabaseConnection,
}

impl DatabaseIdentityProvider {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Config {
            message: format!("Failed to hash password: {e}"),
        })
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if email.is_empty() || !email.contains('@') {
        return Err(Error::Validation {
            message: format!("'{email}' is not a valid email address"),
        });
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::Validation {
            message: format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        });
    }
    Ok(())
}

#[async_trait]
impl IdentityProvider for DatabaseIdentityProvider {
    async fn create_identity(&self, email: &str, password: &str) -> Result<identity::Model> {
        let email = normalize_email(email);
        validate_credentials(&email, password)?;

        if self.find_identity(&email).await?.is_some() {
            return Err(Error::EmailAlreadyRegistered { email });
        }

        let created = identity::ActiveModel {
            email: Set(email.clone()),
            password_hash: Set(hash_password(password)?),
            is_disabled: Set(false),
            created_at: Set(Utc::now()),
            last_sign_in_at: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| match Error::from(e) {
            Error::AlreadyExists(_) => Error::EmailAlreadyRegistered {
                email: email.clone(),
            },
            other => other,
        })?;

        info!("Registered identity {} <{}>", created.id, created.email);
        Ok(created)
    }

    async fn verify_credentials(&self, email: &str, password: &str) -> Result<identity::Model> {
        let found = self
            .find_identity(email)
            .await?
            .ok_or(Error::InvalidCredentials)?;

        if !verify_password(password, &found.password_hash) {
            return Err(Error::InvalidCredentials);
        }
        if found.is_disabled {
            return Err(Error::AccountDisabled);
        }

        let mut active: identity::ActiveModel = found.into();
        active.last_sign_in_at = Set(Some(Utc::now()));
        active.update(&self.db).await.map_err(Into::into)
    }

    async fn find_identity(&self, email: &str) -> Result<Option<identity::Model>> {
        Identity::find()
            .filter(identity::Column::Email.eq(normalize_email(email)))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn remove_identity(&self, identity_id: i64) -> Result<()> {
        Identity::delete_by_id(identity_id).exec(&self.db).await?;
        debug!("Removed identity {}", identity_id);
        Ok(())
    }
}

/// What a session is allowed to act as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Partner { partner_id: i64 },
    Admin { admin_id: i64 },
}

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token identifying the session
    pub token: String,
    pub email: String,
    pub identity_id: i64,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct FailureWindow {
    count: u32,
    last_failure_at: DateTime<Utc>,
}

fn generate_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Sign-up, sign-in and session bookkeeping.
pub struct AuthGateway {
    db: DatabaseConnection,
    provider: Arc<dyn IdentityProvider>,
    settings: AuthConfig,
    sessions: RwLock<HashMap<String, Session>>,
    failures: Mutex<HashMap<String, FailureWindow>>,
}

impl std::fmt::Debug for AuthGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGateway")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl AuthGateway {
    /// Gateway over the database identity provider.
    #[must_use]
    pub fn new(db: DatabaseConnection, settings: AuthConfig) -> Self {
        let provider = Arc::new(DatabaseIdentityProvider::new(db.clone()));
        Self::with_provider(db, provider, settings)
    }

    /// Gateway over a custom identity provider.
    #[must_use]
    pub fn with_provider(
        db: DatabaseConnection,
        provider: Arc<dyn IdentityProvider>,
        settings: AuthConfig,
    ) -> Self {
        Self {
            db,
            provider,
            settings,
            sessions: RwLock::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Registers credentials and creates a pending partner profile.
    ///
    /// The profile is checked before any credentials are stored, and the
    /// identity is removed again when the profile insert fails.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: PartnerProfile,
    ) -> Result<partner::Model> {
        let email = normalize_email(email);
        partner_core::validate_profile(&profile)?;
        if partner_core::get_partner_by_email(&self.db, &email)
            .await?
            .is_some()
        {
            return Err(Error::EmailAlreadyRegistered { email });
        }

        let identity = self.provider.create_identity(&email, password).await?;

        let created = match partner_core::create_partner(&self.db, &email, profile).await {
            Ok(created) => created,
            Err(e) => {
                if let Err(cleanup) = self.provider.remove_identity(identity.id).await {
                    error!(
                        "Failed to remove identity {} after a failed sign-up: {}",
                        identity.id, cleanup
                    );
                }
                return Err(match e {
                    Error::AlreadyExists(_) => Error::EmailAlreadyRegistered { email },
                    other => other,
                });
            }
        };

        info!(
            "Partner {} signed up with identity {}",
            created.id, identity.id
        );
        Ok(created)
    }

    /// Signs a partner in.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.sign_in_at(email, password, Utc::now()).await
    }

    async fn sign_in_at(&self, email: &str, password: &str, now: DateTime<Utc>) -> Result<Session> {
        let email = normalize_email(email);
        let identity = self.authenticate(&email, password, now).await?;

        let profile = partner_core::get_partner_by_email(&self.db, &email)
            .await?
            .ok_or_else(|| Error::ProfileNotFound {
                email: email.clone(),
            })?;
        if profile.is_disabled {
            return Err(Error::AccountDisabled);
        }

        Ok(self
            .open_session(
                identity,
                Role::Partner {
                    partner_id: profile.id,
                },
                now,
            )
            .await)
    }

    /// Signs an admin in. The identity must hold the admin role.
    pub async fn admin_sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.admin_sign_in_at(email, password, Utc::now()).await
    }

    async fn admin_sign_in_at(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Session> {
        let email = normalize_email(email);
        let identity = self.authenticate(&email, password, now).await?;

        let role = Admin::find()
            .filter(admin::Column::IdentityId.eq(identity.id))
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::PermissionDenied {
                message: format!("{email} is not an admin"),
            })?;

        Ok(self
            .open_session(identity, Role::Admin { admin_id: role.id }, now)
            .await)
    }

    /// Ends a session.
    pub async fn sign_out(&self, token: &str) -> Result<()> {
        let removed = self.sessions.write().await.remove(token);
        match removed {
            Some(session) => {
                debug!("Signed out {}", session.email);
                Ok(())
            }
            None => Err(Error::Unauthenticated),
        }
    }

    /// Resolves a bearer token.
    pub async fn session(&self, token: &str) -> Result<Session> {
        self.sessions
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or(Error::Unauthenticated)
    }

    /// Ensures `email` has an identity and the admin role. Safe to call on every start.
    pub async fn bootstrap_admin(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<admin::Model> {
        let email = normalize_email(email);
        let identity = match self.provider.find_identity(&email).await? {
            Some(existing) => existing,
            None => self.provider.create_identity(&email, password).await?,
        };

        if let Some(existing) = Admin::find()
            .filter(admin::Column::IdentityId.eq(identity.id))
            .one(&self.db)
            .await?
        {
            debug!("Admin {} already present", existing.email);
            return Ok(existing);
        }

        let created = admin::ActiveModel {
            identity_id: Set(identity.id),
            email: Set(email),
            display_name: Set(display_name.trim().to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!("Bootstrapped admin {} <{}>", created.id, created.email);
        Ok(created)
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<identity::Model> {
        self.check_rate_limit(email, now).await?;

        match self.provider.verify_credentials(email, password).await {
            Ok(identity) => {
                self.failures.lock().await.remove(email);
                Ok(identity)
            }
            Err(Error::InvalidCredentials) => {
                self.record_failure(email, now).await;
                Err(Error::InvalidCredentials)
            }
            Err(other) => Err(other),
        }
    }

    fn lockout(&self) -> Duration {
        Duration::minutes(self.settings.lockout_minutes)
    }

    async fn check_rate_limit(&self, email: &str, now: DateTime<Utc>) -> Result<()> {
        let failures = self.failures.lock().await;
        let Some(window) = failures.get(email) else {
            return Ok(());
        };

        let unlocks_at = window.last_failure_at + self.lockout();
        if window.count >= self.settings.max_failed_attempts && now < unlocks_at {
            let retry_after_secs = (unlocks_at - now).num_seconds().max(1);
            warn!("Sign-in for {} throttled for {}s", email, retry_after_secs);
            return Err(Error::RateLimited { retry_after_secs });
        }
        Ok(())
    }

    async fn record_failure(&self, email: &str, now: DateTime<Utc>) {
        let lockout = self.lockout();
        let mut failures = self.failures.lock().await;
        failures.retain(|_, window| now - window.last_failure_at < lockout);
        let window = failures.entry(email.to_string()).or_insert(FailureWindow {
            count: 0,
            last_failure_at: now,
        });

        window.count += 1;
        window.last_failure_at = now;
        debug!("Failed sign-in #{} for {}", window.count, email);
    }

    async fn open_session(
        &self,
        identity: identity::Model,
        role: Role,
        now: DateTime<Utc>,
    ) -> Session {
        let session = Session {
            token: generate_token(),
            email: identity.email,
            identity_id: identity.id,
            role,
            issued_at: now,
        };
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());
        info!("{} signed in as {:?}", session.email, session.role);
        session
    }
}
