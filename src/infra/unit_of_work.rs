//! Unit of Work: one place to reach every repository.
//!
//! Services depend on the trait, so tests can plug in in-memory stores.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use super::repositories::{CallRepository, CallStore, UserRepository, UserStore};

/// Centralized repository access for services.
pub trait UnitOfWork: Send + Sync {
    /// Get user repository
    fn users(&self) -> Arc<dyn UserRepository>;

    /// Get call repository
    fn calls(&self) -> Arc<dyn CallRepository>;
}

/// Database-backed UnitOfWork
pub struct Persistence {
    user_repo: Arc<UserStore>,
    call_repo: Arc<CallStore>,
}

impl Persistence {
    /// Create new UnitOfWork instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            user_repo: Arc::new(UserStore::new(db.clone())),
            call_repo: Arc::new(CallStore::new(db)),
        }
    }
}

impl UnitOfWork for Persistence {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.user_repo.clone()
    }

    fn calls(&self) -> Arc<dyn CallRepository> {
        self.call_repo.clone()
    }
}

/// UnitOfWork over arbitrary repository implementations (mocks, fakes).
pub struct Repositories {
    users: Arc<dyn UserRepository>,
    calls: Arc<dyn CallRepository>,
}

impl Repositories {
    pub fn new(users: Arc<dyn UserRepository>, calls: Arc<dyn CallRepository>) -> Self {
        Self { users, calls }
    }
}

impl UnitOfWork for Repositories {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    fn calls(&self) -> Arc<dyn CallRepository> {
        self.calls.clone()
    }
}
