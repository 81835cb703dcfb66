//! Infrastructure layer - External systems integration
//!
//! Database connections and repositories, the voice provider client and the
//! in-process rate limiter.

pub mod db;
pub mod elevenlabs;
pub mod rate_limiter;
pub mod repositories;
pub mod unit_of_work;

pub use db::{Database, Migrator};
pub use elevenlabs::{ElevenLabsClient, ProviderError, SignedUrlReply, UserReply, VoiceProvider};
pub use rate_limiter::{spawn_cleanup_task, RateLimitInfo, RateLimiter};
pub use repositories::{CallRepository, CallStore, UserRepository, UserStore};
pub use unit_of_work::{Persistence, Repositories, UnitOfWork};

#[cfg(any(test, feature = "test-utils"))]
pub use elevenlabs::MockVoiceProvider;
#[cfg(any(test, feature = "test-utils"))]
pub use repositories::{MockCallRepository, MockUserRepository};
