//! Domain layer - Core business entities and logic
//!
//! Users, calls and the rules that keep them consistent, independent of
//! the HTTP and persistence layers.

pub mod call;
pub mod call_query;
pub mod password;
pub mod user;
pub mod validation;

pub use call::{
    Call, CallMetadata, CallPatch, CallResponse, CallStatus, InitiatedBy, NewCall,
    TranscriptEntry,
};
pub use call_query::{CallField, CallQuery, FieldFilter, FilterOp, FilterValue, SortKey};
pub use password::Password;
pub use user::{NewUser, User, UserResponse, UserRole};
pub use validation::Input;
