//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod call;
pub mod user;

#[allow(unused_imports)]
pub use call::{ActiveModel as CallActiveModel, Entity as CallEntity, Model as CallModel};
#[allow(unused_imports)]
pub use user::{ActiveModel as UserActiveModel, Entity as UserEntity, Model as UserModel};
