//! Request extractors that reject with [`AppError`](crate::errors::AppError).

mod id_path;
mod validated_json;
mod validated_query;

pub use id_path::{parse_id, IdPath};
pub use validated_json::{format_validation_errors, ValidatedJson};
pub use validated_query::{QueryParams, ValidatedQuery};
