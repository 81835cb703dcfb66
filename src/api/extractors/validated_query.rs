//! Query-string extractor that parses raw pairs into a typed query.

use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};

use crate::errors::AppError;

/// Raw query-string pairs
pub type QueryParams = HashMap<String, String>;

/// Query string converted into `T`, rejecting with the conversion error.
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: TryFrom<QueryParams, Error = AppError>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<QueryParams>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::bad_request(e.body_text()))?;

        Ok(ValidatedQuery(T::try_from(params)?))
    }
}
