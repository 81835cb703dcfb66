//! Call service - call-record use cases.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{Call, CallPatch, CallQuery, NewCall};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UnitOfWork;

/// One page of a filtered listing
#[derive(Debug, Clone)]
pub struct CallPage {
    pub calls: Vec<Call>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// 404 message for a call id.
pub fn call_not_found(id: Uuid) -> String {
    format!("No call found with ID: {}", id)
}

/// Call service trait for dependency injection.
#[async_trait]
pub trait CallService: Send + Sync {
    /// Filtered, sorted, paginated listing
    async fn list(&self, query: &CallQuery) -> AppResult<CallPage>;

    /// Get a call by ID
    async fn get(&self, id: Uuid) -> AppResult<Call>;

    /// Create a call owned by `created_by`
    async fn create(&self, payload: NewCall, created_by: Uuid) -> AppResult<Call>;

    /// Apply a partial update in a single write
    async fn update(&self, id: Uuid, patch: CallPatch) -> AppResult<Call>;

    /// Permanently delete a call
    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Calls still in progress, newest first
    async fn active(&self) -> AppResult<Vec<Call>>;

    /// Calls of one customer, newest first
    async fn by_customer(&self, customer_id: &str) -> AppResult<Vec<Call>>;
}

/// CallService backed by a Unit of Work.
pub struct CallManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> CallManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> CallService for CallManager<U> {
    async fn list(&self, query: &CallQuery) -> AppResult<CallPage> {
        let (calls, total) = self.uow.calls().list(query).await?;

        Ok(CallPage {
            calls,
            total,
            page: query.page,
            limit: query.limit,
            total_pages: query.total_pages(total),
        })
    }

    async fn get(&self, id: Uuid) -> AppResult<Call> {
        self.uow
            .calls()
            .find_by_id(id)
            .await?
            .ok_or_not_found(call_not_found(id))
    }

    async fn create(&self, payload: NewCall, created_by: Uuid) -> AppResult<Call> {
        let call = payload.into_call(Some(created_by))?;
        let call = self.uow.calls().create(call).await?;

        tracing::info!(call_id = %call.id, customer_id = %call.customer_id, "Call created");
        Ok(call)
    }

    async fn update(&self, id: Uuid, patch: CallPatch) -> AppResult<Call> {
        let mut call = self.get(id).await?;
        call.apply_patch(patch, Utc::now())?;

        let call = self.uow.calls().save(call).await?;
        tracing::info!(call_id = %call.id, status = %call.status, "Call updated");
        Ok(call)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.uow.calls().delete(id).await? {
            return Err(AppError::not_found(call_not_found(id)));
        }

        tracing::info!(call_id = %id, "Call deleted");
        Ok(())
    }

    async fn active(&self) -> AppResult<Vec<Call>> {
        self.uow.calls().find_active().await
    }

    async fn by_customer(&self, customer_id: &str) -> AppResult<Vec<Call>> {
        self.uow.calls().find_by_customer(customer_id.trim()).await
    }
}
