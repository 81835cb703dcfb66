//! Call repository implementation.
//!
//! Translates a [`CallQuery`] into a SeaORM condition, ordering and page.

use async_trait::async_trait;
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, Select, Value,
};
use uuid::Uuid;

use super::entities::call::{self, ActiveModel, Entity as CallEntity};
use crate::domain::{Call, CallField, CallQuery, CallStatus, FieldFilter, FilterOp, FilterValue};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Call repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CallRepository: Send + Sync {
    /// Find call by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Call>>;

    /// Filtered, sorted page of calls plus the total number of matches
    async fn list(&self, query: &CallQuery) -> AppResult<(Vec<Call>, u64)>;

    /// Calls still in progress, newest first
    async fn find_active(&self) -> AppResult<Vec<Call>>;

    /// Calls of one customer, newest first
    async fn find_by_customer(&self, customer_id: &str) -> AppResult<Vec<Call>>;

    /// Insert a new call
    async fn create(&self, call: Call) -> AppResult<Call>;

    /// Persist every column of an existing call in one write
    async fn save(&self, call: Call) -> AppResult<Call>;

    /// Permanently delete a call. Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

/// SeaORM-backed implementation of CallRepository
pub struct CallStore {
    db: DatabaseConnection,
}

impl CallStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn fetch(&self, select: Select<CallEntity>) -> AppResult<Vec<Call>> {
        select
            .all(&self.db)
            .await
            .map_err(AppError::from)?
            .into_iter()
            .map(Call::try_from)
            .collect()
    }
}

#[async_trait]
impl CallRepository for CallStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Call>> {
        CallEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?
            .map(Call::try_from)
            .transpose()
    }

    async fn list(&self, query: &CallQuery) -> AppResult<(Vec<Call>, u64)> {
        let paginator = filtered(query).paginate(&self.db, query.limit);
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(query.page - 1).await?;

        let calls = models
            .into_iter()
            .map(Call::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((calls, total))
    }

    async fn find_active(&self) -> AppResult<Vec<Call>> {
        let active: Vec<&str> = CallStatus::ALL
            .iter()
            .filter(|status| status.is_active())
            .map(|status| status.as_str())
            .collect();

        self.fetch(
            CallEntity::find()
                .filter(call::Column::Status.is_in(active))
                .order_by_desc(call::Column::CreatedAt),
        )
        .await
    }

    async fn find_by_customer(&self, customer_id: &str) -> AppResult<Vec<Call>> {
        self.fetch(
            CallEntity::find()
                .filter(call::Column::CustomerId.eq(customer_id))
                .order_by_desc(call::Column::CreatedAt),
        )
        .await
    }

    async fn create(&self, call: Call) -> AppResult<Call> {
        let model = ActiveModel::from_call(&call)?
            .insert(&self.db)
            .await
            .map_err(AppError::from)?;
        Call::try_from(model)
    }

    async fn save(&self, call: Call) -> AppResult<Call> {
        let model = ActiveModel::from_call(&call)?
            .update(&self.db)
            .await
            .map_err(AppError::from)?;
        Call::try_from(model)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = CallEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected > 0)
    }
}

/// Select with the query's filters and ordering applied.
fn filtered(query: &CallQuery) -> Select<CallEntity> {
    let mut select = CallEntity::find();
    if !query.filters.is_empty() {
        let condition = query
            .filters
            .iter()
            .fold(Condition::all(), |condition, filter| condition.add(filter_expr(filter)));
        select = select.filter(condition);
    }

    query.sort.iter().fold(select, |select, key| {
        let order = if key.descending { Order::Desc } else { Order::Asc };
        select.order_by(column(key.field), order)
    })
}

fn column(field: CallField) -> call::Column {
    match field {
        CallField::Status => call::Column::Status,
        CallField::CustomerId => call::Column::CustomerId,
        CallField::CreatedBy => call::Column::CreatedBy,
        CallField::StartTime => call::Column::StartTime,
        CallField::EndTime => call::Column::EndTime,
        CallField::Duration => call::Column::Duration,
        CallField::CreatedAt => call::Column::CreatedAt,
        CallField::UpdatedAt => call::Column::UpdatedAt,
    }
}

fn filter_expr(filter: &FieldFilter) -> SimpleExpr {
    let column = column(filter.field);
    let value: Value = match &filter.value {
        FilterValue::Status(status) => status.as_str().into(),
        FilterValue::Text(text) => text.clone().into(),
        FilterValue::Id(id) => (*id).into(),
        FilterValue::Time(time) => (*time).into(),
        FilterValue::Number(number) => (*number).into(),
    };

    match filter.op {
        FilterOp::Eq => column.eq(value),
        FilterOp::Gt => column.gt(value),
        FilterOp::Gte => column.gte(value),
        FilterOp::Lt => column.lt(value),
        FilterOp::Lte => column.lte(value),
    }
}
