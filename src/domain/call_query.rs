//! Query model for listing calls.
//!
//! Raw query-string pairs are parsed into typed filters over an allow-list
//! of fields. Unknown fields are ignored; a bad operator or value is a 400.
//!
//! ```text
//! ?status=completed&duration[gte]=30&sort=-createdAt,duration&fields=status&page=2&limit=20
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::call::{Call, CallStatus};
use crate::config::{DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::errors::{AppError, AppResult};

const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Fields that can be filtered and sorted on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallField {
    Status,
    CustomerId,
    CreatedBy,
    StartTime,
    EndTime,
    Duration,
    CreatedAt,
    UpdatedAt,
}

impl CallField {
    pub fn parse(name: &str) -> Option<Self> {
        let field = match name {
            "status" => CallField::Status,
            "customerId" => CallField::CustomerId,
            "createdBy" => CallField::CreatedBy,
            "startTime" => CallField::StartTime,
            "endTime" => CallField::EndTime,
            "duration" => CallField::Duration,
            "createdAt" => CallField::CreatedAt,
            "updatedAt" => CallField::UpdatedAt,
            _ => return None,
        };
        Some(field)
    }

    pub fn name(&self) -> &'static str {
        match self {
            CallField::Status => "status",
            CallField::CustomerId => "customerId",
            CallField::CreatedBy => "createdBy",
            CallField::StartTime => "startTime",
            CallField::EndTime => "endTime",
            CallField::Duration => "duration",
            CallField::CreatedAt => "createdAt",
            CallField::UpdatedAt => "updatedAt",
        }
    }

    /// Whether range operators make sense for this field.
    pub fn is_orderable(&self) -> bool {
        !matches!(
            self,
            CallField::Status | CallField::CustomerId | CallField::CreatedBy
        )
    }

    fn parse_value(&self, raw: &str) -> AppResult<FilterValue> {
        let invalid = || AppError::bad_request(format!("Invalid {}: {}.", self.name(), raw));
        let value = match self {
            CallField::Status => FilterValue::Status(raw.parse().map_err(|_| invalid())?),
            CallField::CustomerId => FilterValue::Text(raw.trim().to_string()),
            CallField::CreatedBy => FilterValue::Id(Uuid::parse_str(raw).map_err(|_| invalid())?),
            CallField::Duration => FilterValue::Number(raw.parse().map_err(|_| invalid())?),
            CallField::StartTime
            | CallField::EndTime
            | CallField::CreatedAt
            | CallField::UpdatedAt => FilterValue::Time(parse_time(raw).ok_or_else(invalid)?),
        };
        Ok(value)
    }

    /// The value of this field on `call`, if set.
    pub fn value_of(&self, call: &Call) -> Option<FilterValue> {
        match self {
            CallField::Status => Some(FilterValue::Status(call.status)),
            CallField::CustomerId => Some(FilterValue::Text(call.customer_id.clone())),
            CallField::CreatedBy => call.created_by.map(FilterValue::Id),
            CallField::StartTime => Some(FilterValue::Time(call.start_time)),
            CallField::EndTime => call.end_time.map(FilterValue::Time),
            CallField::Duration => call.duration.map(FilterValue::Number),
            CallField::CreatedAt => Some(FilterValue::Time(call.created_at)),
            CallField::UpdatedAt => Some(FilterValue::Time(call.updated_at)),
        }
    }
}

/// Comparison operator of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    fn parse(name: &str) -> Option<Self> {
        let op = match name {
            "eq" => FilterOp::Eq,
            "gt" => FilterOp::Gt,
            "gte" => FilterOp::Gte,
            "lt" => FilterOp::Lt,
            "lte" => FilterOp::Lte,
            _ => return None,
        };
        Some(op)
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            FilterOp::Eq => ordering == Ordering::Equal,
            FilterOp::Gt => ordering == Ordering::Greater,
            FilterOp::Gte => ordering != Ordering::Less,
            FilterOp::Lt => ordering == Ordering::Less,
            FilterOp::Lte => ordering != Ordering::Greater,
        }
    }
}

/// Typed operand of a filter
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Status(CallStatus),
    Text(String),
    Id(Uuid),
    Time(DateTime<Utc>),
    Number(f64),
}

impl FilterValue {
    fn compare(&self, other: &FilterValue) -> Option<Ordering> {
        match (self, other) {
            (FilterValue::Status(a), FilterValue::Status(b)) => Some(a.as_str().cmp(b.as_str())),
            (FilterValue::Text(a), FilterValue::Text(b)) => Some(a.cmp(b)),
            (FilterValue::Id(a), FilterValue::Id(b)) => Some(a.cmp(b)),
            (FilterValue::Time(a), FilterValue::Time(b)) => Some(a.cmp(b)),
            (FilterValue::Number(a), FilterValue::Number(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// `field <op> value`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: CallField,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl FieldFilter {
    /// Evaluate against a call. Unset fields never match.
    pub fn matches(&self, call: &Call) -> bool {
        self.field
            .value_of(call)
            .and_then(|actual| actual.compare(&self.value))
            .map(|ordering| self.op.accepts(ordering))
            .unwrap_or(false)
    }
}

/// One sort criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: CallField,
    pub descending: bool,
}

impl SortKey {
    /// Compare two calls on this key. Unset values sort first ascending.
    pub fn compare(&self, a: &Call, b: &Call) -> Ordering {
        let ordering = match (self.field.value_of(a), self.field.value_of(b)) {
            (Some(x), Some(y)) => x.compare(&y).unwrap_or(Ordering::Equal),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// Parsed list query
#[derive(Debug, Clone, PartialEq)]
pub struct CallQuery {
    pub filters: Vec<FieldFilter>,
    pub sort: Vec<SortKey>,
    pub fields: Option<Vec<String>>,
    pub page: u64,
    pub limit: u64,
}

impl Default for CallQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sort: vec![newest_first()],
            fields: None,
            page: DEFAULT_PAGE_NUMBER,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CallQuery {
    /// Parse raw query-string pairs.
    ///
    /// # Errors
    /// 400 for an unknown operator, a range operator on a non-orderable field
    /// or a value that does not parse for its field.
    pub fn from_params(params: &HashMap<String, String>) -> AppResult<Self> {
        let mut filters = Vec::new();

        // Sorted for deterministic filter order
        let mut keys: Vec<&String> = params.keys().collect();
        keys.sort();

        for key in keys {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let raw = &params[key];
            let (name, op_name) = split_operator(key);

            let Some(field) = CallField::parse(name) else {
                continue;
            };

            let op = match op_name {
                None => FilterOp::Eq,
                Some(op_name) => FilterOp::parse(op_name).ok_or_else(|| {
                    AppError::bad_request(format!("Invalid operator '{}' for {}", op_name, name))
                })?,
            };
            if op != FilterOp::Eq && !field.is_orderable() {
                return Err(AppError::bad_request(format!(
                    "Operator '{}' is not supported for {}",
                    op_name.unwrap_or_default(),
                    name
                )));
            }

            filters.push(FieldFilter {
                field,
                op,
                value: field.parse_value(raw)?,
            });
        }

        let sort = params
            .get("sort")
            .map(|raw| parse_sort(raw))
            .filter(|keys| !keys.is_empty())
            .unwrap_or_else(|| vec![newest_first()]);

        let fields = params.get("fields").map(|raw| split_list(raw)).filter(|f| !f.is_empty());

        let limit = positive_or(params.get("limit"), DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
        let page = positive_or(params.get("page"), DEFAULT_PAGE_NUMBER);
        // Offsets are bound as signed 64-bit integers
        let offset_fits = (page - 1)
            .checked_mul(limit)
            .is_some_and(|offset| offset <= i64::MAX as u64);
        if !offset_fits {
            return Err(AppError::bad_request("page is out of range"));
        }

        Ok(Self {
            filters,
            sort,
            fields,
            page,
            limit,
        })
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }

    /// Whether a call passes every filter.
    pub fn matches(&self, call: &Call) -> bool {
        self.filters.iter().all(|filter| filter.matches(call))
    }

    /// Combined ordering of all sort keys.
    pub fn compare(&self, a: &Call, b: &Call) -> Ordering {
        self.sort
            .iter()
            .map(|key| key.compare(a, b))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }

    /// Keep only the requested keys of a serialized call (`id` always stays).
    pub fn project(&self, value: Value) -> Value {
        let (Some(fields), Value::Object(object)) = (&self.fields, &value) else {
            return value;
        };

        let projected: Map<String, Value> = object
            .iter()
            .filter(|(key, _)| key.as_str() == "id" || fields.iter().any(|f| f == *key))
            .map(|(key, v)| (key.clone(), v.clone()))
            .collect();
        Value::Object(projected)
    }
}

impl TryFrom<HashMap<String, String>> for CallQuery {
    type Error = AppError;

    fn try_from(params: HashMap<String, String>) -> AppResult<Self> {
        Self::from_params(&params)
    }
}

fn newest_first() -> SortKey {
    SortKey {
        field: CallField::CreatedAt,
        descending: true,
    }
}

/// `duration[gte]` -> (`duration`, Some(`gte`))
fn split_operator(key: &str) -> (&str, Option<&str>) {
    match key.split_once('[') {
        Some((name, rest)) => (name, Some(rest.strip_suffix(']').unwrap_or(rest))),
        None => (key, None),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_sort(raw: &str) -> Vec<SortKey> {
    split_list(raw)
        .iter()
        .filter_map(|item| {
            let (name, descending) = match item.strip_prefix('-') {
                Some(name) => (name, true),
                None => (item.as_str(), false),
            };
            CallField::parse(name).map(|field| SortKey { field, descending })
        })
        .collect()
}

fn positive_or(raw: Option<&String>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
