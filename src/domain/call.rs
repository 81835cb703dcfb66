//! Call domain entity and the payloads that create or patch it.
//!
//! `duration` is never taken from clients: it is derived from the two
//! timestamps by [`Call::sync_duration`] before every write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::validation::{error, not_blank, required, well_formed, Input};
use crate::errors::{AppError, AppResult};

/// Lifecycle state of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    #[default]
    Initiated,
    Answered,
    Completed,
    Missed,
}

impl CallStatus {
    pub const ALL: [CallStatus; 4] = [
        CallStatus::Initiated,
        CallStatus::Answered,
        CallStatus::Completed,
        CallStatus::Missed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Initiated => "initiated",
            CallStatus::Answered => "answered",
            CallStatus::Completed => "completed",
            CallStatus::Missed => "missed",
        }
    }

    /// Still in progress (shown by the active-calls listing).
    pub fn is_active(&self) -> bool {
        matches!(self, CallStatus::Initiated | CallStatus::Answered)
    }

    /// Reaching this state stamps an end time.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallStatus::Completed | CallStatus::Missed)
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CallStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                AppError::bad_request(
                    "Status must be one of: initiated, answered, completed, missed",
                )
            })
    }
}

/// Who started the call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InitiatedBy {
    Ai,
    #[default]
    Customer,
    System,
}

/// Provider bookkeeping attached to a call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CallMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevenlabs_session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevenlabs_signed_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevenlabs_agent_id: Option<String>,
    pub initiated_by: InitiatedBy,
    pub tags: Vec<String>,
}

/// One utterance of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TranscriptEntry {
    #[schema(example = "agent")]
    pub speaker: String,
    #[schema(example = "Hello, how can I help?")]
    pub text: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Call domain entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub id: Uuid,
    pub customer_id: String,
    pub call_details: Value,
    pub status: CallStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    pub metadata: CallMetadata,
    pub transcript: Vec<TranscriptEntry>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Call {
    /// Seconds between start and end, fractional. `None` until the call has
    /// ended.
    pub fn calculated_duration(&self) -> Option<f64> {
        self.end_time
            .and_then(|end| (end - self.start_time).num_microseconds())
            .map(|micros| micros as f64 / 1_000_000.0)
    }

    /// Recompute `duration` from the timestamps.
    ///
    /// # Errors
    /// Rejects a call whose end time precedes its start time.
    pub fn sync_duration(&mut self) -> AppResult<()> {
        if let Some(end) = self.end_time {
            if end < self.start_time {
                return Err(AppError::bad_request("endTime must not be before startTime"));
            }
        }
        self.duration = self.calculated_duration();
        Ok(())
    }

    /// Apply a client patch. A terminal status without an end time gets one
    /// stamped at `now`.
    pub fn apply_patch(&mut self, patch: CallPatch, now: DateTime<Utc>) -> AppResult<()> {
        if let Some(status) = patch.status.into_option() {
            self.status = status;
        }
        if let Some(end_time) = patch.end_time.into_option() {
            self.end_time = Some(end_time);
        }
        if let Some(metadata) = patch.metadata.into_option() {
            self.metadata = metadata;
        }
        if let Some(transcript) = patch.transcript.into_option() {
            self.transcript = transcript;
        }

        if self.status.is_terminal() && self.end_time.is_none() {
            self.end_time = Some(now);
        }
        self.updated_at = now;
        self.sync_duration()
    }
}

/// Payload for creating a call
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct NewCall {
    #[validate(
        custom(function = "required"),
        custom(function = "well_formed"),
        custom(function = "not_blank", message = "customerId is required")
    )]
    #[schema(value_type = String, example = "cust-1042")]
    pub customer_id: Input<String>,
    #[validate(custom(function = "json_object"))]
    #[schema(value_type = Object)]
    pub call_details: Input<Value>,
    #[validate(custom(function = "well_formed", message = "status must be one of: initiated, answered, completed, missed"))]
    #[schema(value_type = Option<CallStatus>)]
    pub status: Input<CallStatus>,
    #[validate(custom(function = "well_formed", message = "startTime must be a valid date"))]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub start_time: Input<DateTime<Utc>>,
    #[validate(custom(function = "well_formed"))]
    #[schema(value_type = Option<CallMetadata>)]
    pub metadata: Input<CallMetadata>,
    #[validate(custom(function = "well_formed"))]
    #[schema(value_type = Option<Vec<TranscriptEntry>>)]
    pub transcript: Input<Vec<TranscriptEntry>>,
}

impl NewCall {
    /// Build the record to persist, owned by `created_by`.
    pub fn into_call(self, created_by: Option<Uuid>) -> AppResult<Call> {
        let now = Utc::now();
        let mut call = Call {
            id: Uuid::new_v4(),
            customer_id: self.customer_id.or_default().trim().to_string(),
            call_details: self.call_details.or_else(empty_object),
            status: self.status.or_default(),
            start_time: self.start_time.or_else(Utc::now),
            end_time: None,
            duration: None,
            metadata: self.metadata.or_default(),
            transcript: self.transcript.or_default(),
            created_by,
            created_at: now,
            updated_at: now,
        };
        call.sync_duration()?;
        Ok(call)
    }
}

/// Partial update of a call. At least one field must be present.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", default)]
#[validate(schema(function = "patch_not_empty", skip_on_field_errors = false))]
pub struct CallPatch {
    #[validate(custom(function = "well_formed", message = "status must be one of: initiated, answered, completed, missed"))]
    #[schema(value_type = Option<CallStatus>)]
    pub status: Input<CallStatus>,
    #[validate(custom(function = "well_formed", message = "endTime must be a valid date"))]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub end_time: Input<DateTime<Utc>>,
    #[validate(custom(function = "well_formed"))]
    #[schema(value_type = Option<CallMetadata>)]
    pub metadata: Input<CallMetadata>,
    #[validate(custom(function = "well_formed"))]
    #[schema(value_type = Option<Vec<TranscriptEntry>>)]
    pub transcript: Input<Vec<TranscriptEntry>>,
}

impl CallPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_missing()
            && self.end_time.is_missing()
            && self.metadata.is_missing()
            && self.transcript.is_missing()
    }
}

/// Call representation returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallResponse {
    pub id: Uuid,
    #[schema(example = "cust-1042")]
    pub customer_id: String,
    #[schema(value_type = Object)]
    pub call_details: Value,
    pub status: CallStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    pub metadata: CallMetadata,
    pub transcript: Vec<TranscriptEntry>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Seconds between start and end, computed at read time
    pub calculated_duration: Option<f64>,
}

impl From<Call> for CallResponse {
    fn from(call: Call) -> Self {
        let calculated_duration = call.calculated_duration();
        Self {
            id: call.id,
            customer_id: call.customer_id,
            call_details: call.call_details,
            status: call.status,
            start_time: call.start_time,
            end_time: call.end_time,
            duration: call.duration,
            metadata: call.metadata,
            transcript: call.transcript,
            created_by: call.created_by,
            created_at: call.created_at,
            updated_at: call.updated_at,
            calculated_duration,
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

fn json_object(value: &Input<Value>) -> Result<(), ValidationError> {
    match value.as_present() {
        Some(details) if !details.is_object() => {
            Err(error("json_object", "callDetails must be an object"))
        }
        _ => Ok(()),
    }
}

fn patch_not_empty(patch: &CallPatch) -> Result<(), ValidationError> {
    if patch.is_empty() {
        Err(error(
            "patch_not_empty",
            "Update must contain at least one of: status, endTime, metadata, transcript",
        ))
    } else {
        Ok(())
    }
}
