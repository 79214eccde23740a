//! Domain objects decoded from service replies.
//!
//! # Design
//! The wire keeps most scalar fields stringly ("0"/"1" flags, empty strings
//! for absent dates, numbers quoted); the serde helpers at the bottom of this
//! file normalize those once, so the rest of the crate works with real Rust
//! types. Task data arrives nested (list → taskseries → task); the decoder
//! flattens it into [`Task`], which carries the full id triple a later
//! modification call needs.

use serde::{Deserialize, Deserializer};

use crate::dates::WireDate;
use crate::error::RtmError;

/// Opaque user credential obtained once via the auth flow and reused for
/// every authenticated request. The core never inspects its contents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Short-lived opaque value correlating a browser authorization with the
/// subsequent token exchange. Dead after one successful exchange.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Frob(String);

impl Frob {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Access level requested during authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    Delete,
}

impl Permission {
    pub fn as_param(self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Delete => "delete",
        }
    }
}

/// The authorized user attached to a token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub fullname: Option<String>,
}

/// Result of a successful token exchange or token check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Auth {
    pub token: Token,
    pub perms: Permission,
    pub user: User,
}

/// Task priority; the wire encodes "N" for none and "1".."3" otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Priority {
    #[default]
    #[serde(rename = "N")]
    None,
    #[serde(rename = "1")]
    High,
    #[serde(rename = "2")]
    Medium,
    #[serde(rename = "3")]
    Low,
}

impl Priority {
    pub fn as_param(self) -> &'static str {
        match self {
            Priority::None => "N",
            Priority::High => "1",
            Priority::Medium => "2",
            Priority::Low => "3",
        }
    }
}

/// A task list as returned by the `lists` operations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskList {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "de_flag")]
    pub deleted: bool,
    #[serde(deserialize_with = "de_flag")]
    pub locked: bool,
    #[serde(deserialize_with = "de_flag")]
    pub archived: bool,
    #[serde(deserialize_with = "de_i32")]
    pub position: i32,
    #[serde(deserialize_with = "de_flag")]
    pub smart: bool,
    /// Present only on smart lists.
    #[serde(default)]
    pub filter: Option<String>,
}

/// A note attached to a taskseries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub body: String,
    pub created: WireDate,
    pub modified: WireDate,
}

/// One task occurrence, flattened from the wire's list → taskseries → task
/// nesting. `list_id`, `taskseries_id` and `id` together address the task in
/// modification calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub taskseries_id: String,
    pub list_id: String,
    pub name: String,
    pub created: WireDate,
    pub modified: WireDate,
    pub added: WireDate,
    pub due: Option<WireDate>,
    pub has_due_time: bool,
    pub completed: Option<WireDate>,
    pub deleted: Option<WireDate>,
    pub priority: Priority,
    pub postponed: u32,
    pub estimate: Option<String>,
    pub source: String,
    pub url: Option<String>,
    pub location_id: Option<String>,
    pub tags: Vec<String>,
    pub notes: Vec<Note>,
}

impl Task {
    /// The id triple used to address this task in modification calls.
    pub fn task_ref(&self) -> TaskRef {
        TaskRef {
            list_id: self.list_id.clone(),
            taskseries_id: self.taskseries_id.clone(),
            task_id: self.id.clone(),
        }
    }
}

/// The id triple addressing one task: list, taskseries, task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRef {
    pub list_id: String,
    pub taskseries_id: String,
    pub task_id: String,
}

impl TaskRef {
    pub fn new(
        list_id: impl Into<String>,
        taskseries_id: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Self {
        Self {
            list_id: list_id.into(),
            taskseries_id: taskseries_id.into(),
            task_id: task_id.into(),
        }
    }
}

/// A task known only by its ids, reported in a sync reply as deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedTask {
    pub task_id: String,
    pub taskseries_id: String,
    pub list_id: String,
    pub deleted: WireDate,
}

/// Tasks touched since a sync watermark, partitioned by what happened to
/// them. A task id appears in at most one partition; the decoder rejects
/// replies that violate this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynchedTasks {
    pub added: Vec<Task>,
    pub modified: Vec<Task>,
    pub deleted: Vec<DeletedTask>,
    /// The new high-watermark to pass as `last_sync` next time.
    pub current: WireDate,
}

/// An entry from the user's contact list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Contact {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub fullname: Option<String>,
}

/// A named group of contacts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    /// Ids of the contacts in this group.
    #[serde(default)]
    pub contacts: Vec<String>,
}

/// A saved location.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "de_f64")]
    pub longitude: f64,
    #[serde(deserialize_with = "de_f64")]
    pub latitude: f64,
    #[serde(deserialize_with = "de_i32")]
    pub zoom: i32,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(deserialize_with = "de_flag")]
    pub viewable: bool,
}

/// A timezone the service knows about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Timezone {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "de_flag")]
    pub dst: bool,
    #[serde(deserialize_with = "de_i32")]
    pub offset: i32,
    #[serde(deserialize_with = "de_i32")]
    pub current_offset: i32,
}

/// Per-user settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub timezone: String,
    #[serde(deserialize_with = "de_i32")]
    pub dateformat: i32,
    #[serde(deserialize_with = "de_i32")]
    pub timeformat: i32,
    #[serde(default)]
    pub defaultlist: Option<String>,
    pub language: String,
}

/// One declared argument of a reflected operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MethodArgument {
    pub name: String,
    #[serde(deserialize_with = "de_flag")]
    pub optional: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// Reflection data for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    #[serde(deserialize_with = "de_flag")]
    pub needslogin: bool,
    #[serde(deserialize_with = "de_flag")]
    pub needssigning: bool,
    #[serde(deserialize_with = "de_flag")]
    pub needstimeline: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub arguments: Vec<MethodArgument>,
}

// --- serde helpers for the stringly wire encoding ---

/// "1" → true, "0" or "" → false.
pub(crate) fn de_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let text = String::deserialize(deserializer)?;
    match text.as_str() {
        "1" => Ok(true),
        "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!("expected \"0\" or \"1\", got {other:?}"))),
    }
}

pub(crate) fn de_i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let text = String::deserialize(deserializer)?;
    text.parse().map_err(serde::de::Error::custom)
}

pub(crate) fn de_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let text = String::deserialize(deserializer)?;
    text.parse().map_err(serde::de::Error::custom)
}

pub(crate) fn de_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let text = String::deserialize(deserializer)?;
    text.parse().map_err(serde::de::Error::custom)
}

/// Empty string → None, anything else must parse as a wire date.
pub(crate) fn de_opt_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<WireDate>, D::Error> {
    let text = String::deserialize(deserializer)?;
    if text.is_empty() {
        return Ok(None);
    }
    WireDate::parse(&text).map(Some).map_err(serde::de::Error::custom)
}

/// Empty string → None.
pub(crate) fn de_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let text = String::deserialize(deserializer)?;
    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Convert a serde_json decoding failure into a protocol violation.
pub(crate) fn protocol_error(context: &str, err: serde_json::Error) -> RtmError {
    RtmError::Protocol(format!("{context}: {err}"))
}
