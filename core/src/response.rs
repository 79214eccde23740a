//! Reply decoding: envelope classification plus typed extraction.
//!
//! # Design
//! `Response::decode` parses the raw body into the generic envelope and
//! classifies it once: `stat=ok` keeps the payload tree, `stat=fail` keeps
//! the server's error code and message. Every typed extractor first consults
//! that classification, so a failed reply surfaces the same server error no
//! matter which extractor the caller reaches for — a caller can never read a
//! default value out of a failure.
//!
//! A body that is not well-formed, or an ok payload missing the fields an
//! extractor expects, is a protocol violation: the server answered, but not
//! per contract. That is fatal to the call and never retried.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::dates::WireDate;
use crate::error::RtmError;
use crate::types::{
    de_flag, de_opt_date, de_opt_string, de_u32, protocol_error, Auth, Contact, DeletedTask, Frob,
    Group, Location, MethodInfo, Note, Priority, Settings, SynchedTasks, Task, TaskList, Timezone,
    User,
};

/// A decoded reply: either an ok payload tree or a server-reported failure.
#[derive(Debug, Clone)]
pub struct Response {
    outcome: Outcome,
}

#[derive(Debug, Clone)]
enum Outcome {
    Success(Map<String, Value>),
    Failure { code: i32, msg: String },
}

impl Response {
    /// Parse and classify a raw reply body.
    pub fn decode(raw: &str) -> Result<Self, RtmError> {
        let root: Value = serde_json::from_str(raw)
            .map_err(|e| RtmError::Protocol(format!("reply is not valid JSON: {e}")))?;
        let rsp = root
            .get("rsp")
            .and_then(Value::as_object)
            .ok_or_else(|| RtmError::Protocol("reply has no rsp envelope".into()))?;

        match rsp.get("stat").and_then(Value::as_str) {
            Some("ok") => Ok(Self { outcome: Outcome::Success(rsp.clone()) }),
            Some("fail") => {
                let err = rsp
                    .get("err")
                    .and_then(Value::as_object)
                    .ok_or_else(|| RtmError::Protocol("fail reply has no err block".into()))?;
                let code = match err.get("code") {
                    Some(Value::String(s)) => s
                        .parse()
                        .map_err(|_| RtmError::Protocol(format!("non-numeric error code {s:?}")))?,
                    Some(Value::Number(n)) => n
                        .as_i64()
                        .map(|n| n as i32)
                        .ok_or_else(|| RtmError::Protocol("non-integer error code".into()))?,
                    _ => return Err(RtmError::Protocol("fail reply has no error code".into())),
                };
                let msg = err
                    .get("msg")
                    .and_then(Value::as_str)
                    .ok_or_else(|| RtmError::Protocol("fail reply has no error message".into()))?
                    .to_string();
                Ok(Self { outcome: Outcome::Failure { code, msg } })
            }
            Some(other) => Err(RtmError::Protocol(format!("unknown stat {other:?}"))),
            None => Err(RtmError::Protocol("reply has no stat discriminator".into())),
        }
    }

    fn payload(&self) -> Result<&Map<String, Value>, RtmError> {
        match &self.outcome {
            Outcome::Success(payload) => Ok(payload),
            Outcome::Failure { code, msg } => {
                Err(RtmError::Server { code: *code, msg: msg.clone() })
            }
        }
    }

    fn field(&self, name: &str) -> Result<&Value, RtmError> {
        self.payload()?
            .get(name)
            .ok_or_else(|| RtmError::Protocol(format!("payload has no {name:?} field")))
    }

    fn extract<T: DeserializeOwned>(&self, name: &str) -> Result<T, RtmError> {
        serde_json::from_value(self.field(name)?.clone())
            .map_err(|e| protocol_error(&format!("malformed {name:?} payload"), e))
    }

    /// Collections arrive wrapped: `{"lists": {"list": [...]}}`. An absent
    /// inner key means the collection is empty.
    fn extract_collection<T: DeserializeOwned>(
        &self,
        outer: &str,
        inner: &str,
    ) -> Result<Vec<T>, RtmError> {
        let wrapper = self.field(outer)?;
        let Some(items) = wrapper.get(inner) else {
            return Ok(Vec::new());
        };
        serde_json::from_value(items.clone())
            .map_err(|e| protocol_error(&format!("malformed {outer:?} payload"), e))
    }

    /// True iff the reply is an ok envelope; a failure reply surfaces the
    /// server error instead of a boolean.
    pub fn status(&self) -> Result<bool, RtmError> {
        self.payload().map(|_| true)
    }

    /// The logged-in user from `rtm.test.login`.
    pub fn login(&self) -> Result<User, RtmError> {
        self.extract("user")
    }

    pub fn frob(&self) -> Result<Frob, RtmError> {
        self.extract("frob")
    }

    pub fn auth(&self) -> Result<Auth, RtmError> {
        self.extract("auth")
    }

    /// A bare string payload field (timeline ids, echoed parameters).
    pub fn string(&self, name: &str) -> Result<String, RtmError> {
        self.field(name)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RtmError::Protocol(format!("{name:?} is not a string")))
    }

    pub fn timeline(&self) -> Result<String, RtmError> {
        self.string("timeline")
    }

    /// A wire date payload field (`rtm.time.convert`, `rtm.time.parse`).
    pub fn date(&self, name: &str) -> Result<WireDate, RtmError> {
        WireDate::parse(&self.string(name)?)
    }

    pub fn task_lists(&self) -> Result<Vec<TaskList>, RtmError> {
        self.extract_collection("lists", "list")
    }

    /// The single list returned by list-modifying operations.
    pub fn task_list(&self) -> Result<TaskList, RtmError> {
        self.extract("list")
    }

    pub fn contacts(&self) -> Result<Vec<Contact>, RtmError> {
        self.extract_collection("contacts", "contact")
    }

    pub fn contact(&self) -> Result<Contact, RtmError> {
        self.extract("contact")
    }

    pub fn groups(&self) -> Result<Vec<Group>, RtmError> {
        self.extract_collection("groups", "group")
    }

    pub fn group(&self) -> Result<Group, RtmError> {
        self.extract("group")
    }

    /// The single note returned by the note add/edit operations.
    pub fn note(&self) -> Result<Note, RtmError> {
        self.extract("note")
    }

    pub fn locations(&self) -> Result<Vec<Location>, RtmError> {
        self.extract_collection("locations", "location")
    }

    pub fn timezones(&self) -> Result<Vec<Timezone>, RtmError> {
        self.extract_collection("timezones", "timezone")
    }

    pub fn settings(&self) -> Result<Settings, RtmError> {
        self.extract("settings")
    }

    /// Operation names from `rtm.reflection.getMethods`.
    pub fn method_names(&self) -> Result<Vec<String>, RtmError> {
        self.extract_collection("methods", "method")
    }

    pub fn method_info(&self) -> Result<MethodInfo, RtmError> {
        self.extract("method")
    }

    /// All tasks in a `rtm.tasks.getList` reply, flattened across lists and
    /// taskseries.
    pub fn tasks(&self) -> Result<Vec<Task>, RtmError> {
        let envelope: TasksEnvelope = self.extract("tasks")?;
        Ok(envelope.flatten_live())
    }

    /// The taskseries returned by a task-modifying operation (complete,
    /// delete, set-name, ...), which reply with a single `list` entry.
    pub fn modified_tasks(&self) -> Result<Vec<Task>, RtmError> {
        let entry: ListEntry = self.extract("list")?;
        Ok(entry.flatten_live())
    }

    /// The freshly added task from `rtm.tasks.add`.
    pub fn added_task(&self) -> Result<Task, RtmError> {
        self.modified_tasks()?
            .into_iter()
            .next()
            .ok_or_else(|| RtmError::Protocol("add reply contains no task".into()))
    }

    /// Partition a sync reply into added / modified / deleted relative to the
    /// `last_sync` watermark the request was made with. A task id showing up
    /// in more than one partition is a contract violation, not a tiebreak.
    pub fn synched_tasks(&self, last_sync: WireDate) -> Result<SynchedTasks, RtmError> {
        let envelope: TasksEnvelope = self.extract("tasks")?;
        let current = envelope
            .current
            .ok_or_else(|| RtmError::Protocol("sync reply has no current watermark".into()))?;

        let mut added = Vec::new();
        let mut modified = Vec::new();
        let mut deleted = Vec::new();
        for entry in &envelope.list {
            for del in &entry.deleted {
                deleted.push(DeletedTask {
                    task_id: del.task_id.clone(),
                    taskseries_id: del.taskseries_id.clone(),
                    list_id: entry.id.clone(),
                    deleted: del.deleted,
                });
            }
        }
        for task in envelope.flatten_live() {
            if task.created.instant > last_sync.instant {
                added.push(task);
            } else {
                modified.push(task);
            }
        }

        let mut seen = HashSet::new();
        let ids = added
            .iter()
            .map(|t| t.id.as_str())
            .chain(modified.iter().map(|t| t.id.as_str()))
            .chain(deleted.iter().map(|t| t.task_id.as_str()));
        for id in ids {
            if !seen.insert(id) {
                return Err(RtmError::Protocol(format!(
                    "task {id} appears in more than one sync partition"
                )));
            }
        }

        Ok(SynchedTasks { added, modified, deleted, current })
    }
}

// --- wire shapes for the nested task payloads ---

#[derive(Debug, Deserialize)]
struct TasksEnvelope {
    #[serde(default)]
    current: Option<WireDate>,
    #[serde(default)]
    list: Vec<ListEntry>,
}

impl TasksEnvelope {
    fn flatten_live(&self) -> Vec<Task> {
        self.list.iter().flat_map(ListEntry::flatten_live).collect()
    }
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    id: String,
    #[serde(default)]
    taskseries: Vec<SeriesEntry>,
    #[serde(default)]
    deleted: Vec<DeletedEntry>,
}

impl ListEntry {
    fn flatten_live(&self) -> Vec<Task> {
        let mut tasks = Vec::new();
        for series in &self.taskseries {
            for occurrence in &series.task {
                tasks.push(Task {
                    id: occurrence.id.clone(),
                    taskseries_id: series.id.clone(),
                    list_id: self.id.clone(),
                    name: series.name.clone(),
                    created: series.created,
                    modified: series.modified,
                    added: occurrence.added,
                    due: occurrence.due,
                    has_due_time: occurrence.has_due_time,
                    completed: occurrence.completed,
                    deleted: occurrence.deleted,
                    priority: occurrence.priority,
                    postponed: occurrence.postponed,
                    estimate: occurrence.estimate.clone(),
                    source: series.source.clone(),
                    url: series.url.clone(),
                    location_id: series.location_id.clone(),
                    tags: series.tags.clone(),
                    notes: series.notes.clone(),
                });
            }
        }
        tasks
    }
}

#[derive(Debug, Deserialize)]
struct DeletedEntry {
    taskseries_id: String,
    task_id: String,
    deleted: WireDate,
}

#[derive(Debug, Deserialize)]
struct SeriesEntry {
    id: String,
    name: String,
    created: WireDate,
    modified: WireDate,
    source: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    url: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    location_id: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    notes: Vec<Note>,
    #[serde(default)]
    task: Vec<TaskEntry>,
}

#[derive(Debug, Deserialize)]
struct TaskEntry {
    id: String,
    added: WireDate,
    #[serde(default, deserialize_with = "de_opt_date")]
    due: Option<WireDate>,
    #[serde(default, deserialize_with = "de_flag")]
    has_due_time: bool,
    #[serde(default, deserialize_with = "de_opt_date")]
    completed: Option<WireDate>,
    #[serde(default, deserialize_with = "de_opt_date")]
    deleted: Option<WireDate>,
    #[serde(default)]
    priority: Priority,
    #[serde(default, deserialize_with = "de_u32")]
    postponed: u32,
    #[serde(default, deserialize_with = "de_opt_string")]
    estimate: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAIL_98: &str = r#"{"rsp":{"stat":"fail",
        "err":{"code":"98","msg":"Login failed / Invalid auth token"}}}"#;

    fn tasks_reply(current: &str, lists: &str) -> String {
        format!(r#"{{"rsp":{{"stat":"ok","tasks":{{"current":"{current}","list":[{lists}]}}}}}}"#)
    }

    fn series(id: &str, name: &str, created: &str, task_id: &str) -> String {
        format!(
            r#"{{"id":"{id}","name":"{name}","created":"{created}","modified":"{created}",
                "source":"api","tags":[],"notes":[],
                "task":[{{"id":"{task_id}","added":"{created}","due":"","has_due_time":"0",
                          "completed":"","deleted":"","priority":"N","postponed":"0",
                          "estimate":""}}]}}"#
        )
    }

    #[test]
    fn non_json_body_is_a_protocol_violation() {
        let err = Response::decode("<html>gateway timeout</html>").unwrap_err();
        assert!(matches!(err, RtmError::Protocol(_)));
    }

    #[test]
    fn missing_envelope_is_a_protocol_violation() {
        assert!(matches!(Response::decode(r#"{"ok":true}"#), Err(RtmError::Protocol(_))));
    }

    #[test]
    fn unknown_stat_is_a_protocol_violation() {
        let err = Response::decode(r#"{"rsp":{"stat":"maybe"}}"#).unwrap_err();
        assert!(matches!(err, RtmError::Protocol(_)));
    }

    #[test]
    fn ok_reply_has_true_status() {
        let response = Response::decode(r#"{"rsp":{"stat":"ok","timeline":"123"}}"#).unwrap();
        assert!(response.status().unwrap());
        assert_eq!(response.timeline().unwrap(), "123");
    }

    #[test]
    fn fail_reply_surfaces_the_server_error_from_every_extractor() {
        let response = Response::decode(FAIL_98).unwrap();
        for err in [
            response.status().unwrap_err(),
            response.task_lists().unwrap_err(),
            response.tasks().unwrap_err(),
            response.login().unwrap_err(),
        ] {
            match err {
                RtmError::Server { code, msg } => {
                    assert_eq!(code, 98);
                    assert_eq!(msg, "Login failed / Invalid auth token");
                }
                other => panic!("expected server error, got {other:?}"),
            }
        }
    }

    #[test]
    fn numeric_error_codes_are_accepted() {
        let response =
            Response::decode(r#"{"rsp":{"stat":"fail","err":{"code":105,"msg":"down"}}}"#).unwrap();
        assert_eq!(response.status().unwrap_err().server_code(), Some(105));
    }

    #[test]
    fn missing_expected_field_is_a_protocol_violation() {
        let response = Response::decode(r#"{"rsp":{"stat":"ok","timeline":"123"}}"#).unwrap();
        assert!(matches!(response.task_lists(), Err(RtmError::Protocol(_))));
        assert!(matches!(response.login(), Err(RtmError::Protocol(_))));
    }

    #[test]
    fn task_lists_decode_and_keep_all_ids() {
        let body = r#"{"rsp":{"stat":"ok","lists":{"list":[
            {"id":"100","name":"Inbox","deleted":"0","locked":"1","archived":"0","position":"-1","smart":"0"},
            {"id":"101","name":"Work","deleted":"0","locked":"0","archived":"0","position":"0","smart":"0"}
        ]}}}"#;
        let lists = Response::decode(body).unwrap().task_lists().unwrap();
        let ids: Vec<_> = lists.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["100", "101"]);
    }

    #[test]
    fn empty_collection_wrapper_decodes_to_empty_vec() {
        let body = r#"{"rsp":{"stat":"ok","lists":{}}}"#;
        assert!(Response::decode(body).unwrap().task_lists().unwrap().is_empty());
    }

    #[test]
    fn tasks_flatten_with_the_full_id_triple() {
        let body = tasks_reply(
            "2012-03-02T10:00:00Z",
            &format!(
                r#"{{"id":"100","taskseries":[{}]}}"#,
                series("ts-1", "Get milk", "2012-03-01T10:00:00Z", "t-1")
            ),
        );
        let tasks = Response::decode(&body).unwrap().tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "t-1");
        assert_eq!(tasks[0].taskseries_id, "ts-1");
        assert_eq!(tasks[0].list_id, "100");
        assert_eq!(tasks[0].name, "Get milk");
        assert_eq!(tasks[0].due, None);
        assert_eq!(tasks[0].priority, Priority::None);
    }

    #[test]
    fn modified_tasks_read_the_singular_list_entry() {
        let body = format!(
            r#"{{"rsp":{{"stat":"ok","transaction":{{"id":"1","undoable":"0"}},
                "list":{{"id":"100","taskseries":[{}]}}}}}}"#,
            series("ts-2", "Walk dog", "2012-03-01T09:00:00Z", "t-2")
        );
        let tasks = Response::decode(&body).unwrap().modified_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "t-2");
    }

    #[test]
    fn added_task_requires_a_task_in_the_reply() {
        let body = r#"{"rsp":{"stat":"ok","list":{"id":"100","taskseries":[]}}}"#;
        let err = Response::decode(body).unwrap().added_task().unwrap_err();
        assert!(matches!(err, RtmError::Protocol(_)));
    }

    #[test]
    fn synched_tasks_partition_by_the_watermark() {
        let last_sync = WireDate::parse("2012-03-01T00:00:00Z").unwrap();
        let lists = format!(
            r#"{{"id":"100",
                 "taskseries":[{},{}],
                 "deleted":[{{"taskseries_id":"ts-9","task_id":"t-9",
                              "deleted":"2012-03-01T12:00:00Z"}}]}}"#,
            series("ts-new", "New", "2012-03-01T08:00:00Z", "t-new"),
            series("ts-old", "Old", "2012-02-20T08:00:00Z", "t-old"),
        );
        let body = tasks_reply("2012-03-02T00:00:00Z", &lists);
        let synched = Response::decode(&body)
            .unwrap()
            .synched_tasks(last_sync)
            .unwrap();
        assert_eq!(synched.added.len(), 1);
        assert_eq!(synched.added[0].id, "t-new");
        assert_eq!(synched.modified.len(), 1);
        assert_eq!(synched.modified[0].id, "t-old");
        assert_eq!(synched.deleted.len(), 1);
        assert_eq!(synched.deleted[0].task_id, "t-9");
        assert_eq!(synched.deleted[0].list_id, "100");
        assert_eq!(synched.current.to_string(), "2012-03-02T00:00:00Z");
    }

    #[test]
    fn overlapping_sync_partitions_are_rejected() {
        // t-dup is both live (created after the watermark) and deleted.
        let last_sync = WireDate::parse("2012-03-01T00:00:00Z").unwrap();
        let lists = format!(
            r#"{{"id":"100",
                 "taskseries":[{}],
                 "deleted":[{{"taskseries_id":"ts-dup","task_id":"t-dup",
                              "deleted":"2012-03-01T12:00:00Z"}}]}}"#,
            series("ts-dup", "Dup", "2012-03-01T08:00:00Z", "t-dup"),
        );
        let body = tasks_reply("2012-03-02T00:00:00Z", &lists);
        let err = Response::decode(&body)
            .unwrap()
            .synched_tasks(last_sync)
            .unwrap_err();
        assert!(matches!(err, RtmError::Protocol(_)));
    }

    #[test]
    fn sync_reply_without_watermark_is_a_protocol_violation() {
        let body = r#"{"rsp":{"stat":"ok","tasks":{"list":[]}}}"#;
        let last_sync = WireDate::parse("2012-03-01T00:00:00Z").unwrap();
        let err = Response::decode(body).unwrap().synched_tasks(last_sync).unwrap_err();
        assert!(matches!(err, RtmError::Protocol(_)));
    }

    #[test]
    fn date_extraction_parses_the_wire_format() {
        let response =
            Response::decode(r#"{"rsp":{"stat":"ok","time":"2012-03-01T17:45:09Z"}}"#).unwrap();
        let time = response.date("time").unwrap();
        assert!(time.has_time);
        assert_eq!(time.to_string(), "2012-03-01T17:45:09Z");

        let malformed =
            Response::decode(r#"{"rsp":{"stat":"ok","time":"soonish"}}"#).unwrap();
        assert!(matches!(malformed.date("time"), Err(RtmError::Protocol(_))));
    }

    #[test]
    fn note_decodes_from_a_note_reply() {
        let body = r#"{"rsp":{"stat":"ok","note":{
            "id":"n-1","title":"Call first","body":"after 6pm",
            "created":"2012-03-01T10:00:00Z","modified":"2012-03-01T10:05:00Z"}}}"#;
        let note = Response::decode(body).unwrap().note().unwrap();
        assert_eq!(note.id, "n-1");
        assert_eq!(note.title, "Call first");
        assert_eq!(note.body, "after 6pm");
    }

    #[test]
    fn method_names_decode_from_the_reflection_wrapper() {
        let body = r#"{"rsp":{"stat":"ok","methods":{"method":["rtm.test.echo","rtm.test.login"]}}}"#;
        let names = Response::decode(body).unwrap().method_names().unwrap();
        assert_eq!(names, vec!["rtm.test.echo", "rtm.test.login"]);
    }
}
