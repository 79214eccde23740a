//! The typed operation surface over the signing/transport/decoding core.
//!
//! # Design
//! Every method here is mechanical glue: assemble a parameter set, build the
//! request at the right capability level, send it once, hand the body to the
//! decoder. One method per logical action — where the service accepts either
//! an id or a whole entity, the caller projects `entity.id` (or uses
//! [`Task::task_ref`](crate::types::Task::task_ref)) instead of this layer
//! duplicating overloads. Optional parameters are plain `Option`s; `None`
//! omits the parameter, which is also how the unset-variants of the task
//! operations work.

use crate::dates::WireDate;
use crate::error::RtmError;
use crate::method::Method;
use crate::params::Params;
use crate::request::{Credentials, RequestBuilder, RequestKind};
use crate::response::Response;
use crate::transport::{HttpTransport, Transport};
use crate::types::{
    Contact, Group, Location, MethodInfo, Note, Priority, Settings, SynchedTasks, Task, TaskList,
    TaskRef, Timezone, Token, User,
};

/// Which way `tasks_move_priority` nudges a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityDirection {
    Up,
    Down,
}

impl PriorityDirection {
    fn as_param(self) -> &'static str {
        match self {
            PriorityDirection::Up => "up",
            PriorityDirection::Down => "down",
        }
    }
}

/// A client bound to one application credential pair and one user token.
///
/// Stateless per call: each operation is at most one network round trip, and
/// nothing is shared between calls, so one client can be used from multiple
/// threads behind a reference.
#[derive(Debug)]
pub struct RtmClient<T = HttpTransport> {
    builder: RequestBuilder,
    transport: T,
}

impl RtmClient<HttpTransport> {
    /// Client against the production endpoint.
    pub fn new(credentials: Credentials, token: Token) -> Self {
        Self::with_transport(credentials, token, HttpTransport::new())
    }
}

impl<T: Transport> RtmClient<T> {
    pub fn with_transport(credentials: Credentials, token: Token, transport: T) -> Self {
        Self {
            builder: RequestBuilder::new(credentials).with_token(token),
            transport,
        }
    }

    fn call(
        &self,
        kind: RequestKind,
        method: Method,
        params: Params,
    ) -> Result<Response, RtmError> {
        let request = self.builder.build(kind, method, params)?;
        let body = self.transport.send(&request)?;
        Response::decode(&body)
    }

    fn authed(&self, method: Method, params: Params) -> Result<Response, RtmError> {
        self.call(RequestKind::Authenticated, method, params)
    }

    fn signed(&self, method: Method, params: Params) -> Result<Response, RtmError> {
        self.call(RequestKind::Signed, method, params)
    }

    // --- test ---

    /// Echo arbitrary parameters off the server; returns the raw reply body.
    pub fn test_echo(&self, params: Params) -> Result<String, RtmError> {
        let request = self.builder.build(RequestKind::Plain, Method::TestEcho, params)?;
        self.transport.send(&request)
    }

    /// Who the configured token is logged in as.
    pub fn test_login(&self) -> Result<User, RtmError> {
        self.authed(Method::TestLogin, Params::new())?.login()
    }

    // --- timelines ---

    /// Create the timeline under which mutating calls are grouped.
    pub fn timelines_create(&self) -> Result<String, RtmError> {
        self.authed(Method::TimelinesCreate, Params::new())?.timeline()
    }

    // --- lists ---

    pub fn lists_get_list(&self) -> Result<Vec<TaskList>, RtmError> {
        self.authed(Method::ListsGetList, Params::new())?.task_lists()
    }

    /// Add a list; a `filter` makes it a smart list.
    pub fn lists_add(
        &self,
        timeline: &str,
        name: &str,
        filter: Option<&str>,
    ) -> Result<TaskList, RtmError> {
        let mut params = Params::new();
        params.insert("timeline", timeline);
        params.insert("name", name);
        if let Some(filter) = filter {
            params.insert("filter", filter);
        }
        self.authed(Method::ListsAdd, params)?.task_list()
    }

    pub fn lists_delete(&self, timeline: &str, list_id: &str) -> Result<TaskList, RtmError> {
        self.authed(Method::ListsDelete, list_params(timeline, list_id))?.task_list()
    }

    pub fn lists_archive(&self, timeline: &str, list_id: &str) -> Result<TaskList, RtmError> {
        self.authed(Method::ListsArchive, list_params(timeline, list_id))?.task_list()
    }

    pub fn lists_unarchive(&self, timeline: &str, list_id: &str) -> Result<TaskList, RtmError> {
        self.authed(Method::ListsUnarchive, list_params(timeline, list_id))?.task_list()
    }

    pub fn lists_set_name(
        &self,
        timeline: &str,
        list_id: &str,
        name: &str,
    ) -> Result<TaskList, RtmError> {
        let mut params = list_params(timeline, list_id);
        params.insert("name", name);
        self.authed(Method::ListsSetName, params)?.task_list()
    }

    pub fn lists_set_default(&self, timeline: &str, list_id: &str) -> Result<bool, RtmError> {
        self.authed(Method::ListsSetDefault, list_params(timeline, list_id))?.status()
    }

    // --- contacts ---

    pub fn contacts_get_list(&self) -> Result<Vec<Contact>, RtmError> {
        self.authed(Method::ContactsGetList, Params::new())?.contacts()
    }

    /// Add a contact by username or email address.
    pub fn contacts_add(&self, timeline: &str, contact: &str) -> Result<Contact, RtmError> {
        let mut params = Params::new();
        params.insert("timeline", timeline);
        params.insert("contact", contact);
        self.authed(Method::ContactsAdd, params)?.contact()
    }

    pub fn contacts_delete(&self, timeline: &str, contact_id: &str) -> Result<bool, RtmError> {
        let mut params = Params::new();
        params.insert("timeline", timeline);
        params.insert("contact_id", contact_id);
        self.authed(Method::ContactsDelete, params)?.status()
    }

    // --- groups ---

    pub fn groups_get_list(&self) -> Result<Vec<Group>, RtmError> {
        self.authed(Method::GroupsGetList, Params::new())?.groups()
    }

    pub fn groups_add(&self, timeline: &str, name: &str) -> Result<Group, RtmError> {
        let mut params = Params::new();
        params.insert("timeline", timeline);
        params.insert("group", name);
        self.authed(Method::GroupsAdd, params)?.group()
    }

    pub fn groups_delete(&self, timeline: &str, group_id: &str) -> Result<bool, RtmError> {
        self.authed(Method::GroupsDelete, group_params(timeline, group_id))?.status()
    }

    pub fn groups_add_contact(
        &self,
        timeline: &str,
        group_id: &str,
        contact_id: &str,
    ) -> Result<bool, RtmError> {
        let mut params = group_params(timeline, group_id);
        params.insert("contact_id", contact_id);
        self.authed(Method::GroupsAddContact, params)?.status()
    }

    pub fn groups_remove_contact(
        &self,
        timeline: &str,
        group_id: &str,
        contact_id: &str,
    ) -> Result<bool, RtmError> {
        let mut params = group_params(timeline, group_id);
        params.insert("contact_id", contact_id);
        self.authed(Method::GroupsRemoveContact, params)?.status()
    }

    // --- tasks ---

    /// All tasks, optionally narrowed to a list and/or a search filter.
    pub fn tasks_get_list(
        &self,
        list_id: Option<&str>,
        filter: Option<&str>,
    ) -> Result<Vec<Task>, RtmError> {
        let mut params = Params::new();
        if let Some(list_id) = list_id {
            params.insert("list_id", list_id);
        }
        if let Some(filter) = filter {
            params.insert("filter", filter);
        }
        self.authed(Method::TasksGetList, params)?.tasks()
    }

    /// Everything created, modified or deleted since `last_sync`, plus the
    /// next watermark.
    pub fn tasks_get_synched_list(
        &self,
        list_id: Option<&str>,
        filter: Option<&str>,
        last_sync: WireDate,
    ) -> Result<SynchedTasks, RtmError> {
        let mut params = Params::new();
        if let Some(list_id) = list_id {
            params.insert("list_id", list_id);
        }
        if let Some(filter) = filter {
            params.insert("filter", filter);
        }
        params.insert("last_sync", last_sync.to_string());
        self.authed(Method::TasksGetList, params)?.synched_tasks(last_sync)
    }

    /// Add a task; `smart` runs the name through Smart Add parsing.
    pub fn tasks_add(
        &self,
        timeline: &str,
        name: &str,
        list_id: Option<&str>,
        smart: bool,
    ) -> Result<Task, RtmError> {
        let mut params = Params::new();
        params.insert("timeline", timeline);
        params.insert("name", name);
        if let Some(list_id) = list_id {
            params.insert("list_id", list_id);
        }
        if smart {
            params.insert("parse", "1");
        }
        self.authed(Method::TasksAdd, params)?.added_task()
    }

    pub fn tasks_delete(&self, timeline: &str, task: &TaskRef) -> Result<Vec<Task>, RtmError> {
        self.authed(Method::TasksDelete, task_params(timeline, task))?.modified_tasks()
    }

    pub fn tasks_complete(&self, timeline: &str, task: &TaskRef) -> Result<Vec<Task>, RtmError> {
        self.authed(Method::TasksComplete, task_params(timeline, task))?.modified_tasks()
    }

    pub fn tasks_uncomplete(&self, timeline: &str, task: &TaskRef) -> Result<Vec<Task>, RtmError> {
        self.authed(Method::TasksUncomplete, task_params(timeline, task))?.modified_tasks()
    }

    pub fn tasks_postpone(&self, timeline: &str, task: &TaskRef) -> Result<Vec<Task>, RtmError> {
        self.authed(Method::TasksPostpone, task_params(timeline, task))?.modified_tasks()
    }

    pub fn tasks_set_name(
        &self,
        timeline: &str,
        task: &TaskRef,
        name: &str,
    ) -> Result<Vec<Task>, RtmError> {
        let mut params = task_params(timeline, task);
        params.insert("name", name);
        self.authed(Method::TasksSetName, params)?.modified_tasks()
    }

    /// `None` clears the due date. `has_due_time` is only sent when a due
    /// date is.
    pub fn tasks_set_due_date(
        &self,
        timeline: &str,
        task: &TaskRef,
        due: Option<&WireDate>,
    ) -> Result<Vec<Task>, RtmError> {
        let mut params = task_params(timeline, task);
        if let Some(due) = due {
            params.insert("due", due.to_string());
            if due.has_time {
                params.insert("has_due_time", "1");
            }
        }
        self.authed(Method::TasksSetDueDate, params)?.modified_tasks()
    }

    pub fn tasks_set_priority(
        &self,
        timeline: &str,
        task: &TaskRef,
        priority: Priority,
    ) -> Result<Vec<Task>, RtmError> {
        let mut params = task_params(timeline, task);
        params.insert("priority", priority.as_param());
        self.authed(Method::TasksSetPriority, params)?.modified_tasks()
    }

    pub fn tasks_move_priority(
        &self,
        timeline: &str,
        task: &TaskRef,
        direction: PriorityDirection,
    ) -> Result<Vec<Task>, RtmError> {
        let mut params = task_params(timeline, task);
        params.insert("direction", direction.as_param());
        self.authed(Method::TasksMovePriority, params)?.modified_tasks()
    }

    pub fn tasks_move_to(
        &self,
        timeline: &str,
        task: &TaskRef,
        to_list_id: &str,
    ) -> Result<Vec<Task>, RtmError> {
        let mut params = Params::new();
        params.insert("timeline", timeline);
        params.insert("from_list_id", task.list_id.as_str());
        params.insert("taskseries_id", task.taskseries_id.as_str());
        params.insert("task_id", task.task_id.as_str());
        params.insert("to_list_id", to_list_id);
        self.authed(Method::TasksMoveTo, params)?.modified_tasks()
    }

    pub fn tasks_add_tags(
        &self,
        timeline: &str,
        task: &TaskRef,
        tags: &[&str],
    ) -> Result<Vec<Task>, RtmError> {
        let mut params = task_params(timeline, task);
        params.insert("tags", tags.join(","));
        self.authed(Method::TasksAddTags, params)?.modified_tasks()
    }

    pub fn tasks_remove_tags(
        &self,
        timeline: &str,
        task: &TaskRef,
        tags: &[&str],
    ) -> Result<Vec<Task>, RtmError> {
        let mut params = task_params(timeline, task);
        params.insert("tags", tags.join(","));
        self.authed(Method::TasksRemoveTags, params)?.modified_tasks()
    }

    /// Replace the tag set; an empty slice clears every tag.
    pub fn tasks_set_tags(
        &self,
        timeline: &str,
        task: &TaskRef,
        tags: &[&str],
    ) -> Result<Vec<Task>, RtmError> {
        let mut params = task_params(timeline, task);
        params.insert("tags", tags.join(","));
        self.authed(Method::TasksSetTags, params)?.modified_tasks()
    }

    /// `None` unsets the estimate.
    pub fn tasks_set_estimate(
        &self,
        timeline: &str,
        task: &TaskRef,
        estimate: Option<&str>,
    ) -> Result<Vec<Task>, RtmError> {
        let mut params = task_params(timeline, task);
        if let Some(estimate) = estimate {
            params.insert("estimate", estimate);
        }
        self.authed(Method::TasksSetEstimate, params)?.modified_tasks()
    }

    /// `None` unsets the location.
    pub fn tasks_set_location(
        &self,
        timeline: &str,
        task: &TaskRef,
        location_id: Option<&str>,
    ) -> Result<Vec<Task>, RtmError> {
        let mut params = task_params(timeline, task);
        if let Some(location_id) = location_id {
            params.insert("location_id", location_id);
        }
        self.authed(Method::TasksSetLocation, params)?.modified_tasks()
    }

    /// `None` unsets the recurrence rule.
    pub fn tasks_set_recurrence(
        &self,
        timeline: &str,
        task: &TaskRef,
        recurrence: Option<&str>,
    ) -> Result<Vec<Task>, RtmError> {
        let mut params = task_params(timeline, task);
        if let Some(recurrence) = recurrence {
            params.insert("repeat", recurrence);
        }
        self.authed(Method::TasksSetRecurrence, params)?.modified_tasks()
    }

    /// `None` unsets the URL.
    pub fn tasks_set_url(
        &self,
        timeline: &str,
        task: &TaskRef,
        url: Option<&str>,
    ) -> Result<Vec<Task>, RtmError> {
        let mut params = task_params(timeline, task);
        if let Some(url) = url {
            params.insert("url", url);
        }
        self.authed(Method::TasksSetUrl, params)?.modified_tasks()
    }

    // --- notes ---

    /// Attach a note to a task.
    pub fn tasks_notes_add(
        &self,
        timeline: &str,
        task: &TaskRef,
        title: &str,
        body: &str,
    ) -> Result<Note, RtmError> {
        let mut params = task_params(timeline, task);
        params.insert("note_title", title);
        params.insert("note_text", body);
        self.authed(Method::TasksNotesAdd, params)?.note()
    }

    /// Replace a note's title and body. Once created, notes are addressed by
    /// their own id rather than the task triple.
    pub fn tasks_notes_edit(
        &self,
        timeline: &str,
        note_id: &str,
        title: &str,
        body: &str,
    ) -> Result<Note, RtmError> {
        let mut params = Params::new();
        params.insert("timeline", timeline);
        params.insert("note_id", note_id);
        params.insert("note_title", title);
        params.insert("note_text", body);
        self.authed(Method::TasksNotesEdit, params)?.note()
    }

    pub fn tasks_notes_delete(&self, timeline: &str, note_id: &str) -> Result<bool, RtmError> {
        let mut params = Params::new();
        params.insert("timeline", timeline);
        params.insert("note_id", note_id);
        self.authed(Method::TasksNotesDelete, params)?.status()
    }

    // --- time ---

    /// Convert a time between timezones; `time` defaults to now server-side,
    /// `from_timezone` to UTC.
    pub fn time_convert(
        &self,
        to_timezone: &str,
        from_timezone: Option<&str>,
        time: Option<&WireDate>,
    ) -> Result<WireDate, RtmError> {
        let mut params = Params::new();
        params.insert("to_timezone", to_timezone);
        if let Some(from_timezone) = from_timezone {
            params.insert("from_timezone", from_timezone);
        }
        if let Some(time) = time {
            params.insert("time", time.to_string());
        }
        self.signed(Method::TimeConvert, params)?.date("time")
    }

    /// Parse free-form date text server-side.
    pub fn time_parse(
        &self,
        text: &str,
        timezone: Option<&str>,
    ) -> Result<WireDate, RtmError> {
        let mut params = Params::new();
        params.insert("text", text);
        if let Some(timezone) = timezone {
            params.insert("timezone", timezone);
        }
        self.signed(Method::TimeParse, params)?.date("time")
    }

    // --- settings, timezones, locations ---

    pub fn settings_get_list(&self) -> Result<Settings, RtmError> {
        self.authed(Method::SettingsGetList, Params::new())?.settings()
    }

    pub fn timezones_get_list(&self) -> Result<Vec<Timezone>, RtmError> {
        self.authed(Method::TimezonesGetList, Params::new())?.timezones()
    }

    pub fn locations_get_list(&self) -> Result<Vec<Location>, RtmError> {
        self.authed(Method::LocationsGetList, Params::new())?.locations()
    }

    // --- reflection ---

    pub fn reflection_get_methods(&self) -> Result<Vec<String>, RtmError> {
        self.signed(Method::ReflectionGetMethods, Params::new())?.method_names()
    }

    pub fn reflection_get_method_info(&self, method_name: &str) -> Result<MethodInfo, RtmError> {
        let mut params = Params::new();
        params.insert("method_name", method_name);
        self.signed(Method::ReflectionGetMethodInfo, params)?.method_info()
    }
}

fn list_params(timeline: &str, list_id: &str) -> Params {
    let mut params = Params::new();
    params.insert("timeline", timeline);
    params.insert("list_id", list_id);
    params
}

fn group_params(timeline: &str, group_id: &str) -> Params {
    let mut params = Params::new();
    params.insert("timeline", timeline);
    params.insert("group_id", group_id);
    params
}

fn task_params(timeline: &str, task: &TaskRef) -> Params {
    let mut params = Params::new();
    params.insert("timeline", timeline);
    params.insert("list_id", task.list_id.as_str());
    params.insert("taskseries_id", task.taskseries_id.as_str());
    params.insert("task_id", task.task_id.as_str());
    params
}
