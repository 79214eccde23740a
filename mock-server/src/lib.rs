use std::{collections::BTreeMap, collections::HashSet, sync::Arc};

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use md5::{Digest, Md5};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// The one application credential pair the mock accepts.
pub const API_KEY: &str = "key-1";
pub const SHARED_SECRET: &str = "topsecret";

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const SUPPORTED_METHODS: &[&str] = &[
    "rtm.auth.checkToken",
    "rtm.auth.getFrob",
    "rtm.auth.getToken",
    "rtm.lists.add",
    "rtm.lists.delete",
    "rtm.lists.getList",
    "rtm.lists.setName",
    "rtm.reflection.getMethods",
    "rtm.tasks.add",
    "rtm.tasks.complete",
    "rtm.tasks.delete",
    "rtm.tasks.getList",
    "rtm.tasks.setName",
    "rtm.test.echo",
    "rtm.test.login",
    "rtm.timelines.create",
];

#[derive(Clone, Debug)]
struct ListRec {
    id: String,
    name: String,
    deleted: bool,
    locked: bool,
    position: i32,
    smart: bool,
    filter: Option<String>,
}

#[derive(Clone, Debug)]
struct TaskRec {
    series_id: String,
    list_id: String,
    name: String,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
    task_id: String,
    added: DateTime<Utc>,
    completed: Option<DateTime<Utc>>,
    deleted: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct Store {
    tick: i64,
    frobs: HashSet<String>,
    tokens: HashSet<String>,
    timelines: HashSet<String>,
    lists: Vec<ListRec>,
    tasks: Vec<TaskRec>,
    next_id: u64,
}

impl Store {
    fn new() -> Self {
        Self {
            tick: 0,
            frobs: HashSet::new(),
            tokens: HashSet::new(),
            timelines: HashSet::new(),
            lists: vec![ListRec {
                id: "100".to_string(),
                name: "Inbox".to_string(),
                deleted: false,
                locked: true,
                position: -1,
                smart: false,
                filter: None,
            }],
            tasks: Vec::new(),
            next_id: 1000,
        }
    }

    /// A monotonic logical clock, so every mutation gets a distinct and
    /// reproducible timestamp.
    fn now(&mut self) -> DateTime<Utc> {
        self.tick += 1;
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(self.tick)
    }

    fn next_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::new()));
    Router::new()
        .route("/services/rest/", get(rest))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// The signature the mock expects: md5 over the shared secret followed by
/// every parameter except the signature itself, name-then-value, in byte
/// order of the names.
pub fn expected_sig(params: &BTreeMap<String, String>) -> String {
    let mut input = SHARED_SECRET.to_string();
    for (name, value) in params {
        if name != "api_sig" {
            input.push_str(name);
            input.push_str(value);
        }
    }
    hex::encode(Md5::digest(input.as_bytes()))
}

async fn rest(State(db): State<Db>, Query(params): Query<BTreeMap<String, String>>) -> Json<Value> {
    let Some(method) = params.get("method").cloned() else {
        return Json(fail(112, "No method provided"));
    };
    if params.get("api_key").map(String::as_str) != Some(API_KEY) {
        return Json(fail(100, "Invalid API Key"));
    }
    if method != "rtm.test.echo" {
        match params.get("api_sig") {
            None => return Json(fail(97, "Missing signature")),
            Some(sig) if *sig != expected_sig(&params) => {
                return Json(fail(96, "Invalid signature"))
            }
            Some(_) => {}
        }
    }

    let mut store = db.write().await;
    let reply = match method.as_str() {
        "rtm.test.echo" => echo(&params),
        "rtm.auth.getFrob" => get_frob(&mut store),
        "rtm.auth.getToken" => get_token(&mut store, &params),
        "rtm.auth.checkToken" => check_token(&store, &params),
        "rtm.reflection.getMethods" => get_methods(),
        _ => {
            if !SUPPORTED_METHODS.contains(&method.as_str()) {
                fail(112, &format!("Method \"{method}\" not found"))
            } else if !valid_token(&store, &params) {
                fail(98, "Login failed / Invalid auth token")
            } else {
                dispatch_authed(&mut store, &method, &params)
            }
        }
    };
    Json(reply)
}

fn dispatch_authed(store: &mut Store, method: &str, params: &BTreeMap<String, String>) -> Value {
    match method {
        "rtm.test.login" => ok(json!({"user": {"id": "1", "username": "tester"}})),
        "rtm.timelines.create" => timelines_create(store),
        "rtm.lists.getList" => lists_get_list(store),
        "rtm.lists.add" => lists_add(store, params),
        "rtm.lists.delete" => lists_delete(store, params),
        "rtm.lists.setName" => lists_set_name(store, params),
        "rtm.tasks.getList" => tasks_get_list(store, params),
        "rtm.tasks.add" => tasks_add(store, params),
        "rtm.tasks.complete" => tasks_complete(store, params),
        "rtm.tasks.delete" => tasks_delete(store, params),
        "rtm.tasks.setName" => tasks_set_name(store, params),
        other => fail(112, &format!("Method \"{other}\" not found")),
    }
}

// --- envelope helpers ---

fn ok(extra: Value) -> Value {
    let mut rsp = Map::new();
    if let Value::Object(fields) = extra {
        rsp.extend(fields);
    }
    rsp.insert("stat".to_string(), json!("ok"));
    json!({ "rsp": rsp })
}

/// Reflect every query parameter back inside an ok envelope.
fn echo(params: &BTreeMap<String, String>) -> Value {
    let fields: Map<String, Value> = params
        .iter()
        .map(|(name, value)| (name.clone(), json!(value)))
        .collect();
    ok(Value::Object(fields))
}

fn fail(code: i32, msg: &str) -> Value {
    json!({"rsp": {"stat": "fail", "err": {"code": code.to_string(), "msg": msg}}})
}

fn render(date: DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn valid_token(store: &Store, params: &BTreeMap<String, String>) -> bool {
    params
        .get("auth_token")
        .is_some_and(|token| store.tokens.contains(token))
}

fn require<'a>(
    params: &'a BTreeMap<String, String>,
    name: &str,
) -> Result<&'a str, Value> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| fail(340, &format!("Required parameter \"{name}\" missing")))
}

fn require_timeline<'a>(
    store: &Store,
    params: &'a BTreeMap<String, String>,
) -> Result<&'a str, Value> {
    let timeline = require(params, "timeline")?;
    if store.timelines.contains(timeline) {
        Ok(timeline)
    } else {
        Err(fail(300, "Timeline invalid or not provided"))
    }
}

fn transaction() -> Value {
    json!({"id": "1", "undoable": "0"})
}

// --- auth ---

fn get_frob(store: &mut Store) -> Value {
    let frob = Uuid::new_v4().to_string();
    store.frobs.insert(frob.clone());
    ok(json!({ "frob": frob }))
}

fn get_token(store: &mut Store, params: &BTreeMap<String, String>) -> Value {
    let frob = match require(params, "frob") {
        Ok(frob) => frob,
        Err(reply) => return reply,
    };
    if !store.frobs.remove(frob) {
        return fail(101, "Invalid frob - did you authenticate?");
    }
    let token = Uuid::new_v4().to_string();
    store.tokens.insert(token.clone());
    ok(auth_payload(&token))
}

fn check_token(store: &Store, params: &BTreeMap<String, String>) -> Value {
    match params.get("auth_token") {
        Some(token) if store.tokens.contains(token) => ok(auth_payload(token)),
        _ => fail(98, "Login failed / Invalid auth token"),
    }
}

fn auth_payload(token: &str) -> Value {
    json!({"auth": {
        "token": token,
        "perms": "delete",
        "user": {"id": "1", "username": "tester"}
    }})
}

// --- reflection ---

fn get_methods() -> Value {
    ok(json!({"methods": {"method": SUPPORTED_METHODS}}))
}

// --- timelines ---

fn timelines_create(store: &mut Store) -> Value {
    let timeline = Uuid::new_v4().to_string();
    store.timelines.insert(timeline.clone());
    ok(json!({ "timeline": timeline }))
}

// --- lists ---

fn list_json(list: &ListRec) -> Value {
    let mut fields = json!({
        "id": list.id,
        "name": list.name,
        "deleted": flag(list.deleted),
        "locked": flag(list.locked),
        "archived": "0",
        "position": list.position.to_string(),
        "smart": flag(list.smart),
    });
    if let Some(filter) = &list.filter {
        fields["filter"] = json!(filter);
    }
    fields
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn lists_get_list(store: &Store) -> Value {
    let lists: Vec<Value> = store.lists.iter().map(list_json).collect();
    ok(json!({"lists": {"list": lists}}))
}

fn lists_add(store: &mut Store, params: &BTreeMap<String, String>) -> Value {
    if let Err(reply) = require_timeline(store, params) {
        return reply;
    }
    let name = match require(params, "name") {
        Ok(name) => name.to_string(),
        Err(reply) => return reply,
    };
    let filter = params.get("filter").cloned();
    let list = ListRec {
        id: store.next_id(),
        name,
        deleted: false,
        locked: false,
        position: 0,
        smart: filter.is_some(),
        filter,
    };
    store.lists.push(list.clone());
    ok(json!({"transaction": transaction(), "list": list_json(&list)}))
}

fn lists_delete(store: &mut Store, params: &BTreeMap<String, String>) -> Value {
    if let Err(reply) = require_timeline(store, params) {
        return reply;
    }
    let list_id = match require(params, "list_id") {
        Ok(id) => id,
        Err(reply) => return reply,
    };
    let Some(list) = store.lists.iter_mut().find(|l| l.id == list_id) else {
        return fail(320, "list_id invalid");
    };
    if list.locked {
        return fail(321, "list_id is locked");
    }
    list.deleted = true;
    let reply = list_json(list);
    ok(json!({"transaction": transaction(), "list": reply}))
}

fn lists_set_name(store: &mut Store, params: &BTreeMap<String, String>) -> Value {
    if let Err(reply) = require_timeline(store, params) {
        return reply;
    }
    let (list_id, name) = match (require(params, "list_id"), require(params, "name")) {
        (Ok(id), Ok(name)) => (id, name.to_string()),
        (Err(reply), _) | (_, Err(reply)) => return reply,
    };
    let Some(list) = store.lists.iter_mut().find(|l| l.id == list_id) else {
        return fail(320, "list_id invalid");
    };
    list.name = name;
    let reply = list_json(list);
    ok(json!({"transaction": transaction(), "list": reply}))
}

// --- tasks ---

fn series_json(task: &TaskRec) -> Value {
    json!({
        "id": task.series_id,
        "name": task.name,
        "created": render(task.created),
        "modified": render(task.modified),
        "source": "api",
        "tags": [],
        "notes": [],
        "task": [{
            "id": task.task_id,
            "added": render(task.added),
            "due": "",
            "has_due_time": "0",
            "completed": task.completed.map(render).unwrap_or_default(),
            "deleted": task.deleted.map(render).unwrap_or_default(),
            "priority": "N",
            "postponed": "0",
            "estimate": ""
        }]
    })
}

/// The singular `list` entry task-modifying operations reply with.
fn modified_list(task: &TaskRec) -> Value {
    ok(json!({
        "transaction": transaction(),
        "list": {"id": task.list_id, "taskseries": [series_json(task)]}
    }))
}

fn tasks_get_list(store: &mut Store, params: &BTreeMap<String, String>) -> Value {
    let list_filter = params.get("list_id").cloned();
    let last_sync = match params.get("last_sync") {
        Some(raw) => match parse_date(raw) {
            Some(date) => Some(date),
            None => return fail(340, "last_sync is not a valid time"),
        },
        None => None,
    };

    let mut lists: Map<String, Value> = Map::new();
    for task in &store.tasks {
        if list_filter.as_deref().is_some_and(|id| id != task.list_id) {
            continue;
        }
        let entry = lists.entry(task.list_id.clone()).or_insert_with(|| {
            json!({"id": task.list_id, "taskseries": [], "deleted": []})
        });
        match (task.deleted, last_sync) {
            (None, watermark) if watermark.map_or(true, |w| task.modified > w) => {
                if let Some(series) = entry["taskseries"].as_array_mut() {
                    series.push(series_json(task));
                }
            }
            (Some(deleted_at), Some(watermark)) if deleted_at > watermark => {
                if let Some(deleted) = entry["deleted"].as_array_mut() {
                    deleted.push(json!({
                        "taskseries_id": task.series_id,
                        "task_id": task.task_id,
                        "deleted": render(deleted_at),
                    }));
                }
            }
            _ => {}
        }
    }

    let entries: Vec<Value> = lists.into_iter().map(|(_, v)| v).collect();
    let mut tasks = json!({"list": entries});
    if last_sync.is_some() {
        tasks["current"] = json!(render(store.now()));
    }
    ok(json!({ "tasks": tasks }))
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(raw, DATE_FORMAT)
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .ok()
}

fn tasks_add(store: &mut Store, params: &BTreeMap<String, String>) -> Value {
    if let Err(reply) = require_timeline(store, params) {
        return reply;
    }
    let name = match require(params, "name") {
        Ok(name) => name.to_string(),
        Err(reply) => return reply,
    };
    let list_id = params.get("list_id").cloned().unwrap_or_else(|| "100".to_string());
    if !store.lists.iter().any(|l| l.id == list_id && !l.deleted) {
        return fail(320, "list_id invalid");
    }
    let now = store.now();
    let task = TaskRec {
        series_id: store.next_id(),
        list_id,
        name,
        created: now,
        modified: now,
        task_id: store.next_id(),
        added: now,
        completed: None,
        deleted: None,
    };
    store.tasks.push(task.clone());
    modified_list(&task)
}

fn find_task<'a>(
    store: &'a mut Store,
    params: &BTreeMap<String, String>,
) -> Result<&'a mut TaskRec, Value> {
    let list_id = require(params, "list_id")?;
    let series_id = require(params, "taskseries_id")?;
    let task_id = require(params, "task_id")?;
    store
        .tasks
        .iter_mut()
        .find(|t| {
            t.deleted.is_none()
                && t.list_id == list_id
                && t.series_id == series_id
                && t.task_id == task_id
        })
        .ok_or_else(|| fail(310, "task_id invalid"))
}

fn tasks_complete(store: &mut Store, params: &BTreeMap<String, String>) -> Value {
    if let Err(reply) = require_timeline(store, params) {
        return reply;
    }
    let now = store.now();
    let task = match find_task(store, params) {
        Ok(task) => task,
        Err(reply) => return reply,
    };
    task.completed = Some(now);
    task.modified = now;
    let reply = task.clone();
    modified_list(&reply)
}

fn tasks_delete(store: &mut Store, params: &BTreeMap<String, String>) -> Value {
    if let Err(reply) = require_timeline(store, params) {
        return reply;
    }
    let now = store.now();
    let task = match find_task(store, params) {
        Ok(task) => task,
        Err(reply) => return reply,
    };
    task.deleted = Some(now);
    task.modified = now;
    let reply = task.clone();
    modified_list(&reply)
}

fn tasks_set_name(store: &mut Store, params: &BTreeMap<String, String>) -> Value {
    if let Err(reply) = require_timeline(store, params) {
        return reply;
    }
    let name = match require(params, "name") {
        Ok(name) => name.to_string(),
        Err(reply) => return reply,
    };
    let now = store.now();
    let task = match find_task(store, params) {
        Ok(task) => task,
        Err(reply) => return reply,
    };
    task.name = name;
    task.modified = now;
    let reply = task.clone();
    modified_list(&reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn expected_sig_matches_a_precomputed_digest() {
        // md5("topsecret" + "api_keykey-1auth_tokentok-1filterstatus:incomplete"
        //     + "formatjsonmethodrtm.tasks.getList")
        let sig = expected_sig(&params(&[
            ("method", "rtm.tasks.getList"),
            ("api_key", "key-1"),
            ("auth_token", "tok-1"),
            ("format", "json"),
            ("filter", "status:incomplete"),
        ]));
        assert_eq!(sig, "784e08e89ebadbbda5d8ea2bf06d7e45");
    }

    #[test]
    fn expected_sig_skips_the_signature_itself() {
        let mut with_sig = params(&[("method", "rtm.test.login"), ("api_key", "key-1")]);
        let without = with_sig.clone();
        with_sig.insert("api_sig".to_string(), "whatever".to_string());
        assert_eq!(expected_sig(&with_sig), expected_sig(&without));
    }

    #[test]
    fn logical_clock_is_strictly_monotonic() {
        let mut store = Store::new();
        let a = store.now();
        let b = store.now();
        assert!(b > a);
    }

    #[test]
    fn fail_envelope_carries_code_and_msg() {
        let reply = fail(98, "Login failed / Invalid auth token");
        assert_eq!(reply["rsp"]["stat"], "fail");
        assert_eq!(reply["rsp"]["err"]["code"], "98");
    }

    #[test]
    fn ok_envelope_merges_payload_fields() {
        let reply = ok(json!({"timeline": "t-1"}));
        assert_eq!(reply["rsp"]["stat"], "ok");
        assert_eq!(reply["rsp"]["timeline"], "t-1");
    }
}
