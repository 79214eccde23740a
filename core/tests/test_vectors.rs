//! Verify signing and reply decoding against JSON vectors in `test-vectors/`.
//!
//! Each signing case is a `(shared_secret, params, expected_sig)` triple;
//! each reply case is a body plus the typed outcome the decoder must reach.
//! Bodies are stored as JSON (not strings) so the vector files stay readable;
//! the one intentionally non-JSON body uses `raw_body` instead.

use rtm_core::{api_sig, Params, Response, RtmError, WireDate};
use serde_json::Value;

#[test]
fn signing_vectors() {
    let raw = include_str!("../../test-vectors/signing.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let secret = case["shared_secret"].as_str().unwrap();
        let params: Params = case["params"]
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str().unwrap()))
            .collect();

        assert_eq!(
            api_sig(&params, secret),
            case["expected_sig"].as_str().unwrap(),
            "{name}: signature"
        );
    }
}

#[test]
fn reply_vectors() {
    let raw = include_str!("../../test-vectors/replies.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let body = match case.get("raw_body") {
            Some(raw_body) => raw_body.as_str().unwrap().to_string(),
            None => serde_json::to_string(&case["body"]).unwrap(),
        };
        let expect = &case["expect"];

        match expect["kind"].as_str().unwrap() {
            "server_error" => {
                let err = Response::decode(&body).unwrap().status().unwrap_err();
                let code = expect["code"].as_i64().unwrap() as i32;
                assert_eq!(err.server_code(), Some(code), "{name}: error code");
            }
            "protocol_error" => {
                let outcome = Response::decode(&body).and_then(|r| r.status());
                assert!(
                    matches!(outcome, Err(RtmError::Protocol(_))),
                    "{name}: expected protocol error, got {outcome:?}"
                );
            }
            "tasks" => {
                let tasks = Response::decode(&body).unwrap().tasks().unwrap();
                assert_eq!(tasks.len() as u64, expect["count"].as_u64().unwrap(), "{name}: count");
                if let Some(first_id) = expect.get("first_id") {
                    assert_eq!(tasks[0].id, first_id.as_str().unwrap(), "{name}: first id");
                }
            }
            "lists" => {
                let lists = Response::decode(&body).unwrap().task_lists().unwrap();
                assert_eq!(lists.len() as u64, expect["count"].as_u64().unwrap(), "{name}: count");
            }
            "sync" => {
                let last_sync = WireDate::parse(case["last_sync"].as_str().unwrap()).unwrap();
                let synched = Response::decode(&body)
                    .unwrap()
                    .synched_tasks(last_sync)
                    .unwrap();
                assert_eq!(synched.added.len() as u64, expect["added"].as_u64().unwrap(), "{name}: added");
                assert_eq!(
                    synched.modified.len() as u64,
                    expect["modified"].as_u64().unwrap(),
                    "{name}: modified"
                );
                assert_eq!(
                    synched.deleted.len() as u64,
                    expect["deleted"].as_u64().unwrap(),
                    "{name}: deleted"
                );
            }
            "sync_overlap" => {
                let last_sync = WireDate::parse(case["last_sync"].as_str().unwrap()).unwrap();
                let outcome = Response::decode(&body).unwrap().synched_tasks(last_sync);
                assert!(
                    matches!(outcome, Err(RtmError::Protocol(_))),
                    "{name}: expected a partition-overlap rejection"
                );
            }
            other => panic!("{name}: unknown expectation kind {other:?}"),
        }
    }
}
