mod common;

use common::{config, signed_in_session, ACCESS_TOKEN};
use mockito::{Matcher, Server};
use mstodo::api::{ApiMethod, RequestDispatcher};
use mstodo::error::ApiError;
use mstodo::models::{DateTimeTimeZone, Importance, NewTask, TaskStatus};
use mstodo::session::Session;
use mstodo::todo::TodoClient;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::net::TcpListener;
use tempfile::TempDir;

fn bearer() -> String {
    format!("Bearer {ACCESS_TOKEN}")
}

/// Base URL of a local port nothing listens on.
fn closed_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

#[test]
fn signed_out_session_never_reaches_the_api() {
    let mut server = Server::new();
    let home = TempDir::new().unwrap();
    let lists = server.mock("GET", "/me/todo/lists").expect(0).create();
    let config = config(&server, &home);

    let session = Session::open_default(config.clone()).unwrap();
    let dispatcher = RequestDispatcher::new(&config).unwrap();
    let err = dispatcher
        .execute(&session, "/me/todo/lists", ApiMethod::Get, None)
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthenticated));
    lists.assert();
}

#[test]
fn no_content_comes_back_as_empty_object() {
    let mut server = Server::new();
    let home = TempDir::new().unwrap();
    let session = signed_in_session(&mut server, &home);
    let _mock = server
        .mock("DELETE", "/me/todo/lists/l1/tasks/t1")
        .match_header("authorization", bearer().as_str())
        .with_status(204)
        .create();

    let dispatcher = RequestDispatcher::new(session.config()).unwrap();
    let value = dispatcher
        .execute(&session, "/me/todo/lists/l1/tasks/t1", ApiMethod::Delete, None)
        .unwrap();

    assert_eq!(value, json!({}));
}

#[test]
fn error_status_carries_the_response_body() {
    let mut server = Server::new();
    let home = TempDir::new().unwrap();
    let session = signed_in_session(&mut server, &home);
    let _mock = server
        .mock("GET", "/me/todo/lists/missing/tasks")
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"ItemNotFound"}"#)
        .create();

    let dispatcher = RequestDispatcher::new(session.config()).unwrap();
    let err = dispatcher
        .execute(&session, "/me/todo/lists/missing/tasks", ApiMethod::Get, None)
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    match err {
        ApiError::Http { body, .. } => assert_eq!(body, Some(json!({"error": "ItemNotFound"}))),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn lists_and_tasks_are_read_with_the_session_token() {
    let mut server = Server::new();
    let home = TempDir::new().unwrap();
    let session = signed_in_session(&mut server, &home);
    let _lists = server
        .mock("GET", "/me/todo/lists")
        .match_header("authorization", bearer().as_str())
        .with_header("content-type", "application/json")
        .with_body(
            json!({"value": [
                {"id": "l1", "displayName": "Tasks"},
                {"id": "l2", "displayName": "Work", "wellknownListName": "none"}
            ]})
            .to_string(),
        )
        .create();
    let _work = server
        .mock("GET", "/me/todo/lists/l2/tasks")
        .match_header("authorization", bearer().as_str())
        .with_body(
            json!({"value": [
                {"id": "t1", "title": "report", "status": "notStarted", "importance": "high"},
                {"id": "t2", "title": "email", "status": "completed"}
            ]})
            .to_string(),
        )
        .create();
    let _tasks = server
        .mock("GET", "/me/todo/lists/l1/tasks")
        .with_body(r#"{"value": []}"#)
        .create();

    let dispatcher = RequestDispatcher::new(session.config()).unwrap();
    let client = TodoClient::new(&session, &dispatcher);

    let work = client.find_list_by_name("Work").unwrap().unwrap();
    assert_eq!(work.id, "l2");
    assert!(client.find_list_by_name("work").unwrap().is_none());

    let task = client.find_task_by_title("l2", "email").unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);

    let groups = client.all_tasks().unwrap();
    let summary: Vec<_> = groups
        .iter()
        .map(|(list, tasks)| (list.display_name.as_str(), tasks.len()))
        .collect();
    assert_eq!(summary, vec![("Tasks", 0), ("Work", 2)]);
}

#[test]
fn tasks_are_created_completed_and_deleted() {
    let mut server = Server::new();
    let home = TempDir::new().unwrap();
    let session = signed_in_session(&mut server, &home);
    let create = server
        .mock("POST", "/me/todo/lists/l1/tasks")
        .match_header("authorization", bearer().as_str())
        .match_body(Matcher::Json(json!({
            "title": "Pay rent",
            "importance": "high",
            "dueDateTime": {"dateTime": "2026-03-02T09:00:00", "timeZone": "UTC"},
            "categories": ["home"]
        })))
        .with_status(201)
        .with_body(r#"{"id": "t9", "title": "Pay rent", "importance": "high"}"#)
        .expect(1)
        .create();
    let complete = server
        .mock("PATCH", "/me/todo/lists/l1/tasks/t9")
        .match_body(Matcher::Json(json!({"status": "completed"})))
        .with_body(r#"{"id": "t9", "title": "Pay rent", "status": "completed"}"#)
        .expect(1)
        .create();
    let delete = server
        .mock("DELETE", "/me/todo/lists/l1/tasks/t9")
        .with_status(204)
        .expect(1)
        .create();

    let dispatcher = RequestDispatcher::new(session.config()).unwrap();
    let client = TodoClient::new(&session, &dispatcher);

    let created = client
        .create_task(
            "l1",
            &NewTask {
                title: "Pay rent".into(),
                importance: Importance::High,
                due_date_time: Some(DateTimeTimeZone::utc("2026-03-02T09:00:00")),
                categories: Some(vec!["home".into()]),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(created.id, "t9");

    let completed = client.complete_task("l1", &created.id).unwrap();
    assert!(completed.is_completed());

    client.delete_task("l1", &created.id).unwrap();

    create.assert();
    complete.assert();
    delete.assert();
}

#[test]
fn list_lifecycle() {
    let mut server = Server::new();
    let home = TempDir::new().unwrap();
    let session = signed_in_session(&mut server, &home);
    let _create = server
        .mock("POST", "/me/todo/lists")
        .match_body(Matcher::Json(json!({"displayName": "Groceries"})))
        .with_status(201)
        .with_body(r#"{"id": "l7", "displayName": "Groceries"}"#)
        .create();
    let delete = server
        .mock("DELETE", "/me/todo/lists/l7")
        .with_status(204)
        .expect(1)
        .create();

    let dispatcher = RequestDispatcher::new(session.config()).unwrap();
    let client = TodoClient::new(&session, &dispatcher);

    let list = client.create_task_list("Groceries").unwrap();
    assert_eq!(list.id, "l7");
    client.delete_task_list(&list.id).unwrap();
    delete.assert();
}

#[test]
fn unreachable_api_is_a_transport_error() {
    let mut server = Server::new();
    let home = TempDir::new().unwrap();
    let session = signed_in_session(&mut server, &home);
    let config = session.config().clone().with_graph_endpoint(closed_endpoint());

    let dispatcher = RequestDispatcher::new(&config).unwrap();
    let err = dispatcher
        .execute(&session, "/me/todo/lists", ApiMethod::Get, None)
        .unwrap_err();

    assert!(matches!(err, ApiError::Transport { .. }), "{err:?}");
    assert_eq!(err.status(), None);
}

#[test]
fn debug_trace_leaves_results_unchanged() {
    let mut server = Server::new();
    let home = TempDir::new().unwrap();
    let session = signed_in_session(&mut server, &home);
    let _deleted = server
        .mock("DELETE", "/me/todo/lists/l1")
        .with_status(204)
        .create();
    let _missing = server
        .mock("GET", "/me/todo/lists/missing/tasks")
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"ItemNotFound"}"#)
        .create();

    let dispatcher = RequestDispatcher::new(session.config())
        .unwrap()
        .with_debug(true);

    let value = dispatcher
        .execute(&session, "/me/todo/lists/l1", ApiMethod::Delete, None)
        .unwrap();
    assert_eq!(value, json!({}));

    let err = dispatcher
        .execute(&session, "/me/todo/lists/missing/tasks", ApiMethod::Get, None)
        .unwrap_err();
    match err {
        ApiError::Http { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, Some(json!({"error": "ItemNotFound"})));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
