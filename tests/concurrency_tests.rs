mod common;

use brrtdispatch::router::PatternRouter;
use brrtdispatch::{Application, ConnectionId, HttpRequest, LifecycleEvent};
use common::fixtures::{user_routes, users_controller, whoami};
use common::doubles::HookLog;
use common::recorders::{RecordingConnection, RecordingWriter};
use http::Method;
use serde_json::json;
use std::sync::Arc;
use std::thread;

const THREADS: usize = 8;
const PER_THREAD: usize = 50;

fn shared_app(log: &HookLog) -> Arc<Application> {
    Arc::new(
        Application::builder()
            .router(PatternRouter::new(user_routes()).unwrap())
            .controller("users", users_controller())
            .service("whoami", whoami)
            .hook(log.hook())
            .build(),
    )
}

#[test]
fn test_concurrent_http_invocations_are_isolated() {
    let log = HookLog::default();
    let app = shared_app(&log);

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let app = Arc::clone(&app);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let trace = format!("t{t}-r{i}");
                    let uri = format!("/users/{t}-{i}");
                    let req = HttpRequest::new(Method::GET, &uri).with_header("x-trace-id", &trace);
                    let mut out = RecordingWriter::default();
                    app.handle_http(&req, &mut out);

                    let body = &out.single().body;
                    assert_eq!(body["trace_id"], json!(trace));
                    assert_eq!(body["target"], json!(uri));
                    assert_eq!(body["id"], json!(format!("{t}-{i}")));
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    let total = THREADS * PER_THREAD;
    assert_eq!(app.request_count(), total as u64);
    assert_eq!(log.count(LifecycleEvent::BeforeRequest), total);
    assert_eq!(log.count(LifecycleEvent::AfterRequest), total);
    for call in log.calls() {
        // Each hook saw the context of its own invocation.
        let expected_target = format!(
            "/users/{}",
            call.trace_id.trim_start_matches('t').replace("-r", "-")
        );
        assert_eq!(call.target, expected_target);
    }
}

#[test]
fn test_concurrent_rpc_invocations_are_isolated() {
    let app = shared_app(&HookLog::default());

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let app = Arc::clone(&app);
            thread::spawn(move || {
                let id = ConnectionId(t as u64);
                let mut conn = RecordingConnection::default();
                for i in 0..PER_THREAD {
                    let packet = json!({"logid": format!("rpc-{t}-{i}"), "spanid": i, "func": "whoami"});
                    app.handle_rpc(&mut conn, id, packet.to_string().as_bytes());
                }
                for (i, (reply_id, _)) in conn.replies.iter().enumerate() {
                    assert_eq!(*reply_id, id);
                    let data = conn.result(i).data;
                    assert_eq!(data["trace_id"], json!(format!("rpc-{t}-{i}")));
                    assert_eq!(data["span_id"], json!(i));
                }
                assert_eq!(conn.replies.len(), PER_THREAD);
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
}
