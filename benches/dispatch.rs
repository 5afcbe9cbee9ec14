use brrtdispatch::dispatcher::ActionTable;
use brrtdispatch::router::{PatternRouter, RouteDef, Router};
use brrtdispatch::{
    Application, ConnectionId, DispatchError, HttpRequest, HttpResponse, RequestContext,
    ResponseWriter, RpcConnection,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use http::Method;
use serde_json::{json, Value};

fn zoo_routes() -> Vec<RouteDef> {
    vec![
        RouteDef::new(Method::GET, "/", "root", "index"),
        RouteDef::new(Method::GET, "/zoo/animals", "animals", "list"),
        RouteDef::new(Method::POST, "/zoo/animals", "animals", "create"),
        RouteDef::new(Method::GET, "/zoo/animals/{id}", "animals", "show"),
        RouteDef::new(Method::PUT, "/zoo/animals/{id}", "animals", "update"),
        RouteDef::new(Method::DELETE, "/zoo/animals/{id}", "animals", "delete"),
        RouteDef::new(Method::GET, "/zoo/animals/{id}/toys/{toy_id}", "toys", "show"),
        RouteDef::new(
            Method::GET,
            "/zoo/{category}/animals/{id}/habitats/{habitat_id}/sections/{section_id}",
            "habitats",
            "section",
        ),
        RouteDef::new(
            Method::POST,
            "/inventory/{warehouse_id}/feeds/{feed_id}/items/{item_id}/batches/{batch_id}",
            "inventory",
            "batch",
        ),
        RouteDef::new(Method::GET, "/complex/{a}/{b}/{c}/{d}/{e}/{f}/{g}/{h}/{i}", "complex", "many"),
    ]
}

struct Sink;

impl ResponseWriter for Sink {
    fn write_response(&mut self, response: HttpResponse) -> std::io::Result<()> {
        black_box(response);
        Ok(())
    }
}

impl RpcConnection for Sink {
    fn send(&mut self, _id: ConnectionId, payload: &[u8]) -> std::io::Result<()> {
        black_box(payload);
        Ok(())
    }
}

fn bench_route_match(c: &mut Criterion) {
    let router = PatternRouter::new(zoo_routes()).expect("valid routes");
    c.bench_function("route_match", |b| {
        let test_paths = [
            (Method::GET, "/zoo/animals/123"),
            (Method::GET, "/zoo/animals/123/toys/456"),
            (Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
            (Method::POST, "/inventory/1/feeds/2/items/3/batches/4"),
            (Method::GET, "/complex/1/2/3/4/5/6/7/8/9"),
        ];
        b.iter(|| {
            for (method, path) in test_paths.iter() {
                let res = router.match_route(method, path);
                black_box(&res);
            }
        })
    });
}

fn bench_handle_http(c: &mut Criterion) {
    let app = Application::builder()
        .router(PatternRouter::new(zoo_routes()).expect("valid routes"))
        .controller(
            "animals",
            ActionTable::new("animals").action("show", |call| {
                Ok(HttpResponse::json(200, json!({ "id": call.param("id") })))
            }),
        )
        .build();
    let hit = HttpRequest::new(Method::GET, "/zoo/animals/123");
    let miss = HttpRequest::new(Method::GET, "/nowhere");

    c.bench_function("handle_http_hit", |b| b.iter(|| app.handle_http(black_box(&hit), &mut Sink)));
    c.bench_function("handle_http_not_found", |b| {
        b.iter(|| app.handle_http(black_box(&miss), &mut Sink))
    });
}

fn bench_handle_rpc(c: &mut Criterion) {
    let app = Application::builder()
        .service(
            "user.get",
            |_: &RequestContext, args: Value| -> Result<Value, DispatchError> {
                Ok(json!({ "name": "a", "id": args["id"] }))
            },
        )
        .build();
    let packet = br#"{"logid":"bench","func":"user.get","args":{"id":42}}"#;

    c.bench_function("handle_rpc", |b| {
        b.iter(|| app.handle_rpc(&mut Sink, ConnectionId(1), black_box(packet)))
    });
}

criterion_group!(benches, bench_route_match, bench_handle_http, bench_handle_rpc);
criterion_main!(benches);
