use axum::http::StatusCode;
use chrono::{Duration, Utc};
use gantt_server::server::scheduler::ReminderScheduler;
use gantt_server::{server, storage};
use gantt_shared::api::endpoints as ep;
use reqwest::Client;
use serde_json::{Value, json};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::Path;

const PASSWORD: &str = "secret123";

struct TestServer {
    base: String,
    client: Client,
    scheduler: ReminderScheduler,
    handle: tokio::task::JoinHandle<()>,
    _tempdir: tempfile::TempDir,
}

impl TestServer {
    async fn spawn() -> Option<Self> {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let (addr, scheduler, handle) = match start_server(&db_path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                eprintln!("Skipping test due to sandbox restrictions: {e}");
                return None;
            }
            Err(e) => panic!("failed to start server: {e}"),
        };
        Some(Self {
            base: format!("http://{}", addr),
            client: Client::new(),
            scheduler,
            handle,
            _tempdir: dir,
        })
    }

    /// Registers `<name>@x.com` and returns its bearer token.
    async fn register(&self, name: &str) -> String {
        let body = self
            .request_expect(
                "POST",
                &ep::register(""),
                None,
                Some(json!({
                    "email": format!("{name}@x.com"),
                    "nickname": name,
                    "password": PASSWORD,
                })),
                StatusCode::CREATED,
            )
            .await;
        assert_eq!(body["token_type"], "Bearer");
        body.get("access_token")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .expect("access_token missing from register response")
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let url = format!("{}{}", self.base, path);
        let mut req = match method {
            "GET" => self.client.get(&url),
            "POST" => self.client.post(&url),
            "PATCH" => self.client.patch(&url),
            "DELETE" => self.client.delete(&url),
            other => panic!("unsupported method {other}"),
        };
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }
        if let Some(b) = body {
            req = req.json(&b);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status();
        let text = resp.text().await.unwrap();
        let val = if text.is_empty() {
            json!(null)
        } else {
            serde_json::from_str(&text).unwrap_or(json!({"raw": text}))
        };
        (status, val)
    }

    async fn request_expect(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
        expected: StatusCode,
    ) -> Value {
        let (status, value) = self.request(method, path, token, body).await;
        assert_eq!(
            status, expected,
            "{method} {path} returned {status:?} with body {value:?}",
        );
        value
    }

    /// Team -> project -> stream owned by `token`; returns their ids.
    async fn hierarchy(&self, token: &str) -> (i32, i32, i32) {
        let team = self
            .request_expect(
                "POST",
                &ep::team_new(""),
                Some(token),
                Some(json!({"name": "Core"})),
                StatusCode::CREATED,
            )
            .await;
        let team_id = id_of(&team);
        let project = self
            .request_expect(
                "POST",
                &ep::project_new("", team_id),
                Some(token),
                Some(json!({"name": "Launch"})),
                StatusCode::CREATED,
            )
            .await;
        let project_id = id_of(&project);
        let stream = self
            .request_expect(
                "POST",
                &ep::stream_new("", project_id),
                Some(token),
                Some(json!({"name": "Backend"})),
                StatusCode::CREATED,
            )
            .await;
        (team_id, project_id, id_of(&stream))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn id_of(v: &Value) -> i32 {
    v["id"].as_i64().expect("id missing") as i32
}

async fn start_server(
    tmp_db: &Path,
) -> Result<(SocketAddr, ReminderScheduler, tokio::task::JoinHandle<()>), std::io::Error> {
    let config = server::AppConfig::parse("jwt_secret: testsecret\n").expect("config");

    let store = storage::Store::connect_sqlite(tmp_db.to_str().unwrap())
        .await
        .expect("db");
    store
        .seed_meta(
            &server::meta_items(&config.statuses),
            &server::meta_items(&config.priorities),
            &server::meta_items(&config.connection_types),
        )
        .await
        .expect("seed");

    let scheduler = ReminderScheduler::new(store.clone(), None, config.reminders.clone());
    scheduler.start().await.expect("scheduler");

    let state = server::AppState::new(config, store, scheduler.clone());
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Ok((addr, scheduler, handle))
}

#[tokio::test]
async fn public_endpoints_work() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    server
        .request_expect("GET", "/healthz", None, None, StatusCode::OK)
        .await;

    let statuses = server
        .request_expect("GET", &ep::task_statuses(""), None, None, StatusCode::OK)
        .await;
    assert_eq!(statuses.as_array().unwrap().len(), 3);
    assert_eq!(statuses[0], json!({"id": 1, "name": "To Do"}));

    let priorities = server
        .request_expect("GET", &ep::priorities(""), None, None, StatusCode::OK)
        .await;
    assert_eq!(priorities.as_array().unwrap().len(), 3);

    let kinds = server
        .request_expect("GET", &ep::connection_types(""), None, None, StatusCode::OK)
        .await;
    assert_eq!(kinds[0]["name"], "blocks");

    let missing = server
        .request_expect(
            "GET",
            &ep::push_vapid_public_key(""),
            None,
            None,
            StatusCode::NOT_FOUND,
        )
        .await;
    assert_eq!(missing["kind"], "not_found");
}

#[tokio::test]
async fn private_routes_require_a_valid_token() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let body = server
        .request_expect(
            "GET",
            &ep::user_by_token(""),
            None,
            None,
            StatusCode::UNAUTHORIZED,
        )
        .await;
    assert_eq!(body["kind"], "unauthorized");

    server
        .request_expect(
            "POST",
            &ep::team_new(""),
            Some("not-a-jwt"),
            Some(json!({"name": "T"})),
            StatusCode::UNAUTHORIZED,
        )
        .await;
}

#[tokio::test]
async fn register_login_and_profile() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let token = server.register("alice").await;

    // Same email, different nickname
    let dup = server
        .request_expect(
            "POST",
            &ep::register(""),
            None,
            Some(json!({"email": "alice@x.com", "nickname": "other", "password": "pw"})),
            StatusCode::CONFLICT,
        )
        .await;
    assert_eq!(dup["kind"], "conflict");

    server
        .request_expect(
            "POST",
            &ep::login(""),
            None,
            Some(json!({"email": "alice@x.com", "password": "wrong"})),
            StatusCode::UNAUTHORIZED,
        )
        .await;
    server
        .request_expect(
            "POST",
            &ep::login(""),
            None,
            Some(json!({"email": "nobody@x.com", "password": PASSWORD})),
            StatusCode::UNAUTHORIZED,
        )
        .await;
    let login = server
        .request_expect(
            "POST",
            &ep::login(""),
            None,
            Some(json!({"email": "alice@x.com", "password": PASSWORD})),
            StatusCode::OK,
        )
        .await;
    assert!(login["access_token"].as_str().is_some());

    let exists = server
        .request_expect(
            "POST",
            &ep::check_email(""),
            None,
            Some(json!({"email": "alice@x.com"})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(exists["exists"], true);
    let absent = server
        .request_expect(
            "POST",
            &ep::check_email(""),
            None,
            Some(json!({"email": "bob@x.com"})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(absent["exists"], false);

    let me = server
        .request_expect("GET", &ep::user_by_token(""), Some(&token), None, StatusCode::OK)
        .await;
    assert_eq!(me["email"], "alice@x.com");
    assert_eq!(me["teams"], json!([]));

    let other_token = server.register("bob").await;
    let bob = server
        .request_expect(
            "GET",
            &ep::user_by_token(""),
            Some(&other_token),
            None,
            StatusCode::OK,
        )
        .await;
    server
        .request_expect(
            "GET",
            &ep::user("", id_of(&bob)),
            Some(&token),
            None,
            StatusCode::FORBIDDEN,
        )
        .await;
}

#[tokio::test]
async fn task_assignee_round_trip() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let alice = server.register("alice").await;
    server.register("b").await;
    let (_, _, stream_id) = server.hierarchy(&alice).await;

    let task = server
        .request_expect(
            "POST",
            &ep::task_new("", stream_id),
            Some(&alice),
            Some(json!({"name": "X"})),
            StatusCode::CREATED,
        )
        .await;
    let task_id = id_of(&task);
    assert_eq!(task["position"], 1);
    assert_eq!(task["status_id"], 1);
    assert_eq!(task["priority_id"], 1);
    assert_eq!(task["description"], "");

    let listed = server
        .request_expect(
            "GET",
            &ep::stream_tasks("", stream_id),
            Some(&alice),
            None,
            StatusCode::OK,
        )
        .await;
    let items = listed.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], task_id);
    assert_eq!(items[0]["assignee_email"], Value::Null);

    server
        .request_expect(
            "PATCH",
            &ep::task("", task_id),
            Some(&alice),
            Some(json!({"assignee_email": "b@x.com"})),
            StatusCode::OK,
        )
        .await;
    let listed = server
        .request_expect(
            "GET",
            &ep::stream_tasks("", stream_id),
            Some(&alice),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(listed[0]["assignee_email"], "b@x.com");

    let cleared = server
        .request_expect(
            "PATCH",
            &ep::task("", task_id),
            Some(&alice),
            Some(json!({"assignee_email": null})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(cleared["assignee_email"], Value::Null);

    let all = server
        .request_expect("GET", &ep::tasks_all(""), Some(&alice), None, StatusCode::OK)
        .await;
    assert_eq!(all[0]["team_name"], "Core");
    assert_eq!(all[0]["project_name"], "Launch");
    assert_eq!(all[0]["stream_name"], "Backend");
    assert_eq!(all[0]["name"], "X");
}

#[tokio::test]
async fn reader_can_list_but_not_create_streams() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let alice = server.register("alice").await;
    let reader = server.register("u").await;
    let outsider = server.register("c").await;
    let (team_id, project_id, _) = server.hierarchy(&alice).await;

    server
        .request_expect(
            "PATCH",
            &ep::team("", team_id),
            Some(&alice),
            Some(json!({"newUsers": ["u@x.com"]})),
            StatusCode::OK,
        )
        .await;
    let members = server
        .request_expect(
            "GET",
            &ep::team_users("", team_id),
            Some(&reader),
            None,
            StatusCode::OK,
        )
        .await;
    let roles: Vec<(String, String)> = members
        .as_array()
        .unwrap()
        .iter()
        .map(|m| {
            (
                m["email"].as_str().unwrap().to_string(),
                m["role"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert!(roles.contains(&("alice@x.com".into(), "Editor".into())));
    assert!(roles.contains(&("u@x.com".into(), "Reader".into())));

    let denied = server
        .request_expect(
            "POST",
            &ep::stream_new("", project_id),
            Some(&reader),
            Some(json!({"name": "Frontend"})),
            StatusCode::FORBIDDEN,
        )
        .await;
    assert_eq!(denied["kind"], "forbidden");

    let streams = server
        .request_expect(
            "GET",
            &ep::project_streams("", project_id),
            Some(&reader),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(streams.as_array().unwrap().len(), 1);

    server
        .request_expect(
            "GET",
            &ep::project_streams("", project_id),
            Some(&outsider),
            None,
            StatusCode::FORBIDDEN,
        )
        .await;
    server
        .request_expect(
            "GET",
            &ep::project_streams("", 9999),
            Some(&outsider),
            None,
            StatusCode::NOT_FOUND,
        )
        .await;
}

#[tokio::test]
async fn duplicate_stream_name_conflicts() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let alice = server.register("alice").await;
    let (_, project_id, stream_id) = server.hierarchy(&alice).await;

    let dup = server
        .request_expect(
            "POST",
            &ep::stream_new("", project_id),
            Some(&alice),
            Some(json!({"name": "Backend"})),
            StatusCode::CONFLICT,
        )
        .await;
    assert_eq!(dup["kind"], "conflict");

    // Renaming to the current name is not a collision
    let same = server
        .request_expect(
            "PATCH",
            &ep::stream("", stream_id),
            Some(&alice),
            Some(json!({"name": "Backend"})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(same["name"], "Backend");
}

#[tokio::test]
async fn reminders_lifecycle() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let alice = server.register("alice").await;
    let bob = server.register("bob").await;
    let (team_id, _, stream_id) = server.hierarchy(&alice).await;
    server
        .request_expect(
            "PATCH",
            &ep::team("", team_id),
            Some(&alice),
            Some(json!({"newUsers": ["bob@x.com"], "newUsersRole": "Reader"})),
            StatusCode::OK,
        )
        .await;
    let task = server
        .request_expect(
            "POST",
            &ep::task_new("", stream_id),
            Some(&alice),
            Some(json!({"name": "Ship"})),
            StatusCode::CREATED,
        )
        .await;
    let task_id = id_of(&task);

    let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
    server
        .request_expect(
            "POST",
            &ep::task_reminders("", task_id),
            Some(&alice),
            Some(json!({"remind_at": past})),
            StatusCode::CONFLICT,
        )
        .await;
    let none = server
        .request_expect("GET", &ep::reminders(""), Some(&alice), None, StatusCode::OK)
        .await;
    assert_eq!(none, json!([]));

    let future = (Utc::now() + Duration::hours(1)).to_rfc3339();
    let created = server
        .request_expect(
            "POST",
            &ep::task_reminders("", task_id),
            Some(&alice),
            Some(json!({"remind_at": future})),
            StatusCode::CREATED,
        )
        .await;
    let reminder_id = id_of(&created);
    assert_eq!(created["sent"], false);

    // A Reader may keep personal reminders; it does not see other members' ones
    server
        .request_expect(
            "POST",
            &ep::task_reminders("", task_id),
            Some(&bob),
            Some(json!({"remind_at": future})),
            StatusCode::CREATED,
        )
        .await;
    let own = server
        .request_expect(
            "GET",
            &ep::task_reminders("", task_id),
            Some(&alice),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(own.as_array().unwrap().len(), 1);

    let later = (Utc::now() + Duration::hours(2)).to_rfc3339();
    let moved = server
        .request_expect(
            "PATCH",
            &ep::reminder("", reminder_id),
            Some(&alice),
            Some(json!({"remind_at": later})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(moved["sent"], false);
    let stale = server
        .request_expect(
            "PATCH",
            &ep::reminder("", reminder_id),
            Some(&alice),
            Some(json!({"remind_at": past})),
            StatusCode::CONFLICT,
        )
        .await;
    assert_eq!(stale["kind"], "conflict");
    let mine = server
        .request_expect("GET", &ep::reminders(""), Some(&alice), None, StatusCode::OK)
        .await;
    assert_eq!(mine[0]["remind_at"], moved["remind_at"]);

    server
        .request_expect(
            "DELETE",
            &ep::reminder("", reminder_id),
            Some(&bob),
            None,
            StatusCode::FORBIDDEN,
        )
        .await;
    server
        .request_expect(
            "DELETE",
            &ep::reminder("", reminder_id),
            Some(&alice),
            None,
            StatusCode::NO_CONTENT,
        )
        .await;
    server
        .request_expect(
            "DELETE",
            &ep::reminder("", reminder_id),
            Some(&alice),
            None,
            StatusCode::NOT_FOUND,
        )
        .await;
}

#[tokio::test]
async fn relations_are_reported_on_both_tasks() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let alice = server.register("alice").await;
    let (_, _, stream_id) = server.hierarchy(&alice).await;
    let mut ids = Vec::new();
    for name in ["Design", "Build"] {
        let t = server
            .request_expect(
                "POST",
                &ep::task_new("", stream_id),
                Some(&alice),
                Some(json!({"name": name})),
                StatusCode::CREATED,
            )
            .await;
        ids.push(id_of(&t));
    }

    let rel = server
        .request_expect(
            "POST",
            &ep::task_relation("", ids[0]),
            Some(&alice),
            Some(json!({"task_id": ids[1], "connection_id": 1})),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(rel["connection_name"], "blocks");
    server
        .request_expect(
            "POST",
            &ep::task_relation("", ids[0]),
            Some(&alice),
            Some(json!({"task_id": ids[0], "connection_id": 1})),
            StatusCode::CONFLICT,
        )
        .await;

    let listed = server
        .request_expect(
            "GET",
            &ep::stream_tasks("", stream_id),
            Some(&alice),
            None,
            StatusCode::OK,
        )
        .await;
    for t in listed.as_array().unwrap() {
        assert_eq!(t["relations"].as_array().unwrap().len(), 1);
    }

    server
        .request_expect(
            "DELETE",
            &ep::task("", ids[0]),
            Some(&alice),
            None,
            StatusCode::NO_CONTENT,
        )
        .await;
    let listed = server
        .request_expect(
            "GET",
            &ep::stream_tasks("", stream_id),
            Some(&alice),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["relations"], json!([]));
}

#[tokio::test]
async fn deleting_a_team_removes_its_subtree() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let alice = server.register("alice").await;
    let (team_id, project_id, stream_id) = server.hierarchy(&alice).await;
    server
        .request_expect(
            "POST",
            &ep::task_new("", stream_id),
            Some(&alice),
            Some(json!({"name": "X"})),
            StatusCode::CREATED,
        )
        .await;
    server
        .request_expect(
            "POST",
            &ep::goal_new("", stream_id),
            Some(&alice),
            Some(json!({"name": "M1", "deadline": "2030-01-01T00:00:00Z"})),
            StatusCode::CREATED,
        )
        .await;

    server
        .request_expect(
            "DELETE",
            &ep::team("", team_id),
            Some(&alice),
            None,
            StatusCode::NO_CONTENT,
        )
        .await;

    server
        .request_expect(
            "GET",
            &ep::project_streams("", project_id),
            Some(&alice),
            None,
            StatusCode::NOT_FOUND,
        )
        .await;
    server
        .request_expect(
            "GET",
            &ep::stream_goals("", stream_id),
            Some(&alice),
            None,
            StatusCode::NOT_FOUND,
        )
        .await;
    let all = server
        .request_expect("GET", &ep::tasks_all(""), Some(&alice), None, StatusCode::OK)
        .await;
    assert_eq!(all, json!([]));
    let me = server
        .request_expect("GET", &ep::user_by_token(""), Some(&alice), None, StatusCode::OK)
        .await;
    assert_eq!(me["teams"], json!([]));
}

#[tokio::test]
async fn push_subscriptions_are_owner_scoped() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let alice = server.register("alice").await;
    let bob = server.register("bob").await;
    let sub = json!({
        "endpoint": "https://push.example/abc",
        "p256dh": "BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA_0QTpQtUbVlUls0VJXg7A8u-Ts1XbjhazAkj7I99e8QcYP7DkM",
        "auth": "tBHItJI5svbpez7KI4CCXg",
    });
    let created = server
        .request_expect(
            "POST",
            &ep::push_subscribe(""),
            Some(&alice),
            Some(sub.clone()),
            StatusCode::CREATED,
        )
        .await;
    // Resubscribing the same endpoint appends
    server
        .request_expect(
            "POST",
            &ep::push_subscribe(""),
            Some(&alice),
            Some(sub),
            StatusCode::CREATED,
        )
        .await;
    let list = server
        .request_expect(
            "GET",
            &ep::push_subscriptions(""),
            Some(&alice),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(list.as_array().unwrap().len(), 2);

    let id = id_of(&created);
    server
        .request_expect(
            "DELETE",
            &ep::push_subscription("", id),
            Some(&bob),
            None,
            StatusCode::FORBIDDEN,
        )
        .await;
    server
        .request_expect(
            "DELETE",
            &ep::push_subscription("", id),
            Some(&alice),
            None,
            StatusCode::NO_CONTENT,
        )
        .await;
    let list = server
        .request_expect(
            "GET",
            &ep::push_subscriptions(""),
            Some(&bob),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn reminder_delete_fails_once_the_scheduler_is_stopped() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let alice = server.register("alice").await;
    let (_, _, stream_id) = server.hierarchy(&alice).await;
    let task = server
        .request_expect(
            "POST",
            &ep::task_new("", stream_id),
            Some(&alice),
            Some(json!({"name": "Ship"})),
            StatusCode::CREATED,
        )
        .await;
    let future = (Utc::now() + Duration::hours(1)).to_rfc3339();
    let reminder = server
        .request_expect(
            "POST",
            &ep::task_reminders("", id_of(&task)),
            Some(&alice),
            Some(json!({"remind_at": future})),
            StatusCode::CREATED,
        )
        .await;
    let reminder_id = id_of(&reminder);

    server.scheduler.stop().await;
    let body = server
        .request_expect(
            "DELETE",
            &ep::reminder("", reminder_id),
            Some(&alice),
            None,
            StatusCode::INTERNAL_SERVER_ERROR,
        )
        .await;
    assert_eq!(body["kind"], "internal");

    // The row survives the failed request
    let left = server
        .request_expect("GET", &ep::reminders(""), Some(&alice), None, StatusCode::OK)
        .await;
    assert_eq!(left.as_array().unwrap().len(), 1);
    assert_eq!(id_of(&left[0]), reminder_id);
}

#[tokio::test]
async fn null_in_a_patch_clears_deadlines() {
    let Some(server) = TestServer::spawn().await else {
        return;
    };
    let alice = server.register("alice").await;
    let (_, _, stream_id) = server.hierarchy(&alice).await;
    let deadline = (Utc::now() + Duration::days(3)).to_rfc3339();

    let task = server
        .request_expect(
            "POST",
            &ep::task_new("", stream_id),
            Some(&alice),
            Some(json!({"name": "Ship", "description": "d", "deadline": deadline})),
            StatusCode::CREATED,
        )
        .await;
    assert!(task["deadline"].is_string());
    let cleared = server
        .request_expect(
            "PATCH",
            &ep::task("", id_of(&task)),
            Some(&alice),
            Some(json!({"deadline": null})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(cleared["deadline"], json!(null));
    assert_eq!(cleared["description"], "d");
    assert_eq!(cleared["name"], "Ship");

    let goal = server
        .request_expect(
            "POST",
            &ep::goal_new("", stream_id),
            Some(&alice),
            Some(json!({"name": "Beta", "description": "g", "deadline": deadline})),
            StatusCode::CREATED,
        )
        .await;
    assert!(goal["deadline"].is_string());
    let cleared = server
        .request_expect(
            "PATCH",
            &ep::goal("", id_of(&goal)),
            Some(&alice),
            Some(json!({"deadline": null})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(cleared["deadline"], json!(null));
    assert_eq!(cleared["description"], "g");

    // Absent fields stay as they are
    let renamed = server
        .request_expect(
            "PATCH",
            &ep::goal("", id_of(&goal)),
            Some(&alice),
            Some(json!({"name": "Beta 2"})),
            StatusCode::OK,
        )
        .await;
    assert_eq!(renamed["description"], "g");
    assert_eq!(renamed["deadline"], json!(null));
}
