use chrono::{Duration, Utc};
use diesel::prelude::*;
use gantt_server::server::{self, AppConfig};
use gantt_server::storage::schema::{
    goals, memberships, projects, streams, task_assignees, task_relations, task_reminders, tasks,
    teams,
};
use gantt_server::storage::{GoalInput, GoalPatch, StorageError, Store, TaskInput, TaskPatch, TeamPatch};
use gantt_shared::Role;

struct Fixture {
    store: Store,
    db_path: String,
    _tempdir: tempfile::TempDir,
}

impl Fixture {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("store.db").to_str().unwrap().to_string();
        let store = Store::connect_sqlite(&db_path).await.expect("db");
        let cfg = AppConfig::parse("jwt_secret: x\n").unwrap();
        store
            .seed_meta(
                &server::meta_items(&cfg.statuses),
                &server::meta_items(&cfg.priorities),
                &server::meta_items(&cfg.connection_types),
            )
            .await
            .expect("seed");
        Self {
            store,
            db_path,
            _tempdir: dir,
        }
    }

    async fn user(&self, name: &str) -> i32 {
        self.store
            .create_user(&format!("{name}@x.com"), name, "not-a-real-hash")
            .await
            .unwrap()
            .id
    }

    /// Team -> project -> stream owned by `actor`.
    async fn hierarchy(&self, actor: i32) -> (i32, i32, i32) {
        let team = self.store.create_team(actor, "Core").await.unwrap();
        let project = self
            .store
            .create_project(actor, team.id, "Launch")
            .await
            .unwrap();
        let stream = self
            .store
            .create_stream(actor, project.id, "Backend")
            .await
            .unwrap();
        (team.id, project.id, stream.id)
    }

    async fn task(&self, actor: i32, stream_id: i32, name: &str) -> i32 {
        self.store
            .create_task(
                actor,
                stream_id,
                TaskInput {
                    name: name.into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .task
            .id
    }

    fn raw(&self) -> SqliteConnection {
        SqliteConnection::establish(&self.db_path).unwrap()
    }
}

fn forbidden<T: std::fmt::Debug>(r: Result<T, StorageError>) {
    assert!(matches!(r, Err(StorageError::Forbidden(_))), "expected Forbidden, got {r:?}");
}

#[tokio::test]
async fn non_members_are_forbidden_at_every_level() {
    let fx = Fixture::new().await;
    let owner = fx.user("owner").await;
    let outsider = fx.user("outsider").await;
    let (team_id, project_id, stream_id) = fx.hierarchy(owner).await;
    let task_id = fx.task(owner, stream_id, "X").await;
    let goal = fx
        .store
        .create_goal(
            owner,
            stream_id,
            GoalInput {
                name: "M1".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let s = &fx.store;

    forbidden(s.team_members(outsider, team_id).await);
    forbidden(s.update_team(outsider, team_id, TeamPatch::default()).await);
    forbidden(s.delete_team(outsider, team_id).await);
    forbidden(s.list_projects(outsider, team_id).await);
    forbidden(s.create_project(outsider, team_id, "P2").await);
    forbidden(s.update_project(outsider, project_id, Some("P3".into())).await);
    forbidden(s.delete_project(outsider, project_id).await);
    forbidden(s.list_streams(outsider, project_id).await);
    forbidden(s.create_stream(outsider, project_id, "S2").await);
    forbidden(s.list_project_tasks(outsider, project_id).await);
    forbidden(s.get_stream(outsider, stream_id).await);
    forbidden(s.update_stream(outsider, stream_id, Some("S3".into())).await);
    forbidden(s.delete_stream(outsider, stream_id).await);
    forbidden(s.list_stream_tasks(outsider, stream_id).await);
    forbidden(s.list_goals(outsider, stream_id).await);
    forbidden(
        s.create_task(
            outsider,
            stream_id,
            TaskInput {
                name: "Y".into(),
                ..Default::default()
            },
        )
        .await,
    );
    forbidden(s.update_task(outsider, task_id, TaskPatch::default()).await);
    forbidden(s.delete_task(outsider, task_id).await);
    forbidden(s.create_relation(outsider, task_id, task_id, 1).await);
    forbidden(s.update_goal(outsider, goal.id, GoalPatch::default()).await);
    forbidden(s.delete_goal(outsider, goal.id).await);
    forbidden(
        s.create_reminder(outsider, task_id, Utc::now().naive_utc() + Duration::hours(1))
            .await,
    );
    forbidden(s.list_task_reminders(outsider, task_id).await);

    assert!(s.list_all_tasks(outsider).await.unwrap().is_empty());
    // Everything is still there
    assert_eq!(s.list_stream_tasks(owner, stream_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn readers_read_but_do_not_write() {
    let fx = Fixture::new().await;
    let owner = fx.user("owner").await;
    let reader = fx.user("reader").await;
    let (team_id, project_id, stream_id) = fx.hierarchy(owner).await;
    fx.store
        .update_team(
            owner,
            team_id,
            TeamPatch {
                new_users: vec!["reader@x.com".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let members = fx.store.team_members(reader, team_id).await.unwrap();
    assert!(members.iter().any(|(u, r)| u.id == reader && *r == Role::Reader));
    assert_eq!(fx.store.list_streams(reader, project_id).await.unwrap().len(), 1);
    forbidden(fx.store.create_stream(reader, project_id, "Frontend").await);
    forbidden(fx.store.delete_stream(reader, stream_id).await);

    // Existing members keep their role when re-added
    fx.store
        .update_team(
            owner,
            team_id,
            TeamPatch {
                new_users: vec!["reader@x.com".into()],
                new_users_role: Some(Role::Editor),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    forbidden(fx.store.create_stream(reader, project_id, "Frontend").await);
}

#[tokio::test]
async fn unknown_member_email_applies_nothing() {
    let fx = Fixture::new().await;
    let owner = fx.user("owner").await;
    let (team_id, _, _) = fx.hierarchy(owner).await;

    let res = fx
        .store
        .update_team(
            owner,
            team_id,
            TeamPatch {
                name: Some("Renamed".into()),
                new_users: vec!["ghost@x.com".into()],
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(res, Err(StorageError::NotFound(_))));
    let (_, teams) = fx.store.user_with_teams(owner).await.unwrap();
    assert_eq!(teams[0].name, "Core");
}

#[tokio::test]
async fn missing_resources_are_not_found() {
    let fx = Fixture::new().await;
    let owner = fx.user("owner").await;
    assert!(matches!(
        fx.store.list_projects(owner, 404).await,
        Err(StorageError::NotFound(_))
    ));
    assert!(matches!(
        fx.store.get_stream(owner, 404).await,
        Err(StorageError::NotFound(_))
    ));
    assert!(matches!(
        fx.store.delete_task(owner, 404).await,
        Err(StorageError::NotFound(_))
    ));
    assert!(matches!(
        fx.store.delete_relation(owner, 404).await,
        Err(StorageError::NotFound(_))
    ));
}

#[tokio::test]
async fn rename_to_own_name_never_conflicts() {
    let fx = Fixture::new().await;
    let owner = fx.user("owner").await;
    let (team_id, project_id, stream_id) = fx.hierarchy(owner).await;
    let goal = fx
        .store
        .create_goal(
            owner,
            stream_id,
            GoalInput {
                name: "M1".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let p = fx
        .store
        .update_project(owner, project_id, Some("Launch".into()))
        .await
        .unwrap();
    assert_eq!(p.name, "Launch");
    let s = fx
        .store
        .update_stream(owner, stream_id, Some("Backend".into()))
        .await
        .unwrap();
    assert_eq!(s.name, "Backend");
    let g = fx
        .store
        .update_goal(
            owner,
            goal.id,
            GoalPatch {
                name: Some("M1".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(g.name, "M1");

    // A sibling's name is taken; a cousin's is not
    fx.store
        .create_project(owner, team_id, "Other")
        .await
        .unwrap();
    assert!(matches!(
        fx.store
            .update_project(owner, project_id, Some("Other".into()))
            .await,
        Err(StorageError::Conflict(_))
    ));
    let other_team = fx.store.create_team(owner, "Second").await.unwrap();
    fx.store
        .create_project(owner, other_team.id, "Launch")
        .await
        .unwrap();
    assert!(matches!(
        fx.store.create_project(owner, team_id, "Launch").await,
        Err(StorageError::Conflict(_))
    ));
}

#[tokio::test]
async fn positions_append_after_the_last_task() {
    let fx = Fixture::new().await;
    let owner = fx.user("owner").await;
    let (_, project_id, stream_id) = fx.hierarchy(owner).await;
    for name in ["a", "b", "c"] {
        fx.task(owner, stream_id, name).await;
    }
    let view = fx
        .store
        .create_task(
            owner,
            stream_id,
            TaskInput {
                name: "d".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(view.task.position, 4);
    let positions: Vec<i32> = fx
        .store
        .list_stream_tasks(owner, stream_id)
        .await
        .unwrap()
        .iter()
        .map(|v| v.task.position)
        .collect();
    assert_eq!(positions, vec![1, 2, 3, 4]);

    let empty = fx
        .store
        .create_stream(owner, project_id, "Empty")
        .await
        .unwrap();
    let first = fx
        .store
        .create_task(
            owner,
            empty.id,
            TaskInput {
                name: "first".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(first.task.position, 1);
}

#[tokio::test]
async fn reassignment_keeps_a_single_row() {
    let fx = Fixture::new().await;
    let owner = fx.user("owner").await;
    fx.user("a").await;
    let b = fx.user("b").await;
    let (_, _, stream_id) = fx.hierarchy(owner).await;
    let view = fx
        .store
        .create_task(
            owner,
            stream_id,
            TaskInput {
                name: "X".into(),
                assignee_email: Some("a@x.com".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(view.assignee_email.as_deref(), Some("a@x.com"));

    let view = fx
        .store
        .update_task(
            owner,
            view.task.id,
            TaskPatch {
                assignee_email: Some(Some("b@x.com".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(view.assignee_email.as_deref(), Some("b@x.com"));

    let mut conn = fx.raw();
    let rows: Vec<i32> = task_assignees::table
        .filter(task_assignees::task_id.eq(view.task.id))
        .select(task_assignees::user_id)
        .load(&mut conn)
        .unwrap();
    assert_eq!(rows, vec![b]);

    let unknown = fx
        .store
        .update_task(
            owner,
            view.task.id,
            TaskPatch {
                assignee_email: Some(Some("ghost@x.com".into())),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(unknown, Err(StorageError::NotFound(_))));
}

#[tokio::test]
async fn unknown_status_is_rejected() {
    let fx = Fixture::new().await;
    let owner = fx.user("owner").await;
    let (_, _, stream_id) = fx.hierarchy(owner).await;
    let res = fx
        .store
        .create_task(
            owner,
            stream_id,
            TaskInput {
                name: "X".into(),
                status_id: Some(99),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(res, Err(StorageError::NotFound(_))));
    assert!(fx.store.list_stream_tasks(owner, stream_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn past_reminder_is_rejected_without_a_row() {
    let fx = Fixture::new().await;
    let owner = fx.user("owner").await;
    let (_, _, stream_id) = fx.hierarchy(owner).await;
    let task_id = fx.task(owner, stream_id, "X").await;

    let res = fx
        .store
        .create_reminder(owner, task_id, Utc::now().naive_utc() - Duration::minutes(5))
        .await;
    assert!(matches!(res, Err(StorageError::Conflict(_))));

    let mut conn = fx.raw();
    let count: i64 = task_reminders::table.count().get_result(&mut conn).unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let fx = Fixture::new().await;
    fx.user("alice").await;
    let same_email = fx.store.create_user("alice@x.com", "alice2", "h").await;
    assert!(matches!(same_email, Err(StorageError::Conflict(_))));
    let same_nick = fx.store.create_user("other@x.com", "alice", "h").await;
    assert!(matches!(same_nick, Err(StorageError::Conflict(_))));
    assert!(fx.store.email_exists("alice@x.com").await.unwrap());
    assert!(!fx.store.email_exists("other@x.com").await.unwrap());
}

#[tokio::test]
async fn team_delete_leaves_no_orphans() {
    let fx = Fixture::new().await;
    let owner = fx.user("owner").await;
    let member = fx.user("member").await;
    let team = fx.store.create_team(owner, "Doomed").await.unwrap();
    fx.store
        .update_team(
            owner,
            team.id,
            TeamPatch {
                new_users: vec!["member@x.com".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let keep = fx.hierarchy(owner).await;
    let kept_task = fx.task(owner, keep.2, "survivor").await;

    let mut doomed_tasks = Vec::new();
    for p in 0..2 {
        let project = fx
            .store
            .create_project(owner, team.id, &format!("P{p}"))
            .await
            .unwrap();
        for s in 0..2 {
            let stream = fx
                .store
                .create_stream(owner, project.id, &format!("S{s}"))
                .await
                .unwrap();
            for k in 0..2 {
                let view = fx
                    .store
                    .create_task(
                        owner,
                        stream.id,
                        TaskInput {
                            name: format!("T{k}"),
                            assignee_email: Some("member@x.com".into()),
                            ..Default::default()
                        },
                    )
                    .await
                    .unwrap();
                doomed_tasks.push(view.task.id);
                fx.store
                    .create_goal(
                        owner,
                        stream.id,
                        GoalInput {
                            name: format!("G{k}"),
                            ..Default::default()
                        },
                    )
                    .await
                    .unwrap();
            }
        }
    }
    fx.store
        .create_relation(owner, doomed_tasks[0], doomed_tasks[1], 1)
        .await
        .unwrap();
    // Relation from a surviving task into the doomed subtree
    fx.store
        .create_relation(owner, kept_task, doomed_tasks[2], 2)
        .await
        .unwrap();

    fx.store.delete_team(owner, team.id).await.unwrap();

    let mut conn = fx.raw();
    let count = |n: i64, what: &str| assert_eq!(n, 0, "orphaned {what}");
    count(
        teams::table
            .filter(teams::id.eq(team.id))
            .count()
            .get_result(&mut conn)
            .unwrap(),
        "team",
    );
    count(
        memberships::table
            .filter(memberships::team_id.eq(team.id))
            .count()
            .get_result(&mut conn)
            .unwrap(),
        "memberships",
    );
    count(
        projects::table
            .filter(projects::team_id.eq(team.id))
            .count()
            .get_result(&mut conn)
            .unwrap(),
        "projects",
    );
    count(
        streams::table
            .left_join(projects::table)
            .filter(projects::id.is_null())
            .count()
            .get_result(&mut conn)
            .unwrap(),
        "streams",
    );
    count(
        tasks::table
            .filter(tasks::id.eq_any(&doomed_tasks))
            .count()
            .get_result(&mut conn)
            .unwrap(),
        "tasks",
    );
    count(
        goals::table
            .left_join(streams::table)
            .filter(streams::id.is_null())
            .count()
            .get_result(&mut conn)
            .unwrap(),
        "goals",
    );
    count(
        task_assignees::table
            .filter(task_assignees::task_id.eq_any(&doomed_tasks))
            .count()
            .get_result(&mut conn)
            .unwrap(),
        "assignees",
    );
    count(
        task_relations::table.count().get_result(&mut conn).unwrap(),
        "relations",
    );

    // The other team and the removed member are untouched
    assert_eq!(fx.store.list_stream_tasks(owner, keep.2).await.unwrap().len(), 1);
    assert!(fx.store.user_exists(member).await.unwrap());
}

#[tokio::test]
async fn explicit_none_clears_nullable_fields() {
    let fx = Fixture::new().await;
    let owner = fx.user("owner").await;
    let (_, _, stream_id) = fx.hierarchy(owner).await;
    let deadline = Utc::now().naive_utc() + Duration::days(2);

    let task = fx
        .store
        .create_task(
            owner,
            stream_id,
            TaskInput {
                name: "Ship".into(),
                description: Some("d".into()),
                deadline: Some(deadline),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .task;
    assert!(task.deadline.is_some());
    let cleared = fx
        .store
        .update_task(
            owner,
            task.id,
            TaskPatch {
                deadline: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .task;
    assert_eq!(cleared.deadline, None);
    assert_eq!(cleared.description.as_deref(), Some("d"));

    let goal = fx
        .store
        .create_goal(
            owner,
            stream_id,
            GoalInput {
                name: "Beta".into(),
                description: Some("g".into()),
                start_date: None,
                deadline: Some(deadline),
                position: None,
            },
        )
        .await
        .unwrap();
    let cleared = fx
        .store
        .update_goal(
            owner,
            goal.id,
            GoalPatch {
                deadline: Some(None),
                description: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.deadline, None);
    assert_eq!(cleared.description, None);
    assert_eq!(cleared.name, "Beta");
}

#[tokio::test]
async fn moving_a_reminder_into_the_past_conflicts() {
    let fx = Fixture::new().await;
    let owner = fx.user("owner").await;
    let (_, _, stream_id) = fx.hierarchy(owner).await;
    let task_id = fx.task(owner, stream_id, "X").await;
    let at = Utc::now().naive_utc() + Duration::hours(1);
    let reminder = fx.store.create_reminder(owner, task_id, at).await.unwrap();

    let res = fx
        .store
        .update_reminder(
            owner,
            reminder.id,
            Some(Utc::now().naive_utc() - Duration::minutes(1)),
        )
        .await;
    assert!(matches!(res, Err(StorageError::Conflict(_))));
    let kept = fx.store.get_reminder(reminder.id).await.unwrap().unwrap();
    assert_eq!(kept.remind_at, reminder.remind_at);
    assert!(!kept.sent);
}
