use super::API_PREFIX;

fn base_join(base: &str, path: &str) -> String {
    let b = base.trim_end_matches('/');
    let p = path.trim_start_matches('/');
    format!("{}/{}", b, p)
}

fn api(base: &str, rest: &str) -> String {
    base_join(base, &format!("{}/{}", API_PREFIX, rest))
}

pub fn register(base: &str) -> String {
    api(base, "register")
}
pub fn login(base: &str) -> String {
    api(base, "login")
}
pub fn check_email(base: &str) -> String {
    api(base, "check-email")
}
pub fn user_by_token(base: &str) -> String {
    api(base, "user_by_token")
}
pub fn user(base: &str, user_id: i32) -> String {
    api(base, &format!("user/{}", user_id))
}

pub fn team_new(base: &str) -> String {
    api(base, "team/new")
}
pub fn team(base: &str, team_id: i32) -> String {
    api(base, &format!("team/{}", team_id))
}
pub fn team_users(base: &str, team_id: i32) -> String {
    api(base, &format!("team/{}/users", team_id))
}
pub fn team_projects(base: &str, team_id: i32) -> String {
    api(base, &format!("team/{}/projects", team_id))
}
pub fn project_new(base: &str, team_id: i32) -> String {
    api(base, &format!("team/{}/project/new", team_id))
}

pub fn project(base: &str, project_id: i32) -> String {
    api(base, &format!("project/{}", project_id))
}
pub fn project_streams(base: &str, project_id: i32) -> String {
    api(base, &format!("project/{}/streams", project_id))
}
pub fn stream_new(base: &str, project_id: i32) -> String {
    api(base, &format!("project/{}/stream/new", project_id))
}
pub fn project_tasks(base: &str, project_id: i32) -> String {
    api(base, &format!("project/{}/tasks", project_id))
}

pub fn stream(base: &str, stream_id: i32) -> String {
    api(base, &format!("stream/{}", stream_id))
}
pub fn stream_tasks(base: &str, stream_id: i32) -> String {
    api(base, &format!("stream/{}/tasks", stream_id))
}
pub fn task_new(base: &str, stream_id: i32) -> String {
    api(base, &format!("stream/{}/task/new", stream_id))
}
pub fn stream_goals(base: &str, stream_id: i32) -> String {
    api(base, &format!("stream/{}/goals", stream_id))
}
pub fn goal_new(base: &str, stream_id: i32) -> String {
    api(base, &format!("stream/{}/goal/new", stream_id))
}

pub fn tasks_all(base: &str) -> String {
    api(base, "tasks/all")
}
pub fn task(base: &str, task_id: i32) -> String {
    api(base, &format!("task/{}", task_id))
}
pub fn task_relation(base: &str, task_id: i32) -> String {
    api(base, &format!("task/{}/relation", task_id))
}
pub fn relation(base: &str, relation_id: i32) -> String {
    api(base, &format!("relation/{}", relation_id))
}
pub fn goal(base: &str, goal_id: i32) -> String {
    api(base, &format!("goal/{}", goal_id))
}

pub fn task_reminders(base: &str, task_id: i32) -> String {
    api(base, &format!("tasks/{}/reminders", task_id))
}
pub fn reminders(base: &str) -> String {
    api(base, "reminders")
}
pub fn reminder(base: &str, reminder_id: i32) -> String {
    api(base, &format!("reminders/{}", reminder_id))
}

pub fn push_subscribe(base: &str) -> String {
    api(base, "push/subscribe")
}
pub fn push_subscriptions(base: &str) -> String {
    api(base, "push/subscriptions")
}
pub fn push_subscription(base: &str, subscription_id: i32) -> String {
    api(base, &format!("push/subscriptions/{}", subscription_id))
}
pub fn push_vapid_public_key(base: &str) -> String {
    api(base, "push/vapid-public-key")
}

pub fn task_statuses(base: &str) -> String {
    api(base, "taskStatuses")
}
pub fn priorities(base: &str) -> String {
    api(base, "priorities")
}
pub fn connection_types(base: &str) -> String {
    api(base, "connectionTypes")
}
