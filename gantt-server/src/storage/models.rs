use crate::storage::schema::{
    goals, memberships, projects, push_subscriptions, streams, task_assignees, task_relations,
    task_reminders, tasks, teams, users,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use gantt_shared::auth::Role;

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub nickname: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub nickname: &'a str,
    pub password_hash: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = teams)]
pub struct Team {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = memberships)]
#[diesel(belongs_to(User, foreign_key = user_id))]
#[diesel(belongs_to(Team, foreign_key = team_id))]
pub struct Membership {
    pub id: i32,
    pub user_id: i32,
    pub team_id: i32,
    pub role_id: i32,
}

impl Membership {
    pub fn role(&self) -> Role {
        Role::from_id(self.role_id)
    }
}

#[derive(Insertable)]
#[diesel(table_name = memberships)]
pub struct NewMembership {
    pub user_id: i32,
    pub team_id: i32,
    pub role_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = projects)]
#[diesel(belongs_to(Team, foreign_key = team_id))]
pub struct Project {
    pub id: i32,
    pub team_id: i32,
    pub name: String,
}

#[derive(Insertable)]
#[diesel(table_name = projects)]
pub struct NewProject<'a> {
    pub team_id: i32,
    pub name: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = streams)]
#[diesel(belongs_to(Project, foreign_key = project_id))]
pub struct Stream {
    pub id: i32,
    pub project_id: i32,
    pub name: String,
}

#[derive(Insertable)]
#[diesel(table_name = streams)]
pub struct NewStream<'a> {
    pub project_id: i32,
    pub name: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(belongs_to(Stream, foreign_key = stream_id))]
pub struct Task {
    pub id: i32,
    pub stream_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub status_id: Option<i32>,
    pub priority_id: Option<i32>,
    pub start_date: Option<NaiveDateTime>,
    pub deadline: Option<NaiveDateTime>,
    pub position: i32,
}

#[derive(Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTask<'a> {
    pub stream_id: i32,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub status_id: Option<i32>,
    pub priority_id: Option<i32>,
    pub start_date: Option<NaiveDateTime>,
    pub deadline: Option<NaiveDateTime>,
    pub position: i32,
}

/// Partial task update; `None` leaves the column untouched.
#[derive(Default, AsChangeset)]
#[diesel(table_name = tasks)]
pub struct TaskChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status_id: Option<Option<i32>>,
    pub priority_id: Option<Option<i32>>,
    pub start_date: Option<Option<NaiveDateTime>>,
    pub deadline: Option<Option<NaiveDateTime>>,
    pub position: Option<i32>,
}

impl TaskChanges {
    /// Diesel rejects an UPDATE with an empty SET clause.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status_id.is_none()
            && self.priority_id.is_none()
            && self.start_date.is_none()
            && self.deadline.is_none()
            && self.position.is_none()
    }
}

#[derive(Insertable)]
#[diesel(table_name = task_assignees)]
pub struct NewTaskAssignee {
    pub task_id: i32,
    pub user_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = task_relations)]
pub struct TaskRelation {
    pub id: i32,
    pub task_id_1: i32,
    pub task_id_2: i32,
    pub connection_id: i32,
}

#[derive(Insertable)]
#[diesel(table_name = task_relations)]
pub struct NewTaskRelation {
    pub task_id_1: i32,
    pub task_id_2: i32,
    pub connection_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = goals)]
#[diesel(belongs_to(Stream, foreign_key = stream_id))]
pub struct Goal {
    pub id: i32,
    pub stream_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDateTime>,
    pub deadline: Option<NaiveDateTime>,
    pub position: i32,
}

#[derive(Insertable)]
#[diesel(table_name = goals)]
pub struct NewGoal<'a> {
    pub stream_id: i32,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub start_date: Option<NaiveDateTime>,
    pub deadline: Option<NaiveDateTime>,
    pub position: i32,
}

#[derive(Default, AsChangeset)]
#[diesel(table_name = goals)]
pub struct GoalChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub start_date: Option<Option<NaiveDateTime>>,
    pub deadline: Option<Option<NaiveDateTime>>,
    pub position: Option<i32>,
}

impl GoalChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.start_date.is_none()
            && self.deadline.is_none()
            && self.position.is_none()
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = task_reminders)]
pub struct TaskReminder {
    pub id: i32,
    pub task_id: i32,
    pub user_id: i32,
    pub remind_at: NaiveDateTime,
    pub sent: bool,
}

#[derive(Insertable)]
#[diesel(table_name = task_reminders)]
pub struct NewTaskReminder {
    pub task_id: i32,
    pub user_id: i32,
    pub remind_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = push_subscriptions)]
pub struct PushSubscription {
    pub id: i32,
    pub user_id: i32,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub created_at: NaiveDateTime,
    pub last_success_at: Option<NaiveDateTime>,
    pub last_error: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = push_subscriptions)]
pub struct NewPushSubscription<'a> {
    pub user_id: i32,
    pub endpoint: &'a str,
    pub p256dh: &'a str,
    pub auth: &'a str,
}

/// Row of a meta catalog (statuses, priorities, connection types).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaItem {
    pub id: i32,
    pub name: String,
}
