use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::Role;

pub mod endpoints;

pub const API_PREFIX: &str = "/api";

/// Distinguishes an absent PATCH field (`None`) from an explicit `null`
/// (`Some(None)`). Use together with `#[serde(default)]`.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// Auth
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterReq {
    pub email: String,
    pub nickname: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResp {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckEmailReq {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckEmailResp {
    pub exists: bool,
}

// Users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamDto {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i32,
    pub email: String,
    pub nickname: String,
    pub teams: Vec<TeamDto>,
}

// Teams
#[derive(Debug, Serialize, Deserialize)]
pub struct TeamCreateReq {
    pub name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TeamUpdateReq {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "newUsers", default, skip_serializing_if = "Option::is_none")]
    pub new_users: Option<Vec<String>>,
    /// Role granted to `newUsers`; Reader when omitted.
    #[serde(rename = "newUsersRole", default, skip_serializing_if = "Option::is_none")]
    pub new_users_role: Option<Role>,
    #[serde(rename = "deleteUsers", default, skip_serializing_if = "Option::is_none")]
    pub delete_users: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemberDto {
    pub id: i32,
    pub email: String,
    pub nickname: String,
    pub role: Role,
}

// Projects
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectCreateReq {
    pub name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProjectUpdateReq {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectDto {
    pub id: i32,
    pub name: String,
    pub team_id: i32,
}

// Streams
#[derive(Debug, Serialize, Deserialize)]
pub struct StreamCreateReq {
    pub name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StreamUpdateReq {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StreamDto {
    pub id: i32,
    pub name: String,
    pub project_id: i32,
}

// Tasks
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskCreateReq {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status_id: Option<i32>,
    #[serde(default)]
    pub priority_id: Option<i32>,
    #[serde(default)]
    pub assignee_email: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>, // RFC3339
    #[serde(default)]
    pub deadline: Option<String>, // RFC3339
    #[serde(default)]
    pub position: Option<i32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskUpdateReq {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub status_id: Option<Option<i32>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub priority_id: Option<Option<i32>>,
    /// `null` removes the current assignee.
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub assignee_email: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRelationDto {
    pub id: i32,
    pub task_id_1: i32,
    pub task_id_2: i32,
    pub connection_id: i32,
    pub connection_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskRelationCreateReq {
    pub task_id: i32,
    pub connection_id: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskDto {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub status_id: Option<i32>,
    pub priority_id: Option<i32>,
    pub stream_id: i32,
    pub start_date: Option<String>, // RFC3339 UTC
    pub deadline: Option<String>,   // RFC3339 UTC
    pub assignee_email: Option<String>,
    pub position: i32,
    pub relations: Vec<TaskRelationDto>,
}

/// Task enriched with its place in the hierarchy, used by the cross-team list.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskFullDto {
    #[serde(flatten)]
    pub task: TaskDto,
    pub team_id: i32,
    pub team_name: String,
    pub project_name: String,
    pub stream_name: String,
}

// Goals
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GoalCreateReq {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GoalUpdateReq {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GoalDto {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub deadline: Option<String>,
    pub stream_id: i32,
    pub position: i32,
}

// Reminders
#[derive(Debug, Serialize, Deserialize)]
pub struct ReminderCreateReq {
    pub remind_at: String, // RFC3339
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ReminderUpdateReq {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remind_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReminderDto {
    pub id: i32,
    pub task_id: i32,
    pub user_id: i32,
    pub remind_at: String, // RFC3339 UTC
    pub sent: bool,
}

/// Body of the web push message delivered when a reminder fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderPayload {
    pub title: String,
    pub body: String,
    pub task_id: i32,
    pub reminder_id: i32,
}

// Push
#[derive(Debug, Serialize, Deserialize)]
pub struct PushSubscribeReq {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PushSubscriptionDto {
    pub id: i32,
    pub user_id: i32,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VapidKeyDto {
    pub public_key: String,
}

// Meta catalogs (statuses, priorities, connection types)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetaItemDto {
    pub id: i32,
    pub name: String,
}
