//! HTTP handlers, grouped by resource. Permission checks live in storage; the
//! handlers only translate between wire DTOs and store calls.

pub(super) mod goals;
pub(super) mod meta;
pub(super) mod projects;
pub(super) mod push;
pub(super) mod reminders;
pub(super) mod streams;
pub(super) mod tasks;
pub(super) mod teams;
pub(super) mod users;

use chrono::NaiveDateTime;

use super::AppError;
use super::timestamp;

fn parse_ts(s: Option<&str>) -> Result<Option<NaiveDateTime>, AppError> {
    timestamp::parse_opt(s).map_err(AppError::bad_request)
}

fn parse_ts_patch(v: Option<Option<String>>) -> Result<Option<Option<NaiveDateTime>>, AppError> {
    match v {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(s)) => timestamp::parse(&s)
            .map(|ts| Some(Some(ts)))
            .map_err(AppError::bad_request),
    }
}

fn format_ts(ts: Option<NaiveDateTime>) -> Option<String> {
    ts.map(timestamp::format)
}

fn require_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn optional_name(name: Option<String>) -> Result<Option<String>, AppError> {
    name.as_deref().map(require_name).transpose()
}
