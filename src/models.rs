use std::{fmt, str::FromStr};

use anyhow::Context;
use jiff::{Timestamp, civil::Date};
use serde::{Deserialize, Serialize};

use crate::{
    entities::release,
    error::{AppError, AppResult, FieldErrors},
};

pub const NAME_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Created,
    InProgress,
    Done,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Created, Status::InProgress, Status::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Created => "CREATED",
            Status::InProgress => "IN_PROGRESS",
            Status::Done => "DONE",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .with_context(|| format!("unknown release status {s:?}"))
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub status: Status,
    pub release_date: Date,
    pub created_at: Timestamp,
    #[serde(rename = "lastUpdateAt")]
    pub last_updated_at: Timestamp,
}

impl TryFrom<release::Model> for Release {
    type Error = anyhow::Error;

    fn try_from(row: release::Model) -> anyhow::Result<Self> {
        Ok(Self {
            id: row.id,
            status: row.status.parse()?,
            release_date: row
                .release_date
                .parse()
                .with_context(|| format!("release {} has a malformed date", row.id))?,
            created_at: Timestamp::from_second(row.created_at)?,
            last_updated_at: Timestamp::from_second(row.last_updated_at)?,
            name: row.name,
            description: row.description,
        })
    }
}

/// A validated creation request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewRelease {
    pub name: String,
    pub description: String,
    pub status: Status,
    pub release_date: Date,
}

/// A validated partial update. `None` leaves the stored value untouched.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReleasePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<Status>,
    pub release_date: Option<Date>,
}

impl ReleasePatch {
    pub fn merge_into(self, mut release: Release) -> Release {
        if let Some(name) = self.name {
            release.name = name;
        }
        if let Some(description) = self.description {
            release.description = description;
        }
        if let Some(status) = self.status {
            release.status = status;
        }
        if let Some(release_date) = self.release_date {
            release.release_date = release_date;
        }
        release
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRelease {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<Status>,
    pub release_date: Option<Date>,
}

impl CreateRelease {
    pub fn validate(self, today: Date) -> AppResult<NewRelease> {
        let mut errors = FieldErrors::new();

        let name = self.name.unwrap_or_default();
        check_text(&mut errors, "name", "Name", &name, NAME_MAX_CHARS);

        let description = self.description.unwrap_or_default();
        check_text(&mut errors, "description", "Description", &description, DESCRIPTION_MAX_CHARS);

        if self.status.is_none() {
            errors.add("status", "Status is required");
        }

        match self.release_date {
            None => errors.add("releaseDate", "Release date is required"),
            Some(date) => check_not_past(&mut errors, date, today),
        }

        let (Some(status), Some(release_date)) = (self.status, self.release_date) else {
            return Err(AppError::Validation(errors));
        };
        errors.into_result(NewRelease { name, description, status, release_date })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRelease {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<Status>,
    pub release_date: Option<Date>,
}

impl UpdateRelease {
    pub fn validate(self, today: Date) -> AppResult<ReleasePatch> {
        let mut errors = FieldErrors::new();

        if let Some(name) = &self.name {
            check_text(&mut errors, "name", "Name", name, NAME_MAX_CHARS);
        }
        if let Some(description) = &self.description {
            check_text(
                &mut errors,
                "description",
                "Description",
                description,
                DESCRIPTION_MAX_CHARS,
            );
        }
        if let Some(date) = self.release_date {
            check_not_past(&mut errors, date, today);
        }

        errors.into_result(ReleasePatch {
            name: self.name,
            description: self.description,
            status: self.status,
            release_date: self.release_date,
        })
    }
}

fn check_text(
    errors: &mut FieldErrors,
    field: &'static str,
    label: &str,
    value: &str,
    max_chars: usize,
) {
    if value.trim().is_empty() {
        errors.add(field, format!("{label} cannot be empty"));
    } else if value.chars().count() > max_chars {
        errors.add(field, format!("{label} cannot exceed {max_chars} characters"));
    }
}

fn check_not_past(errors: &mut FieldErrors, date: Date, today: Date) {
    if date < today {
        errors.add("releaseDate", "Release date cannot be in the past");
    }
}

pub fn now_sec() -> i64 {
    Timestamp::now().as_second()
}

pub fn timestamp(sec: i64) -> Timestamp {
    Timestamp::from_second(sec).unwrap_or(Timestamp::UNIX_EPOCH)
}

pub fn today() -> Date {
    jiff::Zoned::now().date()
}
