//! Courses the account is enrolled in.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use crate::{client::Tokens, Client, Error, Result};

/// An active course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Course type code, e.g. `3C`.
    pub course_type: String,

    /// Account balance in SGD.
    pub account_bal: f64,

    /// Enrollment expiry, `DD-MM-YYYY`.
    pub enr_expiry_date_str: String,

    /// Course-scoped token, `Bearer <jwt>`.
    pub auth_token: String,
}

impl Course {
    /// Enrollment expiry as a date, if the portal sent a parseable one.
    #[must_use]
    pub fn expiry_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.enr_expiry_date_str, "%d-%m-%Y").ok()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseList {
    active_course_list: Vec<Course>,
}

/// List the account's active courses.
///
/// # Errors
///
/// Fails on transport errors, an unexpected response or a rejected token.
#[instrument(skip_all)]
pub async fn list_courses(client: &Client, login_token: &str) -> Result<Vec<Course>> {
    let CourseList { active_course_list } = client
        .post(
            "account/listAccountCourseType",
            &json!({}),
            Tokens {
                authorization: Some(login_token),
                jsessionid: None,
            },
        )
        .await?;

    debug!("got {} courses", active_course_list.len());

    Ok(active_course_list)
}

/// Pick the course with type `course_type`.
///
/// # Errors
///
/// [`Error::CourseNotFound`] if there is none.
pub fn select_course(
    courses: impl IntoIterator<Item = Course>,
    course_type: &str,
) -> Result<Course> {
    courses
        .into_iter()
        .find(|c| c.course_type == course_type)
        .ok_or_else(|| Error::CourseNotFound(course_type.to_owned()))
}
