use std::future::Future;

use anyhow::bail;
use bbdc::{
    auth::{self, Session},
    captcha::CaptchaSolver,
    course,
    slot::{self, LessonFamily, SlotPage},
    Client, Result,
};
use tracing::{info, instrument, warn};

use crate::{
    report::{MonthReport, Report},
    Config,
};

/// Log in, find the configured course and collect matching slots for every
/// month the portal knows about.
///
/// # Errors
///
/// Any failed step aborts the run.
#[instrument(skip_all, fields(course = %config.course))]
pub async fn run(config: &Config, solver: &impl CaptchaSolver) -> anyhow::Result<Report> {
    let client = Client::new(config.client_config())?;

    let ack = auth::login_with(&client, &config.credentials(), solver).await?;
    info!(username = %ack.username, "logged in");

    let courses = course::list_courses(&client, ack.token()).await?;
    let course = course::select_course(courses, &config.course)?;

    let family = pick_family(config.family, &course.course_type)?;

    let session = Session::new(&ack, &course);

    let months = {
        let (client, course_type, session) = (&client, course.course_type.as_str(), &session);

        enumerate(
            |month: Option<String>| async move {
                slot::list_slots(client, family, course_type, session, month.as_deref()).await
            },
            &config.sessions,
        )
        .await?
    };

    Ok(Report {
        username: ack.username,
        course,
        family,
        sessions: config.sessions.clone(),
        months,
    })
}

/// An explicit family always wins. Otherwise the family is inferred from the
/// course type, but only verified families are picked that way.
fn pick_family(explicit: Option<LessonFamily>, course_type: &str) -> anyhow::Result<LessonFamily> {
    if let Some(family) = explicit {
        return Ok(family);
    }

    match LessonFamily::for_course_type(course_type) {
        Some(family) if family.is_verified() => Ok(family),
        Some(family) => bail!(
            "lesson family {family} for course type {course_type} is unverified, \
             pass --family {family} to use it anyway"
        ),
        None => {
            warn!(%course_type, "unknown lesson family, assuming c3practical");
            Ok(LessonFamily::C3Practical)
        }
    }
}

/// Query without a month first; if the portal answers with a list of months
/// instead of slots, query each of them.
async fn enumerate<F, Fut>(mut query: F, sessions: &[u32]) -> Result<Vec<MonthReport>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<SlotPage>>,
{
    let months = match query(None).await? {
        SlotPage::Pending(months) => months,
        page => {
            return Ok(vec![MonthReport::Released {
                month: None,
                slots: page.matching(sessions).unwrap_or_default(),
            }])
        }
    };

    let mut reports = Vec::with_capacity(months.len());

    for month in months {
        let Some(key) = month.slot_month_ym.clone() else {
            info!(%month, "no month key, not released yet");
            reports.push(MonthReport::Pending(month));
            continue;
        };

        let page = query(Some(key)).await?;

        reports.push(match page.matching(sessions) {
            Some(slots) => {
                info!(%month, "{} matching slots", slots.len());
                MonthReport::Released {
                    month: Some(month),
                    slots,
                }
            }
            None => MonthReport::Pending(month),
        });
    }

    Ok(reports)
}
