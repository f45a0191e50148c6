//! Released lesson slots, and picking the ones worth booking.
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashSet},
    fmt,
    str::FromStr,
};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{auth::Session, Client, Result};

/// A month slots are (or will be) released for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotMonth {
    /// Human readable label, e.g. `Jan'24`.
    pub slot_month_en: String,

    /// Sortable key, e.g. `202401`.
    pub slot_month_ym: Option<String>,
}

impl SlotMonth {
    /// Human readable label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.slot_month_en
    }

    /// Key to query this month with.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.slot_month_ym.as_deref()
    }
}

impl fmt::Display for SlotMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A bookable lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    /// Slot id.
    pub slot_id: i64,

    /// Display name, e.g. `SESSION 5`.
    pub slot_ref_name: String,

    /// Calendar date of the lesson.
    pub slot_ref_date: String,

    /// Start time, `HH:MM`.
    pub start_time: String,

    /// End time, `HH:MM`.
    pub end_time: String,

    /// Whether `computed_slot_avl` is meaningful.
    pub slot_avl_computed: bool,

    /// Number of places left.
    pub computed_slot_avl: i64,
}

const DATE_FORMATS: [&str; 2] = ["%d-%m-%Y", "%Y-%m-%d"];
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

/// Parsed value first, raw text only when parsing failed.
fn key<T>(parsed: Option<T>, raw: &str) -> (Option<T>, &str) {
    match parsed {
        Some(v) => (Some(v), ""),
        None => (None, raw),
    }
}

impl Slot {
    /// Calendar date, if it is in one of the formats the portal uses.
    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        let s = self.slot_ref_date.trim();

        DATE_FORMATS
            .iter()
            .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
                    .ok()
                    .map(|dt| dt.date())
            })
    }

    /// Start time, if parseable.
    #[must_use]
    pub fn start(&self) -> Option<NaiveTime> {
        parse_time(&self.start_time)
    }

    /// End time, if parseable.
    #[must_use]
    pub fn end(&self) -> Option<NaiveTime> {
        parse_time(&self.end_time)
    }

    /// Session number encoded in the display name.
    #[must_use]
    pub fn session(&self) -> Option<u32> {
        self.slot_ref_name
            .trim()
            .strip_prefix("SESSION ")?
            .trim()
            .parse()
            .ok()
    }

    /// Order by date, then start time.
    ///
    /// Values that fail to parse sort before parsed ones and among themselves
    /// by their raw text.
    #[must_use]
    pub fn cmp_chronological(&self, other: &Self) -> Ordering {
        let lhs = (
            key(self.date(), &self.slot_ref_date),
            key(self.start(), &self.start_time),
        );
        let rhs = (
            key(other.date(), &other.slot_ref_date),
            key(other.start(), &other.start_time),
        );

        lhs.cmp(&rhs)
    }
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(s, f).ok())
}

/// Display name of session `n`.
#[must_use]
pub fn session_name(n: u32) -> String {
    format!("SESSION {n}")
}

/// Keep the slots for any of `sessions`, earliest first.
///
/// Slots with equal date and start time keep their relative order, so
/// running this on its own output changes nothing.
pub fn filter_sort<'a>(slots: impl IntoIterator<Item = &'a Slot>, sessions: &[u32]) -> Vec<Slot> {
    let names = sessions
        .iter()
        .copied()
        .map(session_name)
        .collect::<HashSet<_>>();

    let mut matching = slots
        .into_iter()
        .filter(|s| names.contains(&s.slot_ref_name))
        .cloned()
        .collect::<Vec<_>>();

    matching.sort_by(Slot::cmp_chronological);
    matching
}

/// Result of a slot query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSlotPage", into = "RawSlotPage")]
pub enum SlotPage {
    /// Slots grouped by day.
    Released(BTreeMap<String, Vec<Slot>>),

    /// Nothing listed yet; these months can be queried individually.
    Pending(Vec<SlotMonth>),
}

impl SlotPage {
    /// Slots for any of `sessions`, earliest first.
    ///
    /// `None` for a [`SlotPage::Pending`] page, whose months have to be
    /// queried one by one instead.
    #[must_use]
    pub fn matching(&self, sessions: &[u32]) -> Option<Vec<Slot>> {
        match self {
            Self::Released(days) => Some(filter_sort(days.values().flatten(), sessions)),
            Self::Pending(_) => None,
        }
    }

    /// Months still to be queried.
    #[must_use]
    pub fn pending_months(&self) -> Option<&[SlotMonth]> {
        match self {
            Self::Released(_) => None,
            Self::Pending(months) => Some(months),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSlotPage {
    released_slot_month_list: Option<Vec<SlotMonth>>,
    released_slot_list_group_by_day: Option<BTreeMap<String, Vec<Slot>>>,
}

impl TryFrom<RawSlotPage> for SlotPage {
    type Error = &'static str;

    fn try_from(raw: RawSlotPage) -> Result<Self, Self::Error> {
        match raw {
            RawSlotPage {
                released_slot_list_group_by_day: Some(days),
                ..
            } => Ok(Self::Released(days)),
            RawSlotPage {
                released_slot_month_list: Some(months),
                ..
            } => Ok(Self::Pending(months)),
            _ => Err("neither released slots nor a month list"),
        }
    }
}

impl From<SlotPage> for RawSlotPage {
    fn from(page: SlotPage) -> Self {
        match page {
            SlotPage::Released(days) => Self {
                released_slot_month_list: None,
                released_slot_list_group_by_day: Some(days),
            },
            SlotPage::Pending(months) => Self {
                released_slot_month_list: Some(months),
                released_slot_list_group_by_day: None,
            },
        }
    }
}

/// Fixed parts of a slot query for one lesson family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotQuery {
    /// Path below the API root.
    pub path: &'static str,

    /// `stageSubDesc`.
    pub stage_sub_desc: &'static str,

    /// `subStageSubNo`.
    pub sub_stage_sub_no: Option<&'static str>,

    /// `subVehicleType`.
    pub sub_vehicle_type: Option<&'static str>,
}

/// Kind of lesson, each with its own endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonFamily {
    /// Class 3 / 3A practical lessons.
    C3Practical,

    /// Class 2B / 2A / 2 practical lessons.
    ///
    /// Provisional: the endpoint and payload constants have not been checked
    /// against the live service (see [`LessonFamily::is_verified`]).
    C2Practical,
}

impl LessonFamily {
    /// Every family.
    pub const ALL: [Self; 2] = [Self::C3Practical, Self::C2Practical];

    /// Endpoint and payload constants.
    #[must_use]
    pub const fn query(self) -> SlotQuery {
        match self {
            Self::C3Practical => SlotQuery {
                path: "booking/c3practical/listC3PracticalSlotReleased",
                stage_sub_desc: "Practical Lesson",
                sub_stage_sub_no: None,
                sub_vehicle_type: None,
            },
            Self::C2Practical => SlotQuery {
                path: "booking/c2practical/listPracSlotReleased",
                stage_sub_desc: "Practical Lesson",
                sub_stage_sub_no: None,
                sub_vehicle_type: None,
            },
        }
    }

    /// Short name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::C3Practical => "c3practical",
            Self::C2Practical => "c2practical",
        }
    }

    /// Whether this family's endpoint and payload are known to work.
    #[must_use]
    pub const fn is_verified(self) -> bool {
        matches!(self, Self::C3Practical)
    }

    /// Family a course type code belongs to, e.g. `3C` → [`LessonFamily::C3Practical`].
    ///
    /// Unverified families are returned too; callers decide whether to use them.
    #[must_use]
    pub fn for_course_type(course_type: &str) -> Option<Self> {
        match course_type.trim().chars().next()? {
            '3' => Some(Self::C3Practical),
            '2' => Some(Self::C2Practical),
            _ => None,
        }
    }
}

impl fmt::Display for LessonFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown lesson family name.
#[derive(Debug, thiserror::Error)]
#[error("unknown lesson family {0:?}")]
pub struct ParseLessonFamilyError(String);

impl FromStr for LessonFamily {
    type Err = ParseLessonFamilyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseLessonFamilyError(s.to_owned()))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListSlotsRequest<'a> {
    course_type: &'a str,
    ins_instructor_id: &'a str,
    stage_sub_desc: &'a str,
    sub_vehicle_type: Option<&'a str>,
    sub_stage_sub_no: Option<&'a str>,
    released_slot_month: Option<&'a str>,
}

impl<'a> ListSlotsRequest<'a> {
    fn new(query: SlotQuery, course_type: &'a str, month: Option<&'a str>) -> Self {
        Self {
            course_type,
            ins_instructor_id: "",
            stage_sub_desc: query.stage_sub_desc,
            sub_vehicle_type: query.sub_vehicle_type,
            sub_stage_sub_no: query.sub_stage_sub_no,
            released_slot_month: month,
        }
    }
}

/// List released slots, optionally for one month (a [`SlotMonth::key`]).
///
/// # Errors
///
/// Fails on transport errors, an unexpected response or a rejected token.
#[instrument(skip(client, session))]
pub async fn list_slots(
    client: &Client,
    family: LessonFamily,
    course_type: &str,
    session: &Session,
    month: Option<&str>,
) -> Result<SlotPage> {
    let query = family.query();
    let body = ListSlotsRequest::new(query, course_type, month);

    let page: SlotPage = client.post(query.path, &body, session.tokens()).await?;

    match &page {
        SlotPage::Released(days) => debug!(
            "{} slots on {} days",
            days.values().map(Vec::len).sum::<usize>(),
            days.len()
        ),
        SlotPage::Pending(months) => debug!("{} months pending", months.len()),
    }

    Ok(page)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::{envelope, Error};

    fn slot(id: i64, name: &str, date: &str, start: &str) -> Slot {
        Slot {
            slot_id: id,
            slot_ref_name: name.to_owned(),
            slot_ref_date: date.to_owned(),
            start_time: start.to_owned(),
            end_time: "23:59".to_owned(),
            slot_avl_computed: true,
            computed_slot_avl: 1,
        }
    }

    #[test]
    fn time_ascending_within_a_day() {
        let a = slot(1, "SESSION 5", "01-06-2024", "08:00");
        let b = slot(2, "SESSION 6", "01-06-2024", "07:00");

        assert_eq!(filter_sort([&a, &b], &[5, 6]), vec![b, a]);
    }

    #[test]
    fn dates_compare_as_dates() {
        // lexically "02-05-2024" > "01-06-2024"
        let may = slot(1, "SESSION 1", "02-05-2024", "10:00");
        let june = slot(2, "SESSION 1", "01-06-2024", "07:00");
        let next_year = slot(3, "SESSION 1", "01-01-2025", "07:00");

        assert_eq!(
            filter_sort([&next_year, &june, &may], &[1]),
            vec![may, june, next_year]
        );
    }

    #[test]
    fn only_requested_sessions() {
        let slots = [
            slot(1, "SESSION 1", "01-06-2024", "07:00"),
            slot(2, "SESSION 2", "01-06-2024", "08:00"),
            slot(3, "SESSION 3", "01-06-2024", "09:00"),
            slot(4, "SESSION 12", "01-06-2024", "10:00"),
        ];

        let ids = filter_sort(&slots, &[2, 12, 7])
            .iter()
            .map(|s| s.slot_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, [2, 4]);
    }

    #[test]
    fn no_match_is_empty() {
        let slots = [slot(1, "SESSION 1", "01-06-2024", "07:00")];
        assert!(filter_sort(&slots, &[4]).is_empty());
        assert!(filter_sort(&slots, &[]).is_empty());
    }

    #[test]
    fn idempotent() {
        let slots = [
            slot(1, "SESSION 3", "03-06-2024", "07:00"),
            slot(2, "SESSION 3", "01-06-2024", "09:00"),
            slot(3, "SESSION 4", "01-06-2024", "09:00"),
            slot(4, "SESSION 4", "2024-06-01", "08:30:00"),
        ];

        let once = filter_sort(&slots, &[3, 4]);
        let twice = filter_sort(&once, &[3, 4]);
        assert_eq!(once, twice);
        assert_eq!(
            once.iter().map(|s| s.slot_id).collect::<Vec<_>>(),
            [4, 2, 3, 1]
        );
    }

    #[test]
    fn unparseable_dates_sort_first() {
        let odd = slot(1, "SESSION 1", "someday", "07:00");
        let normal = slot(2, "SESSION 1", "01-06-2024", "07:00");
        assert_eq!(odd.cmp_chronological(&normal), Ordering::Less);
        assert_eq!(normal.cmp_chronological(&odd), Ordering::Greater);
    }

    #[test]
    fn parses_fields() {
        let s = slot(1, "SESSION 11", "2024-06-01 00:00:00", "13:20");
        assert_eq!(s.session(), Some(11));
        assert_eq!(s.date(), NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(s.start(), NaiveTime::from_hms_opt(13, 20, 0));
        assert_eq!(slot(1, "Theory", "", "").session(), None);
    }

    const RELEASED: &str = r#"{
        "success": true,
        "code": 0,
        "data": {
            "releasedSlotMonthList": null,
            "releasedSlotListGroupByDay": {
                "2024-06-02 00:00:00": [
                    {
                        "slotId": 11,
                        "slotRefName": "SESSION 5",
                        "slotRefDate": "2024-06-02 00:00:00",
                        "startTime": "07:30",
                        "endTime": "09:10",
                        "slotAvlComputed": true,
                        "computedSlotAvl": 2,
                        "totalFee": "69.76"
                    }
                ],
                "2024-06-01 00:00:00": [
                    {
                        "slotId": 10,
                        "slotRefName": "SESSION 6",
                        "slotRefDate": "2024-06-01 00:00:00",
                        "startTime": "09:20",
                        "endTime": "11:00",
                        "slotAvlComputed": false,
                        "computedSlotAvl": 0
                    },
                    {
                        "slotId": 12,
                        "slotRefName": "SESSION 1",
                        "slotRefDate": "2024-06-01 00:00:00",
                        "startTime": "07:30",
                        "endTime": "09:10",
                        "slotAvlComputed": true,
                        "computedSlotAvl": 1
                    }
                ]
            }
        }
    }"#;

    #[test]
    fn released_page() {
        let page: SlotPage = envelope::decode(RELEASED).unwrap();
        assert!(page.pending_months().is_none());

        let ids = page
            .matching(&[5, 6])
            .unwrap()
            .iter()
            .map(|s| s.slot_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, [10, 11]);
    }

    #[test]
    fn pending_page() {
        let page: SlotPage = envelope::decode(
            r#"{"success":true,"code":0,"data":{
                "releasedSlotListGroupByDay":null,
                "releasedSlotMonthList":[
                    {"slotMonthEn":"Jan'24","slotMonthYm":"202401"},
                    {"slotMonthEn":"Feb'24","slotMonthYm":null}]}}"#,
        )
        .unwrap();

        assert_eq!(page.matching(&[1]), None);

        let months = page.pending_months().unwrap();
        assert_eq!(months[0].label(), "Jan'24");
        assert_eq!(months[0].key(), Some("202401"));
        assert_eq!(months[1].key(), None);
    }

    #[test]
    fn month_key_may_be_absent() {
        let month: SlotMonth = serde_json::from_value(json!({"slotMonthEn": "Mar'24"})).unwrap();
        assert_eq!(month.key(), None);
    }

    #[test]
    fn empty_page_is_a_schema_error() {
        let err = envelope::decode::<SlotPage>(
            r#"{"success":true,"code":0,"data":{"releasedSlotMonthList":null}}"#,
        )
        .unwrap_err();
        assert_matches!(err, Error::Schema(_));
    }

    #[test]
    fn slot_missing_field_is_a_schema_error() {
        let err = envelope::decode::<SlotPage>(
            r#"{"success":true,"code":0,"data":{"releasedSlotListGroupByDay":{
                "d":[{"slotId":1,"slotRefName":"SESSION 1","slotRefDate":"01-06-2024"}]}}}"#,
        )
        .unwrap_err();
        assert_matches!(err, Error::Schema(_));
    }

    #[test]
    fn casing_round_trip() {
        let page: SlotPage = envelope::decode(RELEASED).unwrap();
        let wire = serde_json::to_value(&page).unwrap();

        assert!(wire["releasedSlotListGroupByDay"].is_object());
        assert!(wire["releasedSlotMonthList"].is_null());
        assert_eq!(
            wire["releasedSlotListGroupByDay"]["2024-06-02 00:00:00"][0]["computedSlotAvl"],
            2
        );
        assert_eq!(serde_json::from_value::<SlotPage>(wire).unwrap(), page);

        let month = SlotMonth {
            slot_month_en: "Jan'24".to_owned(),
            slot_month_ym: Some("202401".to_owned()),
        };
        let wire = serde_json::to_value(&month).unwrap();
        assert_eq!(wire, json!({"slotMonthEn": "Jan'24", "slotMonthYm": "202401"}));
        assert_eq!(serde_json::from_value::<SlotMonth>(wire).unwrap(), month);
    }

    #[test]
    fn request_sends_unused_fields_as_null() {
        let body = ListSlotsRequest::new(LessonFamily::C3Practical.query(), "3C", None);
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({
                "courseType": "3C",
                "insInstructorId": "",
                "stageSubDesc": "Practical Lesson",
                "subVehicleType": null,
                "subStageSubNo": null,
                "releasedSlotMonth": null,
            })
        );

        let body = ListSlotsRequest::new(LessonFamily::C3Practical.query(), "3C", Some("202401"));
        assert_eq!(serde_json::to_value(body).unwrap()["releasedSlotMonth"], "202401");
    }

    #[test]
    fn families() {
        assert_eq!(
            LessonFamily::for_course_type("3C"),
            Some(LessonFamily::C3Practical)
        );
        assert_eq!(
            LessonFamily::for_course_type("2B"),
            Some(LessonFamily::C2Practical)
        );
        assert_eq!(LessonFamily::for_course_type("9Z"), None);
        assert!(LessonFamily::C3Practical.is_verified());
        assert!(!LessonFamily::C2Practical.is_verified());
        assert_eq!(LessonFamily::for_course_type(""), None);

        assert_eq!("C3Practical".parse::<LessonFamily>().unwrap(), LessonFamily::C3Practical);
        assert!("bus".parse::<LessonFamily>().is_err());

        for family in LessonFamily::ALL {
            assert_eq!(family.to_string().parse::<LessonFamily>().unwrap(), family);
        }
        assert_ne!(
            LessonFamily::C3Practical.query().path,
            LessonFamily::C2Practical.query().path
        );
    }
}
