//! What gets printed at the end of a run.
use std::fmt;

use bbdc::{
    course::Course,
    slot::{LessonFamily, Slot, SlotMonth},
};

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub username: String,
    pub course: Course,
    pub family: LessonFamily,
    pub sessions: Vec<u32>,
    pub months: Vec<MonthReport>,
}

/// Outcome of a single slot query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonthReport {
    /// Matching slots, for a month or for whatever the portal lists by default.
    Released {
        month: Option<SlotMonth>,
        slots: Vec<Slot>,
    },

    /// Nothing released for this month yet.
    Pending(SlotMonth),
}

impl Report {
    /// Every matching slot, in report order.
    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.months
            .iter()
            .filter_map(|m| match m {
                MonthReport::Released { slots, .. } => Some(slots),
                MonthReport::Pending(_) => None,
            })
            .flatten()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Course {
            course_type,
            account_bal,
            ..
        } = &self.course;

        write!(
            f,
            "{} | course {course_type} ({}) | balance ${account_bal:.2}",
            self.username, self.family
        )?;
        if let Some(expiry) = self.course.expiry_date() {
            write!(f, " | expires {}", expiry.format("%-d %b %Y"))?;
        }
        writeln!(f)?;

        let sessions = self
            .sessions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "sessions: {sessions}")?;

        for month in &self.months {
            write!(f, "{month}")?;
        }

        if self.slots().next().is_none() {
            writeln!(f, "no matching slots")?;
        }

        Ok(())
    }
}

impl fmt::Display for MonthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Released { month, slots } => {
                let label = month.as_ref().map_or("released", SlotMonth::label);
                writeln!(f, "{label}: {} matching", slots.len())?;
                for slot in slots {
                    writeln!(f, "  {}", SlotLine(slot))?;
                }
                Ok(())
            }
            Self::Pending(month) => writeln!(f, "{month}: not released yet"),
        }
    }
}

struct SlotLine<'a>(&'a Slot);

impl fmt::Display for SlotLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.0;

        match slot.date() {
            Some(date) => write!(f, "{}", date.format("%a %d %b %Y"))?,
            None => f.write_str(&slot.slot_ref_date)?,
        }

        write!(
            f,
            " {}-{}  {}",
            slot.start_time, slot.end_time, slot.slot_ref_name
        )?;

        if slot.slot_avl_computed {
            write!(f, "  {} left", slot.computed_slot_avl)?;
        }

        write!(f, "  #{}", slot.slot_id)
    }
}
