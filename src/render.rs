//! Terminal rendering for calblock types.
//!
//! Extension traits that add colored output to calblock-core types using
//! owo_colors.

use calblock_core::store::CalendarSummary;
use calblock_core::{CalendarRef, DesyncReport, ScrubReport, SyncReport};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for CalendarRef {
    fn render(&self) -> String {
        match &self.provider_config {
            Some(server) => format!(
                "📅 {} {}",
                self,
                format!("({} @ {})", self.provider_type, server).dimmed()
            ),
            None => format!("📅 {} {}", self, format!("({})", self.provider_type).dimmed()),
        }
    }
}

impl Render for CalendarSummary {
    fn render(&self) -> String {
        let count = format!(
            "{} {}",
            self.blocker_count,
            pluralize("blocker", self.blocker_count as usize)
        );
        format!("{}  {}", self.calendar.render(), count.dimmed())
    }
}

impl Render for SyncReport {
    fn render(&self) -> String {
        let mut lines = vec![format!(
            "Scanned {} {} across {} {}",
            self.events_seen,
            pluralize("event", self.events_seen),
            self.calendars,
            pluralize("calendar", self.calendars)
        )];

        if self.remote_writes() == 0 {
            lines.push(format!("   {}", "Everything up to date".green()));
        } else {
            if self.created > 0 {
                lines.push(format!("   {} {} created", "+".green(), self.created));
            }
            if self.updated > 0 {
                lines.push(format!("   {} {} updated", "~".yellow(), self.updated));
            }
            if self.orphans_removed > 0 {
                lines.push(format!("   {} {} removed", "-".red(), self.orphans_removed));
            }
        }

        let skipped = self.skipped_blockers + self.skipped_pseudo;
        if skipped > 0 {
            lines.push(
                format!(
                    "   {} skipped ({} blockers, {} non-appointments)",
                    skipped, self.skipped_blockers, self.skipped_pseudo
                )
                .dimmed()
                .to_string(),
            );
        }

        lines.join("\n")
    }
}

impl Render for DesyncReport {
    fn render(&self) -> String {
        let mut line = format!(
            "Removed {} {}",
            self.deleted,
            pluralize("blocker", self.deleted)
        );
        if self.already_gone > 0 {
            line.push_str(&format!(" ({} already gone)", self.already_gone).dimmed().to_string());
        }
        line
    }
}

impl Render for ScrubReport {
    fn render(&self) -> String {
        let mut line = format!(
            "Removed {} {}",
            self.deleted,
            pluralize("blocker", self.deleted)
        );
        if self.calendars > 0 {
            line.push_str(&format!(
                " from {} {}",
                self.calendars,
                pluralize("calendar", self.calendars)
            ));
        }
        if self.already_gone > 0 {
            line.push_str(&format!(" ({} already gone)", self.already_gone).dimmed().to_string());
        }
        line
    }
}

fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}
