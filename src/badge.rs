//! Provenance badge ("intelligent tag") shown under a question.
//!
//! At most one badge is chosen per question, in a fixed priority order:
//! current-affairs date, AI topic, exam/year, then generic tags.

use crate::font::FontRegistry;
use crate::question::Question;
use crate::types::{Color, Pt};
use chrono::{DateTime, NaiveDate};

pub const CURRENT_AFFAIRS_SUBJECT: &str = "Current Affairs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeKind {
    CurrentAffairs,
    AiGenerated,
    PreviousYear,
    Tags,
}

impl BadgeKind {
    pub fn color(self) -> Color {
        match self {
            BadgeKind::CurrentAffairs => Color::rgb8(220, 38, 38),
            BadgeKind::AiGenerated => Color::rgb8(147, 51, 234),
            BadgeKind::PreviousYear => Color::rgb8(30, 41, 59),
            BadgeKind::Tags => Color::rgb8(71, 85, 105),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Badge {
    pub kind: BadgeKind,
    pub text: String,
}

impl Badge {
    pub fn color(&self) -> Color {
        self.kind.color()
    }

    /// Text that fits `max_width` when set in `font`, cut and suffixed with
    /// "..." when the full label is too wide.
    pub fn fitted_text(
        &self,
        fonts: &FontRegistry,
        font: &str,
        font_size: Pt,
        max_width: Pt,
    ) -> String {
        let measure = |text: &str| fonts.measure_text_width(font, font_size, text);
        if measure(&self.text) <= max_width {
            return self.text.clone();
        }
        let mut chars: Vec<char> = self.text.chars().collect();
        while !chars.is_empty() {
            chars.pop();
            let candidate = format!("{}...", chars.iter().collect::<String>().trim_end());
            if measure(&candidate) <= max_width {
                return candidate;
            }
        }
        String::new()
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Picks the badge for `question`, or `None` when no rule applies.
pub fn select_badge(question: &Question) -> Option<Badge> {
    if question.subject.trim() == CURRENT_AFFAIRS_SUBJECT {
        if let Some(date) = present(question.date.as_deref()) {
            return Some(Badge {
                kind: BadgeKind::CurrentAffairs,
                text: format_badge_date(date),
            });
        }
    }
    if question.is_ai_generated() {
        if let Some(topic) = present(question.topic.as_deref()) {
            return Some(Badge {
                kind: BadgeKind::AiGenerated,
                text: format!("AI: {}", topic.to_uppercase()),
            });
        }
    }
    if let (Some(exam), Some(year)) = (
        present(question.exam.as_deref()),
        present(question.year.as_deref()),
    ) {
        let text = match present(question.section.as_deref()) {
            Some(section) => format!("{exam} | {section} | {year}"),
            None => format!("{exam} | {year}"),
        };
        return Some(Badge {
            kind: BadgeKind::PreviousYear,
            text: text.to_uppercase(),
        });
    }
    let tags: Vec<&str> = question
        .tags
        .iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .take(2)
        .collect();
    if tags.is_empty() {
        return None;
    }
    Some(Badge {
        kind: BadgeKind::Tags,
        text: tags.join(", ").to_uppercase(),
    })
}

/// `2024-03-05` (or an RFC 3339 timestamp) becomes `5 Mar, 2024`. Anything
/// unparseable is shown as given.
pub fn format_badge_date(raw: &str) -> String {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            raw.get(..10)
                .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
        });
    match date {
        Some(date) => date.format("%-d %b, %Y").to_string(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::HELVETICA_BOLD;

    fn question() -> Question {
        Question {
            id: "abc".to_string(),
            question_eng: "Q".to_string(),
            ..Question::default()
        }
    }

    #[test]
    fn current_affairs_date_wins_over_exam_year() {
        let mut q = question();
        q.subject = CURRENT_AFFAIRS_SUBJECT.to_string();
        q.date = Some("2024-03-05".to_string());
        q.exam = Some("SSC CGL".to_string());
        q.year = Some("2023".to_string());
        q.tags = vec!["AI-Generated".to_string()];
        q.topic = Some("polity".to_string());
        let badge = select_badge(&q).expect("badge");
        assert_eq!(badge.kind, BadgeKind::CurrentAffairs);
        assert_eq!(badge.text, "5 Mar, 2024");
    }

    #[test]
    fn ai_topic_precedes_exam_year() {
        let mut q = question();
        q.id = "q_123".to_string();
        q.topic = Some("Modern History".to_string());
        q.exam = Some("UPSC".to_string());
        q.year = Some("2022".to_string());
        let badge = select_badge(&q).expect("badge");
        assert_eq!(badge.kind, BadgeKind::AiGenerated);
        assert_eq!(badge.text, "AI: MODERN HISTORY");
    }

    #[test]
    fn ai_without_topic_falls_through() {
        let mut q = question();
        q.tags = vec!["AI-Generated".to_string(), "polity".to_string(), "x".to_string()];
        let badge = select_badge(&q).expect("badge");
        assert_eq!(badge.kind, BadgeKind::Tags);
        assert_eq!(badge.text, "AI-GENERATED, POLITY");
    }

    #[test]
    fn exam_year_with_and_without_section() {
        let mut q = question();
        q.exam = Some("ssc cgl".to_string());
        q.year = Some("2023".to_string());
        assert_eq!(select_badge(&q).expect("badge").text, "SSC CGL | 2023");
        q.section = Some("Tier 1".to_string());
        assert_eq!(select_badge(&q).expect("badge").text, "SSC CGL | TIER 1 | 2023");
    }

    #[test]
    fn no_metadata_means_no_badge() {
        let mut q = question();
        q.subject = CURRENT_AFFAIRS_SUBJECT.to_string();
        q.date = Some("  ".to_string());
        assert!(select_badge(&q).is_none());
    }

    #[test]
    fn dates_format_or_pass_through() {
        assert_eq!(format_badge_date("2025-12-31"), "31 Dec, 2025");
        assert_eq!(format_badge_date("2025-01-02T10:00:00Z"), "2 Jan, 2025");
        assert_eq!(format_badge_date("2025-01-02 10:00"), "2 Jan, 2025");
        assert_eq!(format_badge_date("last week"), "last week");
    }

    #[test]
    fn wide_badges_are_truncated() {
        let fonts = FontRegistry::new();
        let badge = Badge {
            kind: BadgeKind::Tags,
            text: "A VERY LONG TAG NAME THAT CANNOT FIT, ANOTHER LONG TAG".to_string(),
        };
        let size = Pt::from_f32(7.0);
        let width = Pt::from_f32(60.0);
        let fitted = badge.fitted_text(&fonts, HELVETICA_BOLD, size, width);
        assert!(fitted.ends_with("..."));
        assert!(fonts.measure_text_width(HELVETICA_BOLD, size, &fitted) <= width);
        assert_eq!(
            badge.fitted_text(&fonts, HELVETICA_BOLD, size, Pt::from_f32(1000.0)),
            badge.text
        );
    }
}
