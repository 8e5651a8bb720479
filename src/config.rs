//! Layout configuration for a render pass.
//!
//! A `LayoutConfig` is an immutable snapshot: the interactive preview owns a
//! mutable draft and hands a clone to each render. Keys serialize in camelCase
//! so that settings saved by the preview UI load unchanged, and every field has
//! a default so a partial object overlays the defaults.

use crate::error::QbankError;
use crate::types::{Color, Pt};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Hi,
    En,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ColumnCount {
    One,
    Two,
}

impl ColumnCount {
    pub fn get(self) -> usize {
        match self {
            ColumnCount::One => 1,
            ColumnCount::Two => 2,
        }
    }
}

impl TryFrom<u8> for ColumnCount {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ColumnCount::One),
            2 => Ok(ColumnCount::Two),
            other => Err(format!("columns must be 1 or 2, got {other}")),
        }
    }
}

impl From<ColumnCount> for u8 {
    fn from(value: ColumnCount) -> Self {
        value.get() as u8
    }
}

/// How the flow controller sizes a question before deciding whether it fits
/// in the current column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightEstimate {
    /// Lay the block out first and use its exact height.
    Measured,
    /// Fixed per-section allowances; matches the legacy web export page for
    /// page, including its occasional overflow near the bottom margin.
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub font_size: f32,
    pub line_spacing: f32,
    pub spacing: f32,
    pub option_spacing: f32,
    pub question_gap: f32,
    pub question_option_gap: f32,
    pub answer_bold: bool,
    pub show_watermark: bool,
    pub question_opacity: f32,
    pub option_opacity: f32,
    pub question_boldness: u16,
    pub option_boldness: u16,
    pub solution_boldness: u16,

    pub show_answer_widget: bool,
    pub hide_question: bool,
    pub hide_option: bool,
    pub hide_box_explanation: bool,
    pub show_solution: bool,
    pub language: Language,
    pub previous_year_tag: bool,

    pub header_bg_color: String,
    pub footer_bg_color: String,
    pub question_color: String,
    pub option_color: String,
    pub question_number_color: String,
    pub columns: ColumnCount,

    pub custom_title: String,
    pub custom_tagline: String,
    pub custom_footer: String,
    pub main_logo: String,
    pub emblem_text: String,
    pub header_contact: String,
    pub header_teacher: String,
    pub header_exam: String,
    pub show_page_border: bool,
    #[serde(rename = "show5thOption")]
    pub show_5th_option: bool,
    pub height_estimate: HeightEstimate,
    pub document_title: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            font_size: 10.0,
            line_spacing: 4.0,
            spacing: 6.0,
            option_spacing: 4.0,
            question_gap: 24.0,
            question_option_gap: 8.0,
            answer_bold: false,
            show_watermark: true,
            question_opacity: 1.0,
            option_opacity: 1.0,
            question_boldness: 700,
            option_boldness: 400,
            solution_boldness: 700,
            show_answer_widget: false,
            hide_question: false,
            hide_option: false,
            hide_box_explanation: false,
            show_solution: false,
            language: Language::Both,
            previous_year_tag: true,
            header_bg_color: "#FFFFFF".to_string(),
            footer_bg_color: "#1E293B".to_string(),
            question_color: "#EF4444".to_string(),
            option_color: "#2563EB".to_string(),
            question_number_color: "#000000".to_string(),
            columns: ColumnCount::Two,
            custom_title: "Practice Set".to_string(),
            custom_tagline: "Exams Success Series".to_string(),
            custom_footer: "Exclusive Study Material".to_string(),
            main_logo: String::new(),
            emblem_text: "B".to_string(),
            header_contact: "Contact: 91+ XXXXX XXXXX".to_string(),
            header_teacher: "By: Teacher Name".to_string(),
            header_exam: "Target Exam 2026".to_string(),
            show_page_border: true,
            show_5th_option: true,
            height_estimate: HeightEstimate::Measured,
            document_title: String::new(),
        }
    }
}

impl LayoutConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, QbankError> {
        let config: LayoutConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, QbankError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json(&self) -> Result<String, QbankError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Overlays the keys present in `partial` onto a copy of `self`.
    pub fn merged_with_json(&self, partial: &str) -> Result<Self, QbankError> {
        let mut base = serde_json::to_value(self)?;
        let patch: serde_json::Value = serde_json::from_str(partial)?;
        let serde_json::Value::Object(patch) = patch else {
            return Err(QbankError::InvalidConfiguration(
                "config patch must be a JSON object".to_string(),
            ));
        };
        if let serde_json::Value::Object(fields) = &mut base {
            for (key, value) in patch {
                fields.insert(key, value);
            }
        }
        let merged: LayoutConfig = serde_json::from_value(base)?;
        merged.validate()?;
        Ok(merged)
    }

    pub fn validate(&self) -> Result<(), QbankError> {
        let invalid = |message: String| Err(QbankError::InvalidConfiguration(message));

        if !self.font_size.is_finite() || self.font_size <= 1.0 {
            return invalid(format!("fontSize must be greater than 1pt, got {}", self.font_size));
        }
        for (key, value) in [
            ("lineSpacing", self.line_spacing),
            ("spacing", self.spacing),
            ("optionSpacing", self.option_spacing),
            ("questionGap", self.question_gap),
            ("questionOptionGap", self.question_option_gap),
        ] {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{key} must be a non-negative length, got {value}"));
            }
        }
        for (key, value) in [
            ("questionOpacity", self.question_opacity),
            ("optionOpacity", self.option_opacity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{key} must be within 0..=1, got {value}"));
            }
        }
        for (key, value) in [
            ("questionBoldness", self.question_boldness),
            ("optionBoldness", self.option_boldness),
            ("solutionBoldness", self.solution_boldness),
        ] {
            if !(400..=900).contains(&value) {
                return invalid(format!("{key} must be within 400..=900, got {value}"));
            }
        }
        for (key, value) in [
            ("headerBgColor", &self.header_bg_color),
            ("footerBgColor", &self.footer_bg_color),
            ("questionColor", &self.question_color),
            ("optionColor", &self.option_color),
            ("questionNumberColor", &self.question_number_color),
        ] {
            if Color::from_hex(value).is_none() {
                return invalid(format!("{key} is not a hex colour: {value:?}"));
            }
        }
        Ok(())
    }

    pub fn shows_english(&self) -> bool {
        matches!(self.language, Language::En | Language::Both)
    }

    pub fn shows_hindi(&self) -> bool {
        matches!(self.language, Language::Hi | Language::Both)
    }

    pub fn column_count(&self) -> usize {
        self.columns.get()
    }

    pub fn font_size_pt(&self) -> Pt {
        Pt::from_f32(self.font_size)
    }

    /// Line advance for a run of text set at `font_size`. Deliberately not
    /// derived from font metrics.
    pub fn line_height(&self, font_size: Pt) -> Pt {
        font_size + Pt::from_f32(self.line_spacing)
    }

    pub fn header_bg(&self) -> Color {
        parse_or(&self.header_bg_color, Color::WHITE)
    }

    pub fn footer_bg(&self) -> Color {
        parse_or(&self.footer_bg_color, Color::rgb8(30, 41, 59))
    }

    pub fn question_rgb(&self) -> Color {
        parse_or(&self.question_color, Color::BLACK)
    }

    pub fn option_rgb(&self) -> Color {
        parse_or(&self.option_color, Color::BLACK)
    }

    pub fn question_number_rgb(&self) -> Color {
        parse_or(&self.question_number_color, Color::BLACK)
    }
}

fn parse_or(raw: &str, fallback: Color) -> Color {
    Color::from_hex(raw).unwrap_or(fallback)
}

/// Weights at or above this use the bold face.
pub(crate) const BOLD_WEIGHT: u16 = 600;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        LayoutConfig::default().validate().expect("defaults are valid");
    }

    #[test]
    fn json_uses_camel_case_keys() {
        let json = LayoutConfig::default().to_json().expect("serialize");
        assert!(json.contains("\"fontSize\": 10.0"));
        assert!(json.contains("\"show5thOption\": true"));
        assert!(json.contains("\"language\": \"both\""));
        assert!(json.contains("\"columns\": 2"));
        assert!(json.contains("\"heightEstimate\": \"measured\""));
    }

    #[test]
    fn partial_json_overlays_defaults() {
        let config = LayoutConfig::from_json_str(r#"{"columns": 1, "language": "en"}"#)
            .expect("partial config");
        assert_eq!(config.columns, ColumnCount::One);
        assert_eq!(config.language, Language::En);
        assert_eq!(config.font_size, 10.0);
        assert_eq!(config.custom_title, "Practice Set");
    }

    #[test]
    fn merge_keeps_unrelated_fields() {
        let mut base = LayoutConfig::default();
        base.custom_title = "Weekly Test".to_string();
        let merged = base
            .merged_with_json(r#"{"showSolution": true}"#)
            .expect("merge");
        assert!(merged.show_solution);
        assert_eq!(merged.custom_title, "Weekly Test");
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(LayoutConfig::from_json_str(r#"{"columns": 3}"#).is_err());
        assert!(LayoutConfig::from_json_str(r#"{"questionOpacity": 1.5}"#).is_err());
        assert!(LayoutConfig::from_json_str(r#"{"optionBoldness": 300}"#).is_err());
        assert!(LayoutConfig::from_json_str(r#"{"questionColor": "red"}"#).is_err());
        assert!(LayoutConfig::from_json_str(r#"{"fontSize": 0}"#).is_err());
        let base = LayoutConfig::default();
        assert!(base.merged_with_json("[1, 2]").is_err());
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let mut config = LayoutConfig::default();
        config.language = Language::Hi;
        config.height_estimate = HeightEstimate::Heuristic;
        config.main_logo = "data:image/png;base64,AAAA".to_string();
        let json = config.to_json().expect("serialize");
        let back = LayoutConfig::from_json_str(&json).expect("deserialize");
        assert_eq!(back, config);
    }
}
