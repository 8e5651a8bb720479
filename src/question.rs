use crate::text::strip_markup;
use serde::{Deserialize, Serialize};

/// One multiple-choice record as stored by the question bank. Text fields may
/// carry inline HTML from the editor; every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Question {
    pub id: String,
    pub question_eng: String,
    pub question_hin: String,
    pub option1_eng: String,
    pub option1_hin: String,
    pub option2_eng: String,
    pub option2_hin: String,
    pub option3_eng: String,
    pub option3_hin: String,
    pub option4_eng: String,
    pub option4_hin: String,
    pub option5_eng: Option<String>,
    pub option5_hin: Option<String>,
    pub answer: String,
    pub solution_eng: String,
    pub solution_hin: String,
    pub subject: String,
    pub exam: Option<String>,
    pub section: Option<String>,
    pub year: Option<String>,
    pub date: Option<String>,
    pub tags: Vec<String>,
    pub topic: Option<String>,
}

/// Named, ordered collection of questions plus delivery settings. Only the
/// fields the exporter reads are modelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuestionSet {
    pub set_id: String,
    pub name: String,
    pub description: String,
    pub question_ids: Vec<String>,
}

impl QuestionSet {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

pub const OPTION_COUNT: usize = 5;
const LABELS: [&str; OPTION_COUNT] = ["(a)", "(b)", "(c)", "(d)", "(e)"];
const LETTERS: [char; OPTION_COUNT] = ['A', 'B', 'C', 'D', 'E'];

const NONE_OF_THE_ABOVE_ENG: &str = "None of the above";
const NONE_OF_THE_ABOVE_HIN: &str = "उपर्युक्त में से कोई नहीं";

/// The recorded correct answer, normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerCode {
    /// Zero-based option index.
    Option(usize),
    /// A non-option code, kept upper-cased for display.
    Other(String),
    Missing,
}

impl AnswerCode {
    pub fn parse(raw: &str) -> Self {
        let code = raw.trim().to_ascii_lowercase();
        if code.is_empty() {
            return AnswerCode::Missing;
        }
        let index = match code.as_str() {
            "a" | "1" | "option1" => Some(0),
            "b" | "2" | "option2" => Some(1),
            "c" | "3" | "option3" => Some(2),
            "d" | "4" | "option4" => Some(3),
            "e" | "5" | "option5" => Some(4),
            _ => None,
        };
        match index {
            Some(index) => AnswerCode::Option(index),
            None => AnswerCode::Other(raw.trim().to_uppercase()),
        }
    }

    pub fn option_index(&self) -> Option<usize> {
        match self {
            AnswerCode::Option(index) => Some(*index),
            _ => None,
        }
    }

    /// Display form for the answer key: `B` for option two, the raw code
    /// otherwise, `-` when absent.
    pub fn display(&self) -> String {
        match self {
            AnswerCode::Option(index) => LETTERS[*index].to_string(),
            AnswerCode::Other(raw) => raw.clone(),
            AnswerCode::Missing => "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionSlot {
    pub label: &'static str,
    pub index: usize,
    pub english: String,
    pub hindi: String,
    pub included: bool,
    /// Built-in "none of the above" text. Drawn as a single line in one
    /// language rather than as a bilingual pair.
    pub filler: bool,
}

impl OptionSlot {
    /// Visible character count after markup removal: both languages for
    /// record options, the longer single line for the filler.
    pub fn combined_chars(&self) -> usize {
        let english = strip_markup(&self.english).chars().count();
        let hindi = strip_markup(&self.hindi).chars().count();
        if self.filler {
            english.max(hindi)
        } else {
            english + hindi
        }
    }

    /// Text of the filler line for the active language.
    pub fn filler_text(&self, hindi: bool) -> &str {
        if hindi { &self.hindi } else { &self.english }
    }
}

impl Question {
    pub fn answer_code(&self) -> AnswerCode {
        AnswerCode::parse(&self.answer)
    }

    /// Builds the five option slots. The fifth ("none of the above") slot is
    /// included only when `show_fifth` is set or it is the recorded answer, so
    /// the caller must decide the option layout from included slots only.
    pub fn option_slots(&self, show_fifth: bool) -> [OptionSlot; OPTION_COUNT] {
        let fifth_is_answer = self.answer_code().option_index() == Some(4);
        let non_blank = |text: &Option<String>| {
            text.as_deref()
                .filter(|text| !text.trim().is_empty())
                .map(str::to_string)
        };
        let record_eng = non_blank(&self.option5_eng);
        let record_hin = non_blank(&self.option5_hin);
        let filler = record_eng.is_none() && record_hin.is_none();
        let (fifth_eng, fifth_hin) = if filler {
            (
                NONE_OF_THE_ABOVE_ENG.to_string(),
                NONE_OF_THE_ABOVE_HIN.to_string(),
            )
        } else {
            (
                record_eng.unwrap_or_default(),
                record_hin.unwrap_or_default(),
            )
        };
        let texts: [(&str, &str); OPTION_COUNT] = [
            (self.option1_eng.as_str(), self.option1_hin.as_str()),
            (self.option2_eng.as_str(), self.option2_hin.as_str()),
            (self.option3_eng.as_str(), self.option3_hin.as_str()),
            (self.option4_eng.as_str(), self.option4_hin.as_str()),
            (fifth_eng.as_str(), fifth_hin.as_str()),
        ];
        std::array::from_fn(|index| {
            let (english, hindi) = texts[index];
            OptionSlot {
                label: LABELS[index],
                index,
                english: english.to_string(),
                hindi: hindi.to_string(),
                included: index < 4 || show_fifth || fifth_is_answer,
                filler: filler && index == 4,
            }
        })
    }

    pub fn is_ai_generated(&self) -> bool {
        self.tags.iter().any(|tag| tag == "AI-Generated") || self.id.contains("q_")
    }
}
