//! Deterministic placeholders returned when a flow cannot produce real output.

use crate::flows::exam::ExamQuestion;
use crate::flows::quiz::QuizQuestion;

pub const ARABIC_APOLOGY: &str =
    "عذرًا، حدث خطأ أثناء معالجة طلبك. يرجى المحاولة مرة أخرى لاحقًا.";

pub const EXAM_REVIEW_QUESTION: &str = "Review: Choose the correct option.";

const PLACEHOLDER_OPTIONS: [&str; 4] = ["A", "B", "C", "D"];
const DEFAULT_IMAGE_TEXT: &str = "Image";

fn placeholder_options() -> Vec<String> {
    PLACEHOLDER_OPTIONS.iter().map(|o| o.to_string()).collect()
}

/// `base` is a templated placeholder-image service URL ending where the text goes.
pub fn placeholder_image_url(base: &str, text: &str) -> String {
    let text = if text.trim().is_empty() {
        DEFAULT_IMAGE_TEXT
    } else {
        text
    };
    format!("{}{}", base, urlencoding::encode(text))
}

pub fn dummy_quiz_question() -> QuizQuestion {
    QuizQuestion {
        question: ARABIC_APOLOGY.to_string(),
        options: placeholder_options(),
        answer: "A".to_string(),
    }
}

pub fn dummy_exam_question() -> ExamQuestion {
    ExamQuestion {
        question: EXAM_REVIEW_QUESTION.to_string(),
        options: placeholder_options(),
        correct_answer: "A".to_string(),
    }
}
