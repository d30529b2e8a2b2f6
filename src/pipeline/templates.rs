//! Prompt skeletons for the flows.

use crate::level::Level;

pub fn quiz_system() -> &'static str {
    "You write multiple-choice English quizzes for Arabic-speaking learners. \
     Reply with ONLY a JSON object, no commentary."
}

pub fn quiz_user(topic: &str, level: Level, lesson_text: &str, count: usize, options: usize) -> String {
    format!(
        "Write {count} questions about \"{topic}\" for {level}.\n\
         Base every question on this lesson:\n{lesson_text}\n\n\
         Each question has exactly {options} options and one answer copied verbatim from its options.\n\
         Format: {{\"questions\":[{{\"question\":\"...\",\"options\":[\"...\"],\"answer\":\"...\"}}]}}",
        count = count,
        topic = topic,
        level = level.as_prompt(),
        lesson_text = lesson_text,
        options = options,
    )
}

pub fn exam_system() -> &'static str {
    "You write final exams for an English course taught to Arabic speakers. \
     Reply with ONLY a JSON object, no commentary."
}

pub fn exam_user(lesson_titles: &[String], count: usize, options: usize) -> String {
    let lessons = lesson_titles
        .iter()
        .map(|t| format!("- {}", t))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Write {count} exam questions covering these lessons:\n{lessons}\n\n\
         Each question has exactly {options} options; correct_answer is copied verbatim from its options.\n\
         Format: {{\"questions\":[{{\"question\":\"...\",\"options\":[\"...\"],\"correct_answer\":\"...\"}}]}}",
        count = count,
        lessons = lessons,
        options = options,
    )
}

pub fn lesson_system() -> &'static str {
    "You are a patient English teacher. Explain in simple Arabic, \
     keeping every English example in English."
}

pub fn lesson_user(topic: &str, level: Level, lesson_text: &str) -> String {
    format!(
        "Explain the lesson \"{}\" to {}.\n\nLesson material:\n{}",
        topic,
        level.as_prompt(),
        lesson_text
    )
}

pub fn story_system() -> &'static str {
    "You write short graded-reader stories in English for Arabic speakers. \
     Reply with ONLY a JSON object, no commentary."
}

pub fn story_user(topic: &str, level: Level) -> String {
    format!(
        "Write a short story about \"{}\" for {}.\n\
         Format: {{\"title\":\"...\",\"content\":\"...\",\"vocabulary\":[{{\"word\":\"...\",\"meaning\":\"Arabic meaning\"}}]}}",
        topic,
        level.as_prompt()
    )
}

pub fn conversation_system(persona_name: &str, persona_style: &str, level: Level) -> String {
    format!(
        "You are {}, an English conversation partner. Style: {}. \
         The learner is {}. Gently correct mistakes and keep replies short.",
        persona_name,
        persona_style,
        level.as_prompt()
    )
}
