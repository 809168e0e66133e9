//! Fixed instruction templates. Each one embeds a context block built from
//! retrieved chunks.

pub const QUESTIONS_SEED: &str = "generate practice questions";
pub const SUMMARY_SEED: &str = "summarize document";
pub const KEY_POINTS_SEED: &str = "extract key points";

/// Retrieved chunks, separated by blank lines.
pub fn format_context(chunks: &[String]) -> String {
    chunks.join("\n\n")
}

pub fn answer_prompt(context: &str, question: &str) -> String {
    format!(
        "You are Astra, a study assistant. Answer the student's question using ONLY the context taken from their study material.

Context from study material:
{context}

Student's question: {question}

Instructions:
- Base the answer only on the context above
- If the context does not contain the answer, reply \"I couldn't find this information in your study material\"
- Be clear and concise
- Use examples from the context where they help

Answer:"
    )
}

pub fn practice_questions_prompt(context: &str, count: usize) -> String {
    format!(
        "You are Astra. Using the study material below, write {count} practice questions that help a student prepare for an exam.

Study material:
{context}

Instructions:
- Mix question types (multiple choice, short answer, conceptual)
- Focus on the key concepts and facts
- Keep questions challenging but fair, across a range of difficulty
- Number every question

Write {count} practice questions:"
    )
}

pub fn summary_prompt(context: &str) -> String {
    format!(
        "You are Astra. Summarize the study material below clearly and concisely, focusing on its main concepts.

Study material:
{context}

Structure the summary as:
1. Main topics covered
2. Key concepts and definitions
3. Important points to remember

Summary:"
    )
}

pub fn key_points_prompt(context: &str) -> String {
    format!(
        "You are Astra. Pull out the most important key points from the study material below and present them as a bullet list.

Study material:
{context}

List 7-10 key points a student should focus on for exam preparation:"
    )
}
