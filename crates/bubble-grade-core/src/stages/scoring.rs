//! Comparison of read answers with the answer key.

use tracing::debug;

use crate::domain::{
    AnswerKey, Choice, GradeError, GradeResult, MarkStatus, QuestionAnswer, QuestionOutcome,
};

/// Whole percentage `round(correct / total * 100)`; zero when `total` is zero.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#[must_use]
pub fn score_percent(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (correct as f64 / total as f64 * 100.0).round() as u32
}

fn status_of(answer: &QuestionAnswer, expected: Choice) -> MarkStatus {
    match answer.selected {
        Some(choice) if choice == expected => MarkStatus::Correct,
        Some(_) => MarkStatus::Incorrect,
        None if answer.multiple_marks => MarkStatus::MultipleMarks,
        None => MarkStatus::Unanswered,
    }
}

/// Scores answers question by question against `key`.
///
/// # Errors
///
/// Returns [`GradeError::KeyMismatch`] when the lengths differ.
pub fn score_answers(
    key: &AnswerKey,
    answers: &[QuestionAnswer],
    student_id: Option<String>,
) -> Result<GradeResult, GradeError> {
    if key.len() != answers.len() {
        return Err(GradeError::KeyMismatch {
            key: key.len(),
            detected: answers.len(),
        });
    }

    let questions: Vec<QuestionOutcome> = key
        .choices()
        .iter()
        .zip(answers)
        .map(|(&expected, answer)| QuestionOutcome {
            question: answer.question,
            expected,
            detected: answer.selected,
            status: status_of(answer, expected),
            confidence: answer.confidence,
        })
        .collect();

    let count = |status: MarkStatus| questions.iter().filter(|q| q.status == status).count();
    let correct = count(MarkStatus::Correct);
    debug!("Scored {correct}/{} against key", key.len());

    Ok(GradeResult {
        student_id,
        score: score_percent(correct, key.len()),
        total: key.len(),
        correct,
        incorrect: count(MarkStatus::Incorrect),
        unanswered: count(MarkStatus::Unanswered),
        multiple_marked: count(MarkStatus::MultipleMarks),
        questions,
    })
}
