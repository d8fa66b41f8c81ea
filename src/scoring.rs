//! Heuristic answer scoring: answer length and time use drive a 0-100 score,
//! scaled per difficulty and blurred with a small random jitter to emulate
//! grading variance. Aggregation averages the per-answer scores and picks a
//! canned summary band.

use rand::Rng;

use crate::models::{Answer, Question};

pub const SUMMARY_EXCELLENT: &str = "Excellent performance! The candidate demonstrated strong technical knowledge and communication skills across all difficulty levels.";
pub const SUMMARY_GOOD: &str = "Good performance with solid understanding of concepts. Some areas could benefit from more detailed explanations.";
pub const SUMMARY_AVERAGE: &str = "Average performance. The candidate shows basic understanding but needs improvement in technical depth and communication.";
pub const SUMMARY_BELOW_AVERAGE: &str = "Below average performance. Significant gaps in technical knowledge and communication skills were observed.";

/// Magnitude of the uniform jitter added to each score.
const JITTER_RANGE: f64 = 5.0;

/// Deterministic part of the score: length component plus time-use bonus,
/// scaled by the difficulty multiplier and capped at 100. Jitter is applied
/// separately so tests can pin exact values here.
pub fn base_score(question: &Question, answer: &Answer) -> f64 {
    let answer_len = answer.text.trim().len();
    let mut score: f64 = if answer_len > 200 {
        40.0
    } else if answer_len > 100 {
        30.0
    } else if answer_len > 50 {
        20.0
    } else if answer_len > 0 {
        10.0
    } else {
        0.0
    };

    let time_ratio = f64::from(answer.time_spent_secs) / f64::from(question.time_limit_secs);
    if time_ratio > 0.7 {
        score += 20.0;
    } else if time_ratio > 0.5 {
        score += 15.0;
    } else if time_ratio > 0.3 {
        score += 10.0;
    }

    (score * question.difficulty.score_multiplier()).min(100.0)
}

/// Full score for one answer: base score plus uniform jitter in
/// [-JITTER_RANGE, +JITTER_RANGE], clamped to [0, 100] and rounded.
pub fn score_answer<R: Rng + ?Sized>(question: &Question, answer: &Answer, rng: &mut R) -> u32 {
    let jitter = rng.gen_range(-JITTER_RANGE..=JITTER_RANGE);
    (base_score(question, answer) + jitter).clamp(0.0, 100.0).round() as u32
}

/// Picks the canned summary sentence for an average score.
pub fn summary_for(average_score: u32) -> &'static str {
    if average_score >= 80 {
        SUMMARY_EXCELLENT
    } else if average_score >= 65 {
        SUMMARY_GOOD
    } else if average_score >= 50 {
        SUMMARY_AVERAGE
    } else {
        SUMMARY_BELOW_AVERAGE
    }
}

/// Averages the per-answer scores (rounded) and picks the summary band.
///
/// Panics when `answers` is empty: the session records the final answer before
/// aggregating, so an empty set here is a programming error.
pub fn aggregate(answers: &[Answer]) -> (u32, String) {
    assert!(
        !answers.is_empty(),
        "aggregate called with no recorded answers"
    );

    let total: u32 = answers.iter().map(|a| a.score.unwrap_or(0)).sum();
    let average = (f64::from(total) / answers.len() as f64).round() as u32;
    (average, summary_for(average).to_string())
}

/// Scores every answer in place, then aggregates. Answers whose question is
/// missing from the sequence score 0; the session never produces such answers
/// through its own transitions.
pub fn evaluate<R: Rng + ?Sized>(
    questions: &[Question],
    answers: &mut [Answer],
    rng: &mut R,
) -> (u32, String) {
    for answer in answers.iter_mut() {
        let score = questions
            .iter()
            .find(|q| q.id == answer.question_id)
            .map(|question| score_answer(question, answer, rng))
            .unwrap_or(0);
        answer.score = Some(score);
    }

    aggregate(answers)
}
