//! Fixed-shape question bank: every session gets 2 easy, 2 medium and 2 hard
//! questions in that order, drawn uniformly (with replacement) from the tier
//! template pools.

use rand::Rng;

use crate::models::{Difficulty, Question};

pub const QUESTIONS_PER_TIER: usize = 2;

const EASY_TEMPLATES: &[&str] = &[
    "Tell me about yourself and your professional background.",
    "Why are you interested in this position?",
    "What are your greatest strengths?",
    "Describe your ideal work environment.",
    "What motivates you to do your best work?",
];

const MEDIUM_TEMPLATES: &[&str] = &[
    "Describe a challenging project you've worked on and how you overcame obstacles.",
    "How do you handle tight deadlines and competing priorities?",
    "Tell me about a time when you had to work with a difficult team member.",
    "What's your approach to learning new technologies or skills?",
    "How do you handle constructive criticism and feedback?",
];

const HARD_TEMPLATES: &[&str] = &[
    "Design a system that can handle millions of concurrent users. Walk me through your architecture decisions.",
    "You notice a critical bug in production that affects 20% of users. How do you handle this situation?",
    "How would you implement a recommendation system for an e-commerce platform?",
    "Explain how you would optimize a slow-performing database query.",
    "Design a distributed cache system that can scale globally.",
];

fn templates_for(difficulty: Difficulty) -> &'static [&'static str] {
    match difficulty {
        Difficulty::Easy => EASY_TEMPLATES,
        Difficulty::Medium => MEDIUM_TEMPLATES,
        Difficulty::Hard => HARD_TEMPLATES,
    }
}

/// Generates the six-question sequence for a session. Difficulty is
/// non-decreasing across the sequence; callers consume it in order.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Vec<Question> {
    let tiers = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
    let mut questions = Vec::with_capacity(tiers.len() * QUESTIONS_PER_TIER);

    for difficulty in tiers {
        let pool = templates_for(difficulty);
        for slot in 1..=QUESTIONS_PER_TIER {
            let text = pool[rng.gen_range(0..pool.len())];
            questions.push(Question {
                id: format!("{}_{}", difficulty.as_str(), slot),
                text: text.to_string(),
                difficulty,
                time_limit_secs: difficulty.time_limit_secs(),
            });
        }
    }

    questions
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn generates_six_questions_in_tier_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let questions = generate(&mut rng);

        assert_eq!(questions.len(), 6);
        let difficulties: Vec<_> = questions.iter().map(|q| q.difficulty).collect();
        assert_eq!(
            difficulties,
            vec![
                Difficulty::Easy,
                Difficulty::Easy,
                Difficulty::Medium,
                Difficulty::Medium,
                Difficulty::Hard,
                Difficulty::Hard,
            ]
        );
    }

    #[test]
    fn ids_are_unique_and_follow_bank_order() {
        let mut rng = StdRng::seed_from_u64(42);
        let questions = generate(&mut rng);

        let ids: Vec<_> = questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["easy_1", "easy_2", "medium_1", "medium_2", "hard_1", "hard_2"]
        );
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn time_limits_match_difficulty_table() {
        let mut rng = StdRng::seed_from_u64(3);
        let questions = generate(&mut rng);

        let limits: Vec<_> = questions.iter().map(|q| q.time_limit_secs).collect();
        assert_eq!(limits, vec![20, 20, 60, 60, 120, 120]);
    }

    #[test]
    fn question_texts_come_from_the_tier_pool() {
        let mut rng = StdRng::seed_from_u64(11);
        for question in generate(&mut rng) {
            let pool = templates_for(question.difficulty);
            assert!(
                pool.contains(&question.text.as_str()),
                "question '{}' not found in the {} pool",
                question.text,
                question.difficulty.as_str()
            );
        }
    }

    #[test]
    fn same_seed_produces_same_sequence() {
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        assert_eq!(generate(&mut a), generate(&mut b));
    }
}
