//! Game randomness and scoring.

use rand::Rng;

use souq_shared::constants::{DAILY_REWARD_MAX, DAILY_REWARD_MIN};

/// Source of game outcomes. Swapped for a fixed sequence in tests.
pub trait GameOracle: Send + Sync {
    /// Dice face, 1..=6.
    fn dice(&self) -> u8;
    /// Dart score, 1..=6 where 6 is a bullseye.
    fn dart(&self) -> u8;
    /// Slot machine value, 1..=64.
    fn slot(&self) -> u8;
    /// Index into a question list of length `count`.
    fn trivia(&self, count: usize) -> usize;
    /// Daily reward in points.
    fn daily_reward(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomOracle;

impl GameOracle for RandomOracle {
    fn dice(&self) -> u8 {
        rand::thread_rng().gen_range(1..=6)
    }

    fn dart(&self) -> u8 {
        rand::thread_rng().gen_range(1..=6)
    }

    fn slot(&self) -> u8 {
        rand::thread_rng().gen_range(1..=64)
    }

    fn trivia(&self, count: usize) -> usize {
        rand::thread_rng().gen_range(0..count.max(1))
    }

    fn daily_reward(&self) -> i64 {
        rand::thread_rng().gen_range(DAILY_REWARD_MIN..=DAILY_REWARD_MAX)
    }
}

pub fn dice_points(value: u8) -> i64 {
    i64::from(value) * 5
}

pub fn dart_points(value: u8) -> i64 {
    match value {
        6 => 100,
        v => i64::from(v) * 10,
    }
}

pub fn slot_points(value: u8) -> i64 {
    match value {
        64 => 500,
        1 | 22 | 43 => 100,
        _ => 10,
    }
}

pub struct TriviaQuestion {
    pub text: &'static str,
    pub options: &'static [&'static str],
    pub correct: usize,
    pub points: i64,
}

pub static TRIVIA_QUESTIONS: &[TriviaQuestion] = &[
    TriviaQuestion {
        text: "What is the capital of Saudi Arabia?",
        options: &["Jeddah", "Riyadh", "Mecca", "Dammam"],
        correct: 1,
        points: 50,
    },
    TriviaQuestion {
        text: "How many days are there in a leap year?",
        options: &["365", "366", "364", "367"],
        correct: 1,
        points: 30,
    },
];
