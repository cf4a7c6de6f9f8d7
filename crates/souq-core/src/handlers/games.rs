use chrono::Utc;

use souq_shared::constants::LEADERBOARD_SIZE;
use souq_shared::UserId;

use crate::error::{BotError, Result};
use crate::oracle::{dart_points, dice_points, slot_points, TRIVIA_QUESTIONS};
use crate::payload::{Menu, OutboundPayload, Reply};
use crate::router::{respond, Bot};

impl Bot {
    pub(crate) fn games_menu(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        Ok(vec![OutboundPayload::new(user_id, Reply::GamesMenu).with_menu(Menu::Games)])
    }

    pub(crate) async fn dice(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        let value = self.oracle.dice();
        let points = dice_points(value);
        self.award(user_id, points).await?;
        Ok(games_reply(user_id, Reply::Dice { value, points }))
    }

    pub(crate) async fn dart(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        let value = self.oracle.dart();
        let points = dart_points(value);
        self.award(user_id, points).await?;
        Ok(games_reply(user_id, Reply::Dart { value, points }))
    }

    pub(crate) async fn slot(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        let value = self.oracle.slot();
        let points = slot_points(value);
        self.award(user_id, points).await?;
        Ok(games_reply(user_id, Reply::Slot { value, points }))
    }

    /// Show a question. Answers come back through [`answer_trivia`](Bot::answer_trivia).
    pub(crate) fn trivia(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        let index = self.oracle.trivia(TRIVIA_QUESTIONS.len());
        let question = TRIVIA_QUESTIONS
            .get(index)
            .ok_or_else(|| BotError::Validation(format!("no trivia question {index}")))?;

        Ok(games_reply(
            user_id,
            Reply::Trivia {
                question: index,
                text: question.text.to_string(),
                options: question.options.iter().map(|o| o.to_string()).collect(),
                points: question.points,
            },
        ))
    }

    /// Score an answer to trivia question `question` (0-based option
    /// `choice`), for transports with inline answer buttons.
    pub async fn answer_trivia(&self, user_id: UserId, question: usize, choice: usize) -> Vec<OutboundPayload> {
        respond(user_id, self.try_answer_trivia(user_id, question, choice).await)
    }

    async fn try_answer_trivia(&self, user_id: UserId, question: usize, choice: usize) -> Result<Vec<OutboundPayload>> {
        if self.active_account(user_id).await?.is_none() {
            return Ok(vec![OutboundPayload::new(user_id, Reply::Banned)]);
        }
        let q = TRIVIA_QUESTIONS
            .get(question)
            .ok_or_else(|| BotError::Validation(format!("no trivia question {question}")))?;

        let correct = choice == q.correct;
        if correct {
            self.award(user_id, q.points).await?;
        }
        Ok(games_reply(
            user_id,
            Reply::TriviaResult {
                correct,
                points: q.points,
            },
        ))
    }

    pub(crate) async fn leaderboard(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        let entries = self
            .store
            .read(|uow| uow.leaderboard(LEADERBOARD_SIZE))
            .await?;
        Ok(games_reply(user_id, Reply::Leaderboard { entries }))
    }

    /// Once per UTC day.
    pub(crate) async fn daily_reward(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        let reward = self.oracle.daily_reward();
        let claimed = self
            .store
            .write(move |uow| uow.claim_daily(user_id, reward, Utc::now()))
            .await?;

        let reply = match claimed {
            Some(points) => Reply::DailyReward { points },
            None => Reply::DailyAlreadyClaimed,
        };
        Ok(games_reply(user_id, reply))
    }

    async fn award(&self, user_id: UserId, points: i64) -> Result<i64> {
        let total = self
            .store
            .write(move |uow| uow.add_points(user_id, points))
            .await?;
        Ok(total)
    }
}

fn games_reply(user_id: UserId, reply: Reply) -> Vec<OutboundPayload> {
    vec![OutboundPayload::new(user_id, reply).with_menu(Menu::Games)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::labels;
    use crate::router::tests::{bot, send};

    async fn points(bot: &Bot, id: i64) -> i64 {
        bot.store
            .read(move |uow| uow.get_account(UserId(id)))
            .await
            .unwrap()
            .points
    }

    #[tokio::test]
    async fn games_award_points() {
        // Fixed oracle: dice 4, dart 6, slot 22.
        let (bot, _sink, _dir) = bot(&[]).await;
        send(&bot, 1, "/start").await;
        let start = points(&bot, 1).await;

        send(&bot, 1, labels::DICE).await;
        send(&bot, 1, labels::DART).await;
        let payloads = send(&bot, 1, labels::SLOT).await;
        assert_eq!(payloads[0].reply, Reply::Slot { value: 22, points: 100 });

        assert_eq!(points(&bot, 1).await, start + 20 + 100 + 100);
    }

    #[tokio::test]
    async fn daily_reward_once_per_day() {
        let (bot, _sink, _dir) = bot(&[]).await;
        send(&bot, 1, "/start").await;

        let first = send(&bot, 1, labels::DAILY_REWARD).await;
        assert_eq!(first[0].reply, Reply::DailyReward { points: 42 });
        let second = send(&bot, 1, labels::DAILY_REWARD).await;
        assert_eq!(second[0].reply, Reply::DailyAlreadyClaimed);
    }

    #[tokio::test]
    async fn trivia_answer_scores_once_correct() {
        let (bot, _sink, _dir) = bot(&[]).await;
        send(&bot, 1, "/start").await;
        let start = points(&bot, 1).await;

        let shown = send(&bot, 1, labels::TRIVIA).await;
        let Reply::Trivia { question, points: prize, .. } = shown[0].reply.clone() else {
            panic!("expected a trivia question");
        };

        let wrong = bot.answer_trivia(UserId(1), question, 0).await;
        assert_eq!(wrong[0].reply, Reply::TriviaResult { correct: false, points: prize });
        let right = bot.answer_trivia(UserId(1), question, TRIVIA_QUESTIONS[question].correct).await;
        assert_eq!(right[0].reply, Reply::TriviaResult { correct: true, points: prize });

        assert_eq!(points(&bot, 1).await, start + prize);
    }

    #[tokio::test]
    async fn leaderboard_orders_by_points() {
        let (bot, _sink, _dir) = bot(&[]).await;
        send(&bot, 1, "/start").await;
        send(&bot, 2, "/start").await;
        send(&bot, 2, labels::DICE).await;

        let payloads = send(&bot, 1, labels::LEADERBOARD).await;
        match &payloads[0].reply {
            Reply::Leaderboard { entries } => {
                assert_eq!(entries[0].user_id, UserId(2));
                assert_eq!(entries.len(), 2);
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }
}
