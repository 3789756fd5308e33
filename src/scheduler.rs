//! Deferred work: bot turns, provider requests and scoring.
//!
//! The service enqueues [`Task`]s only after its transaction commits. A
//! [`Worker`] drains the queue, calling providers and executors outside any
//! transaction and feeding their results back through the service.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::bot::{AskBot, AskBotArgs, BotRoster, construct_prompt, parse_answer};
use crate::executor::SolutionExecutor;
use crate::service::GameService;
use crate::store::GameStore;
use crate::types::{GameId, PlayerId};

/// One unit of deferred work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Task {
    /// A bot is due to move.
    #[serde(rename_all = "camelCase")]
    BotTurn {
        /// Game the bot is playing.
        game_id: GameId,
        /// The bot player.
        player_id: PlayerId,
        /// Play something even without a usable answer.
        must_answer: bool,
    },
    /// A bot needs a fresh answer from its provider.
    AskBot(AskBotArgs),
    /// A game finished inputting and awaits its score.
    #[serde(rename_all = "camelCase")]
    Score {
        /// Game to score.
        game_id: GameId,
    },
}

/// Handle for enqueueing tasks.
#[derive(Debug, Clone)]
pub struct Scheduler {
    tx: mpsc::UnboundedSender<Task>,
}

impl Scheduler {
    /// Creates a scheduler and the receiving end for a [`Worker`].
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Task>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueues a task to run as soon as possible.
    #[instrument(skip(self))]
    pub fn schedule(&self, task: Task) {
        if self.tx.send(task).is_err() {
            warn!("Worker stopped; task dropped");
        }
    }
}

/// Executes single tasks.
#[derive(Clone)]
pub struct TaskRunner<S: GameStore> {
    service: GameService<S>,
    roster: BotRoster,
    executor: Option<Arc<dyn SolutionExecutor>>,
}

impl<S: GameStore> TaskRunner<S> {
    /// Creates a runner. Without an executor, finished games wait for
    /// results recorded from outside.
    pub fn new(
        service: GameService<S>,
        roster: BotRoster,
        executor: Option<Arc<dyn SolutionExecutor>>,
    ) -> Self {
        Self {
            service,
            roster,
            executor,
        }
    }

    /// Runs one task to completion. Failures are logged, never returned.
    #[instrument(skip(self))]
    pub async fn run(&self, task: Task) {
        match task {
            Task::BotTurn {
                game_id,
                player_id,
                must_answer,
            } => {
                if let Err(e) = self.service.take_bot_turn(game_id, player_id, must_answer) {
                    warn!(game_id, player_id, error = %e, "Bot turn rejected");
                }
            }
            Task::AskBot(args) => self.ask_bot(args).await,
            Task::Score { game_id } => self.score(game_id).await,
        }
    }

    async fn ask_bot(&self, args: AskBotArgs) {
        match self.roster.get(&args.bot_type) {
            Some(bot) => {
                if let Some(raw) = self.ask_with_retry(bot.as_ref(), &args).await {
                    let answer = parse_answer(&raw, &args.code_snippet);
                    if let Err(e) = self.service.record_answer(
                        &args.bot_type,
                        &args.prompt,
                        &args.code_snippet,
                        Some(answer),
                    ) {
                        warn!(bot_type = %args.bot_type, error = %e, "Failed to cache answer");
                    }
                }
            }
            None => warn!(bot_type = %args.bot_type, "No client for bot type"),
        }

        if let Err(e) = self.service.take_bot_turn(args.game_id, args.player_id, true) {
            warn!(game_id = args.game_id, error = %e, "Bot turn after ask rejected");
        }
    }

    async fn ask_with_retry(&self, bot: &dyn AskBot, args: &AskBotArgs) -> Option<String> {
        let config = self.service.config();
        let prompt = construct_prompt(&args.prompt, &args.code_snippet);
        let attempts = (*config.bot_max_attempts()).max(1);

        for attempt in 1..=attempts {
            match tokio::time::timeout(config.bot_timeout(), bot.ask(&prompt)).await {
                Ok(Ok(raw)) => {
                    debug!(attempt, raw_len = raw.len(), "Bot answered");
                    return Some(raw);
                }
                Ok(Err(e)) => warn!(attempt, error = %e, "Bot request failed"),
                Err(_) => warn!(attempt, timeout = ?config.bot_timeout(), "Bot request timed out"),
            }
            if attempt < attempts {
                tokio::time::sleep(config.bot_retry_backoff(attempt)).await;
            }
        }
        warn!(bot_type = %args.bot_type, attempts, "Bot gave no answer");
        None
    }

    async fn score(&self, game_id: GameId) {
        let Some(executor) = &self.executor else {
            debug!(game_id, "No executor; awaiting external result");
            return;
        };
        let info = match self.service.info_for_scoring(game_id) {
            Ok(info) => info,
            Err(e) => {
                warn!(game_id, error = %e, "Cannot score game");
                return;
            }
        };
        let outcomes = executor
            .execute(&info.code, info.problem.test_cases())
            .await;
        match self.service.record_result(game_id, &outcomes) {
            Ok(recorded) => info!(game_id, ?recorded, "Score recorded"),
            Err(e) => warn!(game_id, error = %e, "Failed to record score"),
        }
    }
}

/// Consumes the task queue.
pub struct Worker<S: GameStore> {
    runner: TaskRunner<S>,
    rx: mpsc::UnboundedReceiver<Task>,
}

impl<S: GameStore> Worker<S> {
    /// Creates a worker over a queue from [`Scheduler::channel`].
    pub fn new(runner: TaskRunner<S>, rx: mpsc::UnboundedReceiver<Task>) -> Self {
        Self { runner, rx }
    }

    /// Runs one tokio task per queued task until `shutdown` resolves.
    ///
    /// The runner's service holds a scheduler handle, so the queue never
    /// closes on its own while the worker is alive.
    #[instrument(skip_all)]
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        info!("Worker started");
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                task = self.rx.recv() => match task {
                    Some(task) => {
                        let runner = self.runner.clone();
                        tokio::spawn(async move { runner.run(task).await });
                    }
                    None => break,
                },
            }
        }
        info!("Worker stopped");
    }

    /// Runs queued tasks one by one, including those they enqueue, until
    /// the queue is empty. Returns how many ran.
    #[instrument(skip(self))]
    pub async fn run_until_idle(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            self.runner.run(task).await;
            ran += 1;
        }
        debug!(ran, "Queue idle");
        ran
    }
}
