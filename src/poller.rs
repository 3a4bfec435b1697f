use std::sync::Arc;
use std::time::Duration;

use crate::error::{BotError, Result};
use crate::homework::parse_status;
use crate::practicum::HomeworkSource;
use crate::telegram::Messenger;
use crate::validate::ApiResponse;

/// Outcome of one successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub sent: usize,
    pub failed_deliveries: usize,
    pub cursor: i64,
}

/// Owns the time cursor and drives fetch, validate, notify, advance, sleep.
pub struct Poller {
    source: Arc<dyn HomeworkSource>,
    messenger: Arc<dyn Messenger>,
    cursor: i64,
    retry_period: Duration,
}

impl Poller {
    pub fn new(
        source: Arc<dyn HomeworkSource>,
        messenger: Arc<dyn Messenger>,
        cursor: i64,
        retry_period: Duration,
    ) -> Self {
        Self {
            source,
            messenger,
            cursor,
            retry_period,
        }
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Run a single cycle. The cursor moves to `current_date` only when the
    /// fetch, the payload check and every record succeed. Delivery failures
    /// are counted but do not fail the cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        tracing::debug!("Polling homework statuses from_date={}", self.cursor);
        let payload = self.source.fetch(self.cursor).await?;
        let response = ApiResponse::parse(&payload)?;

        let mut sent = 0;
        let mut failed_deliveries = 0;
        let mut record_error: Option<BotError> = None;

        for (idx, homework) in response.homeworks.iter().enumerate() {
            let message = match parse_status(homework) {
                Ok(m) => m,
                Err(e) => {
                    tracing::error!("Skipping homework #{idx}: {e}");
                    record_error.get_or_insert(e);
                    continue;
                }
            };
            match self.messenger.send(&message).await {
                Ok(()) => {
                    tracing::info!("Sent notification: {message}");
                    sent += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to send notification for homework #{idx}: {e}");
                    failed_deliveries += 1;
                }
            }
        }

        if let Some(e) = record_error {
            return Err(e);
        }

        self.cursor = response.current_date;
        Ok(CycleReport {
            sent,
            failed_deliveries,
            cursor: self.cursor,
        })
    }

    /// Cycle forever. Only process termination stops this.
    pub async fn run(&mut self) {
        tracing::info!(
            "Polling every {}s starting from_date={}",
            self.retry_period.as_secs(),
            self.cursor
        );
        loop {
            match self.run_cycle().await {
                Ok(report) if report.sent + report.failed_deliveries > 0 => tracing::info!(
                    "Cycle done: {} sent, {} failed, cursor={}",
                    report.sent,
                    report.failed_deliveries,
                    report.cursor
                ),
                Ok(report) => tracing::debug!("No status changes, cursor={}", report.cursor),
                Err(e @ BotError::Fetch(_)) => {
                    tracing::error!("{e}; retrying from_date={} next cycle", self.cursor)
                }
                Err(e @ BotError::Validation(_)) => {
                    tracing::error!("Malformed API response, cycle skipped: {e}")
                }
                Err(e) if e.is_record_level() => {
                    tracing::error!("Cycle incomplete, cursor kept at {}: {e}", self.cursor)
                }
                Err(e) => tracing::error!("Unexpected error in polling cycle: {e}"),
            }
            tokio::time::sleep(self.retry_period).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted fetch results and records every `from_date` asked for.
    #[derive(Default)]
    struct ScriptedSource {
        replies: Mutex<VecDeque<Result<Value>>>,
        requested: Mutex<Vec<i64>>,
    }

    impl ScriptedSource {
        fn new(replies: Vec<Result<Value>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requested: Mutex::new(Vec::new()),
            })
        }

        fn requested(&self) -> Vec<i64> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl HomeworkSource for ScriptedSource {
        async fn fetch(&self, from_date: i64) -> Result<Value> {
            self.requested.lock().unwrap().push(from_date);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({"homeworks": [], "current_date": from_date})))
        }
    }

    /// Records every attempted message; fails the attempts listed in `fail_on`.
    #[derive(Default)]
    struct RecordingMessenger {
        attempts: Mutex<Vec<String>>,
        fail_on: Vec<usize>,
    }

    impl RecordingMessenger {
        fn failing_on(fail_on: Vec<usize>) -> Arc<Self> {
            Arc::new(Self {
                attempts: Mutex::new(Vec::new()),
                fail_on,
            })
        }

        fn attempts(&self) -> Vec<String> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Messenger for RecordingMessenger {
        async fn send(&self, text: &str) -> Result<()> {
            let mut attempts = self.attempts.lock().unwrap();
            let idx = attempts.len();
            attempts.push(text.to_string());
            if self.fail_on.contains(&idx) {
                return Err(BotError::Delivery("chat not found".into()));
            }
            Ok(())
        }
    }

    fn poller(source: &Arc<ScriptedSource>, messenger: &Arc<RecordingMessenger>, cursor: i64) -> Poller {
        Poller::new(
            source.clone(),
            messenger.clone(),
            cursor,
            Duration::from_secs(600),
        )
    }

    #[tokio::test]
    async fn test_approved_homework_end_to_end() {
        let source = ScriptedSource::new(vec![Ok(json!({
            "homeworks": [{"status": "approved", "homework_name": "hw1"}],
            "current_date": 1700000600
        }))]);
        let messenger = RecordingMessenger::failing_on(vec![]);
        let mut p = poller(&source, &messenger, 1700000000);

        let report = p.run_cycle().await.unwrap();

        assert_eq!(source.requested(), vec![1700000000]);
        assert_eq!(
            messenger.attempts(),
            vec!["Изменился статус проверки работы \"hw1\". Работа проверена: ревьюеру всё понравилось. Ура!"]
        );
        assert_eq!(report.sent, 1);
        assert_eq!(p.cursor(), 1700000600);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_cursor_and_sends_nothing() {
        let source = ScriptedSource::new(vec![Err(BotError::Fetch("connection refused".into()))]);
        let messenger = RecordingMessenger::failing_on(vec![]);
        let mut p = poller(&source, &messenger, 1700000000);

        let err = p.run_cycle().await.unwrap_err();

        assert!(matches!(err, BotError::Fetch(_)));
        assert!(messenger.attempts().is_empty());
        assert_eq!(p.cursor(), 1700000000);
    }

    #[tokio::test]
    async fn test_empty_homeworks_advances_cursor() {
        let source = ScriptedSource::new(vec![Ok(json!({"homeworks": [], "current_date": 1700000600}))]);
        let messenger = RecordingMessenger::failing_on(vec![]);
        let mut p = poller(&source, &messenger, 1700000000);

        let report = p.run_cycle().await.unwrap();

        assert_eq!(report, CycleReport { sent: 0, failed_deliveries: 0, cursor: 1700000600 });
        assert!(messenger.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_sends_nothing_and_keeps_cursor() {
        let source = ScriptedSource::new(vec![Ok(json!({
            "homeworks": [{"status": "approved", "homework_name": "hw1"}],
            "current_date": "tomorrow"
        }))]);
        let messenger = RecordingMessenger::failing_on(vec![]);
        let mut p = poller(&source, &messenger, 5);

        let err = p.run_cycle().await.unwrap_err();

        assert!(matches!(err, BotError::Validation(_)));
        assert!(messenger.attempts().is_empty());
        assert_eq!(p.cursor(), 5);
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_stop_batch() {
        let source = ScriptedSource::new(vec![Ok(json!({
            "homeworks": [
                {"status": "approved", "homework_name": "hw1"},
                {"status": "rejected", "homework_name": "hw2"},
                {"status": "reviewing", "homework_name": "hw3"}
            ],
            "current_date": 20
        }))]);
        let messenger = RecordingMessenger::failing_on(vec![0]);
        let mut p = poller(&source, &messenger, 10);

        let report = p.run_cycle().await.unwrap();

        assert_eq!(messenger.attempts().len(), 3);
        assert_eq!(report.sent, 2);
        assert_eq!(report.failed_deliveries, 1);
        assert_eq!(p.cursor(), 20);
    }

    #[tokio::test]
    async fn test_bad_record_is_skipped_and_cursor_kept() {
        let source = ScriptedSource::new(vec![Ok(json!({
            "homeworks": [
                {"status": "done", "homework_name": "hw1"},
                {"status": "approved"},
                {"status": "approved", "homework_name": "hw3"}
            ],
            "current_date": 20
        }))]);
        let messenger = RecordingMessenger::failing_on(vec![]);
        let mut p = poller(&source, &messenger, 10);

        let err = p.run_cycle().await.unwrap_err();

        assert!(matches!(err, BotError::UnknownStatus(s) if s == "done"));
        let attempts = messenger.attempts();
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].contains("\"hw3\""));
        assert_eq!(p.cursor(), 10);
    }

    #[tokio::test]
    async fn test_next_cycle_reuses_unadvanced_cursor() {
        let source = ScriptedSource::new(vec![
            Err(BotError::Fetch("timeout".into())),
            Ok(json!({"homeworks": [], "current_date": 700})),
        ]);
        let messenger = RecordingMessenger::failing_on(vec![]);
        let mut p = poller(&source, &messenger, 100);

        assert!(p.run_cycle().await.is_err());
        p.run_cycle().await.unwrap();
        p.run_cycle().await.unwrap();

        assert_eq!(source.requested(), vec![100, 100, 700]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sleeps_between_cycles_and_survives_errors() {
        let source = ScriptedSource::new(vec![
            Err(BotError::Fetch("timeout".into())),
            Ok(json!({"homeworks": "nope", "current_date": 1})),
            Ok(json!({"homeworks": [], "current_date": 1300})),
        ]);
        let messenger = RecordingMessenger::failing_on(vec![]);
        let mut p = poller(&source, &messenger, 100);

        let handle = tokio::spawn(async move { p.run().await });
        tokio::time::sleep(Duration::from_secs(1250)).await;

        // Cycles at t=0, 600 and 1200; the next one is not due until 1800.
        assert_eq!(source.requested(), vec![100, 100, 100]);
        assert!(!handle.is_finished());
        handle.abort();
    }
}
