//! Shared fakes for the scheduler tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tempfile::TempDir;

use quill_reminders::{
    BloggingRemindersScheduler, Clock, ContentError, NotificationId, NotificationRequest,
    NotificationScheduler, NotifierError, PermissionAuthority, PermissionGate, Prompt,
    PromptReceiptStore, PromptRemindersScheduler, PromptService, ReminderConfig,
    ReminderConfigBuilder, ReminderCoordinator, ReminderStore, Trigger,
};

/// In-memory notification scheduler that remembers everything it was asked to do.
#[derive(Default)]
pub struct RecordingNotifier {
    state: Mutex<NotifierState>,
    hang_cancel: AtomicBool,
    hang_register: AtomicBool,
    slow_ack: Mutex<Option<Duration>>,
}

#[derive(Default)]
struct NotifierState {
    pending: BTreeMap<NotificationId, NotificationRequest>,
    registered: Vec<NotificationRequest>,
    cancel_calls: Vec<Vec<NotificationId>>,
    reject: Option<fn(&NotificationRequest) -> bool>,
    stalled: BTreeSet<NotificationId>,
}

impl RecordingNotifier {
    /// Reject every registration for which `rule` returns true.
    pub fn reject_when(&self, rule: fn(&NotificationRequest) -> bool) {
        self.state.lock().unwrap().reject = Some(rule);
    }

    pub fn accept_all(&self) {
        self.state.lock().unwrap().reject = None;
    }

    pub fn hang_cancel(&self, hang: bool) {
        self.hang_cancel.store(hang, Ordering::SeqCst);
    }

    /// Never finish a cancel call that includes any of `ids`.
    pub fn stall_cancel_of(&self, ids: impl IntoIterator<Item = NotificationId>) {
        self.state.lock().unwrap().stalled.extend(ids);
    }

    /// Accept registrations at once but only answer after `delay`.
    pub fn slow_ack(&self, delay: Option<Duration>) {
        *self.slow_ack.lock().unwrap() = delay;
    }

    pub fn hang_register(&self, hang: bool) {
        self.hang_register.store(hang, Ordering::SeqCst);
    }

    /// Requests still waiting to fire.
    pub fn pending(&self) -> Vec<NotificationRequest> {
        self.state.lock().unwrap().pending.values().cloned().collect()
    }

    pub fn pending_ids(&self) -> BTreeSet<NotificationId> {
        self.state.lock().unwrap().pending.keys().cloned().collect()
    }

    /// Every accepted request, in registration order.
    pub fn registered(&self) -> Vec<NotificationRequest> {
        self.state.lock().unwrap().registered.clone()
    }

    pub fn cancel_calls(&self) -> Vec<Vec<NotificationId>> {
        self.state.lock().unwrap().cancel_calls.clone()
    }

    /// Pre-register a request as if an earlier run had left it behind.
    pub fn seed(&self, request: NotificationRequest) {
        self.state
            .lock()
            .unwrap()
            .pending
            .insert(request.id.clone(), request);
    }
}

#[async_trait]
impl NotificationScheduler for RecordingNotifier {
    async fn register(&self, request: NotificationRequest) -> Result<NotificationId, NotifierError> {
        if self.hang_register.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let slow_ack = *self.slow_ack.lock().unwrap();
        if let Some(delay) = slow_ack {
            let id = request.id.clone();
            {
                let mut state = self.state.lock().unwrap();
                state.registered.push(request.clone());
                state.pending.insert(id.clone(), request);
            }
            tokio::time::sleep(delay).await;
            return Ok(id);
        }
        tokio::task::yield_now().await;

        let mut state = self.state.lock().unwrap();
        if state.reject.is_some_and(|rule| rule(&request)) {
            return Err(NotifierError::Rejected("rejected by test".to_string()));
        }
        let id = request.id.clone();
        state.registered.push(request.clone());
        state.pending.insert(id.clone(), request);
        Ok(id)
    }

    async fn cancel(&self, ids: &[NotificationId]) {
        let stalled = {
            let state = self.state.lock().unwrap();
            ids.iter().any(|id| state.stalled.contains(id))
        };
        if stalled || self.hang_cancel.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        tokio::task::yield_now().await;

        let mut state = self.state.lock().unwrap();
        state.cancel_calls.push(ids.to_vec());
        for id in ids {
            state.pending.remove(id);
        }
    }
}

/// Permission authority with a switchable answer.
pub struct StaticAuthority {
    granted: AtomicBool,
    requests: AtomicUsize,
}

impl StaticAuthority {
    pub fn new(granted: bool) -> Self {
        Self {
            granted: AtomicBool::new(granted),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }

    pub fn is_granted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionAuthority for StaticAuthority {
    async fn request_authorization(&self) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.granted.load(Ordering::SeqCst)
    }
}

/// Prompt service returning a canned answer.
pub struct StaticPromptService {
    answer: Mutex<Result<Vec<Prompt>, ContentError>>,
    calls: Mutex<Vec<(u64, NaiveDate, u32)>>,
}

impl StaticPromptService {
    pub fn new(prompts: Vec<Prompt>) -> Self {
        Self {
            answer: Mutex::new(Ok(prompts)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(&self, answer: Result<Vec<Prompt>, ContentError>) {
        *self.answer.lock().unwrap() = answer;
    }

    pub fn calls(&self) -> Vec<(u64, NaiveDate, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PromptService for StaticPromptService {
    async fn fetch_prompts(
        &self,
        site_id: u64,
        from: NaiveDate,
        count: u32,
    ) -> Result<Vec<Prompt>, ContentError> {
        self.calls.lock().unwrap().push((site_id, from, count));
        self.answer.lock().unwrap().clone()
    }
}

/// Clock stuck at a settable instant.
pub struct FixedClock(Mutex<NaiveDateTime>);

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}

/// 2024-05-06, a Monday.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
}

pub fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(hour, minute, 0).unwrap())
}

/// `count` consecutive daily prompts starting at `start`, ids counting from 100.
pub fn daily_prompts(start: NaiveDate, count: u64) -> Vec<Prompt> {
    (0..count)
        .map(|offset| Prompt {
            id: 100 + offset,
            date: start + chrono::Days::new(offset),
            text: format!("Prompt for day {offset}"),
        })
        .collect()
}

/// Date of a one-shot trigger, if any.
pub fn once_date(request: &NotificationRequest) -> Option<NaiveDate> {
    match request.trigger {
        Trigger::Once { date, .. } => Some(date),
        Trigger::Weekly { .. } => None,
    }
}

/// Fakes plus stores in a temporary data directory.
pub struct Harness {
    pub dir: TempDir,
    pub config: ReminderConfig,
    pub notifier: Arc<RecordingNotifier>,
    pub authority: Arc<StaticAuthority>,
    pub prompts: Arc<StaticPromptService>,
    pub clock: Arc<FixedClock>,
    pub store: Arc<ReminderStore>,
    pub receipts: Arc<PromptReceiptStore>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(|builder| builder).await
    }

    pub async fn with_config(
        configure: impl FnOnce(ReminderConfigBuilder) -> ReminderConfigBuilder,
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let builder = ReminderConfig::builder()
            .data_dir(dir.path())
            .operation_timeout_secs(5);
        let config = configure(builder).build().unwrap();

        let store = Arc::new(ReminderStore::load(config.reminders_path()).await);
        let receipts = Arc::new(PromptReceiptStore::load(config.prompt_receipts_path()).await);

        Self {
            dir,
            config,
            notifier: Arc::new(RecordingNotifier::default()),
            authority: Arc::new(StaticAuthority::new(true)),
            prompts: Arc::new(StaticPromptService::new(daily_prompts(monday(), 15))),
            clock: Arc::new(FixedClock::new(at(monday(), 8, 0))),
            store,
            receipts,
        }
    }

    pub fn gate(&self) -> PermissionGate {
        PermissionGate::new(self.authority.clone(), self.config.operation_timeout())
    }

    pub fn weekly(&self) -> BloggingRemindersScheduler {
        BloggingRemindersScheduler::new(
            self.store.clone(),
            self.notifier.clone(),
            self.gate(),
            &self.config,
        )
    }

    pub fn prompt(&self) -> PromptRemindersScheduler {
        PromptRemindersScheduler::new(
            self.receipts.clone(),
            self.notifier.clone(),
            self.prompts.clone(),
            self.gate(),
            self.clock.clone(),
            &self.config,
        )
    }

    pub fn coordinator(&self) -> ReminderCoordinator {
        ReminderCoordinator::new(self.weekly(), self.prompt(), &self.config)
    }
}
