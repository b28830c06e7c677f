use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use crate::error::Result;
use crate::mapping::{RecipientId, RecipientMapping};
use crate::message::MessageTemplate;
use crate::record::{DutyPatch, DutyRecord};
use crate::resolve::resolve;

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Read/write access to the duty roster.
pub trait DutySource {
    /// Fetch every record in the roster. Called once per run.
    fn list_records(&self) -> Result<Vec<DutyRecord>>;

    /// Apply a partial update to one record. Fields left `None` in the
    /// patch must not be touched.
    fn update_record(&self, id: &str, patch: &DutyPatch) -> Result<()>;
}

/// Delivery channel for start-of-duty notifications.
pub trait Messenger {
    fn send_direct_message(&self, recipient: &RecipientId, text: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Notify,
    Close,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Notify => "notify",
            Action::Close => "close",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide which transitions apply to a record on `today`.
///
/// Pure. The two preconditions are evaluated independently against the
/// record as fetched, so one record can yield both actions in a single
/// pass (started today, already past its end date).
pub fn plan(record: &DutyRecord, today: NaiveDate) -> Vec<Action> {
    let mut actions = Vec::new();
    if record.start_date == Some(today) && !record.notified {
        actions.push(Action::Notify);
    }
    if record.end_date.is_some_and(|end| today > end) && !record.is_done() {
        actions.push(Action::Close);
    }
    actions
}

// ---------------------------------------------------------------------------
// RunSummary
// ---------------------------------------------------------------------------

/// Counters for one reconciliation pass. Only transitions whose record
/// update succeeded are counted; a failed write re-fires next run and would
/// otherwise be reported twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Records durably marked notified + Ongoing this pass.
    pub tasks_sent: u32,
    /// Records durably moved to Done this pass.
    pub status_updates: u32,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} notification(s) sent, {} record(s) closed",
            self.tasks_sent, self.status_updates
        )
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The reconciliation engine: fetches the roster once, plans transitions
/// per record, and applies them through the injected ports.
pub struct Engine<'a> {
    source: &'a dyn DutySource,
    messenger: &'a dyn Messenger,
    mapping: RecipientMapping,
    template: MessageTemplate,
}

impl<'a> Engine<'a> {
    pub fn new(
        source: &'a dyn DutySource,
        messenger: &'a dyn Messenger,
        mapping: RecipientMapping,
        template: MessageTemplate,
    ) -> Self {
        Self {
            source,
            messenger,
            mapping,
            template,
        }
    }

    /// One reconciliation pass for `today`.
    ///
    /// A failed roster fetch aborts the run. A failed delivery skips that
    /// recipient only; a failed record update skips that record, leaving the
    /// guard field unchanged so the next scheduled run re-attempts the
    /// transition. Nothing here protects against overlapping runs: schedule
    /// one invocation at a time.
    pub fn run(&self, today: NaiveDate) -> Result<RunSummary> {
        let records = self.source.list_records()?;
        tracing::info!(count = records.len(), %today, "fetched duty records");

        let mut summary = RunSummary::default();
        for record in &records {
            for action in plan(record, today) {
                match action {
                    Action::Notify => {
                        if self.notify(record) {
                            summary.tasks_sent += 1;
                        }
                    }
                    Action::Close => {
                        if self.close(record) {
                            summary.status_updates += 1;
                        }
                    }
                }
            }
        }

        tracing::info!(
            tasks_sent = summary.tasks_sent,
            status_updates = summary.status_updates,
            "run complete"
        );
        Ok(summary)
    }

    /// Apply the notify transition. Returns true when the record was
    /// durably marked.
    fn notify(&self, record: &DutyRecord) -> bool {
        let resolution = resolve(record, &self.mapping, &self.template.conjunction);
        let text = self.template.render(&record.title, &resolution);

        if resolution.ids.is_empty() {
            tracing::warn!(
                record = %record.id,
                title = %record.title,
                "no recipients resolved; marking record without a delivery"
            );
        }
        for id in &resolution.ids {
            match self.messenger.send_direct_message(id, &text) {
                Ok(()) => {
                    tracing::info!(record = %record.id, recipient = %id, "sent duty notification");
                }
                Err(e) => {
                    tracing::warn!(
                        record = %record.id,
                        recipient = %id,
                        error = %e,
                        "delivery failed; skipping recipient"
                    );
                }
            }
        }

        match self.source.update_record(&record.id, &DutyPatch::begun()) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    record = %record.id,
                    error = %e,
                    "failed to mark record notified; next run will retry"
                );
                false
            }
        }
    }

    /// Apply the close transition. Returns true when the record was durably
    /// moved to Done.
    fn close(&self, record: &DutyRecord) -> bool {
        match self.source.update_record(&record.id, &DutyPatch::done()) {
            Ok(()) => {
                tracing::info!(record = %record.id, title = %record.title, "closed expired duty");
                true
            }
            Err(e) => {
                tracing::warn!(
                    record = %record.id,
                    error = %e,
                    "failed to close record; next run will retry"
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DutySyncError;
    use crate::record::{STATUS_DONE, STATUS_ONGOING};
    use std::cell::RefCell;
    use std::collections::HashSet;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn today() -> NaiveDate {
        date("2025-07-29")
    }

    fn record(id: &str) -> DutyRecord {
        DutyRecord::new(id, "Pager triage")
    }

    // -----------------------------------------------------------------------
    // Fakes
    // -----------------------------------------------------------------------

    #[derive(Default)]
    struct FakeSource {
        records: RefCell<Vec<DutyRecord>>,
        updates: RefCell<Vec<(String, DutyPatch)>>,
        fail_list: bool,
        fail_updates: RefCell<HashSet<String>>,
    }

    impl FakeSource {
        fn with_records(records: Vec<DutyRecord>) -> Self {
            Self {
                records: RefCell::new(records),
                ..Self::default()
            }
        }
    }

    impl DutySource for FakeSource {
        fn list_records(&self) -> Result<Vec<DutyRecord>> {
            if self.fail_list {
                return Err(DutySyncError::Api {
                    endpoint: "fake/query".to_string(),
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(self.records.borrow().clone())
        }

        fn update_record(&self, id: &str, patch: &DutyPatch) -> Result<()> {
            if self.fail_updates.borrow().contains(id) {
                return Err(DutySyncError::Api {
                    endpoint: format!("fake/pages/{id}"),
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            self.updates
                .borrow_mut()
                .push((id.to_string(), patch.clone()));
            // Apply the patch so a second run sees the stored state.
            let mut records = self.records.borrow_mut();
            if let Some(record) = records.iter_mut().find(|r| r.id == id) {
                if let Some(notified) = patch.notified {
                    record.notified = notified;
                }
                if let Some(status) = &patch.status {
                    record.status = Some(status.clone());
                }
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeMessenger {
        sent: RefCell<Vec<(String, String)>>,
        fail_for: HashSet<String>,
    }

    impl Messenger for FakeMessenger {
        fn send_direct_message(&self, recipient: &RecipientId, text: &str) -> Result<()> {
            if self.fail_for.contains(recipient.as_str()) {
                return Err(DutySyncError::SendRejected {
                    recipient: recipient.to_string(),
                    error: "channel_not_found".to_string(),
                });
            }
            self.sent
                .borrow_mut()
                .push((recipient.as_str().to_string(), text.to_string()));
            Ok(())
        }
    }

    fn engine<'a>(
        source: &'a FakeSource,
        messenger: &'a FakeMessenger,
        mapping: RecipientMapping,
    ) -> Engine<'a> {
        Engine::new(source, messenger, mapping, MessageTemplate::default())
    }

    // -----------------------------------------------------------------------
    // plan
    // -----------------------------------------------------------------------

    #[test]
    fn plan_notify_fires_only_on_exact_start_date() {
        let mut r = record("1");
        r.start_date = Some(date("2025-07-28"));
        assert!(plan(&r, today()).is_empty());
        r.start_date = Some(date("2025-07-30"));
        assert!(plan(&r, today()).is_empty());
        r.start_date = Some(today());
        assert_eq!(plan(&r, today()), vec![Action::Notify]);
    }

    #[test]
    fn plan_notify_guard_blocks_repeat() {
        let mut r = record("1");
        r.start_date = Some(today());
        r.notified = true;
        assert!(plan(&r, today()).is_empty());
    }

    #[test]
    fn plan_close_requires_strictly_past_end() {
        let mut r = record("1");
        r.end_date = Some(today());
        assert!(plan(&r, today()).is_empty());
        r.end_date = Some(date("2025-07-28"));
        assert_eq!(plan(&r, today()), vec![Action::Close]);
    }

    #[test]
    fn plan_close_skips_done_records() {
        let mut r = record("1");
        r.end_date = Some(date("2025-07-01"));
        r.status = Some(STATUS_DONE.to_string());
        assert!(plan(&r, today()).is_empty());
    }

    #[test]
    fn plan_without_dates_never_acts() {
        let r = record("1");
        assert!(plan(&r, today()).is_empty());
    }

    #[test]
    fn plan_can_select_both_transitions() {
        let mut r = record("1");
        r.start_date = Some(today());
        r.end_date = Some(date("2025-07-28"));
        assert_eq!(plan(&r, today()), vec![Action::Notify, Action::Close]);
    }

    // -----------------------------------------------------------------------
    // Engine::run
    // -----------------------------------------------------------------------

    #[test]
    fn starts_today_notifies_and_marks() {
        let mut r = record("1");
        r.start_date = Some(today());
        r.assignees = vec!["Alice".to_string()];
        let source = FakeSource::with_records(vec![r]);
        let messenger = FakeMessenger::default();
        let mapping = RecipientMapping::from_pairs([("Alice", "U111")]);

        let summary = engine(&source, &messenger, mapping).run(today()).unwrap();

        assert_eq!(summary.tasks_sent, 1);
        assert_eq!(summary.status_updates, 0);
        let sent = messenger.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "U111");
        assert!(sent[0].1.contains(":clipboard: *Today's Duty:* Pager triage"));
        let updates = source.updates.borrow();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "1");
        assert_eq!(updates[0].1, DutyPatch::begun());
    }

    #[test]
    fn expired_record_is_closed_without_delivery() {
        let mut r = record("2");
        r.end_date = Some(date("2025-07-26"));
        r.status = Some(STATUS_ONGOING.to_string());
        let source = FakeSource::with_records(vec![r]);
        let messenger = FakeMessenger::default();

        let summary = engine(&source, &messenger, RecipientMapping::new())
            .run(today())
            .unwrap();

        assert_eq!(summary.status_updates, 1);
        assert_eq!(summary.tasks_sent, 0);
        assert!(messenger.sent.borrow().is_empty());
        let updates = source.updates.borrow();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1, DutyPatch::done());
    }

    #[test]
    fn ongoing_mid_duty_record_is_left_alone() {
        let mut r = record("3");
        r.start_date = Some(date("2025-07-24"));
        r.end_date = Some(date("2025-07-31"));
        r.status = Some(STATUS_ONGOING.to_string());
        r.notified = true;
        let source = FakeSource::with_records(vec![r]);
        let messenger = FakeMessenger::default();

        let summary = engine(&source, &messenger, RecipientMapping::new())
            .run(today())
            .unwrap();

        assert_eq!(summary, RunSummary::default());
        assert!(messenger.sent.borrow().is_empty());
        assert!(source.updates.borrow().is_empty());
    }

    #[test]
    fn second_run_is_a_noop() {
        let mut starts = record("1");
        starts.start_date = Some(today());
        starts.assignees = vec!["Alice".to_string()];
        let mut expired = record("2");
        expired.end_date = Some(date("2025-07-20"));
        let source = FakeSource::with_records(vec![starts, expired]);
        let messenger = FakeMessenger::default();
        let mapping = RecipientMapping::from_pairs([("Alice", "U111")]);

        let eng = engine(&source, &messenger, mapping);
        let first = eng.run(today()).unwrap();
        assert_eq!(first.tasks_sent, 1);
        assert_eq!(first.status_updates, 1);

        // The fake applied both patches; nothing is due anymore.
        let second = eng.run(today()).unwrap();
        assert_eq!(second, RunSummary::default());
        assert_eq!(messenger.sent.borrow().len(), 1);
        assert_eq!(source.updates.borrow().len(), 2);
    }

    #[test]
    fn both_transitions_apply_to_one_record_in_one_pass() {
        let mut r = record("1");
        r.start_date = Some(today());
        r.end_date = Some(date("2025-07-28"));
        r.assignees = vec!["Alice".to_string()];
        let source = FakeSource::with_records(vec![r]);
        let messenger = FakeMessenger::default();
        let mapping = RecipientMapping::from_pairs([("Alice", "U111")]);

        let summary = engine(&source, &messenger, mapping).run(today()).unwrap();

        assert_eq!(summary.tasks_sent, 1);
        assert_eq!(summary.status_updates, 1);
        assert_eq!(messenger.sent.borrow().len(), 1);
        let updates = source.updates.borrow();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].1, DutyPatch::begun());
        assert_eq!(updates[1].1, DutyPatch::done());
    }

    #[test]
    fn zero_resolved_recipients_still_marks_the_record() {
        let mut r = record("1");
        r.start_date = Some(today());
        r.assignees = vec!["Nobody Known".to_string()];
        let source = FakeSource::with_records(vec![r]);
        let messenger = FakeMessenger::default();

        let summary = engine(&source, &messenger, RecipientMapping::new())
            .run(today())
            .unwrap();

        assert_eq!(summary.tasks_sent, 1);
        assert!(messenger.sent.borrow().is_empty());
        assert_eq!(source.updates.borrow().len(), 1);
    }

    #[test]
    fn one_failed_delivery_does_not_block_the_rest() {
        let mut r = record("1");
        r.start_date = Some(today());
        r.assignees = vec!["Alice".to_string(), "Bob".to_string()];
        let source = FakeSource::with_records(vec![r]);
        let mut messenger = FakeMessenger::default();
        messenger.fail_for.insert("U111".to_string());
        let mapping = RecipientMapping::from_pairs([("Alice", "U111"), ("Bob", "U222")]);

        let summary = engine(&source, &messenger, mapping).run(today()).unwrap();

        // Bob still got the message and the record was still marked.
        let sent = messenger.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "U222");
        assert_eq!(source.updates.borrow().len(), 1);
        assert_eq!(summary.tasks_sent, 1);
    }

    #[test]
    fn failed_update_leaves_the_transition_armed() {
        let mut r = record("1");
        r.start_date = Some(today());
        r.assignees = vec!["Alice".to_string()];
        let source = FakeSource::with_records(vec![r]);
        source.fail_updates.borrow_mut().insert("1".to_string());
        let messenger = FakeMessenger::default();
        let mapping = RecipientMapping::from_pairs([("Alice", "U111")]);

        let eng = engine(&source, &messenger, mapping);
        let first = eng.run(today()).unwrap();
        assert_eq!(first.tasks_sent, 0);
        assert!(!source.records.borrow()[0].notified);

        // Once the store recovers, the same transition fires again.
        source.fail_updates.borrow_mut().clear();
        let second = eng.run(today()).unwrap();
        assert_eq!(second.tasks_sent, 1);
        assert_eq!(messenger.sent.borrow().len(), 2);
        assert!(source.records.borrow()[0].notified);
    }

    #[test]
    fn roster_fetch_failure_aborts_the_run() {
        let source = FakeSource {
            fail_list: true,
            ..FakeSource::default()
        };
        let messenger = FakeMessenger::default();

        let result = engine(&source, &messenger, RecipientMapping::new()).run(today());
        assert!(matches!(result, Err(DutySyncError::Api { .. })));
        assert!(messenger.sent.borrow().is_empty());
    }

    #[test]
    fn summary_display() {
        let summary = RunSummary {
            tasks_sent: 2,
            status_updates: 1,
        };
        assert_eq!(
            summary.to_string(),
            "2 notification(s) sent, 1 record(s) closed"
        );
    }
}
