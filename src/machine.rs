use chrono::{DateTime, Duration, Utc};

use crate::api::{LaunchRecord, LaunchStatus};
use crate::countdown::Countdown;

/// Zero-crossing window: commit to liftoff while seconds-to-zero ∈ (−5, 0].
const TRIGGER_WINDOW_SECS: i64 = 5;
/// Past this without a trigger, the window was missed; go straight to the
/// post-launch check.
const MISSED_WINDOW_SECS: i64 = 10;
const INFLIGHT_POLL_SECS: i64 = 45;
const RECHECK_RETRY_SECS: i64 = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Idle,
    Countdown,
    Launching,
    PostLaunchCheck,
}

/// Side effect requested from the event loop. The machine never does I/O.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    None,
    /// Kick off the liftoff animation.
    StartLiftoff,
    /// Re-fetch this record id for an outcome check.
    Recheck(i64),
    /// Fetch the upcoming list and pick the next record.
    LoadNext,
}

pub(crate) struct LaunchMachine {
    phase: Phase,
    current: Option<LaunchRecord>,
    next_check_at: Option<DateTime<Utc>>,
}

impl LaunchMachine {
    pub(crate) fn new() -> Self {
        Self {
            phase: Phase::Idle,
            current: None,
            next_check_at: None,
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn current(&self) -> Option<&LaunchRecord> {
        self.current.as_ref()
    }

    /// Among several upcoming records, prefer the first that is neither the
    /// one already shown nor in flight; fall back to the first non-in-flight
    /// record, then to the first record at all.
    fn select_next<'a>(
        records: &'a [LaunchRecord],
        prev_id: Option<i64>,
    ) -> Option<&'a LaunchRecord> {
        records
            .iter()
            .find(|r| Some(r.id) != prev_id && r.status != LaunchStatus::InFlight)
            .or_else(|| records.iter().find(|r| r.status != LaunchStatus::InFlight))
            .or_else(|| records.first())
    }

    /// Feed a fresh upcoming list. In Idle this picks a record; during a
    /// countdown it refreshes the displayed record wholesale (postponements
    /// included). Ignored while launching or checking an outcome.
    pub(crate) fn on_launches(&mut self, records: &[LaunchRecord]) {
        match self.phase {
            Phase::Idle => {
                let prev_id = self.current.as_ref().map(|r| r.id);
                if let Some(rec) = Self::select_next(records, prev_id) {
                    self.current = Some(rec.clone());
                    if rec.t0.is_some() {
                        self.phase = Phase::Countdown;
                    }
                }
            }
            Phase::Countdown => {
                let cur_id = match &self.current {
                    Some(r) => r.id,
                    None => return,
                };
                if let Some(rec) = records.iter().find(|r| r.id == cur_id) {
                    self.current = Some(rec.clone());
                    if self.current.as_ref().and_then(|r| r.t0).is_none() {
                        // schedule was withdrawn; wait for it to come back
                        self.phase = Phase::Idle;
                    }
                } else if let Some(rec) = Self::select_next(records, Some(cur_id)) {
                    // our record vanished from the feed: treat as scrubbed
                    self.current = Some(rec.clone());
                    if rec.t0.is_none() {
                        self.phase = Phase::Idle;
                    }
                }
            }
            Phase::Launching | Phase::PostLaunchCheck => {}
        }
    }

    /// One countdown tick. Drives the zero-crossing trigger, the
    /// missed-window fallback, and due outcome checks.
    pub(crate) fn tick(&mut self, now: DateTime<Utc>) -> Action {
        match self.phase {
            Phase::Idle | Phase::Launching => Action::None,
            Phase::Countdown => {
                let t0 = match self.current.as_ref().and_then(|r| r.t0) {
                    Some(t0) => t0,
                    None => {
                        self.phase = Phase::Idle;
                        return Action::None;
                    }
                };
                let s = Countdown::seconds_to_zero(t0, now);
                if s <= 0 && s > -TRIGGER_WINDOW_SECS {
                    self.phase = Phase::Launching;
                    return Action::StartLiftoff;
                }
                if s < -MISSED_WINDOW_SECS {
                    self.phase = Phase::PostLaunchCheck;
                    self.next_check_at = Some(now);
                }
                Action::None
            }
            Phase::PostLaunchCheck => {
                let due = self.next_check_at.map(|at| now >= at).unwrap_or(false);
                if !due {
                    return Action::None;
                }
                self.next_check_at = None;
                match &self.current {
                    Some(r) => Action::Recheck(r.id),
                    None => {
                        self.phase = Phase::Idle;
                        Action::LoadNext
                    }
                }
            }
        }
    }

    /// Debug trigger ("force launch now"): straight into Launching,
    /// bypassing the time check. A second trigger while launching is a
    /// silent no-op.
    pub(crate) fn force_launch(&mut self) -> Action {
        match self.phase {
            Phase::Countdown => {
                self.phase = Phase::Launching;
                Action::StartLiftoff
            }
            _ => Action::None,
        }
    }

    /// Manual interruption of the animation (the immediate-stop path). The
    /// countdown resumes; completion never fires for the stopped run.
    pub(crate) fn abort_liftoff(&mut self) {
        if self.phase == Phase::Launching {
            self.phase = Phase::Countdown;
        }
    }

    /// Liftoff animation finished (its completion fires exactly once).
    pub(crate) fn liftoff_complete(&mut self, now: DateTime<Utc>) {
        if self.phase == Phase::Launching {
            self.phase = Phase::PostLaunchCheck;
            self.next_check_at = Some(now);
        }
    }

    /// Result of an outcome re-fetch.
    pub(crate) fn on_recheck(
        &mut self,
        fetched: Option<LaunchRecord>,
        now: DateTime<Utc>,
    ) -> Action {
        if self.phase != Phase::PostLaunchCheck {
            return Action::None;
        }
        let Some(rec) = fetched else {
            // gone from the feed entirely: scrubbed or archived
            self.phase = Phase::Idle;
            return Action::LoadNext;
        };
        let old_t0 = self.current.as_ref().and_then(|r| r.t0);
        if rec.t0.is_some() && rec.t0 != old_t0 {
            // postponement: same mission, new clock
            self.current = Some(rec);
            self.phase = Phase::Countdown;
            return Action::None;
        }
        if rec.status == LaunchStatus::InFlight {
            self.current = Some(rec);
            self.next_check_at = Some(now + Duration::seconds(INFLIGHT_POLL_SECS));
            return Action::None;
        }
        // terminal outcome, or simply no longer flight-pending
        self.current = Some(rec);
        self.phase = Phase::Idle;
        Action::LoadNext
    }

    /// The re-fetch itself failed; try again shortly.
    pub(crate) fn recheck_failed(&mut self, now: DateTime<Utc>) {
        if self.phase == Phase::PostLaunchCheck {
            self.next_check_at = Some(now + Duration::seconds(RECHECK_RETRY_SECS));
        }
    }
}
