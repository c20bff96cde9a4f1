// Sequence Allocator - year-scoped recruitment ids (HR <year>/<n>)
//
// One counter per calendar year, each behind its own async mutex so that
// allocations for different years never wait on each other. Numbers are
// dense from 1 within a year.

use crate::application::transaction::TxContext;
use crate::domain::recruitment_id::validate_year;
use crate::domain::RecruitmentId;
use crate::error::{AppError, Result};
use crate::port::RecruitmentIdSource;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

/// Last number issued for one year
type YearCounter = Arc<AsyncMutex<u32>>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Readiness {
    Unrecovered,
    Failed(String),
    Ready,
}

struct AllocatorState {
    readiness: Readiness,
    counters: HashMap<i32, YearCounter>,
}

/// Outcome of scanning persisted ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Well-formed ids seen
    pub recovered: usize,
    /// Raw values that did not match the id grammar
    pub skipped: Vec<String>,
    /// Highest number seen per year
    pub last_issued: BTreeMap<i32, u32>,
}

/// Numbers allocated inside an open transaction.
///
/// Holds the year's lock until the outermost frame finishes: published on
/// commit, discarded (counter untouched) on rollback.
pub(crate) struct PendingSequence {
    guard: OwnedMutexGuard<u32>,
    last: u32,
}

impl PendingSequence {
    pub(crate) fn last(&self) -> u32 {
        self.last
    }

    pub(crate) fn rewind(&mut self, last: u32) {
        self.last = last;
    }

    pub(crate) fn publish(mut self) {
        *self.guard = self.last;
    }
}

/// Allocates recruitment ids
///
/// Refuses to allocate until `recover`/`recover_from` succeeded or the
/// caller explicitly chose `start_fresh`.
pub struct SequenceAllocator {
    state: Mutex<AllocatorState>,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AllocatorState {
                readiness: Readiness::Unrecovered,
                counters: HashMap::new(),
            }),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.lock_state()
            .map(|s| s.readiness == Readiness::Ready)
            .unwrap_or(false)
    }

    /// Seed counters from persisted ids
    ///
    /// Malformed ids are skipped and reported, never fatal. Counters only
    /// move forward, so recovering twice is harmless.
    pub async fn recover<I, S>(&self, existing_ids: I) -> Result<RecoveryReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = RecoveryReport::default();

        for raw in existing_ids {
            let raw = raw.as_ref();
            match raw.parse::<RecruitmentId>() {
                Ok(id) => {
                    report.recovered += 1;
                    let last = report.last_issued.entry(id.year()).or_insert(0);
                    *last = (*last).max(id.number());
                }
                Err(e) => {
                    warn!(id = %raw, error = %e, "Skipping malformed recruitment id during recovery");
                    report.skipped.push(raw.to_string());
                }
            }
        }

        let seeds: Vec<(u32, YearCounter)> = {
            let mut state = self.lock_state()?;
            report
                .last_issued
                .iter()
                .map(|(&year, &last)| (last, state.counter_for(year)))
                .collect()
        };

        for (last, counter) in seeds {
            let mut current = counter.lock().await;
            if *current < last {
                *current = last;
            }
        }

        self.lock_state()?.readiness = Readiness::Ready;

        info!(
            recovered = report.recovered,
            skipped = report.skipped.len(),
            years = report.last_issued.len(),
            "Recruitment sequences recovered"
        );
        Ok(report)
    }

    /// Load persisted ids from `source` and recover from them
    ///
    /// On load failure the allocator stays unavailable (unless an earlier
    /// recovery already succeeded) and `AppError::RecoveryFailed` is returned.
    pub async fn recover_from(&self, source: &dyn RecruitmentIdSource) -> Result<RecoveryReport> {
        match source.load_recruitment_ids().await {
            Ok(ids) => self.recover(ids).await,
            Err(e) => {
                error!(error = %e, "Failed to load recruitment ids for sequence recovery");
                let mut state = self.lock_state()?;
                if state.readiness != Readiness::Ready {
                    state.readiness = Readiness::Failed(e.to_string());
                }
                Err(AppError::RecoveryFailed(e.to_string()))
            }
        }
    }

    /// Explicit fallback: serve allocations from zero without recovery
    pub fn start_fresh(&self) -> Result<()> {
        let mut state = self.lock_state()?;
        if state.readiness != Readiness::Ready {
            warn!(previous = ?state.readiness, "Starting recruitment sequences fresh at zero");
            state.readiness = Readiness::Ready;
        }
        Ok(())
    }

    /// Increment and return the counter for `year`
    pub async fn next(&self, year: i32) -> Result<u32> {
        let counter = self.counter(year)?;
        let mut last = counter.lock().await;
        let number = increment(year, *last)?;
        *last = number;
        debug!(year, number, "Allocated sequence number");
        Ok(number)
    }

    /// `next` formatted as a recruitment id
    pub async fn allocate_id(&self, year: i32) -> Result<RecruitmentId> {
        let number = self.next(year).await?;
        Ok(RecruitmentId::new(year, number)?)
    }

    /// Allocate an id inside the context's open transaction
    ///
    /// The number becomes permanent only when the outermost frame commits.
    /// Until then the year's counter stays locked for other callers, so a
    /// rollback leaves no gap.
    pub async fn allocate_in(&self, ctx: &mut TxContext, year: i32) -> Result<RecruitmentId> {
        if !ctx.in_transaction() {
            return Err(AppError::InvalidState(
                "allocate_in requires an active transaction".to_string(),
            ));
        }

        if let Some(pending) = ctx.pending_sequences.get_mut(&year) {
            pending.last = increment(year, pending.last)?;
            return Ok(RecruitmentId::new(year, pending.last)?);
        }

        let counter = self.counter(year)?;
        let guard = counter.lock_owned().await;
        let last = increment(year, *guard)?;
        let id = RecruitmentId::new(year, last)?;
        ctx.pending_sequences
            .insert(year, PendingSequence { guard, last });

        debug!(year, number = last, "Reserved sequence number in transaction");
        Ok(id)
    }

    /// Last issued number per year (diagnostics)
    pub async fn snapshot(&self) -> Result<BTreeMap<i32, u32>> {
        let counters: Vec<(i32, YearCounter)> = {
            let state = self.lock_state()?;
            state
                .counters
                .iter()
                .map(|(year, counter)| (*year, counter.clone()))
                .collect()
        };

        let mut snapshot = BTreeMap::new();
        for (year, counter) in counters {
            snapshot.insert(year, *counter.lock().await);
        }
        Ok(snapshot)
    }

    fn counter(&self, year: i32) -> Result<YearCounter> {
        let mut state = self.lock_state()?;
        match &state.readiness {
            Readiness::Ready => {}
            Readiness::Unrecovered => {
                return Err(AppError::AllocatorUnavailable(
                    "sequence recovery has not run".to_string(),
                ))
            }
            Readiness::Failed(reason) => {
                return Err(AppError::AllocatorUnavailable(format!(
                    "sequence recovery failed ({}); start fresh explicitly to continue",
                    reason
                )))
            }
        }
        validate_year(year)?;
        Ok(state.counter_for(year))
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, AllocatorState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("sequence allocator state poisoned".to_string()))
    }
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocatorState {
    fn counter_for(&mut self, year: i32) -> YearCounter {
        self.counters
            .entry(year)
            .or_insert_with(|| Arc::new(AsyncMutex::new(0)))
            .clone()
    }
}

fn increment(year: i32, last: u32) -> Result<u32> {
    last.checked_add(1)
        .ok_or_else(|| AppError::Internal(format!("sequence for year {} exhausted", year)))
}
