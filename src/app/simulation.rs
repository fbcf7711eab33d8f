use crate::adapters::InMemoryStore;
use crate::core::coordinator::{SerializationMode, TransactionCoordinator};
use crate::domain::model::{Domain, OperationFailure};
use crate::domain::ports::Transactional;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

const DEADLOCK_MESSAGE: &str = "Deadlock found when trying to get lock; try restarting transaction";

#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub workers: usize,
    pub ops_per_worker: usize,
    pub domains: Vec<Domain>,
    /// Every Nth write hits one deadlock before succeeding. 0 disables.
    pub deadlock_every: usize,
    /// Time spent inside the critical section per attempt.
    pub work: Duration,
}

impl Default for SimulationPlan {
    fn default() -> Self {
        Self {
            workers: 4,
            ops_per_worker: 10,
            domains: vec![Domain::StageSummary, Domain::FinancialStatement, Domain::Expense],
            deadlock_every: 5,
            work: Duration::from_millis(2),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub mode: SerializationMode,
    pub operations: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub attempts: usize,
    pub rows_written: usize,
    /// Highest number of operations seen inside one domain's critical section.
    pub peak_in_flight: BTreeMap<Domain, usize>,
    /// Highest number of operations seen in any critical section at once.
    pub peak_in_flight_total: usize,
    pub elapsed_ms: u128,
}

#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

struct RecordWrite<'a> {
    domain: Domain,
    key: String,
    inject_deadlock: bool,
    work: Duration,
    store: &'a InMemoryStore,
    gauges: &'a HashMap<Domain, Gauge>,
    total: &'a Gauge,
    attempts: &'a AtomicUsize,
}

impl Transactional for RecordWrite<'_> {
    type Output = ();

    fn owner(&self) -> &'static str {
        "SimulationWorker"
    }

    fn name(&self) -> &'static str {
        "record_write"
    }

    fn domain(&self) -> Domain {
        self.domain
    }

    fn execute(&mut self) -> Result<(), OperationFailure> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let gauge = &self.gauges[&self.domain];
        gauge.enter();
        self.total.enter();
        std::thread::sleep(self.work);

        let result = if self.inject_deadlock {
            self.inject_deadlock = false;
            Err(OperationFailure::from_message(DEADLOCK_MESSAGE))
        } else {
            self.store
                .upsert(&self.key, serde_json::json!({ "domain": self.domain }))
                .map(|_| ())
        };

        self.total.exit();
        gauge.exit();
        result
    }
}

pub struct Simulation {
    coordinator: TransactionCoordinator,
    store: InMemoryStore,
}

impl Simulation {
    pub fn new(coordinator: TransactionCoordinator, store: InMemoryStore) -> Self {
        Self { coordinator, store }
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }

    pub fn run(&self, plan: &SimulationPlan) -> SimulationReport {
        if plan.domains.is_empty() {
            tracing::warn!("simulation plan has no domains; nothing to run");
            return SimulationReport {
                mode: self.coordinator.mode(),
                operations: 0,
                succeeded: 0,
                failed: 0,
                attempts: 0,
                rows_written: self.store.len(),
                peak_in_flight: BTreeMap::new(),
                peak_in_flight_total: 0,
                elapsed_ms: 0,
            };
        }

        let gauges: HashMap<Domain, Gauge> =
            plan.domains.iter().map(|d| (*d, Gauge::default())).collect();
        let total = Gauge::default();
        let attempts = AtomicUsize::new(0);
        let succeeded = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let started = Instant::now();

        tracing::info!(
            mode = ?self.coordinator.mode(),
            workers = plan.workers,
            ops = plan.workers * plan.ops_per_worker,
            "starting simulation"
        );

        std::thread::scope(|scope| {
            for worker in 0..plan.workers {
                let (gauges, total, attempts, succeeded, failed) =
                    (&gauges, &total, &attempts, &succeeded, &failed);
                scope.spawn(move || {
                    for i in 0..plan.ops_per_worker {
                        let seq = worker * plan.ops_per_worker + i;
                        let domain = plan.domains[seq % plan.domains.len()];
                        let mut op = RecordWrite {
                            domain,
                            key: format!("{}:{}:{}", domain, worker, i),
                            inject_deadlock: plan.deadlock_every > 0
                                && (seq + 1) % plan.deadlock_every == 0,
                            work: plan.work,
                            store: &self.store,
                            gauges,
                            total,
                            attempts,
                        };
                        match self.coordinator.run(&mut op) {
                            Ok(()) => {
                                succeeded.fetch_add(1, Ordering::SeqCst);
                            }
                            Err(e) => {
                                tracing::error!(worker, %domain, "write failed: {}", e);
                                failed.fetch_add(1, Ordering::SeqCst);
                            }
                        }
                    }
                });
            }
        });

        let report = SimulationReport {
            mode: self.coordinator.mode(),
            operations: plan.workers * plan.ops_per_worker,
            succeeded: succeeded.load(Ordering::SeqCst),
            failed: failed.load(Ordering::SeqCst),
            attempts: attempts.load(Ordering::SeqCst),
            rows_written: self.store.len(),
            peak_in_flight: gauges
                .iter()
                .map(|(domain, gauge)| (*domain, gauge.peak.load(Ordering::SeqCst)))
                .collect(),
            peak_in_flight_total: total.peak.load(Ordering::SeqCst),
            elapsed_ms: started.elapsed().as_millis(),
        };

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            attempts = report.attempts,
            elapsed_ms = report.elapsed_ms as u64,
            "simulation finished"
        );
        report
    }
}
