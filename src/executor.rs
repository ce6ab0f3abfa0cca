//! The parallel executor: strategy selection, task dispatch, cancellation.
//!
//! This is the component the rest of the crate is built around. It owns no
//! domain semantics of its own — everything it does is in terms of the
//! [`Calculator`] contract and the [`Context`] collaborator — and is the
//! one place the two dispatch strategies, the cancellation sentinel, and
//! progress reporting are implemented, so every applier/reducer/filterer
//! gets them for free.
//!
//! Threads are scoped with [`crossbeam::thread::scope`] rather than owned
//! by a long-lived pool, the same bounded-lifetime shape TiKV's worker
//! pool (`tikv_util::worker::pool`) uses for a `FuturePool` spun up for
//! one unit of work and torn down once it finishes: every `execute` call
//! borrows `calculator` and `ctx` for exactly as long as it takes to
//! finish, and nothing outlives the call.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::calculator::Calculator;
use crate::context::Context;
use crate::error::{EngineError, ExecutionError};
use crate::logging::{self, ExecutorEvent, Logger};
use crate::workload::{Workload, BATCH_DIVISOR, THRESHOLD_FACTOR_EQUAL_PARTS};

/// The dispatch strategy chosen for one execution, and the batch count it
/// implies. See §4.4 of the design: this is a pure function of `N`, `P`,
/// and the workload's `(T_par, B)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// Work-stealing dispatch: `P` tasks, each starting with a
    /// pre-assigned window of `batch_size` and then racing for more via a
    /// shared position counter.
    Batched { batch_size: usize, num_batches: usize },
    /// Static partition into `num_batches` equal (modulo rounding and the
    /// final remainder) windows, one task per window.
    EqualParts { num_batches: usize },
}

impl Strategy {
    fn num_batches(self) -> usize {
        match self {
            Strategy::Batched { num_batches, .. } => num_batches,
            Strategy::EqualParts { num_batches } => num_batches,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Strategy::Batched { .. } => "batched",
            Strategy::EqualParts { .. } => "equal_parts",
        }
    }
}

fn div_ceil(n: usize, d: usize) -> usize {
    if d == 0 {
        0
    } else {
        n.div_ceil(d)
    }
}

fn choose_strategy(n: usize, p: usize, workload: Workload) -> Strategy {
    let b = workload.batch_size();
    let t_par = workload.parallel_threshold();

    if n >= b.saturating_mul(THRESHOLD_FACTOR_EQUAL_PARTS).saturating_mul(p) {
        Strategy::Batched { batch_size: b, num_batches: div_ceil(n, b) }
    } else if n < t_par {
        Strategy::EqualParts { num_batches: 1 }
    } else {
        let num_batches = (p.min(n / t_par)).max(1);
        Strategy::EqualParts { num_batches }
    }
}

/// Rounds `x` up to the next multiple of `BATCH_DIVISOR`, leaving `0`
/// untouched.
fn round_up_to_divisor(x: usize) -> usize {
    if x == 0 {
        0
    } else {
        div_ceil(x, BATCH_DIVISOR) * BATCH_DIVISOR
    }
}

/// A `[from, to)` window tagged with its dense batch index.
#[derive(Debug, Clone, Copy)]
struct Window {
    from: usize,
    to: usize,
    batch_index: usize,
}

/// Builds the static windows for equal-parts mode, re-deriving
/// `num_batches` from the rounded target batch size exactly as §4.4
/// prescribes.
fn equal_parts_windows(n: usize, requested_batches: usize) -> (usize, Vec<Window>) {
    if n == 0 {
        return (1, vec![Window { from: 0, to: 0, batch_index: 0 }]);
    }

    let target = round_up_to_divisor(div_ceil(n, requested_batches.max(1)));
    let num_batches = div_ceil(n, target);

    let mut windows = Vec::with_capacity(num_batches);
    let mut from = 0;
    let mut batch_index = 0;
    while from < n {
        let to = (from + target).min(n);
        windows.push(Window { from, to, batch_index });
        from = to;
        batch_index += 1;
    }
    (num_batches, windows)
}

/// Runs a [`Calculator`] to completion under a [`Context`], per the
/// strategy rules in §4.4.
///
/// This is a thin, stateless driver: it holds no data of its own beyond
/// the per-execution sentinel and position counter, both scoped to a
/// single `execute` call.
pub struct ParallelExecutor<'a> {
    workload: Workload,
    callback: Option<Box<dyn Fn(f64) + Send + Sync + 'a>>,
    logger: Option<&'a dyn Logger>,
}

impl<'a> ParallelExecutor<'a> {
    /// Builds an executor with the default workload, no progress callback,
    /// and no logger.
    pub fn new() -> Self {
        ParallelExecutor { workload: Workload::default(), callback: None, logger: None }
    }

    /// Sets the workload hint used for strategy selection.
    pub fn workload(mut self, workload: Workload) -> Self {
        self.workload = workload;
        self
    }

    /// Registers a progress callback. Receives values in `[0, 1]`, or
    /// `NaN` to denote an indeterminate equal-parts execution; the final
    /// call is always exactly `1.0`.
    pub fn callback(mut self, callback: impl Fn(f64) + Send + Sync + 'a) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Registers an event logger.
    pub fn logger(mut self, logger: &'a dyn Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    fn report(&self, progress: f64) {
        if let Some(callback) = &self.callback {
            callback(progress);
        }
    }

    /// Runs `calculator` to completion under `ctx`.
    ///
    /// On success, returns `calculator.result()`. On failure, returns
    /// whichever error was observed first across all workers — either an
    /// engine-level [`EngineError`] or the calculator's own `Error`,
    /// wrapped in [`ExecutionError`] — and never returns a result built
    /// from partial output.
    pub fn execute<C>(
        &self,
        calculator: C,
        ctx: &(impl Context + ?Sized),
    ) -> Result<C::Output, ExecutionError<C::Error>>
    where
        C: Calculator,
    {
        let n = calculator.num_ops();
        let p = ctx.parallelism().max(1);
        let strategy = choose_strategy(n, p, self.workload);

        logging::log(
            self.logger,
            ExecutorEvent::StrategyChosen {
                num_ops: n,
                parallelism: p,
                strategy: strategy.name(),
                num_batches: strategy.num_batches(),
            },
        );

        let sentinel = AtomicBool::new(true);
        let first_error: parking_lot::Mutex<Option<ExecutionError<C::Error>>> =
            parking_lot::Mutex::new(None);

        let report_failure = |err: ExecutionError<C::Error>| {
            if sentinel.swap(false, Ordering::SeqCst) {
                logging::log(self.logger, ExecutorEvent::Cancelled { context_inactive: false });
                *first_error.lock() = Some(err);
            }
        };

        let cancelled = || -> bool { !sentinel.load(Ordering::SeqCst) || !ctx.is_active() };

        match strategy {
            Strategy::Batched { batch_size, num_batches } => {
                calculator.init(num_batches);
                self.run_batched(&calculator, ctx, batch_size, n, p, &cancelled, &report_failure);
            }
            Strategy::EqualParts { num_batches } => {
                self.report(f64::NAN);
                let (num_batches, windows) = equal_parts_windows(n, num_batches);
                calculator.init(num_batches);
                self.run_equal_parts(&calculator, ctx, &windows, &cancelled, &report_failure);
            }
        }

        if !ctx.is_active() && sentinel.load(Ordering::SeqCst) {
            logging::log(self.logger, ExecutorEvent::Cancelled { context_inactive: true });
            sentinel.store(false, Ordering::SeqCst);
            let mut guard = first_error.lock();
            if guard.is_none() {
                *guard = Some(EngineError::Aborted.into());
            }
        }

        if let Some(err) = first_error.into_inner() {
            return Err(err);
        }

        self.report(1.0);
        Ok(calculator.result())
    }

    #[allow(clippy::too_many_arguments)]
    fn run_batched<C>(
        &self,
        calculator: &C,
        ctx: &(impl Context + ?Sized),
        batch_size: usize,
        n: usize,
        p: usize,
        cancelled: &impl Fn() -> bool,
        report_failure: &impl Fn(ExecutionError<C::Error>) + Sync,
    ) where
        C: Calculator,
    {
        let position = AtomicUsize::new(p * batch_size);
        let position = &position;

        crossbeam::thread::scope(|scope| {
            for worker in 0..p {
                scope.spawn(move |_| {
                    let first_from = worker * batch_size;
                    let first_to = ((worker + 1) * batch_size).min(n);
                    if first_from < first_to {
                        self.run_batched_window(
                            calculator,
                            ctx,
                            first_from,
                            first_to,
                            first_from / batch_size,
                            cancelled,
                            report_failure,
                            n,
                        );
                    }

                    loop {
                        if cancelled() {
                            return;
                        }
                        let next = position.fetch_add(batch_size, Ordering::SeqCst);
                        let start = next - batch_size;
                        let end = next.min(n);
                        if start >= end {
                            return;
                        }
                        self.run_batched_window(
                            calculator,
                            ctx,
                            start,
                            end,
                            start / batch_size,
                            cancelled,
                            report_failure,
                            n,
                        );
                    }
                });
            }
        })
        .expect("worker thread panicked");
    }

    #[allow(clippy::too_many_arguments)]
    fn run_batched_window<C>(
        &self,
        calculator: &C,
        ctx: &(impl Context + ?Sized),
        from: usize,
        to: usize,
        batch_index: usize,
        cancelled: &impl Fn() -> bool,
        report_failure: &impl Fn(ExecutionError<C::Error>) + Sync,
        n: usize,
    ) where
        C: Calculator,
    {
        if cancelled() || !ctx.is_active() {
            return;
        }
        logging::log(self.logger, ExecutorEvent::BatchDispatched { from, to, batch_index });
        if let Err(err) = calculator.do_part(from, to, batch_index) {
            report_failure(err);
            return;
        }
        if cancelled() || !ctx.is_active() {
            return;
        }
        self.report(((to - 1) as f64) / (n as f64));
    }

    fn run_equal_parts<C>(
        &self,
        calculator: &C,
        ctx: &(impl Context + ?Sized),
        windows: &[Window],
        cancelled: &impl Fn() -> bool,
        report_failure: &impl Fn(ExecutionError<C::Error>) + Sync,
    ) where
        C: Calculator,
    {
        crossbeam::thread::scope(|scope| {
            for window in windows {
                scope.spawn(move |_| {
                    if cancelled() || !ctx.is_active() {
                        return;
                    }
                    logging::log(
                        self.logger,
                        ExecutorEvent::BatchDispatched {
                            from: window.from,
                            to: window.to,
                            batch_index: window.batch_index,
                        },
                    );
                    if let Err(err) = calculator.do_part(window.from, window.to, window.batch_index) {
                        report_failure(err);
                    }
                });
            }
        })
        .expect("worker thread panicked");
    }
}

impl<'a> Default for ParallelExecutor<'a> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ThreadPoolContext;
    use parking_lot::Mutex;
    use std::convert::Infallible;

    struct RangeCollector {
        n: usize,
        seen: Mutex<Vec<(usize, usize)>>,
    }

    impl Calculator for RangeCollector {
        type Output = Vec<(usize, usize)>;
        type Error = Infallible;

        fn num_ops(&self) -> usize {
            self.n
        }

        fn init(&self, _num_batches: usize) {}

        fn do_part(&self, from: usize, to: usize, _batch_index: usize) -> Result<(), ExecutionError<Infallible>> {
            self.seen.lock().push((from, to));
            Ok(())
        }

        fn result(self) -> Self::Output {
            let mut v = self.seen.into_inner();
            v.sort_unstable();
            v
        }
    }

    #[test]
    fn batched_windows_cover_range_disjointly() {
        let n = 1_000_000;
        let calc = RangeCollector { n, seen: Mutex::new(Vec::new()) };
        let ctx = ThreadPoolContext::with_parallelism(4);
        let executor = ParallelExecutor::new().workload(Workload::Huge);
        let ranges = executor.execute(calc, &ctx).unwrap();
        let mut covered = 0usize;
        for &(from, to) in &ranges {
            assert_eq!(from, covered);
            covered = to;
        }
        assert_eq!(covered, n);
    }

    #[test]
    fn small_input_runs_single_batch() {
        let calc = RangeCollector { n: 5, seen: Mutex::new(Vec::new()) };
        let ctx = ThreadPoolContext::with_parallelism(4);
        let executor = ParallelExecutor::new();
        let ranges = executor.execute(calc, &ctx).unwrap();
        assert_eq!(ranges, vec![(0, 5)]);
    }

    #[test]
    fn zero_length_dispatches_one_empty_batch() {
        let calc = RangeCollector { n: 0, seen: Mutex::new(Vec::new()) };
        let ctx = ThreadPoolContext::with_parallelism(4);
        let executor = ParallelExecutor::new();
        let ranges = executor.execute(calc, &ctx).unwrap();
        assert_eq!(ranges, vec![(0, 0)]);
    }

    #[test]
    fn strategy_thresholds_match_spec_formula() {
        let w = Workload::Default;
        let b = w.batch_size();
        let t_par = w.parallel_threshold();
        let p = 4;

        assert_eq!(choose_strategy(b * 2 * p, p, w).name(), "batched");
        assert_eq!(choose_strategy(t_par - 1, p, w).name(), "equal_parts");
        assert_eq!(choose_strategy(t_par * 2, p, w).name(), "equal_parts");
    }
}
