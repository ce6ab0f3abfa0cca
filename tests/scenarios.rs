//! End-to-end seed scenarios (S1-S7), run through the public façade.
//!
//! The same shapes are covered as in-crate unit tests closer to the
//! calculator that implements them; these exercise the full path through
//! `Transformer`/`Filterer` and a real `ThreadPoolContext`.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use colpar::column::buffer::{NumericBuffer, ObjectBuffer};
use colpar::testing::{NumericColumns, VecCategoricalColumn, VecNumericColumn, VecObjectColumn};
use colpar::{EngineError, ExecutionError, Filterer, RowTransformer, ThreadPoolContext, Transformer, Workload};

#[test]
fn s1_double_the_values() {
    let column = VecNumericColumn::new(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    let ctx = ThreadPoolContext::with_parallelism(4);
    let progress: std::sync::Mutex<Vec<f64>> = std::sync::Mutex::new(Vec::new());

    let result = Transformer::new(Some(&column))
        .workload(Workload::Default)
        .callback(|p| progress.lock().unwrap().push(p))
        .apply_numeric_to_real(Some(|x: f64| -> Result<f64, Infallible> { Ok(x * 2.0) }), &ctx)
        .unwrap();

    assert_eq!(result.into_vec(), vec![2.0, 4.0, 6.0, 8.0, 10.0]);
    assert_eq!(*progress.lock().unwrap().last().unwrap(), 1.0);
}

#[test]
fn s2_categorical_recode() {
    let labels = ["a", "b", "c"];
    let column = VecCategoricalColumn::new(vec![0, 1, 1, 2, 0, 2]);
    let ctx = ThreadPoolContext::with_parallelism(1);

    let result = Transformer::new(Some(&column))
        .apply_categorical_to_nominal(
            3,
            Some(|i: u32| -> Result<&'static str, Infallible> { Ok(labels[i as usize]) }),
            &ctx,
        )
        .unwrap();

    assert_eq!(result.format(), colpar::column::Format::UI2);
    assert_eq!(result.into_vec(), vec!["a", "b", "b", "c", "a", "c"]);
}

#[test]
fn s3_sum_reduction_is_bit_identical_across_runs() {
    let column = VecNumericColumn::new(vec![1.0; 1_000_000]);
    let ctx = ThreadPoolContext::with_parallelism(8);

    let run = || {
        Transformer::new(Some(&column))
            .reduce_numeric(
                0.0f64,
                Some(|acc, x| -> Result<f64, Infallible> { Ok(acc + x) }),
                Some(|a: f64, b: f64| a + b),
                &ctx,
            )
            .unwrap()
    };

    let first = run();
    let second = run();
    assert_eq!(first, 1_000_000.0);
    assert_eq!(first.to_bits(), second.to_bits());
}

#[test]
fn s4_mutable_reduction_order_follows_batch_index() {
    let column = VecCategoricalColumn::new((0..16).collect());
    let ctx = ThreadPoolContext::with_parallelism(2);

    let result: Vec<u32> = Transformer::new(Some(&column))
        .workload(Workload::Huge)
        .reduce_categorical_mutable(
            Some(|| Some(Vec::<u32>::new())),
            Some(|mut acc: Vec<u32>, x: u32| {
                acc.push(x);
                acc
            }),
            Some(|mut a: Vec<u32>, b: Vec<u32>| {
                a.extend(b);
                a
            }),
            &ctx,
        )
        .unwrap();

    assert_eq!(result, (0..16).collect::<Vec<u32>>());
}

#[test]
fn s5_filter_compaction() {
    let column = VecNumericColumn::new(vec![-1.0, 2.0, -3.0, 4.0, 5.0, -6.0, 7.0]);
    let ctx = ThreadPoolContext::with_parallelism(4);

    let result = Filterer::new(Some(&column))
        .filter_numeric(Some(|x: f64| -> Result<bool, Infallible> { Ok(x > 0.0) }), &ctx)
        .unwrap();

    assert_eq!(result, vec![1, 3, 4, 6]);
}

#[test]
fn s6_cancellation_aborts_without_returning_partial_output() {
    let n = 10_000_000;
    let values: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let column = VecNumericColumn::new(values);
    let ctx = Arc::new(ThreadPoolContext::with_parallelism(4));
    let first_batch_seen = AtomicBool::new(false);

    let ctx_for_callback = Arc::clone(&ctx);
    let result: Result<NumericBuffer, ExecutionError<Infallible>> = Transformer::new(Some(&column))
        .workload(Workload::Huge)
        .callback(move |_p| {
            if !first_batch_seen.swap(true, Ordering::SeqCst) {
                ctx_for_callback.cancel();
            }
        })
        .apply_numeric_to_real(Some(|x: f64| -> Result<f64, Infallible> { Ok(x) }), &*ctx);

    assert!(matches!(result, Err(ExecutionError::Engine(EngineError::Aborted))));
}

#[test]
fn s7_capacity_overflow() {
    let column = VecCategoricalColumn::new(vec![0, 1, 2, 3, 4]);
    let ctx = ThreadPoolContext::with_parallelism(1);

    let labels = ["a", "b", "c", "d", "e"];
    let result = Transformer::new(Some(&column)).apply_categorical_to_nominal(
        3,
        Some(|i: u32| -> Result<&'static str, Infallible> { Ok(labels[i as usize]) }),
        &ctx,
    );

    assert!(matches!(result, Err(ExecutionError::Engine(EngineError::CapacityExceeded { max: 4 }))));
}

#[test]
fn s8_object_read_as_matching_type_succeeds() {
    let column = VecObjectColumn::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    let ctx = ThreadPoolContext::with_parallelism(1);

    let result: ObjectBuffer<String> = Transformer::new(Some(&column))
        .apply_object_to_object::<String, String, _, Infallible>(
            Some(|x: Option<String>| -> Result<String, Infallible> { Ok(x.unwrap_or_default().to_uppercase()) }),
            &ctx,
        )
        .unwrap();

    assert_eq!(result.into_vec(), vec![Some("A".to_string()), Some("B".to_string()), Some("C".to_string())]);
}

#[test]
fn s9_object_read_as_mismatched_type_is_rejected() {
    let column = VecObjectColumn::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    let ctx = ThreadPoolContext::with_parallelism(1);

    let result: Result<ObjectBuffer<i32>, ExecutionError<Infallible>> = Transformer::new(Some(&column))
        .apply_object_to_object::<i32, i32, _, Infallible>(Some(|x: Option<i32>| -> Result<i32, Infallible> { Ok(x.unwrap_or(0)) }), &ctx);

    assert!(matches!(result, Err(ExecutionError::Engine(EngineError::TypeMismatch))));
}

#[test]
fn s10_generic_row_apply_and_reduce_via_row_facade() {
    use colpar::column::NumericRow;

    let a = VecNumericColumn::new(vec![1.0, 2.0, 3.0, 4.0]);
    let b = VecNumericColumn::new(vec![10.0, 20.0, 30.0, 40.0]);
    let group = NumericColumns::new(vec![&a, &b]);
    let ctx = ThreadPoolContext::with_parallelism(2);

    let target = NumericBuffer::new(4);
    let applied = RowTransformer::new(Some(&group))
        .apply_row(target, Some(|row: NumericRow| -> Result<f64, Infallible> { Ok(row.0.iter().sum()) }), &ctx)
        .unwrap();
    assert_eq!(applied.into_vec(), vec![11.0, 22.0, 33.0, 44.0]);

    let reduced: f64 = RowTransformer::new(Some(&group))
        .reduce_row(
            Some(|| Some(0.0f64)),
            Some(|acc: f64, row: NumericRow| -> f64 { acc + row.0.iter().sum::<f64>() }),
            Some(|a: f64, b: f64| a + b),
            &ctx,
        )
        .unwrap();
    assert_eq!(reduced, 110.0);
}
