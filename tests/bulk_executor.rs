use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use pelicanctl::cli::executor::{summarize, Executor, ExecutorConfig, Operation, Summary};

fn operation(id: usize, fail: bool, delay_ms: u64) -> Operation {
    let name = format!("srv-{}", id);
    Operation::new(name.clone(), name, move || async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        if fail {
            Err(anyhow!("srv-{} failed", id))
        } else {
            Ok(())
        }
    })
}

#[tokio::test]
async fn outcomes_do_not_depend_on_completion_order() {
    // Later operations finish first.
    let ops: Vec<_> = (0..8)
        .map(|i| operation(i, i % 3 == 0, (8 - i as u64) * 5))
        .collect();

    let results = Executor::new(ExecutorConfig::new(8, true, false))
        .execute(ops)
        .await;

    assert_eq!(results.len(), 8);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.id(), format!("srv-{}", i));
        assert_eq!(result.success(), i % 3 != 0, "srv-{}", i);
    }
}

#[tokio::test]
async fn running_operations_never_exceed_limit() {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let ops: Vec<_> = (0..20)
        .map(|i| {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            Operation::new(format!("srv-{}", i), format!("srv-{}", i), move || async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })
        })
        .collect();

    let results = Executor::new(ExecutorConfig::new(3, false, false))
        .execute(ops)
        .await;

    assert!(results.iter().all(|r| r.success()));
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn continue_on_error_does_not_change_execution() {
    let run = |continue_on_error: bool| async move {
        let calls = Arc::new(AtomicUsize::new(0));
        let ops: Vec<_> = (0..6)
            .map(|i| {
                let calls = Arc::clone(&calls);
                Operation::new(i.to_string(), i.to_string(), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if i == 2 {
                        Err(anyhow!("boom"))
                    } else {
                        Ok(())
                    }
                })
            })
            .collect();

        let results = Executor::new(ExecutorConfig::new(2, continue_on_error, false))
            .execute(ops)
            .await;
        let outcomes: Vec<bool> = results.iter().map(|r| r.success()).collect();
        (outcomes, calls.load(Ordering::SeqCst))
    };

    let (with_flag, calls_with) = run(true).await;
    let (without_flag, calls_without) = run(false).await;

    assert_eq!(with_flag, without_flag);
    assert_eq!(calls_with, 6);
    assert_eq!(calls_without, 6);
}

#[tokio::test]
async fn fail_fast_skips_everything_after_first_failure_when_serial() {
    let calls = Arc::new(AtomicUsize::new(0));
    let ops: Vec<_> = (0..5)
        .map(|i| {
            let calls = Arc::clone(&calls);
            Operation::new(i.to_string(), i.to_string(), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if i == 1 {
                    Err(anyhow!("first failure"))
                } else {
                    Ok(())
                }
            })
        })
        .collect();

    let results = Executor::new(ExecutorConfig::new(1, false, true))
        .execute(ops)
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(results[0].success());
    assert!(!results[1].success() && !results[1].is_skipped());
    for result in &results[2..] {
        assert!(result.is_skipped());
        assert_eq!(
            result.error.as_ref().unwrap().to_string(),
            "skipped due to previous error"
        );
    }
}

#[tokio::test]
async fn repeated_runs_report_the_same_outcomes() {
    let mut rounds = Vec::new();
    for round in 0..5u64 {
        // Rotate delays so completion order changes between rounds.
        let ops: Vec<_> = (0..10)
            .map(|i| operation(i, i % 4 == 1, ((i as u64 + round * 3) % 7) * 3))
            .collect();
        let results = Executor::new(ExecutorConfig::new(4, true, false))
            .execute(ops)
            .await;
        let outcomes: Vec<(String, bool)> = results
            .iter()
            .map(|r| (r.id().to_string(), r.success()))
            .collect();
        rounds.push(outcomes);
    }

    assert_eq!(rounds[0].len(), 10);
    for outcomes in &rounds[1..] {
        assert_eq!(outcomes, &rounds[0]);
    }
}

#[tokio::test]
async fn fail_fast_with_parallel_slots_skips_the_tail() {
    let calls = Arc::new(AtomicUsize::new(0));
    let ops: Vec<_> = (0..10)
        .map(|i| {
            let calls = Arc::clone(&calls);
            Operation::new(i.to_string(), i.to_string(), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if i == 3 {
                    return Err(anyhow!("srv-3 failed"));
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(())
            })
        })
        .collect();

    let results = Executor::new(ExecutorConfig::new(2, false, true))
        .execute(ops)
        .await;

    assert_eq!(results.len(), 10);
    assert!(results[0].success());
    assert!(!results[3].success() && !results[3].is_skipped());
    // Operations already holding a slot may finish; nothing far past the failure starts.
    for result in &results[6..] {
        assert!(result.is_skipped(), "{} should be skipped", result.id());
    }
    assert!(calls.load(Ordering::SeqCst) < 10);
}

#[tokio::test]
async fn summary_counts_match_results() {
    let ops: Vec<_> = (0..7).map(|i| operation(i, i % 2 == 1, 0)).collect();
    let results = Executor::new(ExecutorConfig::default()).execute(ops).await;
    let summary = summarize(&results);

    assert_eq!(
        summary,
        Summary {
            total: 7,
            succeeded: 4,
            failed: 3
        }
    );
    assert_eq!(summary.total, summary.succeeded + summary.failed);
    assert!(summary.is_fatal(false));
    assert!(!summary.is_fatal(true));
}
