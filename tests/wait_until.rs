use spark_signal_utils::timer::TokioTimer;
use spark_signal_utils::{signal, wait_for_match, wait_for_value, PendingFlag, ReactiveMap};
use std::time::Duration;
use tokio::task::LocalSet;

#[tokio::test(start_paused = true)]
async fn test_resolves_when_value_arrives() {
    LocalSet::new()
        .run_until(async {
            let value = signal(0);
            let wait = wait_for_value(&value, 5, None);

            value.set(5);
            assert!(wait.await);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_times_out_with_false() {
    LocalSet::new()
        .run_until(async {
            let value = signal(0);
            let started = tokio::time::Instant::now();

            let matched = wait_for_value(&value, 5, Some(Duration::from_millis(10))).await;

            assert!(!matched);
            assert!(started.elapsed() >= Duration::from_millis(10));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_resolves_from_another_task() {
    LocalSet::new()
        .run_until(async {
            let value = signal(0);
            let writer = tokio::task::spawn_local({
                let value = value.clone();
                async move {
                    for n in 1..=3 {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        value.set(n);
                    }
                }
            });

            let matched =
                wait_for_match(&value, |n: &i32| *n == 3, Some(Duration::from_secs(1))).await;
            assert!(matched);
            writer.await.unwrap();
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_waits_for_pending_flag_to_settle() {
    LocalSet::new()
        .run_until(async {
            let timer = TokioTimer::new();
            let loading = PendingFlag::with_timer(std::rc::Rc::new(timer.clone()));
            loading.activate(Duration::from_millis(30));
            assert_eq!(timer.pending_count(), 1);

            assert!(wait_for_value(&loading, false, None).await);
            assert!(!loading.peek());
            assert_eq!(timer.pending_count(), 0);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_waits_on_derived_map_reads() {
    LocalSet::new()
        .run_until(async {
            let jobs: ReactiveMap<u32, &str> = ReactiveMap::new();
            let done = spark_signal_utils::derived({
                let jobs = jobs.clone();
                move || jobs.values().iter().filter(|s| **s == "done").count()
            });

            tokio::task::spawn_local({
                let jobs = jobs.clone();
                async move {
                    jobs.set(1, "done");
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    jobs.set(2, "done");
                }
            });

            assert!(wait_for_value(&done, 2, Some(Duration::from_millis(50))).await);
        })
        .await;
}
