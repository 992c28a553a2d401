use spark_signal_utils::timer::ManualTimer;
use spark_signal_utils::{effect, PendingFlag};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

fn flag() -> (Rc<ManualTimer>, PendingFlag) {
    let timer = Rc::new(ManualTimer::new());
    let flag = PendingFlag::with_timer(timer.clone());
    (timer, flag)
}

#[test]
fn test_indefinite_activation_outlives_timed_one() {
    let (timer, loading) = flag();

    let forever = loading.activate(None);
    let _short = loading.activate(Duration::from_millis(100));
    assert!(loading.peek());
    assert_eq!(loading.peek_active_count(), 2);

    timer.advance(Duration::from_millis(100));
    assert!(loading.peek());

    loading.cancel(forever);
    assert!(!loading.peek());
}

#[test]
fn test_cancel_one_keeps_flag_while_other_pending() {
    let (timer, loading) = flag();

    let first = loading.activate(None);
    loading.activate(Duration::from_millis(100));

    loading.cancel(first);
    assert!(loading.peek());

    timer.advance(Duration::from_millis(100));
    assert!(!loading.peek());
    assert_eq!(timer.pending_count(), 0);
}

#[test]
fn test_clear_leaves_no_late_expiry() {
    let (timer, loading) = flag();
    let changes = Rc::new(RefCell::new(Vec::new()));

    let _subscription = loading.subscribe({
        let changes = changes.clone();
        move |value| changes.borrow_mut().push(value)
    });

    loading.activate(Duration::from_millis(50));
    loading.activate(Duration::from_millis(80));
    loading.clear();
    assert_eq!(timer.pending_count(), 0);

    timer.advance(Duration::from_secs(1));
    assert_eq!(*changes.borrow(), vec![false, true, false]);
}

#[test]
fn test_effect_sees_every_transition() {
    let (timer, saving) = flag();
    let runs = Rc::new(Cell::new(0));

    let _dispose = effect({
        let (saving, runs) = (saving.clone(), runs.clone());
        move || {
            saving.get();
            runs.set(runs.get() + 1);
        }
    });

    saving.activate(Duration::from_millis(10));
    saving.activate(Duration::from_millis(20));
    // Second activation keeps the flag true
    assert_eq!(runs.get(), 2);

    timer.advance(Duration::from_millis(10));
    assert_eq!(runs.get(), 2);

    timer.advance(Duration::from_millis(10));
    assert_eq!(runs.get(), 3);
    assert!(!saving.peek());
}

#[test]
fn test_active_count_is_reactive() {
    let (timer, busy) = flag();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let _dispose = effect({
        let (busy, seen) = (busy.clone(), seen.clone());
        move || seen.borrow_mut().push(busy.active_count())
    });

    busy.activate(Duration::from_millis(5));
    busy.activate(Duration::from_millis(15));
    timer.advance(Duration::from_millis(20));

    assert_eq!(*seen.borrow(), vec![0, 1, 2, 1, 0]);
}

#[test]
fn test_dropping_flag_cancels_timers() {
    let timer = Rc::new(ManualTimer::new());
    {
        let flag = PendingFlag::with_timer(timer.clone());
        flag.activate(Duration::from_millis(10));
        flag.activate(Duration::from_millis(20));
        assert_eq!(timer.pending_count(), 2);
    }
    assert_eq!(timer.pending_count(), 0);
}

#[test]
fn test_display_and_comparison() {
    let (_timer, flag) = flag();
    assert_eq!(flag.to_string(), "false");
    assert!(flag == false);

    flag.activate(None);
    assert_eq!(flag.to_string(), "true");
    assert!(bool::from(&flag));
}

#[test]
fn test_foreign_activation_is_ignored() {
    let timer = Rc::new(ManualTimer::new());
    let uploads = PendingFlag::with_timer(timer.clone());
    let downloads = PendingFlag::with_timer(timer.clone());

    let upload = uploads.activate(None);
    downloads.activate(Duration::from_millis(50));

    downloads.cancel(upload);
    assert!(downloads.peek());
    assert!(uploads.peek());
    assert_eq!(timer.pending_count(), 1);

    uploads.cancel(upload);
    assert!(!uploads.peek());

    timer.advance(Duration::from_millis(50));
    assert!(!downloads.peek());
}

#[test]
fn test_default_timer_can_be_swapped_outside_tokio() {
    let timer = Rc::new(ManualTimer::new());
    let flag = spark_signal_utils::timer::with_timer(timer.clone(), PendingFlag::new);

    flag.activate(Duration::from_millis(10));
    assert!(flag.peek());

    timer.advance(Duration::from_millis(10));
    assert!(!flag.peek());
}

#[test]
#[should_panic]
fn test_default_timer_needs_local_set() {
    let flag = PendingFlag::new();
    flag.activate(Duration::from_millis(10));
}
