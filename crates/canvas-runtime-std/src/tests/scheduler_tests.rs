use super::*;
use canvas_core::CanvasError;
use pretty_assertions::assert_eq;
use std::sync::atomic::AtomicUsize;

fn counting(counter: &Arc<AtomicUsize>) -> RenderingCallback {
    let counter = Arc::clone(counter);
    Arc::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

#[test]
fn tick_runs_each_callback_once() {
    let scheduler = StdFrameScheduler::new();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    scheduler.register(counting(&first)).unwrap();
    scheduler.register(counting(&second)).unwrap();

    assert_eq!(scheduler.tick(16_000_000), 0);
    assert_eq!(scheduler.tick(32_000_000), 0);
    assert_eq!(first.load(Ordering::SeqCst), 2);
    assert_eq!(second.load(Ordering::SeqCst), 2);
}

#[test]
fn unregistered_callback_stops_running() {
    let scheduler = StdFrameScheduler::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let token = scheduler.register(counting(&calls)).unwrap();
    scheduler.tick(0);
    scheduler.unregister(token);
    scheduler.unregister(token);
    scheduler.tick(1);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.callback_count(), 0);
    assert!(!scheduler.is_registered(token));
}

#[test]
fn failures_are_counted_and_do_not_stop_the_tick() {
    let scheduler = StdFrameScheduler::new();
    let calls = Arc::new(AtomicUsize::new(0));
    scheduler
        .register(Arc::new(|_| Err(CanvasError::DrawingSession("boom".into()))))
        .unwrap();
    scheduler.register(counting(&calls)).unwrap();

    assert_eq!(scheduler.tick(0), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn callback_may_unregister_itself_during_tick() {
    let scheduler = Arc::new(StdFrameScheduler::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let own_token = Arc::new(Mutex::new(None));
    {
        let inner = Arc::clone(&scheduler);
        let calls = Arc::clone(&calls);
        let slot = Arc::clone(&own_token);
        let token = scheduler
            .register(Arc::new(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(token) = slot.lock().take() {
                    inner.unregister(token);
                }
                Ok(())
            }))
            .unwrap();
        *own_token.lock() = Some(token);
    }

    scheduler.tick(0);
    scheduler.tick(1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.callback_count(), 0);
}

#[test]
fn registration_requests_a_frame_and_wakes() {
    let scheduler = StdFrameScheduler::new();
    let wakes = Arc::new(AtomicUsize::new(0));
    {
        let wakes = Arc::clone(&wakes);
        scheduler.set_frame_waker(move || {
            wakes.fetch_add(1, Ordering::SeqCst);
        });
    }

    scheduler.register(Arc::new(|_| Ok(()))).unwrap();
    assert_eq!(wakes.load(Ordering::SeqCst), 1);
    assert!(scheduler.take_frame_request());
    assert!(!scheduler.take_frame_request());

    scheduler.clear_frame_waker();
    scheduler.register(Arc::new(|_| Ok(()))).unwrap();
    assert_eq!(wakes.load(Ordering::SeqCst), 1);
}

#[test]
fn explicit_frame_request_wakes_without_registration() {
    let scheduler = StdFrameScheduler::new();
    let wakes = Arc::new(AtomicUsize::new(0));
    {
        let wakes = Arc::clone(&wakes);
        scheduler.set_frame_waker(move || {
            wakes.fetch_add(1, Ordering::SeqCst);
        });
    }

    scheduler.request_frame();
    scheduler.request_frame();
    assert_eq!(wakes.load(Ordering::SeqCst), 2);
    assert!(scheduler.take_frame_request());

    scheduler.request_frame();
    scheduler.tick(0);
    assert!(!scheduler.take_frame_request());
}

#[test]
fn waker_may_tick_synchronously() {
    let scheduler = Arc::new(StdFrameScheduler::new());
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let weak = Arc::downgrade(&scheduler);
        scheduler.set_frame_waker(move || {
            if let Some(scheduler) = weak.upgrade() {
                scheduler.tick(0);
            }
        });
    }

    scheduler.register(counting(&calls)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    scheduler.request_frame();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn clock_is_monotonic() {
    let clock = StdClock::new();
    let first = clock.now_nanos();
    let second = clock.now_nanos();
    assert!(second >= first);
}
