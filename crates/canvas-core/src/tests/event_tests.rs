use super::*;

type Handler = dyn Fn(&mut Vec<&'static str>) + Send + Sync;

fn recording(label: &'static str) -> Arc<Handler> {
    Arc::new(move |log: &mut Vec<&'static str>| log.push(label))
}

#[test]
fn dispatches_in_registration_order() {
    let source: EventSource<Handler> = EventSource::new();
    source.add(recording("first"));
    source.add(recording("second"));
    source.add(recording("third"));

    let mut log = Vec::new();
    source
        .invoke_all::<()>(|handler| {
            handler(&mut log);
            Ok(())
        })
        .unwrap();
    assert_eq!(log, vec!["first", "second", "third"]);
}

#[test]
fn tokens_are_unique_and_remove_once() {
    let source: EventSource<Handler> = EventSource::new();
    let a = source.add(recording("a"));
    let b = source.add(recording("b"));
    assert_ne!(a, b);

    assert!(source.remove(a));
    assert!(!source.remove(a), "second removal of the same token is a no-op");
    assert_eq!(source.len(), 1);
    assert!(source.contains(b));
}

#[test]
fn tokens_do_not_cross_sources() {
    let first: EventSource<Handler> = EventSource::new();
    let second: EventSource<Handler> = EventSource::new();
    let token = first.add(recording("a"));
    second.add(recording("b"));

    assert!(!second.remove(token));
    assert_eq!(second.len(), 1);
}

#[test]
fn first_error_stops_dispatch() {
    let source: EventSource<Handler> = EventSource::new();
    source.add(recording("ok"));
    source.add(recording("fails"));
    source.add(recording("never"));

    let mut log = Vec::new();
    let result = source.invoke_all(|handler| {
        handler(&mut log);
        if log.last() == Some(&"fails") {
            Err("boom")
        } else {
            Ok(())
        }
    });
    assert_eq!(result, Err("boom"));
    assert_eq!(log, vec!["ok", "fails"]);
}

#[test]
fn handler_removed_during_dispatch_is_skipped() {
    type Cb = dyn Fn() + Send + Sync;
    let source: Arc<EventSource<Cb>> = Arc::new(EventSource::new());
    let calls = Arc::new(Mutex::new(Vec::new()));
    let victim: Arc<Mutex<Option<EventRegistrationToken>>> = Arc::new(Mutex::new(None));

    {
        let inner_source = Arc::clone(&source);
        let victim = Arc::clone(&victim);
        let calls = Arc::clone(&calls);
        source.add(Arc::new(move || {
            calls.lock().push("remover");
            if let Some(token) = victim.lock().take() {
                inner_source.remove(token);
            }
        }));
    }
    {
        let calls = Arc::clone(&calls);
        let token = source.add(Arc::new(move || calls.lock().push("victim")));
        *victim.lock() = Some(token);
    }

    source
        .invoke_all::<()>(|handler| {
            handler();
            Ok(())
        })
        .unwrap();
    assert_eq!(*calls.lock(), vec!["remover"]);
    assert_eq!(source.len(), 1);
}

#[test]
fn handler_added_during_dispatch_waits_for_next_dispatch() {
    type Cb = dyn Fn() + Send + Sync;
    let source: Arc<EventSource<Cb>> = Arc::new(EventSource::new());
    let calls = Arc::new(Mutex::new(0usize));
    {
        let inner_source = Arc::clone(&source);
        let calls = Arc::clone(&calls);
        source.add(Arc::new(move || {
            let calls = Arc::clone(&calls);
            inner_source.add(Arc::new(move || *calls.lock() += 1));
        }));
    }

    source
        .invoke_all::<()>(|handler| {
            handler();
            Ok(())
        })
        .unwrap();
    assert_eq!(*calls.lock(), 0);
    assert_eq!(source.len(), 2);
}
