use super::*;
use std::cell::Cell;
use std::rc::Rc;

struct CountingSession {
    closes: Rc<Cell<usize>>,
    commands: Vec<&'static str>,
    fail_close: bool,
}

impl CountingSession {
    fn new(closes: &Rc<Cell<usize>>) -> Self {
        Self {
            closes: Rc::clone(closes),
            commands: Vec::new(),
            fail_close: false,
        }
    }
}

impl DrawingSession for CountingSession {
    fn close(&mut self) -> Result<()> {
        self.closes.set(self.closes.get() + 1);
        if self.fail_close {
            Err(CanvasError::DeviceLost("present failed".into()))
        } else {
            Ok(())
        }
    }
}

#[test]
fn drop_closes_session_once() {
    let closes = Rc::new(Cell::new(0));
    let args = CanvasDrawingEventArgs::new(CountingSession::new(&closes));
    for _ in 0..3 {
        args.drawing_session().unwrap().commands.push("clear");
    }
    assert_eq!(closes.get(), 0);
    drop(args);
    assert_eq!(closes.get(), 1);
}

#[test]
fn explicit_close_then_drop_closes_once() {
    let closes = Rc::new(Cell::new(0));
    let args = CanvasDrawingEventArgs::new(CountingSession::new(&closes));
    args.close().unwrap();
    args.close().unwrap();
    assert!(args.is_closed());
    drop(args);
    assert_eq!(closes.get(), 1);
}

#[test]
fn session_is_unavailable_after_close() {
    let closes = Rc::new(Cell::new(0));
    let args = CanvasDrawingEventArgs::new(CountingSession::new(&closes));
    args.close().unwrap();
    assert!(matches!(
        args.drawing_session(),
        Err(CanvasError::DrawingSession(_))
    ));
}

#[test]
fn overlapping_borrows_are_rejected() {
    let closes = Rc::new(Cell::new(0));
    let args = CanvasDrawingEventArgs::new(CountingSession::new(&closes));
    let held = args.drawing_session().unwrap();
    assert!(args.drawing_session().is_err());
    assert!(args.close().is_err());
    drop(held);
    assert!(args.close().is_ok());
    assert_eq!(closes.get(), 1);
}

#[test]
fn close_reports_session_failure() {
    let closes = Rc::new(Cell::new(0));
    let mut session = CountingSession::new(&closes);
    session.fail_close = true;
    let args = CanvasDrawingEventArgs::new(session);
    assert!(args.close().unwrap_err().is_device_lost());
    drop(args);
    assert_eq!(closes.get(), 1);
}
