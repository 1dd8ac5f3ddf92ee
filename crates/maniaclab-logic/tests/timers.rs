//! Timer queue semantics against a live level.

use std::cell::RefCell;
use std::rc::Rc;

use maniaclab_logic::{Level, Timer};

#[test]
fn timers_fire_once_in_trigger_order() {
    let mut level = Level::with_seed(4, 4, 20);
    let log = Rc::new(RefCell::new(Vec::new()));

    for trigger_at in [3u32, 1, 2] {
        let log = Rc::clone(&log);
        level.add_timer(Timer::new(
            trigger_at,
            -1,
            -1,
            Box::new(move |_| log.borrow_mut().push(trigger_at)),
        ));
    }

    for _ in 0..5 {
        level.update();
    }

    assert_eq!(*log.borrow(), vec![1, 2, 3]);
}

#[test]
fn timer_scheduled_for_the_current_tick_fires_in_the_same_drain() {
    let mut level = Level::with_seed(4, 4, 21);
    let log = Rc::new(RefCell::new(Vec::new()));

    let outer_log = Rc::clone(&log);
    level.add_timer(Timer::new(
        2,
        -1,
        -1,
        Box::new(move |level| {
            outer_log.borrow_mut().push("outer");
            let inner_log = Rc::clone(&outer_log);
            let now = level.get_ticks();
            level.add_timer(Timer::new(
                now,
                -1,
                -1,
                Box::new(move |_| inner_log.borrow_mut().push("inner")),
            ));
        }),
    ));

    level.update();
    assert!(log.borrow().is_empty());
    level.update();
    assert_eq!(*log.borrow(), vec!["outer", "inner"]);
}

#[test]
fn overdue_timers_fire_on_the_next_update() {
    let mut level = Level::with_seed(4, 4, 22);
    let fired = Rc::new(RefCell::new(0u32));

    let seen = Rc::clone(&fired);
    level.add_timer(Timer::new(
        0,
        -1,
        -1,
        Box::new(move |_| *seen.borrow_mut() += 1),
    ));

    level.update();
    assert_eq!(*fired.borrow(), 1);
    level.update();
    assert_eq!(*fired.borrow(), 1, "timers are one-shot");
}

#[test]
fn timer_cell_coordinates_are_kept() {
    let timer = Timer::new(5, 2, 3, Box::new(|_| {}));
    assert_eq!((timer.trigger_at, timer.x, timer.y), (5, 2, 3));
}
