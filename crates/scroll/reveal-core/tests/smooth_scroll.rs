mod common;

use common::{lenient, run, smooth_scroll_serial, Applied};
use reveal_core::{
    Bounds, Config, Crossing, ElementId, ElementSpec, MemoryDocument, Property, RevealError,
    RevealSection, Stage, StageEvent, TriggerEvent, Viewport,
};

const WRAPPER: ElementId = ElementId(1);
const CONTENT: ElementId = ElementId(2);

fn doc() -> MemoryDocument {
    let b = |top, height| Bounds {
        top,
        height,
        width: 1200.0,
    };
    let mut doc = MemoryDocument::new();
    doc.insert(ElementSpec::new(1, None, &["smooth-wrapper"], b(0.0, 1000.0)));
    doc.insert(ElementSpec::new(2, Some(1), &["smooth-content"], b(0.0, 6000.0)));
    doc.insert(ElementSpec::new(700, Some(2), &["contact"], b(3000.0, 600.0)));
    doc.insert(ElementSpec::new(701, Some(700), &["contact-line"], b(3050.0, 80.0)));
    doc
}

fn stage(cfg: Config) -> Stage<MemoryDocument> {
    Stage::new(cfg, doc(), Viewport::new(1200.0, 1000.0))
}

#[test]
fn start_stop_restart() {
    let _serial = smooth_scroll_serial();
    let mut stage = stage(lenient());
    stage.start_smooth_scroll(WRAPPER, CONTENT).unwrap();
    assert_eq!(
        stage.start_smooth_scroll(WRAPPER, CONTENT),
        Err(RevealError::SmoothScrollActive)
    );
    assert_eq!(stage.smooth_scroll().map(|h| h.wrapper()), Some(WRAPPER));

    stage.stop_smooth_scroll().unwrap();
    assert_eq!(
        stage.stop_smooth_scroll(),
        Err(RevealError::SmoothScrollInactive)
    );
    assert!(stage.smooth_scroll().is_none());

    stage.start_smooth_scroll(WRAPPER, CONTENT).unwrap();
    assert!(stage.smooth_scroll().is_some());
}

#[test]
fn one_proxy_per_process_across_stages() {
    let _serial = smooth_scroll_serial();
    let mut a = stage(lenient());
    let mut b = stage(lenient());
    a.start_smooth_scroll(WRAPPER, CONTENT).unwrap();
    assert_eq!(
        b.start_smooth_scroll(WRAPPER, CONTENT),
        Err(RevealError::SmoothScrollActive)
    );
    drop(a);
    b.start_smooth_scroll(WRAPPER, CONTENT).unwrap();
}

#[test]
#[should_panic(expected = "smooth scroll started twice")]
fn strict_second_start_panics() {
    let _serial = smooth_scroll_serial();
    let cfg = Config {
        strict_contracts: true,
        ..Config::default()
    };
    let mut stage = stage(cfg);
    stage.start_smooth_scroll(WRAPPER, CONTENT).unwrap();
    let _ = stage.start_smooth_scroll(WRAPPER, CONTENT);
}

#[test]
fn start_takes_over_current_offset() {
    let _serial = smooth_scroll_serial();
    let mut stage = stage(lenient());
    stage.scroll_to(1800.0);
    stage.start_smooth_scroll(WRAPPER, CONTENT).unwrap();
    assert_eq!(stage.scroll_offset(), 1800.0);
    assert_eq!(stage.tick(0.0).scroll, 1800.0);
}

#[test]
fn triggers_follow_the_virtual_offset() {
    let _serial = smooth_scroll_serial();
    let mut stage = stage(lenient());
    let mut applied = Applied::default();
    stage.start_smooth_scroll(WRAPPER, CONTENT).unwrap();
    let section =
        RevealSection::new(reveal_test_fixtures::sections::load("contact").expect("preset"));
    stage.mount(section).unwrap();
    run(&mut stage, &mut applied, 0.0, 60.0, 20.0);

    // zone starts at 2200; the native offset jumps past it at once
    stage.scroll_to(2500.0);
    let frame = stage.tick(80.0);
    applied.apply(&frame);
    assert!(frame.scroll > 0.0 && frame.scroll < 2200.0);
    assert!(frame.events.is_empty());
    assert_eq!(applied.get(701, Property::Opacity), Some(0.0));

    let mut entered_at = None;
    let mut now = 100.0;
    while now < 4000.0 && entered_at.is_none() {
        let frame = stage.tick(now);
        applied.apply(&frame);
        let entered = frame.events.iter().any(|e| {
            matches!(
                e,
                StageEvent::Trigger {
                    event: TriggerEvent::Crossed {
                        crossing: Crossing::Enter,
                        ..
                    }
                }
            )
        });
        if entered {
            entered_at = Some(frame.scroll);
        }
        now += 20.0;
    }
    let scroll = entered_at.expect("trigger should fire once smoothing catches up");
    assert!((2200.0..=2500.0).contains(&scroll));

    run(&mut stage, &mut applied, now, now + 4000.0, 20.0);
    assert_eq!(stage.scroll_offset(), 2500.0);
    assert_eq!(applied.get(701, Property::Opacity), Some(1.0));
}

#[test]
fn stopping_returns_to_native_offset() {
    let _serial = smooth_scroll_serial();
    let mut stage = stage(lenient());
    stage.start_smooth_scroll(WRAPPER, CONTENT).unwrap();
    stage.tick(0.0);
    stage.scroll_to(900.0);
    assert!(stage.tick(16.0).scroll < 900.0);
    stage.stop_smooth_scroll().unwrap();
    assert_eq!(stage.tick(32.0).scroll, 900.0);
}
