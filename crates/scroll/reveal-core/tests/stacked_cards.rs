mod common;

use common::{lenient, load_document, run, Applied};
use reveal_core::{
    ContainerId, Crossing, ElementId, MemoryDocument, Property, Stage, StageEvent,
    StackedCardsSection, TriggerEvent, TriggerKind, Viewport,
};

fn mounted_with_id() -> (Stage<MemoryDocument>, Applied, ContainerId) {
    let preset = reveal_test_fixtures::sections::load("small-projects").expect("preset");
    let mut stage = Stage::new(
        lenient(),
        load_document("small-projects"),
        Viewport::new(1200.0, 1000.0),
    );
    let id = stage.mount(StackedCardsSection::new(preset)).expect("mount");
    let mut applied = Applied::default();
    // build is due 50ms after mount
    run(&mut stage, &mut applied, 0.0, 60.0, 20.0);
    (stage, applied, id)
}

fn mounted() -> (Stage<MemoryDocument>, Applied) {
    let (stage, applied, _) = mounted_with_id();
    (stage, applied)
}

#[test]
fn registers_pin_and_reveal_per_card() {
    let (stage, applied) = mounted();
    let kinds: Vec<TriggerKind> = stage.registry().iter().map(|t| t.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            TriggerKind::PinnedScrub,
            TriggerKind::OneShotReveal,
            TriggerKind::PinnedScrub,
            TriggerKind::OneShotReveal,
            TriggerKind::PinnedScrub,
            TriggerKind::OneShotReveal,
        ]
    );
    // hidden until revealed
    for card in [810, 820, 830] {
        assert_eq!(applied.get(card + 1, Property::ClipInsetTop), Some(100.0));
        for text in card + 2..card + 5 {
            assert_eq!(applied.get(text, Property::Opacity), Some(0.0));
            assert_eq!(applied.get(text, Property::TranslateY), Some(30.0));
        }
    }
    // later cards pin earlier relative to their own top
    let starts: Vec<f32> = stage
        .registry()
        .iter()
        .filter(|t| t.kind() == TriggerKind::PinnedScrub)
        .map(|t| stage.registry().zone(t.id()).unwrap().0)
        .collect();
    assert_eq!(starts, vec![1850.0, 2710.0, 3570.0]);
}

#[test]
fn first_card_reveals_text_after_image_while_others_wait() {
    let (mut stage, mut applied) = mounted();

    // card 1 reveal starts at 2000 - (500 + 100)
    stage.scroll_to(1450.0);
    let mut events = run(&mut stage, &mut applied, 80.0, 260.0, 20.0);

    // 0.2s in: image under way, text still waiting for its 0.3s delay
    let clip = applied.get(811, Property::ClipInsetTop).unwrap();
    assert!(clip > 0.0 && clip < 100.0, "clip={clip}");
    assert_eq!(applied.get(812, Property::Opacity), Some(0.0));

    events.extend(run(&mut stage, &mut applied, 280.0, 460.0, 20.0));
    // 0.4s in: first text item moving, second one staggered 0.15s later
    assert!(applied.get(812, Property::Opacity).unwrap() > 0.0);
    assert_eq!(applied.get(813, Property::Opacity), Some(0.0));

    events.extend(run(&mut stage, &mut applied, 480.0, 2500.0, 20.0));
    assert_eq!(applied.get(811, Property::ClipInsetTop), Some(0.0));
    for text in 812..815 {
        assert_eq!(applied.get(text, Property::Opacity), Some(1.0));
        assert_eq!(applied.get(text, Property::TranslateY), Some(0.0));
    }
    for card in [820, 830] {
        assert_eq!(applied.get(card + 1, Property::ClipInsetTop), Some(100.0));
        assert_eq!(applied.get(card + 2, Property::Opacity), Some(0.0));
    }

    let enters = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                StageEvent::Trigger {
                    event: TriggerEvent::Crossed {
                        crossing: Crossing::Enter,
                        ..
                    }
                }
            )
        })
        .count();
    assert_eq!(enters, 1);
}

#[test]
fn cards_pin_and_shrink_by_depth() {
    let (mut stage, mut applied) = mounted();
    stage.scroll_to(1900.0);
    let events = run(&mut stage, &mut applied, 80.0, 100.0, 20.0);
    assert!(events.iter().any(|e| matches!(
        e,
        StageEvent::Trigger {
            event: TriggerEvent::Pinned { target, .. }
        } if *target == ElementId(810)
    )));
    assert_eq!(applied.get(810, Property::PinOffset), Some(50.0));

    // fully scrubbed at the container's "bottom bottom"
    stage.scroll_to(4000.0);
    run(&mut stage, &mut applied, 120.0, 140.0, 20.0);
    let scale = |el| applied.get(el, Property::Scale).unwrap();
    assert!((scale(810) - 0.9).abs() < 1e-4);
    assert!((scale(820) - 0.95).abs() < 1e-4);
    assert!((scale(830) - 1.0).abs() < 1e-4);
}

#[test]
fn unmount_restores_every_property() {
    let (mut stage, mut applied, id) = mounted_with_id();
    stage.scroll_to(2000.0);
    run(&mut stage, &mut applied, 80.0, 1000.0, 20.0);
    assert!(!applied.is_empty());

    assert!(stage.unmount(id));
    run(&mut stage, &mut applied, 1020.0, 1020.0, 20.0);
    assert!(applied.is_empty());
    assert!(stage.registry().is_empty());
}
