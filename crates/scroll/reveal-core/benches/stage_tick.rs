use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reveal_core::{
    Bounds, Config, Ease, ElementId, ElementSpec, MemoryDocument, Property, PropertyRange,
    RevealGroup, RevealPreset, RevealSection, Stage, TweenSpec, Viewport, ZoneEdge,
};

const ITEMS_PER_SECTION: u32 = 6;

fn bounds(top: f32, height: f32) -> Bounds {
    Bounds {
        top,
        height,
        width: 1280.0,
    }
}

fn build_stage(sections: u32) -> Stage<MemoryDocument> {
    let mut doc = MemoryDocument::new();
    for s in 0..sections {
        let root = (s + 1) * 100;
        let top = s as f32 * 1000.0;
        doc.insert(ElementSpec::new(root, None, &["section"], bounds(top, 900.0)));
        for i in 0..ITEMS_PER_SECTION {
            doc.insert(ElementSpec::new(
                root + 1 + i,
                Some(root),
                &["item"],
                bounds(top + 50.0 + i as f32 * 120.0, 100.0),
            ));
        }
    }
    let cfg = Config {
        strict_contracts: false,
        ..Config::default()
    };
    let mut stage = Stage::new(cfg, doc, Viewport::new(1280.0, 800.0));
    let start: ZoneEdge = "top 70%".parse().expect("zone");
    for s in 0..sections {
        let tween = TweenSpec::new(
            vec![
                PropertyRange::new(Property::Opacity, 0.0, 1.0),
                PropertyRange::new(Property::TranslateY, 40.0, 0.0),
            ],
            0.8,
        )
        .with_stagger(0.15)
        .with_ease("power2.out".parse::<Ease>().expect("ease"));
        let preset = RevealPreset {
            root: ElementId((s + 1) * 100),
            start,
            end: None,
            once: s % 2 == 0,
            toggle_actions: "play none none reverse".parse().expect("actions"),
            groups: vec![RevealGroup {
                selector: ".item".into(),
                tween,
            }],
            header_bar: None,
        };
        stage
            .mount(RevealSection::new(preset))
            .expect("mount section");
    }
    // run the deferred builds
    stage.tick(0.0);
    stage.tick(100.0);
    stage
}

fn tick_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("stage_tick");
    for sections in [8u32, 64, 256] {
        let mut stage = build_stage(sections);
        let height = sections as f32 * 1000.0;
        let mut now = 100.0;
        let mut scroll = 0.0f32;
        group.bench_with_input(BenchmarkId::from_parameter(sections), &sections, |b, _| {
            b.iter(|| {
                now += 16.0;
                scroll = (scroll + 37.0) % height;
                stage.scroll_to(scroll);
                black_box(stage.tick(black_box(now)))
            })
        });
    }
    group.finish();
}

fn refresh_benchmark(c: &mut Criterion) {
    let mut stage = build_stage(64);
    c.bench_function("refresh_64_sections", |b| {
        b.iter(|| {
            stage.refresh();
            black_box(stage.registry().len())
        })
    });
}

criterion_group!(benches, tick_benchmark, refresh_benchmark);
criterion_main!(benches);
