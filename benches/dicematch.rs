use criterion::{criterion_group, criterion_main, Criterion};
use dicematch::lowlevel::{rotate_u8_bilinear_masked, AngleGrid};
use dicematch::{
    CascadeConfig, CascadeSearch, CoarseFineSearch, ImageView, Label, OrientationConfig,
    OrientationScorer, OwnedImage, ScoreResult, Template, TemplateBank, Unscored,
    ZnccOrientationScorer,
};
use std::hint::black_box;

const TPL: usize = 48;

fn make_template(seed: usize) -> Template {
    let mut data = Vec::with_capacity(TPL * TPL);
    for y in 0..TPL {
        for x in 0..TPL {
            let value = ((x * (13 + seed)) ^ (y * 7) ^ (x * y / 4)) & 0xFF;
            data.push(value as u8);
        }
    }
    Template::new(data, TPL, TPL).unwrap()
}

fn make_probe(template: &Template, angle_deg: f32) -> OwnedImage {
    let (width, height) = (96, 96);
    let mut data: Vec<u8> = (0..width * height).map(|i| ((i * 31) % 251) as u8).collect();
    let (rotated, mask) = rotate_u8_bilinear_masked(template.view(), angle_deg, 0);
    for y in 0..TPL {
        for x in 0..TPL {
            let idx = y * TPL + x;
            if mask[idx] == 1 {
                data[(20 + y) * width + 24 + x] = rotated.data()[idx];
            }
        }
    }
    OwnedImage::new(data, width, height).unwrap()
}

/// Scores every label at every fine angle.
fn exhaustive<S: OrientationScorer>(scorer: &S, grid: &AngleGrid) -> Option<ScoreResult> {
    let mut best: Option<ScoreResult> = None;
    for label in scorer.labels() {
        for &angle in grid.angles() {
            if let Ok(result) = scorer.score(label, angle) {
                if best.map_or(true, |b| result.confidence > b.confidence) {
                    best = Some(result);
                }
            }
        }
    }
    best
}

fn bench_orientation(c: &mut Criterion) {
    let grid = AngleGrid::new(10).unwrap();
    let mut bank = TemplateBank::new(grid.clone(), 0);
    let templates: Vec<Template> = (0..6).map(make_template).collect();
    for (idx, template) in templates.iter().enumerate() {
        bank.insert_template(Label::from_index(idx).unwrap(), template)
            .unwrap();
    }
    let probe = make_probe(&templates[2], 50.0);
    let scorer = ZnccOrientationScorer::new(&bank, probe.view()).unwrap();
    let search = CoarseFineSearch::new(OrientationConfig::default()).unwrap();

    c.bench_function("orientation_coarse_fine", |b| {
        b.iter(|| black_box(search.run(&scorer).unwrap()));
    });

    c.bench_function("orientation_exhaustive", |b| {
        b.iter(|| black_box(exhaustive(&scorer, &grid)));
    });

    #[cfg(feature = "rayon")]
    c.bench_function("orientation_coarse_fine_parallel", |b| {
        b.iter(|| black_box(search.run_par(&scorer).unwrap()));
    });
}

fn bench_cascade(c: &mut Criterion) {
    let image = make_probe(&make_template(0), 0.0);
    let search = CascadeSearch::new(CascadeConfig::default()).unwrap();
    // Never confident: the cascade walks every batch.
    let scorer = |view: ImageView<'_, u8>| -> Result<ScoreResult, Unscored> {
        let mean = view.mean_luminance() / 255.0;
        Ok(ScoreResult::new(Label::new(1).unwrap(), mean * 0.5))
    };

    c.bench_function("cascade_exhausted", |b| {
        b.iter(|| black_box(search.run(image.view(), &scorer).unwrap()));
    });
}

criterion_group!(benches, bench_orientation, bench_cascade);
criterion_main!(benches);
