use dicematch::lowlevel::{rotate_u8_bilinear_masked, AngleGrid};
use dicematch::{
    Angle, CascadeSearch, CoarseFineSearch, Decision, DecisionPolicy, ImageView, Label,
    OrientationConfig, OwnedImage, SearchConfig, Template, TemplateBank, TemplateClassifier,
    Termination, ZnccOrientationScorer,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TPL: usize = 33;

/// Smooth template: a few Gaussian blobs at seeded positions.
fn blob_template(seed: u64) -> Template {
    let mut rng = StdRng::seed_from_u64(seed);
    let blobs: Vec<(f32, f32, f32)> = (0..5)
        .map(|_| {
            (
                rng.random_range(6.0..27.0),
                rng.random_range(6.0..27.0),
                rng.random_range(80.0..160.0),
            )
        })
        .collect();
    let mut data = Vec::with_capacity(TPL * TPL);
    for y in 0..TPL {
        for x in 0..TPL {
            let mut v = 40.0f32;
            for &(bx, by, amp) in &blobs {
                let d2 = (x as f32 - bx).powi(2) + (y as f32 - by).powi(2);
                v += amp * (-d2 / (2.0 * 16.0)).exp();
            }
            data.push(v.min(255.0) as u8);
        }
    }
    Template::new(data, TPL, TPL).unwrap()
}

/// Pastes `template` rotated by `angle_deg` into a noisy probe at `(x0, y0)`.
fn probe_with(template: &Template, angle_deg: f32, x0: usize, y0: usize) -> OwnedImage {
    let (width, height) = (72, 64);
    let mut rng = StdRng::seed_from_u64(99);
    let mut data: Vec<u8> = (0..width * height).map(|_| rng.random_range(0..=255)).collect();
    let (rotated, mask) = rotate_u8_bilinear_masked(template.view(), angle_deg, 0);
    for y in 0..TPL {
        for x in 0..TPL {
            let idx = y * TPL + x;
            if mask[idx] == 1 {
                data[(y0 + y) * width + x0 + x] = rotated.data()[idx];
            }
        }
    }
    OwnedImage::new(data, width, height).unwrap()
}

fn six_sided_bank(step_deg: u16) -> (TemplateBank, Vec<Template>) {
    let mut bank = TemplateBank::new(AngleGrid::new(step_deg).unwrap(), 0);
    let templates: Vec<Template> = (1..=6).map(|seed| blob_template(seed * 17)).collect();
    for (idx, template) in templates.iter().enumerate() {
        bank.insert_template(Label::from_index(idx).unwrap(), template)
            .unwrap();
    }
    (bank, templates)
}

#[test]
fn coarse_sample_match_exits_early() {
    let (bank, templates) = six_sided_bank(10);
    let probe = probe_with(&templates[2], 40.0, 20, 15);
    let scorer = ZnccOrientationScorer::new(&bank, probe.view()).unwrap();

    let search = CoarseFineSearch::new(OrientationConfig {
        coarse_step_deg: 20,
        ..OrientationConfig::default()
    })
    .unwrap();
    let found = search.run(&scorer).unwrap();

    assert_eq!(found.label, Label::new(3).unwrap());
    assert_eq!(found.angle, Angle::new(40));
    assert_eq!(found.termination, Termination::EarlyExit);
    assert!(found.confidence > 0.99);
    let region = found.region.unwrap();
    assert_eq!((region.x, region.y), (20, 15));
    assert_eq!((region.width, region.height), (TPL, TPL));

    let decision = DecisionPolicy::default().decide(&found.result());
    assert_eq!(decision.label(), Some(Label::new(3).unwrap()));
}

#[test]
fn off_coarse_angle_is_refined() {
    let (bank, templates) = six_sided_bank(10);
    let probe = probe_with(&templates[4], 50.0, 30, 10);
    let scorer = ZnccOrientationScorer::new(&bank, probe.view()).unwrap();

    let search = CoarseFineSearch::new(OrientationConfig {
        early_exit_threshold: 0.999,
        ..OrientationConfig::default()
    })
    .unwrap();
    let found = search.run(&scorer).unwrap();

    assert_eq!(found.label, Label::new(5).unwrap());
    assert_eq!(found.angle, Angle::new(50));
    assert_eq!(found.termination, Termination::Refined);
    assert!(found.confidence > 0.99);
}

#[test]
fn cascade_with_template_classifier_recognizes_upright_view() {
    let (bank, templates) = six_sided_bank(90);
    let classifier = TemplateClassifier::new(&bank);
    let cfg = SearchConfig::default();
    let search: CascadeSearch = cfg.cascade_search().unwrap();

    let view = templates[1].view();
    let out = search.run(view, &classifier).unwrap();
    assert_eq!(out.termination, Termination::Accepted);
    assert_eq!(out.label, Label::new(2).unwrap());
    assert_eq!(out.stats.evaluations, 1);

    match cfg.decision.decide(&out.result()) {
        Decision::Recognized { label, region, .. } => {
            assert_eq!(label.get(), 2);
            assert_eq!(region.map(|r| (r.x, r.y)), Some((0, 0)));
        }
        other => panic!("expected recognition, got {other}"),
    }
}

#[test]
fn color_probe_is_classified_after_gray_conversion() {
    let (bank, templates) = six_sided_bank(90);
    let gray = templates[5].view().to_owned_image();
    let rgb: Vec<u8> = gray.data().iter().flat_map(|&v| [v, v, v]).collect();
    let color = ImageView::from_interleaved(&rgb, TPL, TPL, 3).unwrap();

    let search = SearchConfig::default().cascade_search().unwrap();
    let out = search.run(color, &TemplateClassifier::new(&bank)).unwrap();
    assert_eq!(out.label, Label::new(6).unwrap());
    assert_eq!(out.view.channels(), 3);
}
