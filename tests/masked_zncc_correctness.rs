use dicematch::lowlevel::{
    rotate_u8_bilinear_masked, Kernel, MaskedTemplatePlan, TemplatePlan, ZnccMaskedScalar,
    ZnccUnmaskedScalar,
};
use dicematch::ImageView;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn brute_force_best(image: ImageView<'_, u8>, tpl: &MaskedTemplatePlan) -> (usize, usize, f64) {
    let tpl_w = tpl.width();
    let tpl_h = tpl.height();
    let sum_w = tpl.sum_w() as f64;
    let var_t = tpl.var_t() as f64;
    let t_prime = tpl.t_prime();
    let mask = tpl.mask();

    let mut best = (0usize, 0usize, f64::NEG_INFINITY);
    for y in 0..=image.height() - tpl_h {
        for x in 0..=image.width() - tpl_w {
            let mut dot = 0.0f64;
            let mut sum_i = 0.0f64;
            let mut sum_i2 = 0.0f64;
            for ty in 0..tpl_h {
                let row = image.row(y + ty).expect("row in bounds");
                for tx in 0..tpl_w {
                    let idx = ty * tpl_w + tx;
                    if mask[idx] == 0 {
                        continue;
                    }
                    let value = row[x + tx] as f64;
                    dot += t_prime[idx] as f64 * value;
                    sum_i += value;
                    sum_i2 += value * value;
                }
            }
            let var_i = sum_i2 - (sum_i * sum_i) / sum_w;
            if var_i <= 1e-12 {
                continue;
            }
            let score = dot / (var_t * var_i).sqrt();
            if score > best.2 {
                best = (x, y, score);
            }
        }
    }
    best
}

fn extract(image: &[u8], width: usize, x0: usize, y0: usize, w: usize, h: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(w * h);
    for y in 0..h {
        let row = (y0 + y) * width;
        out.extend_from_slice(&image[row + x0..row + x0 + w]);
    }
    out
}

#[test]
fn zncc_finds_perfect_match_no_rotation() {
    let mut rng = StdRng::seed_from_u64(123);
    let width = 32;
    let height = 32;
    let image: Vec<u8> = (0..width * height).map(|_| rng.random_range(0..=255)).collect();

    let (tpl_w, tpl_h, x0, y0) = (11, 9, 7, 9);
    let tpl_data = extract(&image, width, x0, y0, tpl_w, tpl_h);
    let tpl_view = ImageView::from_slice(&tpl_data, tpl_w, tpl_h).unwrap();
    let image_view = ImageView::from_slice(&image, width, height).unwrap();

    let plan = TemplatePlan::from_view(tpl_view).unwrap();
    let best = ZnccUnmaskedScalar::scan_best(image_view, &plan, 1e-3).unwrap();
    assert_eq!((best.x, best.y), (x0, y0));
    assert!(best.score > 0.99);

    let mask = vec![1u8; tpl_w * tpl_h];
    let masked = MaskedTemplatePlan::from_view_mask(tpl_view, &mask).unwrap();
    let best_masked = ZnccMaskedScalar::scan_best(image_view, &masked, 1e-3).unwrap();
    assert_eq!((best_masked.x, best_masked.y), (x0, y0));
    assert!((best_masked.score - best.score).abs() < 1e-4);
}

#[test]
fn zncc_finds_rotated_match() {
    let (tpl_w, tpl_h) = (17, 17);
    let tpl_data: Vec<u8> = (0..tpl_w * tpl_h)
        .map(|i| (((i % tpl_w) * 17 + (i / tpl_w) * 31) % 255) as u8)
        .collect();
    let tpl_view = ImageView::from_slice(&tpl_data, tpl_w, tpl_h).unwrap();
    let (rotated, mask) = rotate_u8_bilinear_masked(tpl_view, 30.0, 0);
    let plan = MaskedTemplatePlan::from_view_mask(rotated.view(), &mask).unwrap();

    let (width, height, x0, y0) = (40, 40, 10, 8);
    let mut image = vec![0u8; width * height];
    for y in 0..tpl_h {
        for x in 0..tpl_w {
            let idx = y * tpl_w + x;
            if mask[idx] == 1 {
                image[(y0 + y) * width + x0 + x] = rotated.data()[idx];
            }
        }
    }

    let image_view = ImageView::from_slice(&image, width, height).unwrap();
    let best = ZnccMaskedScalar::scan_best(image_view, &plan, 1e-3).unwrap();
    assert_eq!((best.x, best.y), (x0, y0));
    assert!(best.score > 0.99);
}

#[test]
fn zncc_matches_bruteforce_on_small_case() {
    let (width, height) = (10, 10);
    let mut rng = StdRng::seed_from_u64(7);
    let image: Vec<u8> = (0..width * height).map(|_| rng.random_range(0..=255)).collect();
    let tpl_data = extract(&image, width, 2, 4, 4, 3);
    let tpl_view = ImageView::from_slice(&tpl_data, 4, 3).unwrap();
    let mask = vec![1u8, 1, 0, 1, 1, 1, 1, 1, 1, 0, 1, 1];
    let plan = MaskedTemplatePlan::from_view_mask(tpl_view, &mask).unwrap();

    let image_view = ImageView::from_slice(&image, width, height).unwrap();
    let (bx, by, bscore) = brute_force_best(image_view, &plan);
    let best = ZnccMaskedScalar::scan_best(image_view, &plan, 1e-3).unwrap();
    assert_eq!((best.x, best.y), (bx, by));
    assert!((best.score as f64 - bscore).abs() < 1e-4);
}

#[test]
fn flat_image_has_no_scorable_placement() {
    let tpl_data: Vec<u8> = (0u8..16).collect();
    let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl_data, 4, 4).unwrap()).unwrap();
    let image = vec![90u8; 20 * 20];
    let view = ImageView::from_slice(&image, 20, 20).unwrap();
    assert!(ZnccUnmaskedScalar::scan_best(view, &plan, 1e-3).is_none());
}
