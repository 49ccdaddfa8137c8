use dicematch::lowlevel::{rotate_u8_bilinear, AngleGrid};
use dicematch::{Angle, DiceMatchError, ImageView, Label, Template, TemplateBank};

fn gradient_template(width: usize, height: usize) -> Template {
    let data = (0..width * height)
        .map(|i| ((i % width) * 9 + (i / width) * 5) as u8)
        .collect();
    Template::new(data, width, height).unwrap()
}

#[test]
fn circular_distance_is_a_symmetric_bounded_metric() {
    for a in 0..360 {
        let a = Angle::new(a);
        assert_eq!(a.distance(a), 0);
        for b in 0..360 {
            let b = Angle::new(b);
            let d = a.distance(b);
            assert_eq!(d, b.distance(a));
            assert!(d <= 180);
        }
    }
    assert_eq!(Angle::new(350).distance(Angle::new(10)), 20);
    assert_eq!(Angle::new(-90), Angle::new(270));
}

#[test]
fn angle_grid_full_range_and_window() {
    let grid = AngleGrid::new(90).unwrap();
    assert_eq!(grid.len(), 4);
    let degrees: Vec<u16> = grid.angles().iter().map(|a| a.degrees()).collect();
    assert_eq!(degrees, vec![0, 90, 180, 270]);

    assert_eq!(grid.nearest(Angle::new(179)), Angle::new(180));
    assert_eq!(grid.nearest(Angle::new(-91)), Angle::new(270));

    let window: Vec<u16> = grid
        .within(Angle::ZERO, 95)
        .iter()
        .map(|a| a.degrees())
        .collect();
    assert_eq!(window, vec![0, 90, 270]);

    let coarse: Vec<u16> = grid.coarse_subset(180).iter().map(|a| a.degrees()).collect();
    assert_eq!(coarse, vec![0, 180]);

    assert!(AngleGrid::new(0).is_err());
    assert!(AngleGrid::new(360).is_err());
}

#[test]
fn rotate_u8_bilinear_identity_and_180() {
    let width = 4;
    let height = 3;
    let data: Vec<u8> = (0u8..(width * height) as u8).collect();
    let view = ImageView::from_slice(&data, width, height).unwrap();

    let rotated = rotate_u8_bilinear(view, 0.0, 0);
    assert_eq!(rotated.data(), data.as_slice());

    let rotated_180 = rotate_u8_bilinear(view, 180.0, 0);
    let mut expected = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            expected[y * width + x] = data[(height - 1 - y) * width + (width - 1 - x)];
        }
    }
    assert_eq!(rotated_180.data(), expected.as_slice());
}

#[test]
fn rotate_constant_image_with_matching_fill() {
    let data = vec![7u8; 5 * 4];
    let view = ImageView::from_slice(&data, 5, 4).unwrap();
    let rotated = rotate_u8_bilinear(view, 33.0, 7);
    assert!(rotated.data().iter().all(|&v| v == 7));
}

#[test]
fn bank_caches_one_plan_per_grid_angle() {
    let mut bank = TemplateBank::new(AngleGrid::new(90).unwrap(), 0);
    let label = Label::new(1).unwrap();
    bank.insert_template(label, &gradient_template(12, 10)).unwrap();

    let first = bank.rotated(label, Angle::new(90)).unwrap();
    let second = bank.rotated(label, Angle::new(90)).unwrap();
    assert!(std::ptr::eq(first, second));
    assert_eq!(first.width(), 12);
    assert_eq!(first.height(), 10);
    assert!(bank.rotated(label, Angle::new(45)).is_none());
    assert!(bank.upright(label).is_some());

    let err = bank
        .insert_template(label, &gradient_template(12, 10))
        .unwrap_err();
    assert_eq!(err, DiceMatchError::DuplicateLabel { label: 1 });
}

#[test]
fn pre_rotated_sets_leave_missing_slots_empty() {
    let mut bank = TemplateBank::new(AngleGrid::new(90).unwrap(), 0);
    let label = Label::new(2).unwrap();
    bank.insert_rotations(label, [(Angle::new(180), gradient_template(8, 8))])
        .unwrap();
    assert!(bank.rotated(label, Angle::new(180)).is_some());
    assert!(bank.rotated(label, Angle::ZERO).is_none());
    assert!(bank.upright(label).is_none());

    let off_grid = bank.insert_rotations(
        Label::new(3).unwrap(),
        [(Angle::new(45), gradient_template(8, 8))],
    );
    assert!(off_grid.is_err());
}
