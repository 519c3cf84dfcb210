use approx::assert_relative_eq;

use gems::core::error::GemsError;
use gems::core::layout::{ScreenPos, StimulusLayout, layout};

#[test]
fn default_display_grid() {
    let slots = layout(3, 3, (1080.0, 1080.0), 240.0);
    assert_eq!(slots.len(), 9);
    assert_eq!(slots[0], ScreenPos::new(-300.0, -300.0));
    assert_eq!(slots[4], ScreenPos::new(0.0, 0.0));
    assert_eq!(slots[8], ScreenPos::new(300.0, 300.0));
    // Columns outer, rows inner.
    assert_eq!(slots[1], ScreenPos::new(-300.0, 0.0));
    assert_eq!(slots[2], ScreenPos::new(-300.0, 300.0));
}

#[test]
fn rectangular_viewport_spacing() {
    let slots = layout(2, 4, (800.0, 400.0), 100.0);
    assert_eq!(slots.len(), 8);
    let xs: Vec<f32> = slots.iter().step_by(2).map(|p| p.x).collect();
    assert_relative_eq!(xs[0], -300.0);
    assert_relative_eq!(xs[1], -100.0);
    assert_relative_eq!(xs[2], 100.0);
    assert_relative_eq!(xs[3], 300.0);
    assert_relative_eq!(slots[0].y, -100.0);
    assert_relative_eq!(slots[1].y, 100.0);
}

#[test]
fn single_slot_sits_at_the_start_corner() {
    let slots = layout(1, 1, (1080.0, 1080.0), 240.0);
    assert_eq!(slots, vec![ScreenPos::new(-300.0, -300.0)]);
    assert_eq!(layout(1, 1, (100.0, 100.0), 0.0), vec![ScreenPos::new(-50.0, -50.0)]);
}

#[test]
fn hit_test_uses_the_stimulus_radius() {
    let layout = StimulusLayout::new(3, 3, (1080.0, 1080.0), 240.0, 60.0).unwrap();
    assert_eq!(layout.hit_test(ScreenPos::new(0.0, 0.0)), Some(4));
    assert_eq!(layout.hit_test(ScreenPos::new(29.0, 0.0)), Some(4));
    assert_eq!(layout.hit_test(ScreenPos::new(31.0, 0.0)), None);
    assert_eq!(layout.hit_test(ScreenPos::new(-300.0, 300.0)), Some(2));
}

#[test]
fn invalid_geometry_is_a_configuration_error() {
    for result in [
        StimulusLayout::new(0, 3, (1080.0, 1080.0), 240.0, 60.0),
        StimulusLayout::new(3, 3, (1080.0, 1080.0), 240.0, 0.0),
        StimulusLayout::new(3, 3, (400.0, 1080.0), 240.0, 60.0),
    ] {
        assert!(matches!(result, Err(GemsError::Configuration(_))));
    }
}

#[test]
fn two_by_two_without_margin_hits_the_corners() {
    assert_eq!(
        layout(2, 2, (100.0, 100.0), 0.0),
        vec![
            ScreenPos::new(-50.0, -50.0),
            ScreenPos::new(-50.0, 50.0),
            ScreenPos::new(50.0, -50.0),
            ScreenPos::new(50.0, 50.0),
        ]
    );
}
