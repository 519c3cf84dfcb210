use approx::assert_relative_eq;

use gems::core::coord::Coord;
use gems::core::error::GemsError;
use gems::core::landscape::{EXPORT_HEADER, Landscape, LandscapeParams};
use gems::core::score::{SimpleHill, score_function_from_name};

fn hill(seed: u64) -> Landscape {
    Landscape::new(
        LandscapeParams::default(),
        Box::new(SimpleHill::default()),
        Some(seed),
    )
    .unwrap()
}

#[test]
fn normalized_hill_peaks_at_one_hundred() {
    let mut landscape = hill(1);
    assert_eq!(landscape.score(Coord::new(50, 50)).unwrap(), 100);
    assert_eq!(landscape.score(Coord::new(0, 0)).unwrap(), 0);
    // Every other cell is strictly below the peak.
    assert!(landscape.score(Coord::new(49, 50)).unwrap() < 100);
    assert!(landscape.score(Coord::new(99, 99)).unwrap() < 100);
}

#[test]
fn raw_hill_matches_closed_form() {
    let mut landscape = Landscape::new(
        LandscapeParams::default(),
        Box::new(SimpleHill::raw_hill()),
        Some(1),
    )
    .unwrap();
    assert_eq!(landscape.score(Coord::new(50, 50)).unwrap(), 5000);
    assert_eq!(landscape.score(Coord::new(10, 20)).unwrap(), -100 - 400 + 1000 + 2000);
}

#[test]
fn features_follow_the_axes() {
    let landscape = hill(1);
    let origin = landscape.gabor(Coord::new(0, 0)).unwrap();
    assert_relative_eq!(origin.ori, 180.0);
    assert_relative_eq!(origin.sf, 0.05);

    let far = landscape.gabor(Coord::new(99, 99)).unwrap();
    assert_relative_eq!(far.ori, 1.8, epsilon = 1e-4);
    assert_relative_eq!(far.sf, 0.2, epsilon = 1e-6);

    // Orientation depends on x only; spatial frequency on y only.
    let a = landscape.gabor(Coord::new(30, 5)).unwrap();
    let b = landscape.gabor(Coord::new(30, 70)).unwrap();
    assert_relative_eq!(a.ori, b.ori);
    assert!(b.sf > a.sf);
}

#[test]
fn lookups_are_stable_and_cached() {
    let mut landscape = hill(3);
    let first = landscape.get(Coord::new(12, 34)).unwrap();
    let again = landscape.get(Coord::new(12, 34)).unwrap();
    assert_eq!(first, again);
    assert_eq!(landscape.cached_len(), 1);
}

#[test]
fn out_of_bounds_lookup_fails() {
    let mut landscape = hill(3);
    let err = landscape.get(Coord::new(100, 0)).unwrap_err();
    assert!(matches!(
        err,
        GemsError::OutOfBounds {
            n_cols: 100,
            n_rows: 100,
            ..
        }
    ));
    assert!(landscape.gabor(Coord::new(0, 100)).is_err());
}

#[test]
fn export_covers_the_grid_column_major() {
    let mut landscape = Landscape::new(
        LandscapeParams::with_dims(3, 4),
        score_function_from_name("flat", (0, 0), None).unwrap(),
        Some(0),
    )
    .unwrap();
    let cells: Vec<Coord> = landscape.export().map(|g| g.coord()).collect();
    assert_eq!(cells.len(), 12);
    assert_eq!(cells[0], Coord::new(0, 0));
    assert_eq!(cells[1], Coord::new(0, 1));
    assert_eq!(cells[3], Coord::new(1, 0));
    assert_eq!(cells[11], Coord::new(3, 2));

    // Restartable with identical content.
    let again: Vec<Coord> = landscape.export().map(|g| g.coord()).collect();
    assert_eq!(cells, again);
}

#[test]
fn csv_export_has_header_and_one_row_per_cell() {
    let mut landscape = Landscape::new(
        LandscapeParams::with_dims(2, 2),
        Box::new(SimpleHill::default()),
        Some(0),
    )
    .unwrap();
    let mut out = Vec::new();
    landscape.write_csv(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], EXPORT_HEADER);
    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with("0,0,180,0.05,"));
}

#[test]
fn seed_is_reported_when_drawn() {
    let a = Landscape::new(
        LandscapeParams::default(),
        Box::new(SimpleHill::default()),
        None,
    )
    .unwrap();
    let mut twin = Landscape::new(
        LandscapeParams::default(),
        Box::new(SimpleHill::default()),
        Some(a.seed()),
    )
    .unwrap();
    let mut a = a;
    let center = Coord::new(10, 10);
    assert_eq!(
        a.sample_neighborhood(center, 8, 9, Default::default()).unwrap(),
        twin.sample_neighborhood(center, 8, 9, Default::default()).unwrap()
    );
}
