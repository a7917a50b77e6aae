use celestial_dustmaps::healpix::ang2pix_nest;
use celestial_dustmaps::{
    Distance, DustMap, GalacticCoord, LosMap, LosMapWriter, QueryMode, QueryOptions, SkyPlot,
    StdPaths,
};
use tempfile::TempDir;

/// Order-2 map over dm 4..16 (2.5..16 kpc is past the end). Reddening
/// grows towards the galactic plane; the northern cap is left uncovered.
fn build_map(dir: &TempDir) -> std::path::PathBuf {
    let order = 2;
    let mut writer = LosMapWriter::new(order, 4, 3, 4.0, 16.0).unwrap();

    for l in (0..360).step_by(2) {
        for b in (-88..=60).step_by(2) {
            let pixel = ang2pix_nest(order, l as f64, b as f64);
            let total = (1.0 - (b as f32).abs() / 90.0) * 1.2;
            let best: Vec<f32> = (1..=4).map(|i| total * i as f32 / 4.0).collect();
            let samples: Vec<Vec<f32>> = [0.9f32, 1.0, 1.1]
                .iter()
                .map(|k| best.iter().map(|v| v * k).collect())
                .collect();
            writer.set_pixel(pixel, &best, &samples).unwrap();
        }
    }

    let path = dir.path().join("data").join("test.dlos");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    writer.write(&path).unwrap();
    path
}

#[cfg(feature = "png")]
#[test]
fn test_default_plot_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let map_path = build_map(&dir);
    let paths = StdPaths::from_root(dir.path());

    let map = LosMap::open(&map_path, QueryOptions::with_max_samples(1)).unwrap();
    let output = SkyPlot::default().run(&map, &paths).unwrap();

    assert_eq!(output, paths.output_dir().join("bayestar.png"));
    let img = image::open(&output).unwrap().to_luma8();
    assert_eq!(img.dimensions(), (73, 37));

    // Uncovered north pole renders black; the plane is brighter than the
    // southern polar cap.
    let north = img.get_pixel(36, 0).0[0];
    let plane = img.get_pixel(36, 18).0[0];
    let south = img.get_pixel(36, 35).0[0];
    assert_eq!(north, 0);
    assert!(plane > south, "plane {} vs south {}", plane, south);
}

#[test]
fn test_grid_query_shape_and_coverage() {
    let dir = tempfile::tempdir().unwrap();
    let map = LosMap::open(build_map(&dir), QueryOptions::default()).unwrap();

    let values = SkyPlot::default().query(&map).unwrap();
    assert_eq!(values.dim(), (37, 73));
    assert!(values[[36, 10]].is_nan(), "north pole should be uncovered");
    assert!(values[[18, 10]].is_finite());
}

#[test]
fn test_distance_monotonic_along_sightline() {
    let dir = tempfile::tempdir().unwrap();
    let map = LosMap::open(build_map(&dir), QueryOptions::default()).unwrap();

    let coords: Vec<GalacticCoord> = [0.1, 0.5, 1.0, 2.0, 5.0, 20.0]
        .iter()
        .map(|&kpc| {
            GalacticCoord::with_distance(120.0, 2.0, Distance::from_kiloparsecs(kpc).unwrap())
                .unwrap()
        })
        .collect();

    let values = map.query(&coords, QueryMode::Best).unwrap();
    for pair in values.windows(2) {
        assert!(pair[1] >= pair[0], "not monotonic: {:?}", values);
    }

    let mut far = coords[5];
    far.set_distance(None);
    let total = map.query(&[far], QueryMode::Best).unwrap()[0];
    assert!((total - values[5]).abs() < 1e-9);
}

#[test]
fn test_modes_bracket_each_other() {
    let dir = tempfile::tempdir().unwrap();
    let map = LosMap::open(build_map(&dir), QueryOptions::default()).unwrap();
    let coord = [GalacticCoord::new(300.0, -20.0).unwrap()];

    let p5 = map.query(&coord, QueryMode::Percentile(5.0)).unwrap()[0];
    let median = map.query(&coord, QueryMode::Median).unwrap()[0];
    let p95 = map.query(&coord, QueryMode::Percentile(95.0)).unwrap()[0];
    let best = map.query(&coord, QueryMode::Best).unwrap()[0];

    assert!(p5 < median && median < p95);
    assert!((median - best).abs() < 1e-6);
}

#[test]
fn test_equatorial_query_lands_on_galactic_position() {
    let dir = tempfile::tempdir().unwrap();
    let map = LosMap::open(build_map(&dir), QueryOptions::default()).unwrap();

    // Betelgeuse: RA 88.7929°, Dec +7.4071° is l = 199.787°, b = -8.959°.
    let eq = GalacticCoord::from_equatorial(88.7929, 7.4071).unwrap();
    assert!((eq.longitude_deg() - 199.787).abs() < 0.01, "l = {}", eq.longitude_deg());
    assert!((eq.latitude_deg() + 8.959).abs() < 0.01, "b = {}", eq.latitude_deg());

    let gal = GalacticCoord::new(199.787, -8.959).unwrap();
    assert_eq!(map.pixel_for(&eq), ang2pix_nest(2, 199.787, -8.959));
    assert_eq!(
        map.query(&[eq], QueryMode::Median).unwrap(),
        map.query(&[gal], QueryMode::Median).unwrap()
    );
}
