//! Median reddening out to 5 kpc over the whole sky, saved as
//! `<output dir>/bayestar.png`.
//!
//! Usage: plot_bayestar [map.dlos]

use celestial_dustmaps::{LosMap, QueryOptions, SkyPlot, StdPaths};
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let paths = StdPaths::discover();
    let map_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| paths.data_dir().join("bayestar.dlos"));

    let map = LosMap::open(&map_path, QueryOptions::with_max_samples(1))?;
    let output = SkyPlot::default().run(&map, &paths)?;

    println!("Wrote {}", output.display());
    Ok(())
}
