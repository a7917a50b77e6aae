//! Query 3D dust reddening maps on galactic coordinate grids and render the
//! result as images.
//!
//! The reddening engine sits behind the [`DustMap`] trait: given galactic
//! coordinates (with optional distance) and a [`QueryMode`], it returns one
//! E(B-V) value per coordinate. The crate ships one engine of its own,
//! [`LosMap`], a memory-mapped HEALPix table of cumulative reddening curves.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`paths`] | [`StdPaths`]: data, test and output directories |
//! | [`coords`] | [`GalacticCoord`], [`Distance`], equatorial conversion |
//! | [`grid`] | [`AxisRange`], [`CoordGrid`] meshgrids |
//! | [`query`] | [`DustMap`] trait, [`QueryMode`], [`QueryOptions`] |
//! | [`los`] | [`LosMap`] reader and [`LosMapWriter`] |
//! | [`render`] | Gray-level scaling, axis flips, PNG output |
//! | [`plot`] | [`SkyPlot`], the query-and-render pipeline |
//!
//! # Quick Start
//!
//! ```ignore
//! use celestial_dustmaps::{LosMap, QueryOptions, SkyPlot, StdPaths};
//!
//! let paths = StdPaths::discover();
//! let map_path = paths.data_dir().join("bayestar.dlos");
//! let map = LosMap::open(map_path, QueryOptions::with_max_samples(1))?;
//! let png = SkyPlot::default().run(&map, &paths)?;
//! ```
//!
//! # Features
//!
//! - **`png`** (default) — PNG output through the `image` crate.
//! - **`serde`** — `Serialize`/`Deserialize` for coordinates and query modes.
//! - **`cli`** — the `dustmap` binary.

pub mod coords;
pub mod errors;
pub mod grid;
pub mod healpix;
pub mod los;
pub mod paths;
pub mod plot;
pub mod query;
pub mod render;
mod stats;

pub use coords::{Distance, GalacticCoord};
pub use errors::{DustMapError, DustMapResult};
pub use grid::{AxisRange, CoordGrid};
pub use los::{LosHeader, LosMap, LosMapWriter};
pub use paths::StdPaths;
pub use plot::SkyPlot;
pub use query::{DustMap, QueryMode, QueryOptions};
pub use render::ColorScale;
