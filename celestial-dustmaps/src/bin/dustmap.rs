use celestial_dustmaps::{
    AxisRange, ColorScale, Distance, DustMap, GalacticCoord, LosMap, QueryMode, QueryOptions,
    SkyPlot, StdPaths,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const DEFAULT_MAP_FILE: &str = "bayestar.dlos";

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Clone, Copy, ValueEnum)]
enum Frame {
    Galactic,
    Icrs,
}

#[derive(Parser)]
#[command(name = "dustmap")]
#[command(about = "Query 3D dust reddening maps and render all-sky plots")]
#[command(version)]
struct Cli {
    /// Path to the map file (default: <data dir>/bayestar.dlos)
    #[arg(long, global = true)]
    map: Option<PathBuf>,

    /// Use at most this many samples per pixel
    #[arg(long, global = true)]
    max_samples: Option<usize>,

    /// Seed for the random query modes
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print map information
    Info,
    /// Query reddening toward one position
    Query {
        /// Longitude in degrees (galactic l, or RA with --frame icrs)
        #[arg(allow_negative_numbers = true)]
        lon: f64,
        /// Latitude in degrees (galactic b, or Dec with --frame icrs)
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        /// Distance in kpc; omit for the whole sightline
        #[arg(long)]
        distance: Option<f64>,
        /// Coordinate frame of lon/lat
        #[arg(long, value_enum, default_value = "galactic")]
        frame: Frame,
        /// Query mode: median, mean, best, random_sample,
        /// random_sample_per_pix or percentile:<p>
        #[arg(long, default_value = "median")]
        mode: QueryMode,
        /// Print every sample instead of a single value
        #[arg(long)]
        samples: bool,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Render an all-sky reddening image
    Plot {
        /// Grid spacing in degrees
        #[arg(long, default_value = "5.0")]
        step: f64,
        /// Distance in kpc
        #[arg(long, default_value = "5.0")]
        distance: f64,
        /// Query mode
        #[arg(long, default_value = "median")]
        mode: QueryMode,
        /// Reddening shown as black
        #[arg(long, default_value = "0.0")]
        vmin: f64,
        /// Reddening shown as white
        #[arg(long, default_value = "1.5")]
        vmax: f64,
        /// Output file (default: <output dir>/bayestar.png)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let paths = StdPaths::discover();
    let map_path = cli
        .map
        .clone()
        .unwrap_or_else(|| paths.data_dir().join(DEFAULT_MAP_FILE));
    let options = QueryOptions {
        max_samples: cli.max_samples,
        seed: cli.seed,
    };

    match cli.command {
        Commands::Info => {
            let map = LosMap::open(&map_path, options)?;
            let size_mb = map.file_size() as f64 / 1_048_576.0;
            println!("{}", map.header());
            println!("Samples in use: {}", map.samples_in_use());
            println!("File size: {} bytes ({:.2} MB)", map.file_size(), size_mb);
        }
        Commands::Query {
            lon,
            lat,
            distance,
            frame,
            mode,
            samples,
            format,
        } => {
            let map = LosMap::open(&map_path, options)?;
            let mut coord = match frame {
                Frame::Galactic => GalacticCoord::new(lon, lat)?,
                Frame::Icrs => GalacticCoord::from_equatorial(lon, lat)?,
            };
            coord.set_distance(distance.map(Distance::from_kiloparsecs).transpose()?);

            let values = if samples {
                map.query_samples(&[coord])?.row(0).to_vec()
            } else {
                map.query(&[coord], mode)?
            };
            let row = QueryRow {
                l_deg: coord.longitude_deg(),
                b_deg: coord.latitude_deg(),
                distance_kpc: coord.distance().map(|d| d.kiloparsecs()),
                pixel: map.pixel_for(&coord),
                mode: if samples {
                    "samples".to_string()
                } else {
                    mode.to_string()
                },
                ebv: values,
            };
            match format {
                OutputFormat::Table => print_table(&row),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&row)?),
                OutputFormat::Csv => print_csv(&row),
            }
        }
        Commands::Plot {
            step,
            distance,
            mode,
            vmin,
            vmax,
            output,
        } => {
            let map = LosMap::open(&map_path, options)?;
            let plot = SkyPlot {
                longitude: AxisRange::new(-180.0, 180.0 + step * 0.02, step)?,
                latitude: AxisRange::new(-90.0, 90.0 + step * 0.02, step)?,
                distance: Some(Distance::from_kiloparsecs(distance)?),
                mode,
                scale: ColorScale::new(vmin, vmax)?,
                ..SkyPlot::default()
            };

            let start = Instant::now();
            let path = match output {
                Some(path) => {
                    plot.save_to(&map, &path)?;
                    path
                }
                None => plot.run(&map, &paths)?,
            };
            eprintln!(
                "Rendered {} in {:.2} ms",
                path.display(),
                start.elapsed().as_secs_f64() * 1000.0
            );
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(serde::Serialize)]
struct QueryRow {
    l_deg: f64,
    b_deg: f64,
    distance_kpc: Option<f64>,
    pixel: u64,
    mode: String,
    ebv: Vec<f64>,
}

fn print_table(row: &QueryRow) {
    let distance = row
        .distance_kpc
        .map_or("inf".to_string(), |d| format!("{:.3} kpc", d));
    println!(
        "l={:.6}° b={:+.6}° d={} pixel={} mode={}",
        row.l_deg, row.b_deg, distance, row.pixel, row.mode
    );
    for (i, v) in row.ebv.iter().enumerate() {
        println!("{:4}: E(B-V)={:.4}", i + 1, v);
    }
}

fn print_csv(row: &QueryRow) {
    println!("l_deg,b_deg,distance_kpc,pixel,mode,ebv");
    let distance = row.distance_kpc.map_or(String::new(), |d| d.to_string());
    for v in &row.ebv {
        println!(
            "{},{},{},{},{},{}",
            row.l_deg, row.b_deg, distance, row.pixel, row.mode, v
        );
    }
}
