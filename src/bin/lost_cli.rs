//! `lost`: command-line front-end over the star-tracker pipeline
//!
//! A thin adapter (SPEC_FULL.md §6): parses text catalogs into binary
//! `MultiDatabase` files, builds pair-distance databases from them, and runs
//! identification against a list of detected pixel centroids. None of the
//! core invariants live here -- this is argument parsing and file I/O around
//! `lost::{catalog, pairdb, multidb, pipeline}`.

use std::fs;
use std::io::BufReader;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{error, info};
use memmap2::Mmap;

use lost::catalog::{self, NarrowOptions};
use lost::geometry::Vec2;
use lost::multidb::{MultiDatabase, MultiDatabaseBuilder};
use lost::pairdb::{self, PairDistanceDatabase};
use lost::serialize::{ByteReader, ByteWriter, Endianness};
use lost::{pipeline, Camera, PyramidParams};

#[derive(Parser)]
#[command(name = "lost", about = "Star-tracker pipeline: catalogs, databases, identification")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a text catalog, narrow it, and write a catalog sub-database.
    BuildCatalog {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, default_value_t = 600)]
        max_magnitude: i32,
        #[arg(long, default_value_t = 0.001)]
        min_separation: f64,
        #[arg(long)]
        max_stars: Option<usize>,
    },
    /// Read a catalog sub-database and append a pair-distance sub-database.
    BuildPairDb {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, default_value_t = 0.0)]
        min_distance: f32,
        #[arg(long, default_value_t = std::f32::consts::PI)]
        max_distance: f32,
        #[arg(long, default_value_t = 1000)]
        num_bins: usize,
    },
    /// Identify a list of pixel centroids (one `x,y` pair per line) against
    /// a combined catalog + pair-distance database.
    Identify {
        database: PathBuf,
        centroids: PathBuf,
        #[arg(long, default_value_t = 1e-5)]
        tolerance: f64,
        #[arg(long, default_value_t = 1_000_000)]
        cutoff: u64,
        #[arg(long, default_value_t = 0.3)]
        fov: f64,
        #[arg(long, default_value_t = 1024.0)]
        x_resolution: f64,
        #[arg(long, default_value_t = 1024.0)]
        y_resolution: f64,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::BuildCatalog {
            input,
            output,
            max_magnitude,
            min_separation,
            max_stars,
        } => build_catalog(input, output, max_magnitude, min_separation, max_stars),
        Command::BuildPairDb {
            input,
            output,
            min_distance,
            max_distance,
            num_bins,
        } => build_pair_db(input, output, min_distance, max_distance, num_bins),
        Command::Identify {
            database,
            centroids,
            tolerance,
            cutoff,
            fov,
            x_resolution,
            y_resolution,
        } => identify(database, centroids, tolerance, cutoff, fov, x_resolution, y_resolution),
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Memory-map a database file read-only rather than copying it into a
/// `Vec<u8>`; `MultiDatabase` only ever borrows from the buffer it's given.
/// Grounded on the teacher's `jplephem::daf::DAF::setup_memory_map`.
fn map_database(path: &PathBuf) -> Result<Mmap, Box<dyn std::error::Error>> {
    let file = fs::File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(mmap)
}

fn build_catalog(
    input: PathBuf,
    output: PathBuf,
    max_magnitude: i32,
    min_separation: f64,
    max_stars: Option<usize>,
) -> CliResult {
    let file = fs::File::open(&input)?;
    let parsed = catalog::parse_catalog_text(BufReader::new(file))?;
    info!("parsed {} stars from {}", parsed.len(), input.display());

    let narrowed = catalog::narrow(
        &parsed,
        NarrowOptions {
            max_magnitude,
            min_separation,
            max_stars,
        },
    );
    info!("narrowed to {} stars", narrowed.len());

    let mut catalog_writer = ByteWriter::new(Endianness::Little);
    catalog::serialize_catalog(&mut catalog_writer, &narrowed, true, true);

    let mut builder = MultiDatabaseBuilder::new();
    builder.add_sub_database(catalog::CATALOG_MAGIC, catalog_writer.finish());
    let mut writer = ByteWriter::new(Endianness::Little);
    builder.finish(&mut writer);
    fs::write(&output, writer.finish())?;
    info!("wrote catalog database to {}", output.display());
    Ok(())
}

fn build_pair_db(input: PathBuf, output: PathBuf, min_distance: f32, max_distance: f32, num_bins: usize) -> CliResult {
    let mmap = map_database(&input)?;
    let multi = MultiDatabase::new(&mmap)?;
    let catalog_bytes = multi.sub_database(catalog::CATALOG_MAGIC)?;
    let mut reader = ByteReader::new(catalog_bytes, Endianness::Little);
    let (parsed_catalog, _, _) = catalog::deserialize_catalog(&mut reader)?;

    let mut pair_writer = ByteWriter::new(Endianness::Little);
    pairdb::build(&mut pair_writer, &parsed_catalog, min_distance, max_distance, num_bins);
    info!("built pair-distance database over {} stars", parsed_catalog.len());

    let mut catalog_writer = ByteWriter::new(Endianness::Little);
    catalog::serialize_catalog(&mut catalog_writer, &parsed_catalog, true, true);

    let mut builder = MultiDatabaseBuilder::new();
    builder.add_sub_database(catalog::CATALOG_MAGIC, catalog_writer.finish());
    builder.add_sub_database(pairdb::PAIR_DISTANCE_MAGIC, pair_writer.finish());
    let mut writer = ByteWriter::new(Endianness::Little);
    builder.finish(&mut writer);
    fs::write(&output, writer.finish())?;
    info!("wrote combined database to {}", output.display());
    Ok(())
}

fn identify(
    database: PathBuf,
    centroids_path: PathBuf,
    tolerance: f64,
    cutoff: u64,
    fov: f64,
    x_resolution: f64,
    y_resolution: f64,
) -> CliResult {
    let mmap = map_database(&database)?;
    let multi = MultiDatabase::new(&mmap)?;

    let catalog_bytes = multi.sub_database(catalog::CATALOG_MAGIC)?;
    let mut catalog_reader = ByteReader::new(catalog_bytes, Endianness::Little);
    let (parsed_catalog, _, _) = catalog::deserialize_catalog(&mut catalog_reader)?;

    let pair_bytes = multi.sub_database(pairdb::PAIR_DISTANCE_MAGIC)?;
    let mut pair_reader = ByteReader::new(pair_bytes, Endianness::Little);
    let pair_db = PairDistanceDatabase::read(&mut pair_reader)?;

    let pixel_positions = parse_centroids_file(&centroids_path)?;
    let camera = Camera::from_fov(fov, x_resolution, y_resolution);
    let centroid_directions = pipeline::back_project_centroids(&camera, &pixel_positions);

    let params = PyramidParams {
        tolerance,
        cutoff,
        ..Default::default()
    };
    let result = pipeline::run(&centroid_directions, &parsed_catalog, &pair_db, params);

    if result.identifiers.is_empty() {
        println!("no stars identified");
    } else {
        for id in &result.identifiers {
            println!(
                "centroid {} -> catalog star {} (name {})",
                id.centroid_index, id.catalog_index, parsed_catalog[id.catalog_index].name
            );
        }
    }
    match result.attitude {
        Some(a) if a.ill_conditioned => {
            println!(
                "quaternion (ill-conditioned, treat as ambiguous): w={} x={} y={} z={}",
                a.quaternion.w(),
                a.quaternion.x(),
                a.quaternion.y(),
                a.quaternion.z()
            );
        }
        Some(a) => {
            println!("quaternion: w={} x={} y={} z={}", a.quaternion.w(), a.quaternion.x(), a.quaternion.y(), a.quaternion.z());
        }
        None => println!("no attitude lock (fewer than 2 identifications)"),
    }
    Ok(())
}

/// One `x,y` pixel coordinate per line; blank lines and `#`-prefixed
/// comments are skipped. This is a CLI-level convenience format, not part of
/// the database wire format.
fn parse_centroids_file(path: &PathBuf) -> Result<Vec<Vec2>, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let mut positions = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.splitn(2, ',');
        let x: f64 = parts
            .next()
            .ok_or_else(|| format!("centroid line {}: missing x", line_no + 1))?
            .trim()
            .parse()?;
        let y: f64 = parts
            .next()
            .ok_or_else(|| format!("centroid line {}: missing y", line_no + 1))?
            .trim()
            .parse()?;
        positions.push(Vec2::new(x, y));
    }
    Ok(positions)
}
