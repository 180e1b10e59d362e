// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate almond;
extern crate clap;
extern crate failure;
extern crate image;
extern crate num_cpus;
extern crate tracing_subscriber;

use almond::escape::in_set;
use almond::{Benchmark, GridEngine, ViewParameters};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use image::pnm::PNMEncoder;
use image::pnm::{PNMSubtype, SampleEncoding};
use image::ColorType;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const RENDER: &str = "render";
const BENCH: &str = "bench";

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const CENTER: &str = "center";
const ZOOM: &str = "zoom";
const ITERATIONS: &str = "iterations";
const THREADS: &str = "threads";
const FOCUS: &str = "focus";
const RUNS: &str = "runs";
const BENCH_ITERATIONS: &str = "bench-iterations";

fn view_args<'a, 'b>() -> Vec<Arg<'a, 'b>> {
    let max_threads = num_cpus::get() * 4;

    vec![
        Arg::with_name(SIZE)
            .long(SIZE)
            .short("s")
            .takes_value(true)
            .default_value("800x600")
            .validator(|s| validate_pair::<u16>(&s, 'x', "Could not parse grid size"))
            .help("Size of the grid, WIDTHxHEIGHT"),
        Arg::with_name(CENTER)
            .long(CENTER)
            .short("c")
            .takes_value(true)
            .allow_hyphen_values(true)
            .default_value("-0.5,0.0")
            .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse center point"))
            .help("Center of the view on the complex plane, RE,IM"),
        Arg::with_name(ZOOM)
            .long(ZOOM)
            .short("z")
            .takes_value(true)
            .default_value("1.0")
            .validator(|s| {
                validate_range(
                    &s,
                    ::std::f64::MIN_POSITIVE,
                    ::std::f64::MAX,
                    "Could not parse zoom",
                    "Zoom must be greater than zero",
                )
            })
            .help("Magnification; the view spans 4/zoom units horizontally"),
        Arg::with_name(ITERATIONS)
            .long(ITERATIONS)
            .short("i")
            .takes_value(true)
            .default_value("256")
            .validator(|s| {
                validate_range(
                    &s,
                    0,
                    1_000_000,
                    "Could not parse iteration count",
                    "Iteration count must be between 0 and 1000000",
                )
            })
            .help("Iteration budget per point"),
        Arg::with_name(THREADS)
            .long(THREADS)
            .short("t")
            .takes_value(true)
            .validator(move |s| {
                validate_range(
                    &s,
                    1,
                    max_threads,
                    "Could not parse thread count",
                    &format!("Thread count must be between 1 and {}", max_threads),
                )
            })
            .help("Number of worker threads [default: one per CPU]"),
    ]
}

fn args<'a>() -> ArgMatches<'a> {
    App::new("almond")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Parallel Mandelbrot evaluator and multi-core benchmark")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name(RENDER)
                .about("Render one frame to a grayscale PNM file")
                .args(&view_args())
                .arg(
                    Arg::with_name(OUTPUT)
                        .required(true)
                        .long(OUTPUT)
                        .short("o")
                        .takes_value(true)
                        .help("Output file"),
                )
                .arg(
                    Arg::with_name(FOCUS)
                        .long(FOCUS)
                        .short("f")
                        .takes_value(true)
                        .validator(|s| validate_pair::<usize>(&s, ',', "Could not parse focus cell"))
                        .help("Zoom in on grid cell X,Y before rendering"),
                ),
        )
        .subcommand(
            SubCommand::with_name(BENCH)
                .about("Time single- and multi-threaded passes and print a score")
                .args(&view_args())
                .arg(
                    Arg::with_name(RUNS)
                        .long(RUNS)
                        .short("r")
                        .takes_value(true)
                        .default_value("3")
                        .validator(|s| {
                            validate_range(
                                &s,
                                1,
                                1000,
                                "Could not parse run count",
                                "Run count must be between 1 and 1000",
                            )
                        })
                        .help("Timed passes per configuration"),
                )
                .arg(
                    Arg::with_name(BENCH_ITERATIONS)
                        .long(BENCH_ITERATIONS)
                        .takes_value(true)
                        .default_value("512")
                        .validator(|s| {
                            validate_range(
                                &s,
                                1,
                                1_000_000,
                                "Could not parse benchmark iteration count",
                                "Benchmark iteration count must be between 1 and 1000000",
                            )
                        })
                        .help("Fixed iteration budget used for every timed pass"),
                ),
        )
        .get_matches()
}

// Every value below has been through a validator, so parsing cannot
// fail; the fallbacks only keep the types honest.
fn view_from(matches: &ArgMatches) -> ViewParameters {
    let defaults = ViewParameters::default();
    let (width, height) = matches
        .value_of(SIZE)
        .and_then(|s| parse_pair::<i32>(s, 'x'))
        .unwrap_or((defaults.width, defaults.height));
    let (center_x, center_y) = matches
        .value_of(CENTER)
        .and_then(|s| parse_pair::<f64>(s, ','))
        .unwrap_or((defaults.center_x, defaults.center_y));
    ViewParameters {
        center_x,
        center_y,
        zoom: value_or(matches, ZOOM, defaults.zoom),
        max_iterations: value_or(matches, ITERATIONS, defaults.max_iterations),
        width,
        height,
    }
}

fn value_or<T: FromStr>(matches: &ArgMatches, name: &str, fallback: T) -> T {
    matches
        .value_of(name)
        .and_then(|s| T::from_str(s).ok())
        .unwrap_or(fallback)
}

fn threads_from(matches: &ArgMatches) -> usize {
    value_or(matches, THREADS, almond::default_workers())
}

// Points in the set are black; the rest shade from dark to white as
// they take longer to escape.
fn shade(count: u32, max_iterations: u32) -> u8 {
    if max_iterations == 0 || in_set(count, max_iterations) {
        return 0;
    }
    (u64::from(count) * 255 / u64::from(max_iterations)) as u8
}

fn write_image(outfile: &str, pixels: &[u8], bounds: (usize, usize)) -> Result<(), std::io::Error> {
    let path = Path::new(outfile);
    let output = File::create(&path)?;
    let mut encoder =
        PNMEncoder::new(output).with_subtype(PNMSubtype::Graymap(SampleEncoding::Binary));
    encoder.encode(pixels, bounds.0 as u32, bounds.1 as u32, ColorType::Gray(8))?;
    Ok(())
}

fn render(matches: &ArgMatches) -> Result<(), failure::Error> {
    let mut params = view_from(matches);
    if let Some((x, y)) = matches.value_of(FOCUS).and_then(|s| parse_pair::<usize>(s, ',')) {
        params = params.zoom_at(x, y);
    }
    let threads = threads_from(matches);
    let mut engine = GridEngine::for_view(&params)?;
    engine.compute(&params, threads)?;

    let budget = params.budget();
    let pixels: Vec<u8> = engine
        .iterations()
        .unwrap_or(&[])
        .iter()
        .map(|&n| shade(n, budget))
        .collect();
    let outfile = matches.value_of(OUTPUT).unwrap_or("almond.pnm");
    write_image(outfile, &pixels, (engine.width(), engine.height()))?;
    println!(
        "Rendered {}x{} at ({}, {}) zoom {} with {} threads to {}",
        engine.width(),
        engine.height(),
        params.center_x,
        params.center_y,
        params.zoom,
        threads,
        outfile
    );
    Ok(())
}

fn bench(matches: &ArgMatches) -> Result<(), failure::Error> {
    let params = view_from(matches);
    let threads = threads_from(matches);
    let runs = value_or(matches, RUNS, almond::DEFAULT_RUNS);
    let iterations = value_or(matches, BENCH_ITERATIONS, almond::BENCHMARK_ITERATIONS);

    println!("Running Almond benchmark...");
    println!("Hardware threads: {}", num_cpus::get());
    let mut engine = GridEngine::for_view(&params)?;
    let comparison = Benchmark::new()
        .runs(runs)
        .iterations(iterations)
        .compare(&mut engine, &params, threads)?;
    let report = comparison.report;

    println!("Single-threaded: {:.2} ms", comparison.single.average_ms);
    println!(
        "Multi-threaded ({} threads): {:.2} ms",
        threads, comparison.multi.average_ms
    );
    println!("Speedup: {:.2}x", report.speedup);
    println!("Efficiency: {}%", (report.efficiency * 100.0) as i64);
    println!("ALMOND SCORE: {} points", report.score);
    println!("Rating: {}", report.rating);
    Ok(())
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let matches = args();
    let outcome = match matches.subcommand() {
        (RENDER, Some(sub)) => render(sub),
        (BENCH, Some(sub)) => bench(sub),
        _ => Ok(()),
    };

    if let Err(e) = outcome {
        eprintln!("Almond failure: {}", e);
        std::process::exit(1);
    }
}
