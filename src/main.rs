use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use gcm_downscale::benchmark::BenchmarkSuite;
use gcm_downscale::config::{self, DEFAULT_HALF_A_BOX};
#[cfg(feature = "netcdf")]
use gcm_downscale::config::{
    AtmoMode, AtmoRunConfig, DownscaleConfig, FileVar, FillPolicy, RunConfig, DEFAULT_OUTPUT_VAR,
};

fn main() {
    let matches = build_cli().get_matches();

    let level = config::log_level(matches.get_flag("verbose"), matches.get_flag("debug"));
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    match matches.subcommand() {
        #[cfg(feature = "netcdf")]
        Some(("downscale", sub_matches)) => {
            if let Err(e) = run_downscale(sub_matches) {
                eprintln!("Downscaling error: {}", e);
                std::process::exit(1);
            }
        }
        #[cfg(feature = "netcdf")]
        Some(("prep-atmo", sub_matches)) => {
            if let Err(e) = run_prep_atmo(sub_matches) {
                eprintln!("Atmosphere forcing error: {}", e);
                std::process::exit(1);
            }
        }
        Some(("benchmark", sub_matches)) => {
            if let Err(e) = run_benchmark(sub_matches) {
                eprintln!("Benchmark error: {}", e);
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("Please specify a subcommand. Use --help for more information.");
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "netcdf")]
fn run_downscale(matches: &ArgMatches) -> Result<(), String> {
    let file_var = |id: &str| -> Result<FileVar, String> {
        matches
            .get_one::<FileVar>(id)
            .cloned()
            .ok_or_else(|| format!("Missing required argument --{}", id))
    };

    let half_a_box = matches
        .get_one::<f64>("half-a-box")
        .copied()
        .unwrap_or(DEFAULT_HALF_A_BOX);
    let fill_policy = matches
        .get_one::<FillPolicy>("fill-policy")
        .copied()
        .unwrap_or_default();

    let config = RunConfig {
        field: file_var("field")?,
        elev_hi: file_var("elev-hi")?,
        elev_lo: file_var("elev-lo")?,
        mask: file_var("mask")?,
        output: matches
            .get_one::<String>("output")
            .map(Into::into)
            .unwrap_or_else(|| "ofile.nc".into()),
        output_var: matches
            .get_one::<String>("output-var")
            .cloned()
            .unwrap_or_else(|| DEFAULT_OUTPUT_VAR.to_string()),
        downscale: DownscaleConfig::new(half_a_box).with_fill_policy(fill_policy),
        num_threads: matches.get_one::<usize>("num-threads").copied().unwrap_or(0),
    };
    config.validate()?;

    gcm_downscale::data_io::run_downscale(&config).map_err(|e| e.to_string())
}

#[cfg(feature = "netcdf")]
fn run_prep_atmo(matches: &ArgMatches) -> Result<(), String> {
    let file_var = |id: &str| -> Result<FileVar, String> {
        matches
            .get_one::<FileVar>(id)
            .cloned()
            .ok_or_else(|| format!("Missing required argument --{}", id))
    };

    let config = AtmoRunConfig {
        mode: matches
            .get_one::<AtmoMode>("mode")
            .copied()
            .ok_or("Missing atmosphere mode")?,
        temperature: file_var("temperature")?,
        precipitation: file_var("precipitation")?,
        output: matches
            .get_one::<String>("output")
            .map(Into::into)
            .unwrap_or_else(|| "atmo.nc".into()),
    };
    config.validate()?;

    gcm_downscale::data_io::run_prep_atmo(&config).map_err(|e| e.to_string())
}

fn run_benchmark(matches: &ArgMatches) -> Result<(), String> {
    let size = matches
        .get_one::<String>("size")
        .map(String::as_str)
        .unwrap_or("200x160");
    let (size_y, size_x) = parse_grid_size(size)?;
    let time_steps = matches.get_one::<usize>("time-steps").copied().unwrap_or(12);
    let half_a_box = matches
        .get_one::<f64>("half-a-box")
        .copied()
        .unwrap_or(DEFAULT_HALF_A_BOX);
    let thread_counts = parse_thread_counts(
        matches
            .get_one::<String>("thread-counts")
            .map(String::as_str)
            .unwrap_or("1,2,4"),
    )?;

    let shape = (time_steps, size_y, size_x);
    let suite = BenchmarkSuite::run_suite(shape, half_a_box, &thread_counts)?;
    print!("{}", suite);

    if let Some(output_dir) = matches.get_one::<String>("output-dir") {
        suite.write_report(output_dir)?;
    }

    Ok(())
}

/// Parse `YxX`, e.g. `200x160`
fn parse_grid_size(size: &str) -> Result<(usize, usize), String> {
    let invalid = || format!("Invalid grid size: {}. Expected: ROWSxCOLS", size);
    let (y, x) = size.split_once('x').ok_or_else(invalid)?;
    let y = y.trim().parse().map_err(|_| invalid())?;
    let x = x.trim().parse().map_err(|_| invalid())?;
    Ok((y, x))
}

/// Parse a comma-separated list of thread counts, e.g. `1,2,4`
fn parse_thread_counts(list: &str) -> Result<Vec<usize>, String> {
    list.split(',')
        .map(|s| {
            s.trim()
                .parse::<usize>()
                .map_err(|_| format!("Invalid thread count '{}' in '{}'", s.trim(), list))
        })
        .collect()
}

fn build_cli() -> Command {
    let cli = Command::new("gcm_downscale")
        .version("0.1.0")
        .about("Downscales GCM fields onto ice-sheet model grids with a local elevation lapse rate")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase output verbosity")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Lots of output for debugging")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("benchmark")
                .about("Time the downscaling kernel on synthetic input over several thread counts")
                .arg(
                    Arg::new("size")
                        .long("size")
                        .value_name("ROWSxCOLS")
                        .help("Grid size of the synthetic input")
                        .default_value("200x160"),
                )
                .arg(
                    Arg::new("time-steps")
                        .short('t')
                        .long("time-steps")
                        .value_name("COUNT")
                        .help("Number of time steps of the synthetic field")
                        .default_value("12")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("half-a-box")
                        .long("half-a-box")
                        .value_name("CELLS")
                        .help("Half-width of the lapse-rate window")
                        .default_value("20")
                        .value_parser(value_parser!(f64)),
                )
                .arg(
                    Arg::new("thread-counts")
                        .long("thread-counts")
                        .value_name("LIST")
                        .help("Comma-separated thread counts to benchmark")
                        .default_value("1,2,4"),
                )
                .arg(
                    Arg::new("output-dir")
                        .short('o')
                        .long("output-dir")
                        .value_name("DIR")
                        .help("Write a benchmark report to this directory"),
                ),
        );

    #[cfg(feature = "netcdf")]
    let cli = cli.subcommand(
        Command::new("downscale")
            .about("Downscale a GCM field to a fine grid using a local elevation lapse rate")
            .arg(
                Arg::new("field")
                    .long("field")
                    .value_name("FILE,VAR")
                    .help("Low resolution field, resampled to the high resolution grid")
                    .required(true)
                    .value_parser(value_parser!(FileVar)),
            )
            .arg(
                Arg::new("elev-hi")
                    .long("elev-hi")
                    .value_name("FILE,VAR")
                    .help("High resolution (target) orography")
                    .required(true)
                    .value_parser(value_parser!(FileVar)),
            )
            .arg(
                Arg::new("elev-lo")
                    .long("elev-lo")
                    .value_name("FILE,VAR")
                    .help("Low resolution orography, resampled to the high resolution grid")
                    .required(true)
                    .value_parser(value_parser!(FileVar)),
            )
            .arg(
                Arg::new("mask")
                    .long("mask")
                    .value_name("FILE,VAR")
                    .help("Domain mask; cells > 0 are downscaled")
                    .required(true)
                    .value_parser(value_parser!(FileVar)),
            )
            .arg(
                Arg::new("output")
                    .short('o')
                    .long("output")
                    .value_name("FILE")
                    .help("Output NetCDF file")
                    .default_value("ofile.nc"),
            )
            .arg(
                Arg::new("output-var")
                    .long("output-var")
                    .value_name("NAME")
                    .help("Name of the downscaled variable")
                    .default_value(DEFAULT_OUTPUT_VAR),
            )
            .arg(
                Arg::new("half-a-box")
                    .long("half-a-box")
                    .value_name("CELLS")
                    .help("Half-width of the lapse-rate window")
                    .default_value("20")
                    .value_parser(value_parser!(f64)),
            )
            .arg(
                Arg::new("fill-policy")
                    .long("fill-policy")
                    .value_name("POLICY")
                    .help("Value of cells that are not downscaled: nan or pass-through")
                    .default_value("nan")
                    .value_parser(value_parser!(FillPolicy)),
            )
            .arg(
                Arg::new("num-threads")
                    .short('j')
                    .long("num-threads")
                    .value_name("COUNT")
                    .help("Number of worker threads (0 = all cores)")
                    .default_value("0")
                    .value_parser(value_parser!(usize)),
            ),
    );

    #[cfg(feature = "netcdf")]
    let cli = cli.subcommand(
        Command::new("prep-atmo")
            .about("Prepare the atmosphere forcing file from monthly temperature and precipitation")
            .arg(
                Arg::new("mode")
                    .value_name("MODE")
                    .help("yearly-cycle (annual and July means) or given (monthly series)")
                    .required(true)
                    .value_parser(value_parser!(AtmoMode)),
            )
            .arg(
                Arg::new("temperature")
                    .long("temperature")
                    .value_name("FILE,VAR")
                    .help("Monthly 2 m air temperature (K) on the model grid")
                    .required(true)
                    .value_parser(value_parser!(FileVar)),
            )
            .arg(
                Arg::new("precipitation")
                    .long("precipitation")
                    .value_name("FILE,VAR")
                    .help("Monthly total precipitation (kg m-2 s-1) on the model grid")
                    .required(true)
                    .value_parser(value_parser!(FileVar)),
            )
            .arg(
                Arg::new("output")
                    .short('o')
                    .long("output")
                    .value_name("FILE")
                    .help("Output NetCDF file")
                    .default_value("atmo.nc"),
            ),
    );

    cli
}
