#[macro_use]
extern crate clap;

use {
    anyhow::{bail, Result},
    barotropic::{
        model::{Model, Output},
        parameters::Parameters,
        snapshot::BinaryWriter,
    },
    clap::ArgMatches,
    log::{error, info},
    simplelog::{Config as LogConfig, LevelFilter, TermLogger, TerminalMode},
    std::{
        fs::{create_dir_all, File},
        io::prelude::*,
        path::Path,
    },
};

#[quit::main]
fn main() {
    let matches = clap_app!(barotropic =>
        (version: crate_version!())
        (@setting SubcommandRequiredElseHelp)
        (@subcommand run =>
            (about: "Integrates the barotropic vorticity equation, writing snapshots and monitor.asc to the output directory.")
            (@arg PARAMETERS: -p --parameters +takes_value +required "Path to file containing simulation parameters.")
            (@arg SCHEME: --scheme +takes_value "Overrides the integration scheme (leapfrog or rk4).")
            (@arg STEPS: --steps +takes_value "Overrides the number of time steps.")
        )
        (@subcommand defaults =>
            (about: "Prints the default simulation parameters.")
        )
    )
    .get_matches();

    if let Err(e) = TermLogger::init(
        LevelFilter::Debug,
        LogConfig::default(),
        TerminalMode::Mixed,
    ) {
        eprintln!("Failed to initialize logger: {}", e);
        quit::with_code(1);
    }

    run_subcommand(&matches).unwrap_or_else(|e| {
        error!("Error: \"{}\"", e);
        quit::with_code(1);
    });
}

fn load_parameters(path: &str) -> Parameters {
    let file = File::open(path).unwrap_or_else(|e| {
        error!("Failed to open {}: \"{}\"", path, e);
        quit::with_code(1);
    });

    let params = serde_yaml::from_reader::<_, Parameters>(file).unwrap_or_else(|e| {
        error!("Failed to parse parameters from {}: \"{}\"", path, e);
        quit::with_code(1);
    });

    info!("Successfully loaded simulation parameters from \"{}\"", path);

    params
}

fn write_file<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<()> {
    let mut f = File::create(path)?;
    f.write_all(data)?;
    Ok(())
}

fn run_subcommand(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        ("run", Some(sub)) => {
            let path = match sub.value_of("PARAMETERS") {
                Some(path) => path,
                None => bail!("Path to parameters file not supplied"),
            };
            let mut params = load_parameters(path);

            if let Some(scheme) = sub.value_of("SCHEME") {
                params.numerical.scheme = scheme.parse()?;
            }
            if let Some(steps) = sub.value_of("STEPS") {
                params.numerical.steps = steps.parse()?;
            }

            info!("Simulation parameters: \n{:#?}", params);

            let directory = Path::new(&params.environment.output_directory);
            create_dir_all(directory)?;

            let mut model = Model::from_parameters(&params)?;
            let mut writer = BinaryWriter::new(directory);

            let mut output = Output::default();
            let result = model.integrate_into(&mut writer, &mut output);

            write_file(directory.join("monitor.asc"), output.monitor.as_bytes())?;
            result?;

            info!(
                "Finished {} steps, wrote {} snapshots to {}",
                output.steps,
                output.snapshots,
                directory.display()
            );
        }
        ("defaults", _) => {
            print!("{}", serde_yaml::to_string(&Parameters::default())?);
        }
        _ => {
            // Should be unreachable due to clap catching this error
            bail!("Unrecognized subcommand");
        }
    }

    Ok(())
}
