use std::fmt;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use launchdeck_app::{DatasetKind, LauncherController, RemoveError, WeatherStatus};
use launchdeck_core::{paths, Theme, BATCH_CONFIRM_THRESHOLD};
use launchdeck_weather::{
    DistrictClient, WeatherDispatcher, WeatherUpdate, COUNTRY_KEYWORDS,
};
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Parser)]
#[command(name = "launchdeck", version, about = "Start a set of programs with one command")]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show registered programs (entries whose file is missing are hidden)
    List,

    /// Register one or more executables
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Remove a program by the index shown in `list`
    Remove { index: usize },

    /// Forget every registered program
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Launch every registered program
    Launch {
        /// Skip the confirmation prompt for large batches
        #[arg(long, short)]
        yes: bool,
    },

    /// Show or change the theme
    Theme { name: Option<String> },

    /// Show live weather for a location
    Weather {
        #[command(flatten)]
        location: LocationArgs,

        /// Keep refreshing every N seconds until interrupted
        #[arg(long, value_name = "SECONDS")]
        watch: Option<u64>,
    },

    /// Show or hide the weather panel
    WeatherPanel { state: PanelState },

    /// Store the weather API key (an empty string clears it)
    SetKey {
        key: String,

        /// Check the key against the provider before saving
        #[arg(long)]
        verify: bool,
    },

    /// Check whether an API key can fetch weather (defaults to the stored key)
    VerifyKey { key: Option<String> },

    /// List provinces in dataset order
    Provinces,

    /// List the cities of a province
    Cities { province: String },

    /// List the districts of a city
    Districts { province: String, city: String },

    /// Resolve a location to its provider area code
    AreaCode {
        province: String,
        city: String,
        district: Option<String>,
    },

    /// Regenerate the bundled region dataset from the provider
    GenerateDataset {
        #[arg(long)]
        key: String,

        #[arg(long, default_value = COUNTRY_KEYWORDS)]
        keywords: String,

        /// Output file (defaults to the bundled dataset location)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show where configuration and resources are read from
    Paths,
}

#[derive(clap::Args)]
struct LocationArgs {
    #[arg(long)]
    province: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    district: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PanelState {
    On,
    Off,
}

pub(crate) async fn execute(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::GenerateDataset {
            key,
            keywords,
            output,
        } => generate_dataset(&key, &keywords, output).await,
        Commands::Paths => show_paths(),
        command => {
            let mut controller = LauncherController::open_default()?;
            run(&mut controller, command).await
        }
    }
}

/// Run one controller-backed command. Bad user input prints a message and
/// yields a failing exit code; `Err` is kept for unexpected failures.
async fn run(controller: &mut LauncherController, command: Commands) -> Result<ExitCode> {
    match command {
        Commands::List => list(controller),
        Commands::Add { paths } => {
            ensure_saved(controller.add_programs(&paths))?;
            list(controller);
        }
        Commands::Remove { index } => match controller.remove_program(index) {
            Ok(entry) => println!("Removed {} ({})", entry.name, entry.path),
            Err(e @ RemoveError::OutOfRange { .. }) => return Ok(user_error(e)),
            Err(e) => return Err(e.into()),
        },
        Commands::Clear { yes } => {
            if !yes && !confirm("Remove all registered programs?")? {
                return Ok(ExitCode::SUCCESS);
            }
            controller.clear_programs();
            ensure_saved(controller.save())?;
            println!("Program list cleared");
        }
        Commands::Launch { yes } => return launch(controller, yes),
        Commands::Theme { name } => return theme(controller, name.as_deref()),
        Commands::Weather { location, watch } => {
            if let Err(e) = select(controller, &location) {
                return Ok(user_error(e));
            }
            return match watch {
                Some(secs) => watch_weather(controller, Duration::from_secs(secs.max(1))).await,
                None => show_weather(controller).await,
            };
        }
        Commands::WeatherPanel { state } => {
            let visible = matches!(state, PanelState::On);
            ensure_saved(controller.set_weather_visible(visible))?;
            println!("Weather panel {}", if visible { "shown" } else { "hidden" });
        }
        Commands::SetKey { key, verify } => {
            if verify && !key.trim().is_empty() && !controller.weather_client().verify_api_key(&key).await {
                println!("API Key 无效，请检查后重试");
                return Ok(ExitCode::FAILURE);
            }
            ensure_saved(controller.set_api_key(Some(&key)))?;
            println!("API key {}", if key.trim().is_empty() { "cleared" } else { "saved" });
        }
        Commands::VerifyKey { key } => {
            let Some(key) =
                key.or_else(|| controller.config().weather_api_key().map(str::to_string))
            else {
                return Ok(user_error("No API key given and none stored"));
            };
            return Ok(if controller.weather_client().verify_api_key(&key).await {
                println!("API Key 有效！");
                ExitCode::SUCCESS
            } else {
                println!("API Key 无效，请检查后重试");
                ExitCode::FAILURE
            });
        }
        Commands::Provinces => {
            note_dataset(controller);
            print_lines(controller.directory().list_provinces());
        }
        Commands::Cities { province } => {
            note_dataset(controller);
            print_lines(controller.directory().list_cities(&province));
        }
        Commands::Districts { province, city } => {
            note_dataset(controller);
            print_lines(controller.directory().list_districts(&province, &city));
        }
        Commands::AreaCode {
            province,
            city,
            district,
        } => {
            note_dataset(controller);
            match controller
                .directory()
                .resolve_area_code(&province, &city, district.as_deref())
            {
                Some(code) => println!("{}", code),
                None => return Ok(user_error("Unknown location")),
            }
        }
        Commands::GenerateDataset { .. } | Commands::Paths => {
            bail!("command does not use the launcher state")
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn user_error(message: impl fmt::Display) -> ExitCode {
    eprintln!("{}", message);
    ExitCode::FAILURE
}

fn ensure_saved(saved: bool) -> Result<()> {
    if !saved {
        bail!("Failed to save configuration");
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

fn note_dataset(controller: &LauncherController) {
    match controller.dataset_kind() {
        DatasetKind::Full => {}
        DatasetKind::Sample => eprintln!(
            "note: using the partial sample dataset ({}), so many cities and districts are missing. \
             Run `launchdeck generate-dataset --key <KEY>` for the full tree.",
            paths::SAMPLE_DATASET_RELATIVE_PATH
        ),
        DatasetKind::Missing => eprintln!("note: no region dataset could be loaded"),
    }
}

fn list(controller: &LauncherController) {
    let programs = controller.programs();
    if programs.is_empty() {
        println!("No programs registered");
        return;
    }
    for (index, entry) in programs {
        println!("{:>3}  {:<24} {}", index, entry.name, entry.path);
    }
    let hidden = controller.config().programs.len() - controller.programs().len();
    if hidden > 0 {
        println!("({} entr{} hidden: file not found)", hidden, if hidden == 1 { "y" } else { "ies" });
    }
}

fn launch(controller: &LauncherController, yes: bool) -> Result<ExitCode> {
    let count = controller.programs().len();
    if count == 0 {
        println!("Register programs with `launchdeck add` first");
        return Ok(ExitCode::SUCCESS);
    }
    if count > BATCH_CONFIRM_THRESHOLD
        && !yes
        && !confirm(&format!("About to launch {} programs. Continue?", count))?
    {
        return Ok(ExitCode::SUCCESS);
    }

    let report = controller.launch_all();
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(pid) => println!("started  {} (pid {})", outcome.entry.name, pid),
            Err(e) => println!("FAILED   {}: {} ({})", outcome.entry.name, e.user_message(), e),
        }
    }

    Ok(if report.is_complete_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn parse_theme(name: &str) -> Option<Theme> {
    Theme::ALL
        .into_iter()
        .find(|t| t.label() == name || format!("{:?}", t).eq_ignore_ascii_case(name))
}

fn theme(controller: &mut LauncherController, name: Option<&str>) -> Result<ExitCode> {
    let Some(name) = name else {
        let current = controller.config().theme;
        for theme in Theme::ALL {
            let marker = if theme == current { "*" } else { " " };
            let dark = if theme.is_dark() { " (dark)" } else { "" };
            println!("{} {}{}", marker, theme, dark);
        }
        return Ok(ExitCode::SUCCESS);
    };

    let Some(theme) = parse_theme(name) else {
        return Ok(user_error(format!("Unknown theme: {}", name)));
    };
    ensure_saved(controller.set_theme(theme))?;
    println!("Theme set to {}", theme);
    Ok(ExitCode::SUCCESS)
}

fn select(controller: &mut LauncherController, args: &LocationArgs) -> Result<()> {
    if let Some(province) = &args.province {
        controller.select_location(province, args.city.as_deref(), args.district.as_deref())?;
    } else if args.city.is_some() || args.district.is_some() {
        bail!("--city and --district need --province");
    }
    Ok(())
}

async fn show_weather(controller: &LauncherController) -> Result<ExitCode> {
    let status = controller.refresh_weather().await;
    println!("{}  |  {}", controller.location(), status.message());
    Ok(match status {
        WeatherStatus::Ready(_) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

async fn watch_weather(controller: &LauncherController, interval: Duration) -> Result<ExitCode> {
    let Some(api_key) = controller.config().weather_api_key() else {
        println!("{}", WeatherStatus::MissingApiKey.message());
        return Ok(ExitCode::FAILURE);
    };
    let Some(area_code) = controller.resolve_selected_area_code() else {
        println!("{}", WeatherStatus::UnknownLocation.message());
        return Ok(ExitCode::FAILURE);
    };

    let (dispatcher, mut updates) = WeatherDispatcher::new(
        controller.weather_client().clone(),
        tokio::runtime::Handle::current(),
    );
    let watch = WatchTarget {
        label: controller.location().to_string(),
        area_code,
        api_key: api_key.to_string(),
    };
    watch_loop(&dispatcher, &mut updates, &watch, interval, &mut std::io::stdout(), None).await?;
    Ok(ExitCode::SUCCESS)
}

struct WatchTarget {
    label: String,
    area_code: String,
    api_key: String,
}

/// Request on every tick and print each current result the moment it lands.
///
/// Returns after `limit` printed lines, or on Ctrl-C.
async fn watch_loop(
    dispatcher: &WeatherDispatcher,
    updates: &mut UnboundedReceiver<WeatherUpdate>,
    target: &WatchTarget,
    interval: Duration,
    out: &mut impl Write,
    limit: Option<usize>,
) -> Result<()> {
    let mut ticker = tokio::time::interval(interval);
    let mut printed = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                dispatcher.request(&target.area_code, &target.api_key);
            }
            Some(update) = updates.recv() => {
                let Some(update) = dispatcher.accept(update) else { continue };
                let text = match &update.result {
                    Ok(snapshot) => snapshot.summary(),
                    Err(e) => e.user_message().to_string(),
                };
                writeln!(out, "{}  |  {}", target.label, text)?;
                out.flush()?;
                printed += 1;
                if limit.is_some_and(|limit| printed >= limit) {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping weather watch");
                return Ok(());
            }
        }
    }
}

async fn generate_dataset(key: &str, keywords: &str, output: Option<PathBuf>) -> Result<ExitCode> {
    let output = match output {
        Some(path) => path,
        None => paths::dataset_path()?,
    };
    let client = DistrictClient::new()?;
    let directory = client.generate_dataset(keywords, key, &output).await?;
    println!(
        "Wrote {} provinces to {}",
        directory.len(),
        output.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn show_paths() -> Result<ExitCode> {
    let dir = paths::install_dir()?;
    let dataset = paths::dataset_path()?;
    println!("install dir: {}", dir.display());
    println!("config:      {}", dir.join(launchdeck_core::CONFIG_FILE_NAME).display());
    if dataset.exists() {
        println!("dataset:     {}", dataset.display());
    } else {
        println!("dataset:     {} (not generated yet)", dataset.display());
        println!(
            "sample:      {} (partial, in use until the full dataset is generated)",
            paths::sample_dataset_path()?.display()
        );
    }
    println!("error log:   {}", paths::error_log_path()?.display());
    Ok(ExitCode::SUCCESS)
}
