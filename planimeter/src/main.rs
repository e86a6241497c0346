//! Point d'entrée CLI pour planimeter

use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// `.env` du répertoire courant, sinon celui à côté du binaire
fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }
    let beside_binary = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(".env")));
    if let Some(path) = beside_binary {
        let _ = dotenvy::from_path(path);
    }
}

mod cli;

use cli::Commands;

/// Périmètre et surface géodésiques de jeux de données vectoriels
#[derive(Parser)]
#[command(name = "planimeter")]
#[command(author, version)]
#[command(about = "Ajouter longueur et surface géodésiques aux features d'un jeu de données GeoJSON")]
#[command(long_about = "Calcule le périmètre et la surface de chaque feature sur l'ellipsoïde de son système de référence.\n\nLa sortie garde la géométrie et le système d'origine, avec les champs length_m et area_m2 ajoutés.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    load_env();
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Compute { input, output, run } => {
            debug!(input = %input.display(), output = %output.display(), "Compute vers GeoJSON");
            cli::cmd_compute(&input, &output, run).await
        }
        Commands::ToPostgis {
            input,
            table,
            schema,
            drop_table,
            run,
            db,
        } => {
            debug!(input = %input.display(), table = %table, "Compute vers PostGIS");
            cli::cmd_to_postgis(&input, table, schema, drop_table, run, db).await
        }
        Commands::Inspect { input, crs, kind } => cli::cmd_inspect(&input, crs.as_deref(), kind),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Logs sur stderr, stdout reste réservé au rapport
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::WARN
    } else {
        [Level::INFO, Level::DEBUG, Level::TRACE][usize::from(verbose.min(2))]
    };

    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(verbose > 0)
        .with_writer(std::io::stderr)
        .init();
}
