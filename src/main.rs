use std::{path::PathBuf, process};

use clap::{Parser, Subcommand};
use log::{error, info};
use tokio::signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tracing_subscriber::{fmt, EnvFilter};

use foodgram::{
    actions::promote_user,
    api::routes,
    config::Config,
    fixtures::{load_ingredients, load_tags, parse_ingredients, parse_tags},
    state::{connect_pool, migrate, StartupError, State},
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply migrations and start the HTTP server (default)
    Serve,
    /// Apply pending database migrations
    Migrate,
    /// Import ingredients from a JSON (`[{name, measurement_unit}]`) or CSV (`name,unit`) file
    LoadIngredients { file: PathBuf },
    /// Import tags from a JSON (`[{name, slug}]`) file
    LoadTags { file: PathBuf },
    /// Grant the admin role to the user with this email
    Promote { email: String },
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let args = Args::parse();
    if let Err(e) = run(args.command.unwrap_or(Command::Serve)).await {
        error!("{e}");
        process::exit(1);
    }
}

async fn run(command: Command) -> Result<(), StartupError> {
    match command {
        Command::Serve => serve().await,
        Command::Migrate => {
            let pool = connect_pool(&Config::database_url()?).await?;
            migrate(&pool).await
        }
        Command::LoadIngredients { file } => {
            let items = parse_ingredients(&file)?;
            let pool = connect_pool(&Config::database_url()?).await?;
            load_ingredients(&items, &pool).await?;
            Ok(())
        }
        Command::LoadTags { file } => {
            let items = parse_tags(&file)?;
            let pool = connect_pool(&Config::database_url()?).await?;
            load_tags(&items, &pool).await?;
            Ok(())
        }
        Command::Promote { email } => {
            let pool = connect_pool(&Config::database_url()?).await?;
            if promote_user(&email, &pool).await? {
                info!("{email} is now an admin");
                Ok(())
            } else {
                Err(StartupError::Fixture(format!("No user with email {email}")))
            }
        }
    }
}

async fn serve() -> Result<(), StartupError> {
    info!("Initializing state...");
    let config = Config::load()?;
    let address = (config.host, config.port);

    let state = State::connect(config).await?;
    migrate(&state.pool).await?;

    let (bound, server) =
        warp::serve(routes(state)).try_bind_with_graceful_shutdown(address, shutdown_signal())?;
    info!("Server running on {bound}");

    server.await;
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}
