use anyhow::Result;
use bestopia_adapters::OpenAiDraftingClient;
use bestopia_ingest::{draft_review, tsv};
use bestopia_store::PgStore;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bestopia")]
#[command(about = "Bestopia server and admin tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the web server.
    Serve,
    /// Apply database migrations.
    Migrate,
    /// Draft review content for a product category and print it as TSV.
    Draft { category: String },
    /// Hash a password, for seeding an admin account by hand.
    HashPassword { password: String },
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing("info");

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => bestopia_web::serve_from_env().await?,
        Commands::Migrate => {
            let config = bestopia_web::WebConfig::from_env();
            let store = PgStore::connect(&config.database_url).await?;
            store.run_migrations().await?;
            println!("migrations applied");
        }
        Commands::Draft { category } => {
            let client = OpenAiDraftingClient::from_env();
            let draft = draft_review(&client, &category).await?;
            println!("title\tsubtitle\tintroduction");
            println!("{}\t{}\t{}", draft.title, draft.subtitle, draft.introduction);
            println!("{}", tsv::BLOCK_SEPARATOR);
            println!("{}", draft.details_tsv());
            println!("{}", tsv::BLOCK_SEPARATOR);
            println!("{}", draft.reviews_tsv());
        }
        Commands::HashPassword { password } => {
            let hash = bestopia_web::auth::hash_password(&password)
                .map_err(|err| anyhow::anyhow!(err.to_string()))?;
            println!("{hash}");
        }
    }

    Ok(())
}
