//! newsdesk: command-line front end for the news listing service.
//!
//! Scopes are passed with `--scope` (repeatable) and parsed strictly; an
//! unknown scope name is a usage error.

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use newsdesk_core::{ListRequest, ScopeSet, SortOrder, VisibilityMode};
use newsdesk_service::logging::init_tracing;
use newsdesk_service::{connect_database, demo_entries, App, Config};

#[derive(Parser)]
#[command(name = "newsdesk")]
#[command(author, version, about = "Access-scoped news listing and search")]
#[command(propagate_version = true)]
struct Cli {
    /// Scope granted to the caller (can specify multiple)
    #[arg(short, long = "scope", global = true)]
    scopes: Vec<String>,

    /// Identity of the caller, recorded as owner on create
    #[arg(short, long, global = true)]
    user_id: Option<String>,

    /// Use the in-memory store preloaded with demo data instead of PostgreSQL
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,

    /// Replace all news and tags with the demo set
    Seed,

    /// List news visible to the caller
    List {
        /// Free text, optionally with #tags
        #[arg(short, long, default_value = "")]
        query: String,

        /// Visibility filter (requires the filter scope)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Owner filter (requires the filter scope)
        #[arg(long)]
        owner: Option<String>,

        /// Only mailed (true) or unmailed (false) records
        #[arg(long)]
        mailed: Option<bool>,

        /// Sort field: activeFrom, createdAt, title or id
        #[arg(long, default_value = "")]
        sort: String,

        #[arg(long, value_enum)]
        order: Option<OrderArg>,

        #[arg(long, default_value_t = 0)]
        offset: i64,

        /// Page size (0 selects the default)
        #[arg(long, default_value_t = 0)]
        limit: i64,
    },

    /// Show one record by id
    Show { id: Uuid },

    /// Show a published record by slug
    ShowSlug { slug: String },

    /// List all tags
    Tags,

    /// Delete one record by id
    Delete { id: Uuid },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Active,
    Inactive,
}

impl From<ModeArg> for VisibilityMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Active => VisibilityMode::Active,
            ModeArg::Inactive => VisibilityMode::Inactive,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for SortOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Asc => SortOrder::Asc,
            OrderArg::Desc => SortOrder::Desc,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _guard = init_tracing("newsdesk=info,newsdesk_service=info,newsdesk_db=info");

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env().context("reading configuration")?;

    let mut scopes = ScopeSet::parse_strict(&cli.scopes).context("parsing --scope")?;
    if let Some(user_id) = cli.user_id {
        scopes = scopes.with_user_id(user_id);
    }

    if let Commands::Migrate = cli.command {
        let db = connect_database(&config).await?;
        db.migrate().await.context("running migrations")?;
        info!(subsystem = "db", op = "migrate", "Migrations applied");
        return Ok(());
    }

    let app = if cli.memory {
        let app = App::in_memory(config.cache_capacity);
        app.news.seed(demo_entries(chrono::Utc::now())).await?;
        app
    } else {
        App::connect(&config).await?
    };

    match cli.command {
        Commands::Migrate => {}
        Commands::Seed => {
            let count = app.news.seed(demo_entries(chrono::Utc::now())).await?;
            print_json(&serde_json::json!({ "seeded": count }))?;
        }
        Commands::List {
            query,
            mode,
            owner,
            mailed,
            sort,
            order,
            offset,
            limit,
        } => {
            let mut request = ListRequest::new(query, scopes);
            request.filter.mode = mode.map(Into::into).unwrap_or_default();
            request.filter.user_id = owner;
            request.filter.is_mailed = mailed;
            request.sort = sort;
            request.order = order.map(Into::into);
            request.offset = offset;
            request.limit = limit;
            print_json(&app.listing.list(request).await?)?;
        }
        Commands::Show { id } => {
            print_json(&app.news.get_one(id, &scopes).await?)?;
        }
        Commands::ShowSlug { slug } => {
            print_json(&app.news.get_by_slug(&slug, &scopes).await?)?;
        }
        Commands::Tags => {
            print_json(&app.news.list_tags().await?)?;
        }
        Commands::Delete { id } => {
            app.news.delete(id, &scopes).await?;
            print_json(&serde_json::json!({ "deleted": id }))?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
