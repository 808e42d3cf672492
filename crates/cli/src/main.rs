mod render;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use honeymoon_core::{PlannerPhase, QuestionnaireAnswers};
use honeymoon_gateway::{CatalogGateway, GatewayConfig, RestGateway, TourFilter};
use honeymoon_observability::{init_tracing, PlannerMetrics};
use honeymoon_planner::{MarkdownRenderer, Planner, PlannerConfig, PlannerState, Transition};
use honeymoon_storage::{SessionStore, Storage};
use serde::Serialize;

use crate::render::{render_session, render_state};

#[derive(Debug, Parser)]
#[command(name = "planner")]
#[command(about = "Honeymoon itinerary planner")]
struct Cli {
    /// SQLite URL for the saved session, or `memory` to keep it in-process.
    #[arg(long, env = "HONEYMOON_DATABASE_URL")]
    database_url: Option<String>,

    /// Directory holding `planner.db` when no database URL is given.
    #[arg(long, env = "HONEYMOON_DATA_DIR", default_value = ".honeymoon")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Answer the questionnaire and get matched itineraries.
    Plan {
        #[command(flatten)]
        answers: AnswerArgs,
        #[command(flatten)]
        unlock: UnlockArgs,
    },
    /// Continue from the last saved recommendations.
    Resume {
        #[command(flatten)]
        unlock: UnlockArgs,
    },
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
}

#[derive(Debug, Args)]
struct AnswerArgs {
    #[arg(long = "vibe", required = true)]
    vibes: Vec<String>,
    #[arg(long, default_value_t = 7)]
    duration: u32,
    #[arg(long = "region")]
    regions: Vec<String>,
    #[arg(long = "interest")]
    interests: Vec<String>,
    #[arg(long)]
    budget: f64,
    #[arg(long)]
    query: Option<String>,
    #[arg(long = "avoid")]
    avoid: Vec<String>,
    #[arg(long = "timing")]
    timing: Vec<String>,
    #[arg(long = "pace")]
    pace: Vec<String>,
}

#[derive(Debug, Args)]
struct UnlockArgs {
    /// Itinerary id, slug or 1-based position in the list.
    #[arg(long)]
    select: Option<String>,
    /// Write the unlocked itinerary as markdown to this path.
    #[arg(long, requires = "select")]
    export: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum SessionCommand {
    Show,
    Clear,
}

#[derive(Debug, Subcommand)]
enum CatalogCommand {
    Countries,
    Country {
        slug: String,
    },
    Collections,
    Vibes,
    Questionnaire,
    Tours {
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        collection: Option<String>,
        #[arg(long)]
        vibe: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    Tour {
        slug: String,
    },
}

impl AnswerArgs {
    fn into_answers(self) -> QuestionnaireAnswers {
        QuestionnaireAnswers {
            vibe: self.vibes.into_iter().collect(),
            duration: self.duration,
            regions: self.regions.into_iter().collect(),
            interests: self.interests.into_iter().collect(),
            budget_range: self.budget,
            free_text_query: self.query,
            avoid: non_empty(self.avoid),
            timing: non_empty(self.timing),
            pace: non_empty(self.pace),
        }
    }
}

fn non_empty(values: Vec<String>) -> Option<BTreeSet<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.into_iter().collect())
    }
}

type CliPlanner = Planner<RestGateway, Storage>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing("honeymoon_cli");
    let cli = Cli::parse();
    let database_url = cli.database_url.as_deref();

    match cli.command {
        Command::Plan { answers, unlock } => {
            let planner = build_planner(build_storage(database_url, &cli.data_dir).await?)?;
            planner.submit(answers.into_answers()).await?;
            println!("{}", render_state(&planner.state())?);
            continue_to_itinerary(&planner, unlock).await?;
        }
        Command::Resume { unlock } => {
            let planner = build_planner(build_storage(database_url, &cli.data_dir).await?)?;
            if !planner.resume_session().await? {
                bail!("no saved planner session; run `planner plan` first");
            }
            println!("{}", render_state(&planner.state())?);
            continue_to_itinerary(&planner, unlock).await?;
        }
        Command::Session { command } => {
            let sessions = SessionStore::new(build_storage(database_url, &cli.data_dir).await?);
            match command {
                SessionCommand::Show => match sessions.load().await {
                    Some(session) => println!("{}", render_session(&session)?),
                    None => println!("No saved session."),
                },
                SessionCommand::Clear => {
                    sessions.clear().await;
                    println!("Saved session cleared.");
                }
            }
        }
        Command::Catalog { command } => run_catalog(build_gateway()?, command).await?,
    }

    Ok(())
}

async fn continue_to_itinerary(planner: &CliPlanner, unlock: UnlockArgs) -> Result<()> {
    let Some(choice) = unlock.select else {
        return Ok(());
    };
    let PlannerState::Preview { recommendations } = planner.state() else {
        return Ok(());
    };

    let itinerary_id = resolve_selection(&recommendations.previews, &choice)?;
    let mut transition = planner.select(&itinerary_id).await?;
    if transition == Transition::Applied(PlannerPhase::Payment) {
        println!("{}", render_state(&planner.state())?);
        transition = planner.pay().await?;
    }
    println!("{}", render_state(&planner.state())?);

    if let (Transition::Applied(PlannerPhase::FullItinerary), Some(path)) =
        (transition, unlock.export)
    {
        let document = planner.export(&MarkdownRenderer)?;
        write_export(&path, &document.body).await?;
        println!("{}", render_state(&planner.state())?);
    }

    Ok(())
}

fn resolve_selection(
    previews: &[honeymoon_core::ItineraryPreview],
    choice: &str,
) -> Result<String> {
    let choice = choice.trim();
    if let Ok(position) = choice.parse::<usize>() {
        if let Some(preview) = position.checked_sub(1).and_then(|index| previews.get(index)) {
            return Ok(preview.id.clone());
        }
    }

    previews
        .iter()
        .find(|preview| preview.id == choice || preview.slug == choice)
        .map(|preview| preview.id.clone())
        .with_context(|| format!("no recommended itinerary matches `{choice}`"))
}

async fn write_export(path: &Path, body: &str) -> Result<()> {
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("failed writing itinerary to {}", path.display()))
}

async fn run_catalog(gateway: RestGateway, command: CatalogCommand) -> Result<()> {
    match command {
        CatalogCommand::Countries => print_json(&gateway.list_countries().await?),
        CatalogCommand::Country { slug } => match gateway.country_by_slug(&slug).await? {
            Some(country) => print_json(&country),
            None => bail!("no country with slug `{slug}`"),
        },
        CatalogCommand::Collections => print_json(&gateway.list_collections().await?),
        CatalogCommand::Vibes => print_json(&gateway.list_vibes().await?),
        CatalogCommand::Questionnaire => print_json(&gateway.questionnaire_config().await?),
        CatalogCommand::Tours {
            country,
            collection,
            vibe,
            limit,
        } => {
            let filter = TourFilter {
                country,
                collection_id: collection,
                vibe,
                limit,
            };
            print_json(&gateway.list_tours(&filter).await?)
        }
        CatalogCommand::Tour { slug } => match gateway.tour_by_slug(&slug).await? {
            Some(tour) => print_json(&tour),
            None => bail!("no tour with slug `{slug}`"),
        },
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_planner(storage: Storage) -> Result<CliPlanner> {
    Ok(Planner::new(
        build_gateway()?,
        SessionStore::new(storage),
        PlannerConfig::from_env(),
        PlannerMetrics::shared(),
    ))
}

const MEMORY_STORAGE: &str = "memory";

/// Each command runs in its own process, so the session lives in a SQLite
/// file under `data_dir` unless a URL (or `memory`) is given.
async fn build_storage(database_url: Option<&str>, data_dir: &Path) -> Result<Storage> {
    let url = match database_url.map(str::trim) {
        Some(MEMORY_STORAGE) => return Ok(Storage::memory()),
        Some(url) if !url.is_empty() => url.to_string(),
        _ => {
            tokio::fs::create_dir_all(data_dir)
                .await
                .with_context(|| format!("failed creating data dir {}", data_dir.display()))?;
            default_database_url(data_dir)
        }
    };

    Storage::sqlite(&url)
        .await
        .with_context(|| format!("failed opening session database {url}"))
}

fn default_database_url(data_dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", data_dir.join("planner.db").display())
}

fn build_gateway() -> Result<RestGateway> {
    let config = GatewayConfig::from_env().context("backend is not configured")?;
    RestGateway::new(config).context("failed building backend client")
}
