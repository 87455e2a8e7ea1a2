use std::sync::Arc;

use dotenvy::dotenv;
use migration::MigratorTrait;
use service::generic::GenericService;
use service::mappings::mapping_config;
use service::pagination::Pagination;
use service::person::{include_team, PersonDto, PersonService};
use service::team::{include_members, TeamDto, TeamService};
use tracing::{error, info, warn};
use uuid::Uuid;

fn load_config() -> configs::AppConfig {
    match configs::AppConfig::load_or_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            // logging is not up yet
            eprintln!("config unusable ({e}); falling back to {}", models::db::DATABASE_URL.as_str());
            let database = configs::DatabaseConfig { url: models::db::DATABASE_URL.clone(), ..Default::default() };
            configs::AppConfig { database, ..Default::default() }
        }
    }
}

async fn run(cfg: configs::AppConfig) -> anyhow::Result<()> {
    let db = models::db::connect_with_config(&cfg.database).await?;
    let in_memory = cfg.database.is_sqlite() && cfg.database.url.contains(":memory:");
    if cfg.database.migrate || in_memory {
        migration::Migrator::up(&db, None).await?;
        info!(event = "migrated", "schema up to date");
    }

    let mappings = Arc::new(mapping_config()?);
    let teams: TeamService = GenericService::new(Arc::new(service::repository::SeaOrmRepository::new(db.clone())), mappings.clone())?;
    let people: PersonService = GenericService::new(Arc::new(service::repository::SeaOrmRepository::new(db)), mappings)?;

    let pioneers = teams.add(TeamDto::new("pioneers")).await?;
    let seed = [("Ada Lovelace", 1815), ("Alan Turing", 1912), ("Grace Hopper", 1906), ("Edsger Dijkstra", 1930)];
    let batch = seed
        .iter()
        .map(|(name, year)| PersonDto { team_id: Some(pioneers.id), ..PersonDto::new(name, *year) })
        .collect();
    let added = people.add_range(batch).await?;
    info!(event = "seeded", team = %pioneers.name, people = added.len(), "sample data stored");

    let ada = people.find_one(&PersonDto::NAME.eq("Ada Lovelace")).await?;
    info!(event = "find_one", found = ?ada.as_ref().map(|p| (&p.name, p.age)), "name filter");

    let modern = people.find_page(&PersonDto::BIRTH_YEAR.ge(1900), Pagination { page: 1, per_page: 2 }).await?;
    info!(event = "find_page", names = ?modern.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), "first page of 20th-century people");

    match people.find(&PersonDto::AGE.gt(30)).await {
        Ok(rows) => warn!(rows = rows.len(), "computed field filter unexpectedly reached the database"),
        Err(e) => info!(event = "rejected", error = %e, "computed field filter refused before querying"),
    }

    let oldest = people.get_limited_ordered(2, "birth_year").await?;
    info!(event = "limited_ordered", names = ?oldest.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), "two oldest");

    let include = include_team();
    for p in people.get_all_with_related(&[&include]).await? {
        info!(event = "person", id = p.id, name = %p.name, age = p.age, team = ?p.team_name, "loaded with team");
    }
    let include = include_members();
    for t in teams.get_all_with_related(&[&include]).await? {
        info!(event = "team", id = t.id, name = %t.name, members = ?t.members, "loaded with members");
    }

    let removed = people.remove_range(added).await?;
    let remaining = people.count().await?;
    info!(event = "cleanup", removed, remaining, "sample people removed");
    Ok(())
}

fn main() -> std::process::ExitCode {
    dotenv().ok();
    let cfg = load_config();
    common::utils::logging::init_logging(&cfg.logging.format, cfg.logging.filter.as_deref());

    let run_id = Uuid::new_v4();
    std::panic::set_hook(Box::new(move |info| {
        error!(service = "demo", event = "panic", %run_id, message = %info, "unhandled panic occurred");
    }));

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "demo", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(service = "demo", event = "start", %run_id, version = env!("CARGO_PKG_VERSION"), "demo starting");
    match rt.block_on(run(cfg)) {
        Ok(()) => {
            info!(service = "demo", event = "stop", %run_id, "demo finished");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            error!(service = "demo", event = "run_failed", error = %e, "demo failed");
            std::process::ExitCode::FAILURE
        }
    }
}
