use anyhow::Result;
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait, QueryFilter, Set};

use crate::{db, person, team};

async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = db::connect_with_config(&configs::DatabaseConfig { url: "sqlite::memory:".into(), ..Default::default() }).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[test]
fn connect_options_pin_memory_sqlite_to_one_connection() {
    let cfg = configs::DatabaseConfig { url: "sqlite::memory:".into(), max_connections: 8, ..Default::default() };
    let opts = db::connect_options(&cfg);
    assert_eq!(opts.get_max_connections(), Some(1));
    assert_eq!(opts.get_min_connections(), Some(1));

    let cfg = configs::DatabaseConfig { url: "postgres://localhost/app".into(), max_connections: 8, ..Default::default() };
    assert_eq!(db::connect_options(&cfg).get_max_connections(), Some(8));
}

#[tokio::test]
async fn person_insert_and_navigation_stays_empty() -> Result<()> {
    let db = setup_test_db().await?;

    let t = team::ActiveModel { name: Set("analysts".into()), ..Default::default() }.insert(&db).await?;
    let mut p = person::Model::new("Ada Lovelace", 1815).into_active_model();
    p.team_id = Set(Some(t.id));
    p.id = sea_orm::ActiveValue::NotSet;
    let saved = p.insert(&db).await?;
    assert!(saved.id > 0);
    assert!(saved.team.is_none(), "navigation is never read from a row");

    let found = person::Entity::find()
        .filter(person::Column::FullName.eq("Ada Lovelace"))
        .one(&db)
        .await?
        .expect("inserted row");
    assert_eq!(found.guid, saved.guid);

    let owner = found.find_related(team::Entity).one(&db).await?;
    assert_eq!(owner.map(|t| t.name), Some("analysts".to_string()));
    Ok(())
}
