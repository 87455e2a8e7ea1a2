//! People: transfer shape, mapping and service alias.

use chrono::{Datelike, Utc};
use models::{person, team};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::generic::GenericService;
use crate::mapping::TypeMap;
use crate::predicate::Field;
use crate::repository::{IncludeOne, SeaOrmRepository, StorageEntity};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonDto {
    pub id: i32,
    pub guid: Uuid,
    pub name: String,
    pub birth_year: i32,
    /// Computed from `birth_year`; not filterable.
    #[serde(default)]
    pub age: i32,
    pub team_id: Option<i32>,
    /// Present only when the team was eagerly loaded; not filterable.
    #[serde(default)]
    pub team_name: Option<String>,
}

impl PersonDto {
    pub const ID: Field<PersonDto> = Field::new("id");
    pub const GUID: Field<PersonDto> = Field::new("guid");
    pub const NAME: Field<PersonDto> = Field::new("name");
    pub const BIRTH_YEAR: Field<PersonDto> = Field::new("birth_year");
    pub const AGE: Field<PersonDto> = Field::new("age");
    pub const TEAM_ID: Field<PersonDto> = Field::new("team_id");
    pub const TEAM_NAME: Field<PersonDto> = Field::new("team_name");

    pub fn new(name: &str, birth_year: i32) -> Self {
        Self {
            id: 0,
            guid: Uuid::new_v4(),
            name: name.to_string(),
            birth_year,
            age: 0,
            team_id: None,
            team_name: None,
        }
    }
}

impl StorageEntity for person::Entity {
    fn id_column() -> person::Column {
        person::Column::Id
    }

    fn guid_column() -> Option<person::Column> {
        Some(person::Column::Guid)
    }
}

/// Age this calendar year.
pub fn age_in(birth_year: i32, year: i32) -> i32 {
    year - birth_year
}

fn fill_computed(row: &person::Model, dto: &mut PersonDto) {
    dto.age = age_in(row.birth_year, Utc::now().year());
    dto.team_name = row.team.as_ref().map(|t| t.name.clone());
}

pub fn person_map() -> TypeMap<person::Model, PersonDto> {
    TypeMap::new()
        .same(&["id", "guid", "birth_year", "team_id"])
        .field("name", "full_name")
        .after_to_dto(fill_computed)
}

/// Eager-loads each person's team into `person::Model::team`.
pub fn include_team() -> IncludeOne<person::Entity, team::Entity> {
    IncludeOne::new("team", |p: &mut person::Model, t| p.team = t)
}

pub type PersonService<R = SeaOrmRepository<person::Entity>> = GenericService<person::Entity, PersonDto, R>;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

    use super::*;
    use crate::errors::ServiceError;
    use crate::mapping::MappingError;
    use crate::mappings::mapping_config;
    use crate::pagination::Pagination;
    use crate::repository::mock::MockRepository;
    use crate::repository::Repository;
    use crate::test_support::get_db;

    fn service(db: DatabaseConnection) -> PersonService {
        let repo = Arc::new(SeaOrmRepository::new(db));
        GenericService::new(repo, Arc::new(mapping_config().unwrap())).unwrap()
    }

    async fn seed(svc: &PersonService) -> Result<Vec<PersonDto>, anyhow::Error> {
        let people = vec![
            PersonDto::new("Ada", 1815),
            PersonDto::new("Alan", 1912),
            PersonDto::new("Grace", 1906),
            PersonDto::new("Edsger", 1930),
            PersonDto::new("Barbara", 1939),
        ];
        Ok(svc.add_range(people).await?)
    }

    #[test]
    fn mapping_round_trips_and_fills_computed_fields() {
        let map = person_map();
        let mut row = person::Model::new("Ada Lovelace", 1815);
        row.id = 4;
        row.team = Some(team::Model { id: 1, name: "analysts".into(), members: vec![] });
        let dto = map.to_dto(&row).unwrap();
        assert_eq!(dto.name, "Ada Lovelace");
        assert_eq!(dto.guid, row.guid);
        assert_eq!(dto.age, age_in(1815, Utc::now().year()));
        assert_eq!(dto.team_name.as_deref(), Some("analysts"));

        let back = map.to_storage(&dto).unwrap();
        assert_eq!(back.full_name, row.full_name);
        assert_eq!(back.id, 4);
        assert!(back.team.is_none(), "navigation is not carried back to storage");
    }

    #[test]
    fn name_filter_translates_and_age_filter_is_rejected() {
        let map = person_map();
        let p = map.translate(&PersonDto::NAME.eq("Ada")).unwrap();
        assert_eq!(p.to_string(), "full_name eq 'Ada'");

        let err = map.translate(&PersonDto::NAME.eq("Ada").and(PersonDto::AGE.gt(30))).unwrap_err();
        assert_eq!(err.field(), Some("age"));
        let err = map.translate(&PersonDto::TEAM_NAME.eq("analysts")).unwrap_err();
        assert_eq!(err.field(), Some("team_name"));
    }

    #[tokio::test]
    async fn add_then_get_by_id_and_guid() -> Result<(), anyhow::Error> {
        let svc = service(get_db().await?);
        let added = svc.add(PersonDto::new("Ada", 1815)).await?;
        assert!(added.id > 0);

        let by_id = svc.get_by_id(added.id).await?.expect("stored");
        assert_eq!(by_id, added);

        let by_guid = svc.get_by_guid(&added.guid.to_string()).await?.expect("stored");
        assert_eq!(by_guid.id, added.id);

        assert!(svc.get_by_guid(&Uuid::new_v4().to_string()).await?.is_none());
        assert!(svc.get_by_id(added.id + 100).await?.is_none());
        assert!(matches!(svc.require_by_id(added.id + 100).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_guid_is_invalid_argument() -> Result<(), anyhow::Error> {
        let svc = service(get_db().await?);
        let err = svc.get_by_guid("not-a-guid").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
        Ok(())
    }

    #[tokio::test]
    async fn find_translates_transfer_predicates() -> Result<(), anyhow::Error> {
        let svc = service(get_db().await?);
        seed(&svc).await?;

        let found = svc.find(&PersonDto::NAME.eq("Ada")).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].birth_year, 1815);

        let found = svc.find(&PersonDto::NAME.starts_with("A").and(PersonDto::BIRTH_YEAR.gt(1900))).await?;
        assert_eq!(found.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), vec!["Alan"]);

        let one = svc.find_one(&PersonDto::BIRTH_YEAR.lt(1920)).await?.expect("match");
        assert_eq!(one.name, "Ada", "lowest key first");

        assert_eq!(svc.count().await?, 5);
        assert_eq!(svc.count_by_predicate(&!PersonDto::NAME.is_in(["Ada", "Alan"])).await?, 3);
        Ok(())
    }

    #[tokio::test]
    async fn service_and_in_process_evaluation_agree() -> Result<(), anyhow::Error> {
        let svc = service(get_db().await?);
        let all = seed(&svc).await?;
        let p = PersonDto::NAME.contains("ra").or(PersonDto::BIRTH_YEAR.ge(1930));

        let expected: Vec<i32> = all.iter().filter(|d| p.matches(d).unwrap()).map(|d| d.id).collect();
        let mut actual: Vec<i32> = svc.find(&p).await?.into_iter().map(|d| d.id).collect();
        actual.sort_unstable();
        assert_eq!(actual, expected);
        Ok(())
    }

    #[tokio::test]
    async fn text_filters_match_wildcard_characters_literally() -> Result<(), anyhow::Error> {
        let svc = service(get_db().await?);
        let all = svc
            .add_range(vec![PersonDto::new("Ada", 1815), PersonDto::new("50% off", 1990), PersonDto::new("a_b", 1991)])
            .await?;

        for p in [
            PersonDto::NAME.contains("%"),
            PersonDto::NAME.contains("_"),
            PersonDto::NAME.starts_with("a_"),
            PersonDto::NAME.ends_with("% off"),
            PersonDto::NAME.contains("\\"),
        ] {
            let expected: Vec<i32> = all.iter().filter(|d| p.matches(d).unwrap()).map(|d| d.id).collect();
            let mut actual: Vec<i32> = svc.find(&p).await?.into_iter().map(|d| d.id).collect();
            actual.sort_unstable();
            assert_eq!(actual, expected, "{p}");
        }
        assert_eq!(svc.count_by_predicate(&PersonDto::NAME.contains("%")).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn negated_filters_on_null_fields_agree_across_backends() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let analysts = team::ActiveModel { name: Set("analysts".into()), ..Default::default() }.insert(&db).await?;
        let sql = service(db);
        let mock: PersonService<MockRepository<person::Entity>> =
            GenericService::new(Arc::new(MockRepository::default()), Arc::new(mapping_config()?))?;

        let mut ada = PersonDto::new("Ada", 1815);
        ada.team_id = Some(analysts.id);
        let loner = PersonDto::new("Loner", 1990);
        let stored = sql.add_range(vec![ada.clone(), loner.clone()]).await?;
        mock.add_range(vec![ada, loner]).await?;

        for p in [
            !PersonDto::TEAM_ID.eq(analysts.id),
            PersonDto::TEAM_ID.ne(analysts.id),
            !PersonDto::TEAM_ID.is_in([analysts.id]),
            !(PersonDto::TEAM_ID.eq(analysts.id).and(PersonDto::NAME.eq("Loner"))),
        ] {
            let from_sql: Vec<String> = sql.find(&p).await?.into_iter().map(|d| d.name).collect();
            let from_mock: Vec<String> = mock.find(&p).await?.into_iter().map(|d| d.name).collect();
            let evaluated: Vec<String> =
                stored.iter().filter(|d| p.matches(d).unwrap()).map(|d| d.name.clone()).collect();
            assert_eq!(from_sql, from_mock, "{p}");
            assert_eq!(from_sql, evaluated, "{p}");
        }
        assert!(sql.find(&!PersonDto::TEAM_ID.eq(analysts.id)).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn limited_ordered_puts_nulls_first_on_both_backends() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let mut team_ids = Vec::new();
        for name in ["first", "second"] {
            team_ids.push(team::ActiveModel { name: Set(name.into()), ..Default::default() }.insert(&db).await?.id);
        }
        let sql = service(db);
        let mock: PersonService<MockRepository<person::Entity>> =
            GenericService::new(Arc::new(MockRepository::default()), Arc::new(mapping_config()?))?;

        let people: Vec<PersonDto> = [Some(team_ids[1]), None, Some(team_ids[0]), None]
            .into_iter()
            .enumerate()
            .map(|(i, team_id)| PersonDto { team_id, ..PersonDto::new(&format!("p{i}"), 1900) })
            .collect();
        sql.add_range(people.clone()).await?;
        mock.add_range(people).await?;

        let teams_of = |rows: Vec<PersonDto>| rows.into_iter().map(|p| p.team_id).collect::<Vec<_>>();
        let expected = vec![None, None, Some(team_ids[0]), Some(team_ids[1])];
        assert_eq!(teams_of(mock.get_limited_ordered(4, "team_id").await?), expected);
        assert_eq!(teams_of(sql.get_limited_ordered(4, "team_id").await?), expected);
        Ok(())
    }

    #[tokio::test]
    async fn unmapped_field_fails_before_any_backend_call() -> Result<(), anyhow::Error> {
        let repo = Arc::new(MockRepository::<person::Entity>::default());
        let svc: PersonService<MockRepository<person::Entity>> =
            GenericService::new(repo.clone(), Arc::new(mapping_config()?))?;

        let err = svc.find(&PersonDto::NAME.eq("Ada").and(PersonDto::AGE.gt(30))).await.unwrap_err();
        match err {
            ServiceError::Mapping(MappingError::UnmappedField { field, .. }) => assert_eq!(field, "age"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(svc.count_by_predicate(&PersonDto::AGE.gt(30)).await.is_err());
        assert!(svc.find_one(&PersonDto::TEAM_NAME.is_null()).await.is_err());
        assert_eq!(repo.calls(), 0);

        // same through the SQL repository, whose connection is never opened
        let svc = service(DatabaseConnection::Disconnected);
        let err = svc.find_paged(&PersonDto::AGE.gt(30), 0, 10).await.unwrap_err();
        assert!(matches!(err, ServiceError::Mapping(_)));
        Ok(())
    }

    #[tokio::test]
    async fn limited_ordered_respects_limit_and_order() -> Result<(), anyhow::Error> {
        let svc = service(get_db().await?);
        seed(&svc).await?;

        let rows = svc.get_limited_ordered(3, "birth_year").await?;
        assert_eq!(rows.iter().map(|p| p.birth_year).collect::<Vec<_>>(), vec![1815, 1906, 1912]);

        let rows = svc.get_limited_ordered(2, "full_name").await?;
        assert_eq!(rows.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), vec!["Ada", "Alan"]);

        let err = svc.get_limited_ordered(3, "age").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(m) if m.contains("age")));

        let typed = svc.repository().get_limited_ordered_by(1, person::Column::BirthYear).await?;
        assert_eq!(typed[0].birth_year, 1815);
        Ok(())
    }

    #[tokio::test]
    async fn paging_filters_then_windows() -> Result<(), anyhow::Error> {
        let svc = service(get_db().await?);
        let all = seed(&svc).await?;
        let born_1900s = PersonDto::BIRTH_YEAR.ge(1900);

        let page = svc.find_paged(&born_1900s, 1, 2).await?;
        let ids: Vec<i32> = page.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![all[2].id, all[3].id], "skip counts matching rows only");

        let last = svc.find_page(&born_1900s, Pagination { page: 2, per_page: 3 }).await?;
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].name, "Barbara");
        Ok(())
    }

    #[tokio::test]
    async fn update_and_remove() -> Result<(), anyhow::Error> {
        let svc = service(get_db().await?);
        let mut ada = svc.add(PersonDto::new("Ada", 1815)).await?;

        ada.name = "Ada Lovelace".into();
        let updated = svc.update(ada.clone()).await?;
        assert_eq!(updated.name, "Ada Lovelace");
        assert_eq!(svc.get_by_id(ada.id).await?.map(|p| p.name), Some("Ada Lovelace".into()));

        assert_eq!(svc.remove(updated.clone()).await?, 1);
        assert!(svc.get_by_id(ada.id).await?.is_none());
        assert_eq!(svc.remove(updated).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn range_writes_are_all_or_nothing() -> Result<(), anyhow::Error> {
        let svc = service(get_db().await?);
        let mut people = seed(&svc).await?;

        for p in &mut people {
            p.birth_year += 1;
        }
        let mut ghost = PersonDto::new("Nobody", 2000);
        ghost.id = 9_999;
        let mut batch = people.clone();
        batch.push(ghost);
        assert!(svc.update_range(batch).await.is_err());
        assert_eq!(svc.get_by_id(people[0].id).await?.map(|p| p.birth_year), Some(1815));

        let updated = svc.update_range(people.clone()).await?;
        assert_eq!(updated[0].birth_year, 1816);

        // duplicate guid violates the unique index on the second insert
        let dup = PersonDto::new("Twin", 1950);
        assert!(svc.add_range(vec![dup.clone(), dup]).await.is_err());
        assert!(svc.find(&PersonDto::NAME.eq("Twin")).await?.is_empty());

        assert_eq!(svc.remove_range(people).await?, 5);
        assert_eq!(svc.count().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn include_team_fills_team_name() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let analysts = team::ActiveModel { name: Set("analysts".into()), ..Default::default() }.insert(&db).await?;
        let svc = service(db);

        let mut ada = PersonDto::new("Ada", 1815);
        ada.team_id = Some(analysts.id);
        svc.add_range(vec![ada, PersonDto::new("Loner", 1990)]).await?;

        let plain = svc.get_all().await?;
        assert!(plain.iter().all(|p| p.team_name.is_none()));

        let include = include_team();
        let loaded = svc.get_all_with_related(&[&include]).await?;
        let names: Vec<Option<&str>> = loaded.iter().map(|p| p.team_name.as_deref()).collect();
        assert_eq!(names, vec![Some("analysts"), None]);
        Ok(())
    }

    #[tokio::test]
    async fn mock_repository_answers_like_the_database() -> Result<(), anyhow::Error> {
        let repo = MockRepository::<person::Entity>::default();
        let rows = repo
            .add_range(vec![person::Model::new("Grace", 1906), person::Model::new("Ada", 1815)])
            .await?;
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);

        let oldest = repo.get_limited_ordered(1, "birth_year").await?;
        assert_eq!(oldest[0].full_name, "Ada");
        let by_guid = repo.get_by_guid(&rows[0].guid.to_string()).await?;
        assert_eq!(by_guid.map(|r| r.id), Some(1));

        let p = person_map().translate(&PersonDto::NAME.ends_with("ce"))?;
        assert_eq!(repo.count_by_predicate(&p).await?, 1);
        assert_eq!(repo.remove(rows[0].clone()).await?, 1);
        assert_eq!(repo.count().await?, 1);
        Ok(())
    }
}
