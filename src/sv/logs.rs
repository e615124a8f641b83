use sea_orm::sea_query::Query;

use crate::{
  audit::Entry,
  entity::{activation_log, license},
  prelude::*,
};

pub const DEFAULT_LIMIT: u64 = 50;
pub const MAX_LIMIT: u64 = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
  pub license_id: Option<Uuid>,
  /// Only entries of licenses owned by this account
  pub owner: Option<Uuid>,
}

pub struct Logs<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Logs<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn append(&self, entry: Entry) -> Result<activation_log::Model> {
    let log = activation_log::ActiveModel {
      id: sea_orm::NotSet,
      license_id: Set(entry.license_id),
      device_id: Set(entry.device_id),
      key: Set(entry.key),
      hwid: Set(entry.hwid),
      action: Set(entry.action),
      outcome: Set(entry.outcome),
      ip: Set(entry.ip),
      created_at: Set(entry.at),
    };

    Ok(log.insert(self.db).await?)
  }

  /// Newest first.
  pub async fn page(
    &self,
    filter: Filter,
    page: u64,
    limit: u64,
  ) -> Result<Vec<activation_log::Model>> {
    let mut query = activation_log::Entity::find();

    if let Some(license_id) = filter.license_id {
      query = query.filter(activation_log::Column::LicenseId.eq(license_id));
    }

    if let Some(owner) = filter.owner {
      query = query.filter(
        activation_log::Column::LicenseId.in_subquery(
          Query::select()
            .column(license::Column::Id)
            .from(license::Entity)
            .and_where(license::Column::OwnerId.eq(owner))
            .to_owned(),
        ),
      );
    }

    let logs = query
      .order_by_desc(activation_log::Column::CreatedAt)
      .order_by_desc(activation_log::Column::Id)
      .paginate(self.db, limit.clamp(1, MAX_LIMIT))
      .fetch_page(page)
      .await?;

    Ok(logs)
  }

  /// Bulk retention cleanup. Returns the number of deleted entries.
  pub async fn purge_before(&self, cutoff: DateTime) -> Result<u64> {
    let res = activation_log::Entity::delete_many()
      .filter(activation_log::Column::CreatedAt.lt(cutoff))
      .exec(self.db)
      .await?;
    Ok(res.rows_affected)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::activation_log::{Action, Outcome},
    testing,
  };

  fn entry(license: Option<&license::Model>, at: DateTime) -> Entry {
    let key = license.map_or("UNKNOWN", |l| l.key.as_str());
    let mut entry = Entry::new(Action::Validate, key, None, Some("127.0.0.1"));
    entry.license_id = license.map(|l| l.id);
    entry.outcome = Outcome::Success;
    entry.at = at;
    entry
  }

  #[tokio::test]
  async fn test_append_and_page() {
    let db = testing::db().await;
    let license = testing::seed(&db, testing::license("ABC-123", Some(1))).await;
    let logs = Logs::new(&db);

    for n in 0..5 {
      logs.append(entry(Some(&license), now() - TimeDelta::minutes(n))).await.unwrap();
    }
    logs.append(entry(None, now())).await.unwrap();

    let all = logs.page(Filter::default(), 0, DEFAULT_LIMIT).await.unwrap();
    assert_eq!(all.len(), 6);
    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let filter = Filter { license_id: Some(license.id), owner: None };
    let first = logs.page(filter.clone(), 0, 2).await.unwrap();
    let third = logs.page(filter, 2, 2).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(third.len(), 1);
    assert!(first.iter().all(|log| log.license_id == Some(license.id)));
  }

  #[tokio::test]
  async fn test_owner_filter() {
    let db = testing::db().await;
    let owner = Uuid::new_v4();
    let mut mine = testing::license("MINE", Some(1));
    mine.owner_id = Some(owner);
    let mine = testing::seed(&db, mine).await;
    let theirs = testing::seed(&db, testing::license("THEIRS", Some(1))).await;

    let logs = Logs::new(&db);
    logs.append(entry(Some(&mine), now())).await.unwrap();
    logs.append(entry(Some(&theirs), now())).await.unwrap();
    logs.append(entry(None, now())).await.unwrap();

    let visible = logs
      .page(Filter { license_id: None, owner: Some(owner) }, 0, DEFAULT_LIMIT)
      .await
      .unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].license_id, Some(mine.id));

    // asking for someone else's license yields nothing
    let foreign = logs
      .page(
        Filter { license_id: Some(theirs.id), owner: Some(owner) },
        0,
        DEFAULT_LIMIT,
      )
      .await
      .unwrap();
    assert!(foreign.is_empty());
  }

  #[tokio::test]
  async fn test_purge_before() {
    let db = testing::db().await;
    let logs = Logs::new(&db);

    logs.append(entry(None, now() - TimeDelta::days(100))).await.unwrap();
    logs.append(entry(None, now() - TimeDelta::days(91))).await.unwrap();
    logs.append(entry(None, now())).await.unwrap();

    let purged = logs.purge_before(now() - TimeDelta::days(90)).await.unwrap();
    assert_eq!(purged, 2);
    assert_eq!(logs.page(Filter::default(), 0, 10).await.unwrap().len(), 1);
  }
}
