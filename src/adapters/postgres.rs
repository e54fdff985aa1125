use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::{debug, info, instrument};

use crate::adapters::feature_store::FeatureStore;
use crate::domain::{FeatureRecord, FeaturesFilter};
use crate::error::Result;

const SELECT_FEATURES: &str = r#"
    SELECT id, cap_mcm, cap_max, cap_min, area_skm, area_max, depth_m,
           catch_skm, dis_avg_ls, elev_masl, dam_hgt_m, dam_len_m,
           dam_type, instream, date
    FROM features
"#;

/// PostgreSQL feature store
#[derive(Clone)]
pub struct PostgresFeatureStore {
    pool: PgPool,
}

impl PostgresFeatureStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }
}

fn record_from_row(row: &PgRow) -> std::result::Result<FeatureRecord, sqlx::Error> {
    Ok(FeatureRecord {
        id: row.try_get("id")?,
        cap_mcm: row.try_get("cap_mcm")?,
        cap_max: row.try_get("cap_max")?,
        cap_min: row.try_get("cap_min")?,
        area_skm: row.try_get("area_skm")?,
        area_max: row.try_get("area_max")?,
        depth_m: row.try_get("depth_m")?,
        catch_skm: row.try_get("catch_skm")?,
        dis_avg_ls: row.try_get("dis_avg_ls")?,
        elev_masl: row.try_get("elev_masl")?,
        dam_hgt_m: row.try_get("dam_hgt_m")?,
        dam_len_m: row.try_get("dam_len_m")?,
        dam_type: row.try_get("dam_type")?,
        instream: row.try_get("instream")?,
        date: row.try_get("date")?,
    })
}

/// Escape LIKE metacharacters so user input matches literally.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Build the filtered listing query.
fn build_list_query(filter: &FeaturesFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_FEATURES);
    qb.push(" WHERE TRUE");

    for (column, min, max) in filter.ranges() {
        // column names come from a fixed list, never from input
        let column = column.to_ascii_lowercase();
        if let Some(min) = min {
            qb.push(format!(" AND {column} >= ")).push_bind(min);
        }
        if let Some(max) = max {
            qb.push(format!(" AND {column} <= ")).push_bind(max);
        }
    }

    if let Some(dam_type) = filter.dam_type.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND dam_type ILIKE ")
            .push_bind(like_pattern(dam_type));
    }
    if let Some(instream) = filter.instream.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND instream ILIKE ")
            .push_bind(like_pattern(instream));
    }
    if let Some(from) = filter.date_from {
        qb.push(" AND date >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND date <= ").push_bind(to);
    }

    qb.push(" ORDER BY id OFFSET ")
        .push_bind(filter.skip())
        .push(" LIMIT ")
        .push_bind(filter.limit());
    qb
}

#[async_trait]
impl FeatureStore for PostgresFeatureStore {
    async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    #[instrument(skip(self))]
    async fn random_record(&self) -> Result<Option<FeatureRecord>> {
        let row = sqlx::query(&format!("{SELECT_FEATURES} ORDER BY random() LIMIT 1"))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(record_from_row).transpose()?)
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &FeaturesFilter) -> Result<Vec<FeatureRecord>> {
        filter.validate()?;
        let mut qb = build_list_query(filter);
        let rows = qb.build().fetch_all(&self.pool).await?;
        debug!(rows = rows.len(), "features listed");
        Ok(rows
            .iter()
            .map(record_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }
}
