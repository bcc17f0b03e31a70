//! PostgreSQL-backed `RecordRepository` implementation using Diesel ORM.
//!
//! Filters are pushed into SQL and must agree with
//! [`RecordFilter::matches`]: text criteria become `ILIKE` with `%`, `_` and
//! `\` escaped, and a flag filter of `0` also matches NULL.

use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, RunQueryDsl};
use pagination::{Page, PageRequest};

use crate::domain::ports::{RecordFilter, RecordRepository, RecordRepositoryError};
use crate::domain::{AttributeRecord, Identnr, NewRecord, RecordId};

use super::diesel_basic_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{MerkmalstextRow, MerkmalstextWrite};
use super::pool::DbPool;
use super::schema::merkmalstexte;

/// Diesel-backed record store.
#[derive(Clone)]
pub struct DieselRecordRepository {
    pool: DbPool,
}

impl DieselRecordRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Escape LIKE metacharacters and wrap `needle` for a substring match.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn filtered(filter: &RecordFilter) -> merkmalstexte::BoxedQuery<'static, Pg> {
    use merkmalstexte::dsl as m;

    let mut query = m::merkmalstexte.into_boxed();
    if let Some(needle) = &filter.quick_search {
        let pattern = contains_pattern(needle);
        return query.filter(
            m::identnr
                .ilike(pattern.clone())
                .or(m::merkmal.ilike(pattern.clone()))
                .or(m::auspraegung.ilike(pattern.clone()))
                .or(m::drucktext.ilike(pattern.clone()))
                .or(m::sondermerkmal.assume_not_null().ilike(pattern)),
        );
    }

    if let Some(needle) = &filter.identnr {
        query = query.filter(m::identnr.ilike(contains_pattern(needle)));
    }
    if let Some(needle) = &filter.merkmal {
        query = query.filter(m::merkmal.ilike(contains_pattern(needle)));
    }
    if let Some(needle) = &filter.auspraegung {
        query = query.filter(m::auspraegung.ilike(contains_pattern(needle)));
    }
    if let Some(needle) = &filter.drucktext {
        query = query.filter(m::drucktext.ilike(contains_pattern(needle)));
    }
    if let Some(needle) = &filter.sondermerkmal {
        query = query.filter(
            m::sondermerkmal
                .assume_not_null()
                .ilike(contains_pattern(needle)),
        );
    }
    if let Some(position) = filter.position {
        query = query.filter(m::merkmalsposition.eq(position));
    }
    if let Some(sonder_abt) = filter.sonder_abt {
        query = query.filter(m::maka.eq(sonder_abt));
    }
    match filter.fertigungsliste {
        Some(0) => {
            query = query.filter(
                m::fertigungsliste
                    .is_null()
                    .or(m::fertigungsliste.assume_not_null().eq(0)),
            );
        }
        Some(flag) => query = query.filter(m::fertigungsliste.assume_not_null().eq(flag)),
        None => {}
    }
    query
}

fn count_to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

fn raw_ids(ids: &[RecordId]) -> Vec<i32> {
    ids.iter().map(|id| id.get()).collect()
}

#[async_trait]
impl RecordRepository for DieselRecordRepository {
    async fn list_all(&self) -> Result<Vec<AttributeRecord>, RecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<MerkmalstextRow> = merkmalstexte::table
            .select(MerkmalstextRow::as_select())
            .order(merkmalstexte::id.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(AttributeRecord::from).collect())
    }

    async fn list_page(
        &self,
        filter: &RecordFilter,
        page: PageRequest,
    ) -> Result<Page<AttributeRecord>, RecordRepositoryError> {
        let limit = i64::from(page.limit());
        let offset = i64::try_from(page.offset())
            .map_err(|_| RecordRepositoryError::query("page offset exceeds i64 range"))?;

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total: i64 = filtered(filter)
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let rows: Vec<MerkmalstextRow> = filtered(filter)
            .select(MerkmalstextRow::as_select())
            .order((
                merkmalstexte::merkmalsposition.asc(),
                merkmalstexte::identnr.asc(),
                merkmalstexte::merkmal.asc(),
                merkmalstexte::id.asc(),
            ))
            .limit(limit)
            .offset(offset)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(Page::new(
            rows.into_iter().map(AttributeRecord::from).collect(),
            page,
            count_to_u64(total),
        ))
    }

    async fn find_by_id(
        &self,
        id: RecordId,
    ) -> Result<Option<AttributeRecord>, RecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<MerkmalstextRow> = merkmalstexte::table
            .find(id.get())
            .select(MerkmalstextRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(AttributeRecord::from))
    }

    async fn find_by_ids(
        &self,
        ids: &[RecordId],
    ) -> Result<Vec<AttributeRecord>, RecordRepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<MerkmalstextRow> = merkmalstexte::table
            .filter(merkmalstexte::id.eq_any(raw_ids(ids)))
            .select(MerkmalstextRow::as_select())
            .order(merkmalstexte::id.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(AttributeRecord::from).collect())
    }

    async fn find_by_identnr(
        &self,
        identnr: &Identnr,
    ) -> Result<Vec<AttributeRecord>, RecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<MerkmalstextRow> = merkmalstexte::table
            .filter(merkmalstexte::identnr.eq(identnr.as_str()))
            .select(MerkmalstextRow::as_select())
            .order((
                merkmalstexte::merkmalsposition.asc(),
                merkmalstexte::merkmal.asc(),
                merkmalstexte::id.asc(),
            ))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(AttributeRecord::from).collect())
    }

    async fn find_by_text(
        &self,
        merkmal: &str,
        auspraegung: &str,
        drucktext: &str,
    ) -> Result<Vec<AttributeRecord>, RecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<MerkmalstextRow> = merkmalstexte::table
            .filter(merkmalstexte::merkmal.eq(merkmal))
            .filter(merkmalstexte::auspraegung.eq(auspraegung))
            .filter(merkmalstexte::drucktext.eq(drucktext))
            .select(MerkmalstextRow::as_select())
            .order((
                merkmalstexte::identnr.asc(),
                merkmalstexte::merkmalsposition.asc(),
                merkmalstexte::id.asc(),
            ))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(AttributeRecord::from).collect())
    }

    async fn find_duplicate(
        &self,
        record: &NewRecord,
        exclude: Option<RecordId>,
    ) -> Result<Option<RecordId>, RecordRepositoryError> {
        let mut query = merkmalstexte::table
            .select(merkmalstexte::id)
            .filter(merkmalstexte::identnr.eq(record.identnr.as_str().to_owned()))
            .filter(merkmalstexte::merkmal.eq(record.fields.merkmal.clone()))
            .filter(merkmalstexte::auspraegung.eq(record.fields.auspraegung.clone()))
            .filter(merkmalstexte::drucktext.eq(record.fields.drucktext.clone()))
            .into_boxed();
        if let Some(excluded) = exclude {
            query = query.filter(merkmalstexte::id.ne(excluded.get()));
        }

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let existing: Option<i32> = query
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(existing.map(RecordId::new))
    }

    async fn insert(&self, record: &NewRecord) -> Result<AttributeRecord, RecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: MerkmalstextRow = diesel::insert_into(merkmalstexte::table)
            .values(MerkmalstextWrite::from(record))
            .returning(MerkmalstextRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(row.into())
    }

    async fn update(
        &self,
        id: RecordId,
        record: &NewRecord,
    ) -> Result<Option<AttributeRecord>, RecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<MerkmalstextRow> = diesel::update(merkmalstexte::table.find(id.get()))
            .set(MerkmalstextWrite::from(record))
            .returning(MerkmalstextRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(AttributeRecord::from))
    }

    async fn update_positions(
        &self,
        positions: &[(RecordId, i32)],
    ) -> Result<Vec<AttributeRecord>, RecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<MerkmalstextRow> = conn
            .transaction(|conn| {
                async move {
                    let mut rows = Vec::with_capacity(positions.len());
                    for (id, position) in positions {
                        let row: Option<MerkmalstextRow> =
                            diesel::update(merkmalstexte::table.find(id.get()))
                                .set(merkmalstexte::merkmalsposition.eq(*position))
                                .returning(MerkmalstextRow::as_returning())
                                .get_result(conn)
                                .await
                                .optional()?;
                        rows.extend(row);
                    }
                    Ok::<_, diesel::result::Error>(rows)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(AttributeRecord::from).collect())
    }

    async fn delete(&self, id: RecordId) -> Result<bool, RecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(merkmalstexte::table.find(id.get()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }

    async fn delete_many(&self, ids: &[RecordId]) -> Result<Vec<RecordId>, RecordRepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut deleted: Vec<i32> =
            diesel::delete(merkmalstexte::table.filter(merkmalstexte::id.eq_any(raw_ids(ids))))
                .returning(merkmalstexte::id)
                .get_results(&mut conn)
                .await
                .map_err(map_diesel_error)?;
        deleted.sort_unstable();
        Ok(deleted.into_iter().map(RecordId::new).collect())
    }

    async fn delete_by_identnr(&self, identnr: &Identnr) -> Result<u64, RecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(
            merkmalstexte::table.filter(merkmalstexte::identnr.eq(identnr.as_str())),
        )
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(deleted as u64)
    }

    async fn distinct_identnrs(&self) -> Result<Vec<String>, RecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        merkmalstexte::table
            .select(merkmalstexte::identnr)
            .distinct()
            .order(merkmalstexte::identnr.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)
    }

    async fn count_all(&self) -> Result<u64, RecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total: i64 = merkmalstexte::table
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(count_to_u64(total))
    }

    async fn count_by_identnr(&self, identnr: &Identnr) -> Result<u64, RecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let total: i64 = merkmalstexte::table
            .filter(merkmalstexte::identnr.eq(identnr.as_str()))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(count_to_u64(total))
    }

    async fn max_position(&self) -> Result<Option<i32>, RecordRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        merkmalstexte::table
            .select(diesel::dsl::max(merkmalstexte::merkmalsposition))
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("rot", "%rot%")]
    #[case("50%", "%50\\%%")]
    #[case("a_b", "%a\\_b%")]
    #[case("c:\\x", "%c:\\\\x%")]
    fn like_patterns_escape_metacharacters(#[case] needle: &str, #[case] expected: &str) {
        assert_eq!(contains_pattern(needle), expected);
    }

    #[rstest]
    fn quick_search_replaces_field_filters() {
        let filter = RecordFilter {
            identnr: Some("4711".to_owned()),
            quick_search: Some("rot".to_owned()),
            ..RecordFilter::default()
        };
        let sql = diesel::debug_query::<Pg, _>(&filtered(&filter)).to_string();
        assert!(sql.contains("ILIKE"));
        assert!(!sql.contains("4711"));
    }
}
