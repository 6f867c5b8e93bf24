// src/db/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, types::Json};

use super::{ReviewStore, StoreError, StoreResult};
use crate::models::{
    review_log::{LogQuery, NewReviewLog, Page, ReviewLog, ReviewLogRow},
    wrong_answer::{ParseEnumError, RecordFilter, WrongAnswerRecord, WrongAnswerRow},
};

const RECORD_COLUMNS: &str = "id, user_id, question_id, source, source_instance_id, \
    wrong_count, correct_count, last_wrong_time, last_correct_time, \
    review_status, next_review_time, review_priority, \
    repetitions, ease_factor, interval_days, last_quality, \
    user_notes, user_tags, question_title, question_content, difficulty, knowledge_points, \
    created_at, updated_at, version";

const LOG_COLUMNS: &str = "id, user_id, wrong_answer_id, result, time_spent_sec, \
    previous_status, new_status, notes, review_at";

impl From<ParseEnumError> for StoreError {
    fn from(err: ParseEnumError) -> Self {
        StoreError::Unavailable(format!("corrupt row: {}", err))
    }
}

fn into_records(rows: Vec<WrongAnswerRow>) -> StoreResult<Vec<WrongAnswerRecord>> {
    rows.into_iter()
        .map(|row| WrongAnswerRecord::try_from(row).map_err(StoreError::from))
        .collect()
}

/// Postgres-backed gateway. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Optimistic update on a borrowed connection so it can run inside a transaction.
    async fn update_row(
        conn: &mut PgConnection,
        record: &WrongAnswerRecord,
    ) -> StoreResult<WrongAnswerRecord> {
        let sql = format!(
            r#"
            UPDATE wrong_answer_records SET
                source = $3,
                source_instance_id = $4,
                wrong_count = $5,
                correct_count = $6,
                last_wrong_time = $7,
                last_correct_time = $8,
                review_status = $9,
                next_review_time = $10,
                review_priority = $11,
                repetitions = $12,
                ease_factor = $13,
                interval_days = $14,
                last_quality = $15,
                user_notes = $16,
                user_tags = $17,
                question_title = $18,
                question_content = $19,
                difficulty = $20,
                knowledge_points = $21,
                updated_at = $22,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {RECORD_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, WrongAnswerRow>(&sql)
            .bind(record.id)
            .bind(record.version)
            .bind(record.source.as_str())
            .bind(&record.source_instance_id)
            .bind(record.wrong_count)
            .bind(record.correct_count)
            .bind(record.last_wrong_time)
            .bind(record.last_correct_time)
            .bind(record.review_status.as_str())
            .bind(record.next_review_time)
            .bind(record.review_priority.as_str())
            .bind(record.repetitions)
            .bind(record.ease_factor)
            .bind(record.interval_days)
            .bind(record.last_quality)
            .bind(&record.user_notes)
            .bind(Json(&record.user_tags))
            .bind(&record.question_title)
            .bind(&record.question_content)
            .bind(record.difficulty.map(|d| d.as_str()))
            .bind(Json(&record.knowledge_points))
            .bind(record.updated_at)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(row.try_into()?),
            None => {
                let exists: Option<i64> =
                    sqlx::query_scalar::<_, i64>("SELECT id FROM wrong_answer_records WHERE id = $1")
                        .bind(record.id)
                        .fetch_optional(&mut *conn)
                        .await?;
                Err(if exists.is_some() {
                    StoreError::Conflict
                } else {
                    StoreError::NotFound
                })
            }
        }
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn find_by_user_and_question(
        &self,
        user_id: i64,
        question_id: i64,
    ) -> StoreResult<Option<WrongAnswerRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM wrong_answer_records WHERE user_id = $1 AND question_id = $2"
        );
        let row = sqlx::query_as::<_, WrongAnswerRow>(&sql)
            .bind(user_id)
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(WrongAnswerRecord::try_from).transpose()?)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<WrongAnswerRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM wrong_answer_records WHERE id = $1");
        let row = sqlx::query_as::<_, WrongAnswerRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(WrongAnswerRecord::try_from).transpose()?)
    }

    async fn insert(&self, record: &WrongAnswerRecord) -> StoreResult<WrongAnswerRecord> {
        let sql = format!(
            r#"
            INSERT INTO wrong_answer_records (
                user_id, question_id, source, source_instance_id,
                wrong_count, correct_count, last_wrong_time, last_correct_time,
                review_status, next_review_time, review_priority,
                repetitions, ease_factor, interval_days, last_quality,
                user_notes, user_tags, question_title, question_content, difficulty, knowledge_points,
                created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, 1)
            RETURNING {RECORD_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, WrongAnswerRow>(&sql)
            .bind(record.user_id)
            .bind(record.question_id)
            .bind(record.source.as_str())
            .bind(&record.source_instance_id)
            .bind(record.wrong_count)
            .bind(record.correct_count)
            .bind(record.last_wrong_time)
            .bind(record.last_correct_time)
            .bind(record.review_status.as_str())
            .bind(record.next_review_time)
            .bind(record.review_priority.as_str())
            .bind(record.repetitions)
            .bind(record.ease_factor)
            .bind(record.interval_days)
            .bind(record.last_quality)
            .bind(&record.user_notes)
            .bind(Json(&record.user_tags))
            .bind(&record.question_title)
            .bind(&record.question_content)
            .bind(record.difficulty.map(|d| d.as_str()))
            .bind(Json(&record.knowledge_points))
            .bind(record.created_at)
            .bind(record.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                // Postgres error code for unique violation is 23505
                if e.to_string().contains("23505") || e.to_string().contains("unique constraint") {
                    StoreError::Conflict
                } else {
                    StoreError::from(e)
                }
            })?;

        Ok(row.try_into()?)
    }

    async fn update(&self, record: &WrongAnswerRecord) -> StoreResult<WrongAnswerRecord> {
        let mut conn = self.pool.acquire().await?;
        Self::update_row(&mut conn, record).await
    }

    async fn delete(&self, user_id: i64, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM wrong_answer_records WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_by_user(
        &self,
        user_id: i64,
        filter: &RecordFilter,
    ) -> StoreResult<Vec<WrongAnswerRecord>> {
        let mut query_builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {RECORD_COLUMNS} FROM wrong_answer_records WHERE user_id = "
        ));
        query_builder.push_bind(user_id);

        if let Some(status) = filter.status {
            query_builder.push(" AND review_status = ");
            query_builder.push_bind(status.as_str());
        }
        if let Some(source) = filter.source {
            query_builder.push(" AND source = ");
            query_builder.push_bind(source.as_str());
        }
        query_builder.push(" ORDER BY updated_at DESC");

        let rows: Vec<WrongAnswerRow> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        into_records(rows)
    }

    async fn list_due(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<WrongAnswerRecord>> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS} FROM wrong_answer_records
            WHERE user_id = $1 AND next_review_time IS NOT NULL AND next_review_time <= $2
            ORDER BY next_review_time ASC
            "#
        );
        let rows = sqlx::query_as::<_, WrongAnswerRow>(&sql)
            .bind(user_id)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        into_records(rows)
    }

    async fn save_review(
        &self,
        record: &WrongAnswerRecord,
        log: NewReviewLog,
    ) -> StoreResult<(WrongAnswerRecord, ReviewLog)> {
        let mut tx = self.pool.begin().await?;

        let updated = Self::update_row(&mut tx, record).await?;

        let sql = format!(
            r#"
            INSERT INTO wrong_answer_review_logs
                (user_id, wrong_answer_id, result, time_spent_sec, previous_status, new_status, notes, review_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {LOG_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ReviewLogRow>(&sql)
            .bind(log.user_id)
            .bind(log.wrong_answer_id)
            .bind(log.result.as_str())
            .bind(log.time_spent_sec)
            .bind(log.previous_status.as_str())
            .bind(log.new_status.as_str())
            .bind(&log.notes)
            .bind(log.review_at)
            .fetch_one(&mut *tx)
            .await?;

        // Dropping `tx` on any early return above rolls both writes back.
        tx.commit().await?;

        Ok((updated, row.try_into()?))
    }

    async fn list_logs(
        &self,
        user_id: i64,
        record_id: i64,
        query: &LogQuery,
    ) -> StoreResult<Page<ReviewLog>> {
        fn push_filters(
            query_builder: &mut QueryBuilder<'_, Postgres>,
            user_id: i64,
            record_id: i64,
            query: &LogQuery,
        ) {
            query_builder.push(" WHERE user_id = ");
            query_builder.push_bind(user_id);
            query_builder.push(" AND wrong_answer_id = ");
            query_builder.push_bind(record_id);
            if let Some(result) = query.result {
                query_builder.push(" AND result = ");
                query_builder.push_bind(result.as_str());
            }
            if let Some(from) = query.from {
                query_builder.push(" AND review_at >= ");
                query_builder.push_bind(from);
            }
            if let Some(to) = query.to {
                query_builder.push(" AND review_at <= ");
                query_builder.push_bind(to);
            }
        }

        let mut count_builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM wrong_answer_review_logs");
        push_filters(&mut count_builder, user_id, record_id, query);
        let total: i64 = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let items = if total > 0 {
            let mut list_builder = QueryBuilder::<Postgres>::new(format!(
                "SELECT {LOG_COLUMNS} FROM wrong_answer_review_logs"
            ));
            push_filters(&mut list_builder, user_id, record_id, query);
            list_builder.push(" ORDER BY review_at DESC, id DESC LIMIT ");
            list_builder.push_bind(query.size);
            list_builder.push(" OFFSET ");
            list_builder.push_bind(query.offset());

            let rows: Vec<ReviewLogRow> = list_builder
                .build_query_as()
                .fetch_all(&self.pool)
                .await?;
            rows.into_iter()
                .map(|row| ReviewLog::try_from(row).map_err(StoreError::from))
                .collect::<StoreResult<Vec<_>>>()?
        } else {
            Vec::new()
        };

        Ok(Page {
            items,
            total,
            page: query.page,
            size: query.size,
        })
    }
}
