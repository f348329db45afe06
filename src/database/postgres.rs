use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Postgres, Row};
use uuid::Uuid;

use crate::database::models::{
    DocumentRequest, NewDocumentRequest, NewNotification, Notification, Profile, ProfileFields,
};
use crate::database::repository::{NotificationStore, ProfileStore, RequestStore};
use crate::database::DatabaseError;
use crate::types::{RequestStatus, Role};

const REQUEST_COLUMNS: &str =
    "id, requester_id, requester_role, request_type, message, status, created_at";
const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, request_id, message, category, status, created_at";
const PROFILE_COLUMNS: &str =
    "uid, first_name, last_name, email, role, promotion, specialty, status, created_at";

/// PostgreSQL-backed implementation of every store trait
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_column<T: std::str::FromStr>(row: &PgRow, column: &str) -> Result<T, DatabaseError> {
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|_| DatabaseError::CorruptRecord(format!("{} = '{}'", column, raw)))
}

fn request_from_row(row: &PgRow) -> Result<DocumentRequest, DatabaseError> {
    Ok(DocumentRequest {
        id: row.try_get("id")?,
        requester_id: row.try_get("requester_id")?,
        requester_role: parse_column(row, "requester_role")?,
        request_type: row.try_get("request_type")?,
        message: row.try_get("message")?,
        status: parse_column(row, "status")?,
        created_at: row.try_get("created_at")?,
    })
}

fn notification_from_row(row: &PgRow) -> Result<Notification, DatabaseError> {
    Ok(Notification {
        id: row.try_get("id")?,
        recipient_id: row.try_get("recipient_id")?,
        request_id: row.try_get("request_id")?,
        message: row.try_get("message")?,
        category: parse_column(row, "category")?,
        status: parse_column(row, "status")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Multi-row insert of a notification batch on an open transaction
async fn insert_batch(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    batch: Vec<NewNotification>,
) -> Result<usize, DatabaseError> {
    if batch.is_empty() {
        return Ok(0);
    }
    let count = batch.len();

    let mut builder = sqlx::QueryBuilder::<Postgres>::new(
        "INSERT INTO notifications (recipient_id, request_id, message, category, status, created_at) ",
    );
    builder.push_values(batch, |mut row, n| {
        row.push_bind(n.recipient_id)
            .push_bind(n.request_id)
            .push_bind(n.message)
            .push_bind(n.category.as_str())
            .push_bind(n.status.as_str())
            .push_bind(n.created_at);
    });
    builder.build().execute(&mut **tx).await?;

    Ok(count)
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn get_profile(&self, uid: &str) -> Result<Option<Profile>, DatabaseError> {
        let sql = format!("SELECT {} FROM profiles WHERE uid = $1", PROFILE_COLUMNS);
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, DatabaseError> {
        let sql = format!("SELECT {} FROM profiles ORDER BY uid", PROFILE_COLUMNS);
        let profiles = sqlx::query_as::<_, Profile>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(profiles)
    }

    async fn profiles_with_roles(&self, roles: &[Role]) -> Result<Vec<Profile>, DatabaseError> {
        let labels: Vec<String> = roles
            .iter()
            .flat_map(|r| r.labels().iter().map(|l| l.to_string()))
            .collect();
        if labels.is_empty() {
            return Ok(vec![]);
        }

        let sql = format!(
            "SELECT {} FROM profiles WHERE lower(trim(role)) = ANY($1) ORDER BY uid",
            PROFILE_COLUMNS
        );
        let profiles = sqlx::query_as::<_, Profile>(&sql)
            .bind(labels)
            .fetch_all(&self.pool)
            .await?;
        Ok(profiles)
    }

    async fn put_profile(&self, profile: &Profile) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (uid, first_name, last_name, email, role, promotion, specialty, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (uid) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                email = EXCLUDED.email,
                role = EXCLUDED.role,
                promotion = EXCLUDED.promotion,
                specialty = EXCLUDED.specialty,
                status = EXCLUDED.status,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&profile.uid)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.email)
        .bind(&profile.role)
        .bind(&profile.promotion)
        .bind(&profile.specialty)
        .bind(&profile.status)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_profile(&self, uid: &str, fields: &ProfileFields) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET first_name = $2, last_name = $3, email = $4, role = $5, promotion = $6, specialty = $7
            WHERE uid = $1
            "#,
        )
        .bind(uid)
        .bind(fields.first_name.clone().unwrap_or_default())
        .bind(fields.last_name.clone().unwrap_or_default())
        .bind(fields.email.clone().unwrap_or_default())
        .bind(fields.role.clone().unwrap_or_default())
        .bind(fields.promotion.clone().unwrap_or_default())
        .bind(fields.specialty.clone().unwrap_or_default())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_profile(&self, uid: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM profiles WHERE uid = $1")
            .bind(uid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RequestStore for PgStore {
    async fn create_request(
        &self,
        request: NewDocumentRequest,
        fan_out: Vec<NewNotification>,
    ) -> Result<DocumentRequest, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO document_requests (requester_id, requester_role, request_type, message, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&request.requester_id)
        .bind(request.requester_role.as_str())
        .bind(&request.request_type)
        .bind(&request.message)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .fetch_one(&mut *tx)
        .await?;

        let fan_out = fan_out
            .into_iter()
            .map(|n| NewNotification { request_id: Some(id), ..n })
            .collect();
        insert_batch(&mut tx, fan_out).await?;

        tx.commit().await?;
        Ok(request.with_id(id))
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<DocumentRequest>, DatabaseError> {
        let sql = format!("SELECT {} FROM document_requests WHERE id = $1", REQUEST_COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(request_from_row).transpose()
    }

    async fn list_requests(&self) -> Result<Vec<DocumentRequest>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM document_requests ORDER BY created_at ASC NULLS FIRST, id",
            REQUEST_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(request_from_row).collect()
    }

    async fn list_requests_by_requester(
        &self,
        requester_id: &str,
    ) -> Result<Vec<DocumentRequest>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM document_requests WHERE requester_id = $1 ORDER BY created_at ASC NULLS FIRST, id",
            REQUEST_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(requester_id).fetch_all(&self.pool).await?;
        rows.iter().map(request_from_row).collect()
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: RequestStatus,
        notification: NewNotification,
    ) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE document_requests SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        insert_batch(&mut tx, vec![notification]).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn advance_status(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
        notification: NewNotification,
    ) -> Result<Option<RequestStatus>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        // Compare and set in one statement so a concurrent transition wins
        let current: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE document_requests
            SET status = CASE WHEN status = $2 THEN $3 ELSE status END
            WHERE id = $1
            RETURNING status
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let status: RequestStatus = match current {
            Some(raw) => raw
                .parse()
                .map_err(|_| DatabaseError::CorruptRecord(format!("status = '{}'", raw)))?,
            None => {
                tx.rollback().await?;
                return Ok(None);
            }
        };

        insert_batch(&mut tx, vec![NewNotification { status, ..notification }]).await?;
        tx.commit().await?;
        Ok(Some(status))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn notifications_for(&self, recipient_id: &str) -> Result<Vec<Notification>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM notifications WHERE recipient_id = $1 ORDER BY created_at, id",
            NOTIFICATION_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(recipient_id).fetch_all(&self.pool).await?;
        rows.iter().map(notification_from_row).collect()
    }
}
