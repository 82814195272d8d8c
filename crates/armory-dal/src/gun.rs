use crate::{ChosenDB, ChosenRow, Error, error::Result};
use futures::TryStreamExt as _;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire as _, Pool, QueryBuilder, Row};
use time::{Duration, OffsetDateTime};
use tracing::debug;

const SELECT_ONE: &str = "SELECT * FROM guns WHERE gun_id = ?";
const SEARCHABLE_COLUMNS: &[&str] = &["gun_name", "serial_number", "description", "misc_attachments"];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Gun {
    pub id: i64,
    pub gun_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Raw image bytes, base64 encoded in JSON
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_bytes")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = Byte))]
    pub image: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub misc_attachments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Gun {
    pub fn has_image(&self) -> bool {
        self.image.as_ref().is_some_and(|i| !i.is_empty())
    }
}

impl sqlx::FromRow<'_, ChosenRow> for Gun {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        Ok(Gun {
            id: row.try_get("gun_id")?,
            gun_name: row.try_get("gun_name")?,
            year: row.try_get("year")?,
            condition: row.try_get("condition")?,
            serial_number: row.try_get("serial_number")?,
            description: row.try_get("description")?,
            image: row.try_get("image")?,
            misc_attachments: row.try_get("misc_attachments")?,
            value: row.try_get("value")?,
            created_at: row.try_get("createdAt")?,
            updated_at: row.try_get("updatedAt")?,
        })
    }
}

mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Optional (clearable) fields of a gun
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GunField {
    Year,
    Condition,
    SerialNumber,
    Description,
    MiscAttachments,
    Value,
    Image,
}

impl GunField {
    pub fn column(&self) -> &'static str {
        match self {
            GunField::Year => "year",
            GunField::Condition => "condition",
            GunField::SerialNumber => "serial_number",
            GunField::Description => "description",
            GunField::MiscAttachments => "misc_attachments",
            GunField::Value => "value",
            GunField::Image => "image",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Year(i64),
    Condition(i64),
    SerialNumber(String),
    Description(String),
    MiscAttachments(String),
    Value(f64),
    Image(Vec<u8>),
}

impl FieldValue {
    pub fn field(&self) -> GunField {
        match self {
            FieldValue::Year(_) => GunField::Year,
            FieldValue::Condition(_) => GunField::Condition,
            FieldValue::SerialNumber(_) => GunField::SerialNumber,
            FieldValue::Description(_) => GunField::Description,
            FieldValue::MiscAttachments(_) => GunField::MiscAttachments,
            FieldValue::Value(_) => GunField::Value,
            FieldValue::Image(_) => GunField::Image,
        }
    }

    fn push_bind<'a>(&'a self, query: &mut QueryBuilder<'a, ChosenDB>) {
        match self {
            FieldValue::Year(v) | FieldValue::Condition(v) => {
                query.push_bind(*v);
            }
            FieldValue::SerialNumber(s)
            | FieldValue::Description(s)
            | FieldValue::MiscAttachments(s) => {
                query.push_bind(s.as_str());
            }
            FieldValue::Value(v) => {
                query.push_bind(*v);
            }
            FieldValue::Image(data) => {
                query.push_bind(data.as_slice());
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Set(FieldValue),
    Clear(GunField),
}

impl FieldOp {
    pub fn field(&self) -> GunField {
        match self {
            FieldOp::Set(value) => value.field(),
            FieldOp::Clear(field) => *field,
        }
    }
}

/// Full set of changes for one gun: name is always written, optional fields
/// are set or cleared as listed
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GunChanges {
    pub gun_name: String,
    pub ops: Vec<FieldOp>,
}

impl GunChanges {
    pub fn new(gun_name: impl Into<String>) -> Self {
        GunChanges {
            gun_name: gun_name.into(),
            ops: Vec::new(),
        }
    }

    pub fn set(mut self, value: FieldValue) -> Self {
        self.ops.push(FieldOp::Set(value));
        self
    }

    pub fn clear(mut self, field: GunField) -> Self {
        self.ops.push(FieldOp::Clear(field));
        self
    }

    /// Last operation for each field, in order of first appearance
    pub fn resolved(&self) -> Vec<&FieldOp> {
        let mut resolved: Vec<&FieldOp> = Vec::with_capacity(self.ops.len());
        for op in &self.ops {
            let existing = resolved.iter().position(|o| o.field() == op.field());
            match existing {
                Some(idx) => resolved[idx] = op,
                None => resolved.push(op),
            }
        }
        resolved
    }
}

/// Timestamp later than `previous`, so stored timestamps never go backwards
fn next_timestamp(previous: Option<OffsetDateTime>) -> OffsetDateTime {
    not_before(previous, OffsetDateTime::now_utc())
}

fn not_before(previous: Option<OffsetDateTime>, now: OffsetDateTime) -> OffsetDateTime {
    match previous {
        Some(prev) if now <= prev => prev + Duration::milliseconds(1),
        _ => now,
    }
}

pub type GunRepository = GunRepositoryImpl<Pool<ChosenDB>>;

pub struct GunRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> GunRepositoryImpl<E>
where
    for<'a> &'a E:
        sqlx::Executor<'c, Database = ChosenDB> + sqlx::Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: GunChanges) -> Result<Gun> {
        let mut transaction = self.executor.begin().await?;

        let values = payload
            .resolved()
            .into_iter()
            .filter_map(|op| match op {
                FieldOp::Set(value) => Some(value),
                FieldOp::Clear(_) => None,
            })
            .collect::<Vec<_>>();

        // Insert comes first so the transaction holds the write lock before any read
        let provisional = OffsetDateTime::now_utc();
        let mut query = QueryBuilder::<ChosenDB>::new("INSERT INTO guns (gun_name, createdAt, updatedAt");
        for value in &values {
            query.push(", ").push(value.field().column());
        }
        query
            .push(") VALUES (")
            .push_bind(payload.gun_name.as_str())
            .push(", ")
            .push_bind(provisional)
            .push(", ")
            .push_bind(provisional);
        for value in &values {
            query.push(", ");
            value.push_bind(&mut query);
        }
        query.push(")");

        let result = query.build().execute(&mut *transaction).await?;
        let id = result.last_insert_rowid();

        let latest: Option<OffsetDateTime> = sqlx::query_scalar(
            "SELECT createdAt FROM guns WHERE gun_id < ? ORDER BY gun_id DESC LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&mut *transaction)
        .await?;
        let now = not_before(latest, provisional);
        if now != provisional {
            sqlx::query("UPDATE guns SET createdAt = ?, updatedAt = ? WHERE gun_id = ?")
                .bind(now)
                .bind(now)
                .bind(id)
                .execute(&mut *transaction)
                .await?;
        }

        let record = get(id, &mut *transaction).await?;
        transaction.commit().await?;
        debug!("Created gun {id}");
        Ok(record)
    }

    pub async fn update(&self, id: i64, payload: GunChanges) -> Result<Gun> {
        let mut transaction = self.executor.begin().await?;

        // Field changes are written first, timestamp is stamped once previous value is known
        let mut query = QueryBuilder::<ChosenDB>::new("UPDATE guns SET gun_name = ");
        query.push_bind(payload.gun_name.as_str());
        for op in payload.resolved() {
            query.push(", ").push(op.field().column());
            match op {
                FieldOp::Set(value) => {
                    query.push(" = ");
                    value.push_bind(&mut query);
                }
                FieldOp::Clear(_) => {
                    query.push(" = NULL");
                }
            }
        }
        query.push(" WHERE gun_id = ").push_bind(id);

        let result = query.build().execute(&mut *transaction).await?;
        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound("Gun".to_string()));
        }

        let previous: OffsetDateTime =
            sqlx::query_scalar("SELECT updatedAt FROM guns WHERE gun_id = ?")
                .bind(id)
                .fetch_one(&mut *transaction)
                .await?;
        sqlx::query("UPDATE guns SET updatedAt = ? WHERE gun_id = ?")
            .bind(next_timestamp(Some(previous)))
            .bind(id)
            .execute(&mut *transaction)
            .await?;

        let record = get(id, &mut *transaction).await?;
        transaction.commit().await?;
        debug!("Updated gun {id}");
        Ok(record)
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM guns")
            .fetch_one(&self.executor)
            .await?;
        Ok(count as u64)
    }

    pub async fn list_all(&self) -> Result<Vec<Gun>> {
        self.list(None).await
    }

    /// Lists all guns ordered by id, optionally only those where any text field
    /// contains `filter`. Case folding is done by SQLite `lower`, so it covers ASCII letters only
    pub async fn list(&self, filter: Option<&str>) -> Result<Vec<Gun>> {
        let mut query = QueryBuilder::<ChosenDB>::new("SELECT * FROM guns");
        if let Some(needle) = filter.map(str::trim).filter(|s| !s.is_empty()) {
            query.push(" WHERE ");
            for (i, column) in SEARCHABLE_COLUMNS.iter().enumerate() {
                if i > 0 {
                    query.push(" OR ");
                }
                query
                    .push(format!("instr(lower({column}), lower("))
                    .push_bind(needle)
                    .push(")) > 0");
            }
        }
        query.push(" ORDER BY gun_id ASC");

        let records = query
            .build_query_as::<Gun>()
            .fetch(&self.executor)
            .try_collect::<Vec<_>>()
            .await?;
        Ok(records)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM guns WHERE gun_id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Gun".to_string()))
        } else {
            debug!("Deleted gun {id}");
            Ok(())
        }
    }

    pub async fn get(&self, id: i64) -> Result<Gun> {
        get(id, &self.executor).await
    }
}

async fn get<'c, E>(id: i64, executor: E) -> Result<Gun>
where
    E: sqlx::Executor<'c, Database = ChosenDB>,
{
    let record = sqlx::query_as::<_, Gun>(SELECT_ONE)
        .bind(id)
        .fetch_one(executor)
        .await?;
    Ok(record)
}
