use std::{fmt, str::FromStr};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageType {
    Family,
    Couple,
    Solo,
}

impl PackageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Family => "Family",
            Self::Couple => "Couple",
            Self::Solo => "Solo",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown package type `{0}`")]
pub struct UnknownPackageType(pub String);

impl FromStr for PackageType {
    type Err = UnknownPackageType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Family" => Ok(Self::Family),
            "Couple" => Ok(Self::Couple),
            "Solo" => Ok(Self::Solo),
            other => Err(UnknownPackageType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryDay {
    pub day: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// A sellable trip as the API presents it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub destination: String,
    pub duration: String,
    #[serde(rename = "type")]
    pub package_type: PackageType,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub highlights: Vec<String>,
    pub inclusions: Vec<String>,
    pub excludes: Vec<String>,
    pub itinerary: Vec<ItineraryDay>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Row as stored; `package_type` is plain text constrained by a CHECK.
#[derive(Debug, FromRow)]
pub struct PackageRow {
    pub id: Uuid,
    pub destination: String,
    pub duration: String,
    pub package_type: String,
    pub price: f64,
    pub image: Option<String>,
    pub highlights: Vec<String>,
    pub inclusions: Vec<String>,
    pub excludes: Vec<String>,
    pub itinerary: Json<Vec<ItineraryDay>>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<PackageRow> for Package {
    type Error = UnknownPackageType;

    fn try_from(r: PackageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            destination: r.destination,
            duration: r.duration,
            package_type: r.package_type.parse()?,
            price: r.price,
            image: r.image,
            highlights: r.highlights,
            inclusions: r.inclusions,
            excludes: r.excludes,
            itinerary: r.itinerary.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewPackage {
    pub destination: String,
    pub duration: String,
    pub package_type: PackageType,
    pub price: f64,
    pub image: Option<String>,
    pub highlights: Vec<String>,
    pub inclusions: Vec<String>,
    pub excludes: Vec<String>,
    pub itinerary: Vec<ItineraryDay>,
}

/// Fields to overwrite; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct PackagePatch {
    pub destination: Option<String>,
    pub duration: Option<String>,
    pub package_type: Option<PackageType>,
    pub price: Option<f64>,
    pub image: Option<String>,
    pub highlights: Option<Vec<String>>,
    pub inclusions: Option<Vec<String>>,
    pub excludes: Option<Vec<String>>,
    pub itinerary: Option<Vec<ItineraryDay>>,
}

#[cfg(test)]
impl PackagePatch {
    pub fn apply(self, p: &mut Package) {
        if let Some(v) = self.destination {
            p.destination = v;
        }
        if let Some(v) = self.duration {
            p.duration = v;
        }
        if let Some(v) = self.package_type {
            p.package_type = v;
        }
        if let Some(v) = self.price {
            p.price = v;
        }
        if let Some(v) = self.image {
            p.image = Some(v);
        }
        if let Some(v) = self.highlights {
            p.highlights = v;
        }
        if let Some(v) = self.inclusions {
            p.inclusions = v;
        }
        if let Some(v) = self.excludes {
            p.excludes = v;
        }
        if let Some(v) = self.itinerary {
            p.itinerary = v;
        }
    }
}

#[async_trait]
pub trait PackageStore: Send + Sync {
    /// Newest first.
    async fn list(&self) -> Result<Vec<Package>, StoreError>;
    async fn create(&self, package: NewPackage) -> Result<Package, StoreError>;
    async fn update(&self, id: Uuid, patch: PackagePatch) -> Result<Option<Package>, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

const PACKAGE_COLUMNS: &str = "id, destination, duration, package_type, price, image, \
     highlights, inclusions, excludes, itinerary, created_at, updated_at";

#[derive(Clone)]
pub struct PgPackageStore {
    db: PgPool,
}

impl PgPackageStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn decode(row: PackageRow) -> Result<Package, StoreError> {
    Package::try_from(row).map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
}

#[async_trait]
impl PackageStore for PgPackageStore {
    async fn list(&self) -> Result<Vec<Package>, StoreError> {
        let rows = sqlx::query_as::<_, PackageRow>(&format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages ORDER BY created_at DESC"
        ))
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(decode).collect()
    }

    async fn create(&self, p: NewPackage) -> Result<Package, StoreError> {
        let row = sqlx::query_as::<_, PackageRow>(&format!(
            r#"
            INSERT INTO packages
                (id, destination, duration, package_type, price, image,
                 highlights, inclusions, excludes, itinerary)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PACKAGE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&p.destination)
        .bind(&p.duration)
        .bind(p.package_type.as_str())
        .bind(p.price)
        .bind(&p.image)
        .bind(&p.highlights)
        .bind(&p.inclusions)
        .bind(&p.excludes)
        .bind(Json(&p.itinerary))
        .fetch_one(&self.db)
        .await?;
        decode(row)
    }

    async fn update(&self, id: Uuid, patch: PackagePatch) -> Result<Option<Package>, StoreError> {
        let row = sqlx::query_as::<_, PackageRow>(&format!(
            r#"
            UPDATE packages SET
                destination  = COALESCE($2, destination),
                duration     = COALESCE($3, duration),
                package_type = COALESCE($4, package_type),
                price        = COALESCE($5, price),
                image        = COALESCE($6, image),
                highlights   = COALESCE($7, highlights),
                inclusions   = COALESCE($8, inclusions),
                excludes     = COALESCE($9, excludes),
                itinerary    = COALESCE($10, itinerary),
                updated_at   = now()
            WHERE id = $1
            RETURNING {PACKAGE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.destination)
        .bind(&patch.duration)
        .bind(patch.package_type.map(PackageType::as_str))
        .bind(patch.price)
        .bind(&patch.image)
        .bind(&patch.highlights)
        .bind(&patch.inclusions)
        .bind(&patch.excludes)
        .bind(patch.itinerary.as_ref().map(Json))
        .fetch_optional(&self.db)
        .await?;
        row.map(decode).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let done = sqlx::query("DELETE FROM packages WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Package {
        let now = OffsetDateTime::now_utc();
        Package {
            id: Uuid::new_v4(),
            destination: "Goa".into(),
            duration: "2N/3D".into(),
            package_type: PackageType::Couple,
            price: 5000.0,
            image: None,
            highlights: vec!["Beach".into()],
            inclusions: vec![],
            excludes: vec![],
            itinerary: vec![ItineraryDay {
                day: 1,
                title: "Arrive".into(),
                description: "Check in".into(),
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn package_type_parses_known_values_only() {
        assert_eq!("Family".parse::<PackageType>(), Ok(PackageType::Family));
        assert_eq!("Solo".parse::<PackageType>(), Ok(PackageType::Solo));
        assert!("family".parse::<PackageType>().is_err());
        assert!("Group".parse::<PackageType>().is_err());
    }

    #[test]
    fn serialises_with_api_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["type"], "Couple");
        assert!(json.get("_id").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("image").is_none());
        assert_eq!(json["itinerary"][0]["day"], 1);
    }

    #[test]
    fn patch_only_touches_supplied_fields() {
        let mut p = sample();
        PackagePatch {
            price: Some(6500.0),
            image: Some("goa.jpg".into()),
            ..Default::default()
        }
        .apply(&mut p);
        assert_eq!(p.price, 6500.0);
        assert_eq!(p.image.as_deref(), Some("goa.jpg"));
        assert_eq!(p.destination, "Goa");
        assert_eq!(p.highlights, vec!["Beach".to_string()]);
        assert_eq!(p.itinerary.len(), 1);
    }

    #[test]
    fn row_with_unknown_type_fails_conversion() {
        let now = OffsetDateTime::now_utc();
        let row = PackageRow {
            id: Uuid::new_v4(),
            destination: "Goa".into(),
            duration: "2N/3D".into(),
            package_type: "Group".into(),
            price: 1.0,
            image: None,
            highlights: vec![],
            inclusions: vec![],
            excludes: vec![],
            itinerary: Json(vec![]),
            created_at: now,
            updated_at: now,
        };
        assert!(Package::try_from(row).is_err());
    }

    #[test]
    fn itinerary_day_text_defaults() {
        let day: ItineraryDay = serde_json::from_str(r#"{"day":2}"#).unwrap();
        assert_eq!(day.title, "");
        assert_eq!(day.description, "");
    }
}
