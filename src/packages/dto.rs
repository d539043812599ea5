use serde::{Deserialize, Serialize};

use crate::{
    auth::dto::present,
    error::ApiError,
    packages::repo::{ItineraryDay, NewPackage, Package, PackagePatch, PackageType},
};

/// Admin forms post prices either as JSON numbers or as the raw input string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    fn value(&self) -> Result<f64, ApiError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| ApiError::validation("Price must be a number")),
        }
    }
}

fn parse_type(raw: &str) -> Result<PackageType, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::validation("Invalid package type"))
}

#[derive(Debug, Deserialize)]
pub struct CreatePackageRequest {
    pub destination: Option<String>,
    pub duration: Option<String>,
    #[serde(rename = "type")]
    pub package_type: Option<String>,
    pub price: Option<PriceInput>,
    pub image: Option<String>,
    pub highlights: Option<Vec<String>>,
    pub inclusions: Option<Vec<String>>,
    pub excludes: Option<Vec<String>>,
    pub itinerary: Option<Vec<ItineraryDay>>,
}

impl TryFrom<CreatePackageRequest> for NewPackage {
    type Error = ApiError;

    fn try_from(req: CreatePackageRequest) -> Result<Self, Self::Error> {
        let (Some(destination), Some(duration), Some(package_type), Some(price)) = (
            present(&req.destination),
            present(&req.duration),
            present(&req.package_type),
            req.price.as_ref(),
        ) else {
            return Err(ApiError::validation(
                "Destination, duration, type and price are required",
            ));
        };
        Ok(Self {
            destination: destination.to_string(),
            duration: duration.to_string(),
            package_type: parse_type(package_type)?,
            price: price.value()?,
            image: req.image.filter(|i| !i.is_empty()),
            highlights: req.highlights.unwrap_or_default(),
            inclusions: req.inclusions.unwrap_or_default(),
            excludes: req.excludes.unwrap_or_default(),
            itinerary: req.itinerary.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePackageRequest {
    pub destination: Option<String>,
    pub duration: Option<String>,
    #[serde(rename = "type")]
    pub package_type: Option<String>,
    pub price: Option<PriceInput>,
    pub image: Option<String>,
    pub highlights: Option<Vec<String>>,
    pub inclusions: Option<Vec<String>>,
    pub excludes: Option<Vec<String>>,
    pub itinerary: Option<Vec<ItineraryDay>>,
}

impl TryFrom<UpdatePackageRequest> for PackagePatch {
    type Error = ApiError;

    fn try_from(req: UpdatePackageRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            package_type: req.package_type.as_deref().map(parse_type).transpose()?,
            price: req.price.as_ref().map(PriceInput::value).transpose()?,
            destination: req.destination,
            duration: req.duration,
            image: req.image.filter(|i| !i.is_empty()),
            highlights: req.highlights,
            inclusions: req.inclusions,
            excludes: req.excludes,
            itinerary: req.itinerary,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PackageList {
    pub ok: bool,
    pub packages: Vec<Package>,
}

#[derive(Debug, Serialize)]
pub struct PackageEnvelope {
    pub ok: bool,
    pub package: Package,
}
