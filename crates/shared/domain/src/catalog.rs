use crate::ids::{AvailabilityId, FeatureId, LocalityId, PlanId, ZoneTypeId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Icon shown for a feature when none is given.
pub const DEFAULT_FEATURE_ICON: &str = "check_circle";

/// A named geographic service area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locality {
    pub id: LocalityId,
    pub name: String,
}

/// Classification of a locality area (urban, rural) affecting the offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneType {
    pub id: ZoneTypeId,
    pub name: String,
}

/// Plan category. The three known names match ignoring case; any other name is kept as
/// given, trimmed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Internet,
    Tv,
    Combo,
    Other(String),
}

impl Category {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Internet => "internet",
            Self::Tv => "tv",
            Self::Combo => "combo",
            Self::Other(name) => name,
        }
    }

    /// `true` for a category without a name (only possible through `Other`).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.as_str().trim().is_empty()
    }
}

impl From<&str> for Category {
    fn from(raw: &str) -> Self {
        let name = raw.trim();
        match name.to_lowercase().as_str() {
            "internet" => Self::Internet,
            "tv" => Self::Tv,
            "combo" => Self::Combo,
            _ => Self::Other(name.to_owned()),
        }
    }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_owned()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchasable service offering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub price: Decimal,
    pub category: Category,
    pub created_at: DateTime<Utc>,
}

/// A line-item benefit displayed under a plan, ordered by `sort_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub plan_id: PlanId,
    pub icon_name: String,
    pub description: String,
    pub sort_order: i64,
}

/// Assertion that a plan is offered in a locality under a zone type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanAvailability {
    pub id: AvailabilityId,
    pub plan_id: PlanId,
    pub locality_id: LocalityId,
    pub zone_type_id: ZoneTypeId,
}

/// A plan together with its features in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDetails {
    #[serde(flatten)]
    pub plan: Plan,
    pub features: Vec<Feature>,
}

/// Desired feature of a plan draft; its position in the draft becomes its `sort_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    #[serde(default)]
    pub icon: Option<String>,
    pub description: String,
}

impl FeatureSpec {
    pub fn new(description: impl Into<String>) -> Self {
        Self { icon: None, description: description.into() }
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// The icon to store, falling back to [`DEFAULT_FEATURE_ICON`].
    #[must_use]
    pub fn icon_name(&self) -> &str {
        self.icon
            .as_deref()
            .map(str::trim)
            .filter(|icon| !icon.is_empty())
            .unwrap_or(DEFAULT_FEATURE_ICON)
    }
}

/// A (locality, zone type) combination a plan is offered at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvailabilityPair {
    pub locality_id: LocalityId,
    pub zone_type_id: ZoneTypeId,
}

impl AvailabilityPair {
    pub fn new(locality_id: impl Into<LocalityId>, zone_type_id: impl Into<ZoneTypeId>) -> Self {
        Self { locality_id: locality_id.into(), zone_type_id: zone_type_id.into() }
    }
}

/// Full desired state of a plan: attributes, ordered features and availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDraft {
    pub name: String,
    pub price: Decimal,
    pub category: Category,
    #[serde(default)]
    pub features: Vec<FeatureSpec>,
    #[serde(default)]
    pub availability: Vec<AvailabilityPair>,
}

impl PlanDraft {
    pub fn new(name: impl Into<String>, price: Decimal, category: impl Into<Category>) -> Self {
        Self {
            name: name.into(),
            price,
            category: category.into(),
            features: Vec::new(),
            availability: Vec::new(),
        }
    }

    #[must_use]
    pub fn feature(mut self, feature: FeatureSpec) -> Self {
        self.features.push(feature);
        self
    }

    #[must_use]
    pub fn available_at(
        mut self,
        locality_id: impl Into<LocalityId>,
        zone_type_id: impl Into<ZoneTypeId>,
    ) -> Self {
        self.availability.push(AvailabilityPair::new(locality_id, zone_type_id));
        self
    }
}

/// An availability row of a plan with its locality and zone type resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityDetail {
    pub id: AvailabilityId,
    pub locality: Locality,
    pub zone_type: ZoneType,
}

/// An availability row joined with its plan, locality and zone type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityListing {
    pub id: AvailabilityId,
    pub plan: Plan,
    pub locality: Locality,
    pub zone_type: ZoneType,
}

/// Everything the plan editor shows for one plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanForEdit {
    pub plan: Plan,
    pub features: Vec<Feature>,
    pub availability: Vec<AvailabilityDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_plans: usize,
    pub total_localities: usize,
    pub total_zone_types: usize,
    pub plans_by_category: BTreeMap<String, usize>,
    /// Most recently created plans, newest first.
    pub recent_plans: Vec<Plan>,
}

/// Snapshot of the whole catalog, as written by the export command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogExport {
    pub exported_at: DateTime<Utc>,
    pub plans: Vec<PlanDetails>,
    pub localities: Vec<Locality>,
    pub zone_types: Vec<ZoneType>,
}
