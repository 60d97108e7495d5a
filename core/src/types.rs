//! Wire shapes exchanged with the SolarSync backend.
//!
//! # Design
//! These types mirror the backend's declared schema field for field. Adding,
//! removing, or retyping a field here is a breaking change for the client.
//! They are defined independently from the mock-server crate; the
//! integration tests catch any schema drift between the two.
//!
//! Decoding doubles as validation: ids must be positive, timestamps must parse
//! as ISO-8601, and a payload that does not fit surfaces as
//! `ApiError::SchemaMismatch` instead of a half-filled value. Unknown extra
//! fields are ignored so the backend can grow its responses.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat};
use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An ISO-8601 date-time as sent by the backend.
///
/// Accepts RFC 3339 strings with an offset and naive date-times, which the
/// backend emits for columns stored without a time zone (read as UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<FixedOffset>);

impl Timestamp {
    pub fn parse(input: &str) -> Result<Self, chrono::ParseError> {
        match DateTime::parse_from_rfc3339(input) {
            Ok(dt) => Ok(Self(dt)),
            Err(rfc_err) => NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| Self(naive.and_utc().fixed_offset()))
                .map_err(|_| rfc_err),
        }
    }

    pub fn as_datetime(&self) -> &DateTime<FixedOffset> {
        &self.0
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw)
            .map_err(|e| D::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
    }
}

/// Entity ids start at 1; a zero id is rejected like a negative one.
fn positive_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match u64::deserialize(deserializer)? {
        0 => Err(D::Error::invalid_value(Unexpected::Unsigned(0), &"a positive id")),
        id => Ok(id),
    }
}

/// A supplier or installer company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(deserialize_with = "positive_id")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub years_in_business: Option<u32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A company together with the products it supplies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(flatten)]
    pub company: Company,
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(deserialize_with = "positive_id")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(deserialize_with = "positive_id")]
    pub category_id: u64,
    #[serde(deserialize_with = "positive_id")]
    pub supplier_id: u64,
    /// Free-form technical sheet; the backend does not constrain its shape.
    #[serde(default)]
    pub specifications: Option<serde_json::Value>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub price_info: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(deserialize_with = "positive_id")]
    pub id: u64,
    #[serde(deserialize_with = "positive_id")]
    pub product_id: u64,
    /// Opaque user identifier (a UUID string on the current backend).
    pub user_id: String,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
    pub created_at: Timestamp,
}

/// Request payload for `submit_review`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub product_id: u64,
    pub rating: i32,
    pub comment: String,
}

/// Request payload for `register_user`. `company_name` is required by the
/// backend when `role` is `supplier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub email: String,
    pub password: String,
    pub role: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub role: String,
    pub full_name: String,
    #[serde(default)]
    pub company_name: Option<String>,
}

/// Profile-view analytics for the signed-in supplier's company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsData {
    pub total_views: u64,
    pub views_past_30_days: u64,
    /// One entry per day with at least one view, oldest first.
    pub daily_views: Vec<DailyViews>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyViews {
    pub date: NaiveDate,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Body of a 422 response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpValidationError {
    #[serde(default)]
    pub detail: Option<Vec<ValidationError>>,
}

impl HttpValidationError {
    pub fn errors(&self) -> &[ValidationError] {
        self.detail.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub loc: Vec<LocSegment>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ValidationError {
    /// Dotted location, e.g. `body.rating` or `path.product_id`.
    pub fn location(&self) -> String {
        self.loc
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// One step of a validation error location: a field name or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocSegment {
    Index(u64),
    Key(String),
}

impl fmt::Display for LocSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocSegment::Index(i) => write!(f, "{i}"),
            LocSegment::Key(k) => f.write_str(k),
        }
    }
}

/// Query filters for `list_products`. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListProductsParams {
    /// Category name, e.g. `Inverters`.
    pub category: Option<String>,
    /// Brand name; the backend matches substrings.
    pub brand: Option<String>,
}

/// Query filters for `search_companies`. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCompaniesParams {
    /// Two-letter state code, e.g. `SP`.
    pub state: Option<String>,
    pub city: Option<String>,
}

/// Where a quote request stands on the supplier's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Pending,
    Contacted,
    Quoted,
    Closed,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 4] = [
        LeadStatus::Pending,
        LeadStatus::Contacted,
        LeadStatus::Quoted,
        LeadStatus::Closed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::Pending => "pending",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Quoted => "quoted",
            LeadStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A quote request sent by an installer to a supplier company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    #[serde(deserialize_with = "positive_id")]
    pub id: u64,
    /// Opaque user id of the installer who sent the request.
    pub installer_id: String,
    /// Company id of the receiving supplier.
    #[serde(deserialize_with = "positive_id")]
    pub supplier_id: u64,
    pub project_description: String,
    #[serde(default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub estimated_budget: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub preferred_contact_method: Option<String>,
    #[serde(default)]
    pub timeline: Option<String>,
    pub status: LeadStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

/// A lead as seen by the installer who sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentLead {
    #[serde(flatten)]
    pub lead: Lead,
    pub supplier_name: String,
}

/// Request payload for `create_lead`. Unset optionals are left out of the
/// body so the backend applies its own defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateLeadRequest {
    pub supplier_id: u64,
    pub project_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub contact_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_contact_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
}

impl CreateLeadRequest {
    pub fn new(supplier_id: u64, project_description: impl Into<String>, contact_email: impl Into<String>) -> Self {
        Self {
            supplier_id,
            project_description: project_description.into(),
            project_type: None,
            estimated_budget: None,
            location: None,
            contact_email: contact_email.into(),
            contact_phone: None,
            preferred_contact_method: None,
            timeline: None,
        }
    }
}

/// Request payload for `update_lead_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateLeadStatus {
    pub lead_id: u64,
    pub status: LeadStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Acknowledgement body of update-style routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
        })
    }
}

/// A subscription plan offered to supplier companies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(deserialize_with = "positive_id")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    pub billing_cycle: BillingCycle,
    #[serde(default)]
    pub max_products: Option<u32>,
    #[serde(default)]
    pub max_users: Option<u32>,
    /// Feature list as the backend stores it: a JSON-encoded string.
    #[serde(default)]
    pub features: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

/// Request payload for `create_plan`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePlanRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    pub billing_cycle: BillingCycle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_products: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_users: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Cancelled,
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Cancelled => "cancelled",
        })
    }
}

/// One row of a company's subscription history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySubscription {
    #[serde(deserialize_with = "positive_id")]
    pub id: u64,
    #[serde(deserialize_with = "positive_id")]
    pub company_id: u64,
    #[serde(deserialize_with = "positive_id")]
    pub plan_id: u64,
    pub status: SubscriptionStatus,
    pub start_date: Timestamp,
    #[serde(default)]
    pub end_date: Option<Timestamp>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

/// A company with its active subscription, if any, for the admin panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyWithSubscription {
    #[serde(deserialize_with = "positive_id")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub current_plan: Option<String>,
    #[serde(default)]
    pub plan_status: Option<SubscriptionStatus>,
    #[serde(default)]
    pub subscription_start: Option<Timestamp>,
    #[serde(default)]
    pub subscription_end: Option<Timestamp>,
}

/// Request payload for `update_subscription`: move `company_id` onto
/// `plan_id`, deactivating its current plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSubscriptionRequest {
    pub company_id: u64,
    pub plan_id: u64,
}

/// Paging for `list_admin_companies`. The backend defaults to page 1 of 50
/// and caps `limit` at 100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdminCompaniesParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPANY: &str = r#"{
        "id": 3,
        "name": "Sol Campinas",
        "city": "Campinas",
        "state": "SP",
        "created_at": "2024-03-01T12:00:00Z",
        "updated_at": "2024-03-02T08:30:00.123456"
    }"#;

    #[test]
    fn company_optional_fields_default_to_none() {
        let company: Company = serde_json::from_str(COMPANY).unwrap();
        assert_eq!(company.id, 3);
        assert!(company.description.is_none());
        assert!(company.years_in_business.is_none());
        assert_eq!(company.state.as_deref(), Some("SP"));
    }

    #[test]
    fn naive_timestamps_are_read_as_utc() {
        let ts = Timestamp::parse("2024-03-02T08:30:00").unwrap();
        assert_eq!(ts.to_string(), "2024-03-02T08:30:00Z");
        assert_eq!(ts.as_datetime().offset().local_minus_utc(), 0);
    }

    #[test]
    fn offset_timestamps_keep_their_offset() {
        let ts = Timestamp::parse("2024-03-02T08:30:00-03:00").unwrap();
        assert_eq!(ts.to_string(), "2024-03-02T08:30:00-03:00");
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        let raw = COMPANY.replace("2024-03-01T12:00:00Z", "yesterday");
        let err = serde_json::from_str::<Company>(&raw).unwrap_err();
        assert!(err.to_string().contains("invalid timestamp"));
    }

    #[test]
    fn negative_id_is_rejected() {
        let raw = COMPANY.replace("\"id\": 3", "\"id\": -3");
        assert!(serde_json::from_str::<Company>(&raw).is_err());
    }

    #[test]
    fn zero_id_is_rejected() {
        let raw = COMPANY.replace("\"id\": 3", "\"id\": 0");
        let err = serde_json::from_str::<Company>(&raw).unwrap_err();
        assert!(err.to_string().contains("a positive id"), "{err}");
    }

    #[test]
    fn profile_products_default_to_empty() {
        let profile: CompanyProfile = serde_json::from_str(COMPANY).unwrap();
        assert_eq!(profile.company.name, "Sol Campinas");
        assert!(profile.products.is_empty());
    }

    #[test]
    fn registration_omits_missing_company_name() {
        let req = RegistrationRequest {
            email: "ana@example.com".to_string(),
            password: "secret".to_string(),
            role: "installer".to_string(),
            full_name: "Ana Souza".to_string(),
            company_name: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("company_name").is_none());
        assert_eq!(json["role"], "installer");
    }

    #[test]
    fn validation_error_decodes_mixed_locations() {
        let raw = r#"{"detail":[{"loc":["body","items",2,"rating"],"msg":"field required","type":"missing"}]}"#;
        let err: HttpValidationError = serde_json::from_str(raw).unwrap();
        let first = &err.errors()[0];
        assert_eq!(first.loc[2], LocSegment::Index(2));
        assert_eq!(first.location(), "body.items.2.rating");
        assert_eq!(first.kind, "missing");
    }

    #[test]
    fn validation_error_without_detail_has_no_errors() {
        let err: HttpValidationError = serde_json::from_str("{}").unwrap();
        assert!(err.errors().is_empty());
    }

    const LEAD: &str = r#"{
        "id": 12,
        "installer_id": "4b0c7a8e-9d2f-4c1e-8a55-2f1f3b7d9e01",
        "supplier_id": 1,
        "project_description": "Telhado residencial, 6 kWp",
        "estimated_budget": 28000,
        "contact_email": "ana@example.com",
        "preferred_contact_method": "email",
        "status": "quoted",
        "created_at": "2024-05-03T10:00:00.123456"
    }"#;

    #[test]
    fn lead_decodes_status_and_optional_fields() {
        let lead: Lead = serde_json::from_str(LEAD).unwrap();
        assert_eq!(lead.status, LeadStatus::Quoted);
        assert_eq!(lead.estimated_budget, Some(28000.0));
        assert!(lead.notes.is_none());
        assert!(lead.updated_at.is_none());
    }

    #[test]
    fn unknown_lead_status_is_rejected() {
        let raw = LEAD.replace("\"quoted\"", "\"won\"");
        assert!(serde_json::from_str::<Lead>(&raw).is_err());
    }

    #[test]
    fn sent_lead_carries_supplier_name() {
        let raw = LEAD.replacen('{', r#"{"supplier_name": "Sol Campinas Energia","#, 1);
        let sent: SentLead = serde_json::from_str(&raw).unwrap();
        assert_eq!(sent.supplier_name, "Sol Campinas Energia");
        assert_eq!(sent.lead.id, 12);
    }

    #[test]
    fn create_lead_leaves_unset_optionals_out() {
        let mut req = CreateLeadRequest::new(1, "Galpão industrial", "obra@example.com");
        req.timeline = Some("3 meses".to_string());
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("preferred_contact_method").is_none());
        assert!(json.get("estimated_budget").is_none());
        assert_eq!(json["timeline"], "3 meses");
    }

    #[test]
    fn status_update_serializes_lowercase_status() {
        let req = UpdateLeadStatus {
            lead_id: 4,
            status: LeadStatus::Contacted,
            notes: None,
        };
        let json = serde_json::to_value(req).unwrap();
        assert_eq!(json, serde_json::json!({"lead_id": 4, "status": "contacted", "notes": null}));
    }

    #[test]
    fn plan_and_admin_company_decode() {
        let plan: Plan = serde_json::from_str(
            r#"{"id":2,"name":"Profissional","price":249.9,"billing_cycle":"monthly","max_products":50}"#,
        )
        .unwrap();
        assert_eq!(plan.billing_cycle, BillingCycle::Monthly);
        assert_eq!(plan.max_products, Some(50));

        let company: CompanyWithSubscription = serde_json::from_str(
            r#"{"id":1,"name":"Sol Campinas Energia","current_plan":"Profissional","plan_status":"active"}"#,
        )
        .unwrap();
        assert_eq!(company.plan_status, Some(SubscriptionStatus::Active));
        assert!(company.subscription_end.is_none());
    }

    #[test]
    fn analytics_daily_views_keep_order() {
        let raw = r#"{"total_views":5,"views_past_30_days":3,"daily_views":[
            {"date":"2024-05-02","views":2},{"date":"2024-05-01","views":1}]}"#;
        let data: AnalyticsData = serde_json::from_str(raw).unwrap();
        assert_eq!(data.daily_views[0].date.to_string(), "2024-05-02");
        assert_eq!(data.daily_views[1].views, 1);
    }
}
