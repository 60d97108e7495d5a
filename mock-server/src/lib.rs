//! In-memory stand-in for the SolarSync backend.
//!
//! Serves the same routes and JSON shapes as the real service from a seeded
//! store, including its error envelopes: `{"detail": "..."}` for 4xx
//! failures and the field-level `{"detail": [...]}` list for 422s.
//!
//! Any non-empty bearer token authenticates. Unknown tokens are provisioned
//! as installers without a company; `SUPPLIER_TOKEN` belongs to the
//! supplier that owns company 1 and `ADMIN_TOKEN` to the platform admin.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const SUPPLIER_TOKEN: &str = "supplier-demo-token";
pub const ADMIN_TOKEN: &str = "admin-demo-token";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub years_in_business: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(flatten)]
    pub company: Company,
    pub products: Vec<Product>,
}

/// Product rows are stored without a time zone, so their timestamps go out
/// as naive date-times.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category_id: u64,
    pub supplier_id: u64,
    pub specifications: Option<Value>,
    pub image_url: Option<String>,
    pub price_info: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: u64,
    pub product_id: u64,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub product_id: u64,
    pub rating: i32,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    pub email: String,
    pub password: String,
    pub role: String,
    pub full_name: String,
    #[serde(default)]
    pub company_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub role: String,
    pub full_name: String,
    pub company_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyViews {
    pub date: NaiveDate,
    pub views: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsData {
    pub total_views: u64,
    pub views_past_30_days: u64,
    pub daily_views: Vec<DailyViews>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductFilters {
    pub category: Option<String>,
    pub brand: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompanyFilters {
    pub state: Option<String>,
    pub city: Option<String>,
}

/// A quote request from an installer to a supplier company.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: u64,
    pub installer_id: Uuid,
    pub supplier_id: u64,
    pub project_description: String,
    pub project_type: Option<String>,
    pub estimated_budget: Option<f64>,
    pub location: Option<String>,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub preferred_contact_method: Option<String>,
    pub timeline: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentLead {
    #[serde(flatten)]
    pub lead: Lead,
    pub supplier_name: String,
}

fn email_contact() -> Option<String> {
    Some("email".to_string())
}

#[derive(Debug, Deserialize)]
pub struct CreateLeadRequest {
    pub supplier_id: u64,
    pub project_description: String,
    pub project_type: Option<String>,
    pub estimated_budget: Option<f64>,
    pub location: Option<String>,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    #[serde(default = "email_contact")]
    pub preferred_contact_method: Option<String>,
    pub timeline: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLeadStatusRequest {
    pub lead_id: u64,
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub billing_cycle: String,
    pub max_products: Option<u32>,
    pub max_users: Option<u32>,
    pub features: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub billing_cycle: String,
    pub max_products: Option<u32>,
    pub max_users: Option<u32>,
    pub features: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: u64,
    pub company_id: u64,
    pub plan_id: u64,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompanyWithSubscription {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub website: Option<String>,
    pub current_plan: Option<String>,
    pub plan_status: Option<String>,
    pub subscription_start: Option<DateTime<Utc>>,
    pub subscription_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubscriptionRequest {
    pub company_id: u64,
    pub plan_id: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminPaging {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Clone, Debug)]
struct User {
    id: Uuid,
    email: String,
    role: String,
    company_id: Option<u64>,
}

const ROLES: &[&str] = &["installer", "supplier"];
const LEAD_STATUSES: &[&str] = &["pending", "contacted", "quoted", "closed"];
const BILLING_CYCLES: &[&str] = &["monthly", "yearly"];

#[derive(Debug)]
pub struct Store {
    categories: Vec<(u64, String)>,
    companies: Vec<Company>,
    products: Vec<Product>,
    reviews: Vec<Review>,
    users: Vec<User>,
    tokens: HashMap<String, Uuid>,
    profile_views: Vec<(u64, DateTime<Utc>)>,
    leads: Vec<Lead>,
    plans: Vec<Plan>,
    subscriptions: Vec<Subscription>,
}

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

impl Store {
    /// Store with a small catalogue of companies, products and reviews.
    pub fn seeded() -> Self {
        let created = at(1_709_294_400); // 2024-03-01T12:00:00Z
        let company = |id, name: &str, city: &str, state: &str, years| Company {
            id,
            name: name.to_string(),
            description: Some(format!("{name}: solar equipment and installation")),
            website: None,
            city: Some(city.to_string()),
            state: Some(state.to_string()),
            years_in_business: Some(years),
            created_at: created,
            updated_at: created,
        };
        let product = |id, name: &str, brand: &str, category_id, supplier_id| Product {
            id,
            name: name.to_string(),
            description: None,
            brand: Some(brand.to_string()),
            category_id,
            supplier_id,
            specifications: Some(json!({ "warranty_years": 10 })),
            image_url: None,
            price_info: None,
            created_at: created.naive_utc(),
            updated_at: created.naive_utc(),
        };

        let supplier = User {
            id: Uuid::new_v4(),
            email: "vendas@solcampinas.com.br".to_string(),
            role: "supplier".to_string(),
            company_id: Some(1),
        };
        let admin = User {
            id: Uuid::new_v4(),
            email: "admin@solarsync.com.br".to_string(),
            role: "admin".to_string(),
            company_id: None,
        };
        let tokens = HashMap::from([
            (SUPPLIER_TOKEN.to_string(), supplier.id),
            (ADMIN_TOKEN.to_string(), admin.id),
        ]);
        let old_view = Utc::now() - TimeDelta::days(45);
        let plan = |id, name: &str, price, billing_cycle: &str, max_products| Plan {
            id,
            name: name.to_string(),
            description: None,
            price,
            billing_cycle: billing_cycle.to_string(),
            max_products,
            max_users: None,
            features: None,
            created_at: created,
        };
        let lead_at = created + TimeDelta::days(60);

        Self {
            categories: vec![
                (1, "Panels".to_string()),
                (2, "Inverters".to_string()),
                (3, "Batteries".to_string()),
            ],
            companies: vec![
                company(1, "Sol Campinas Energia", "Campinas", "SP", 8),
                company(2, "Brilho Solar", "Campinas", "SP", 3),
                company(3, "Paulista Fotovoltaica", "São Paulo", "SP", 12),
                company(4, "Minas Sol", "Belo Horizonte", "MG", 5),
            ],
            products: vec![
                product(1, "Painel Canadian 550W", "Canadian Solar", 1, 1),
                product(2, "Inversor WEG SIW500H", "WEG", 2, 1),
                product(3, "Inversor Growatt MIN 5000TL-X", "Growatt", 2, 2),
                product(4, "Bateria BYD HVS 5.1", "BYD", 3, 3),
            ],
            reviews: vec![Review {
                id: 1,
                product_id: 1,
                user_id: Uuid::new_v4(),
                rating: 4,
                comment: Some("Good output on cloudy days".to_string()),
                created_at: created,
            }],
            users: vec![supplier, admin],
            tokens,
            profile_views: vec![(1, old_view), (1, old_view)],
            leads: vec![Lead {
                id: 1,
                installer_id: Uuid::new_v4(),
                supplier_id: 1,
                project_description: "Telhado residencial, 6 kWp".to_string(),
                project_type: Some("residencial".to_string()),
                estimated_budget: Some(28_000.0),
                location: Some("Campinas/SP".to_string()),
                contact_email: "marcos@example.com".to_string(),
                contact_phone: None,
                preferred_contact_method: Some("email".to_string()),
                timeline: Some("2 meses".to_string()),
                status: "pending".to_string(),
                notes: None,
                created_at: lead_at,
                updated_at: lead_at,
            }],
            plans: vec![
                plan(1, "Básico", 99.0, "monthly", Some(10)),
                plan(2, "Profissional", 249.0, "monthly", Some(50)),
                plan(3, "Profissional Anual", 2490.0, "yearly", Some(50)),
            ],
            subscriptions: vec![Subscription {
                id: 1,
                company_id: 1,
                plan_id: 2,
                status: "active".to_string(),
                start_date: created,
                end_date: None,
                created_at: created,
                updated_at: created,
            }],
        }
    }

    /// Exact match on category name, case-insensitive substring on brand.
    pub fn products(&self, filters: &ProductFilters) -> Vec<Product> {
        let category_id = match non_empty(&filters.category) {
            Some(name) => match self.categories.iter().find(|(_, n)| n == name) {
                Some((id, _)) => Some(*id),
                None => return Vec::new(),
            },
            None => None,
        };
        let brand = non_empty(&filters.brand).map(str::to_lowercase);

        self.products
            .iter()
            .filter(|p| category_id.is_none_or(|id| p.category_id == id))
            .filter(|p| match &brand {
                Some(needle) => p
                    .brand
                    .as_deref()
                    .is_some_and(|b| b.to_lowercase().contains(needle)),
                None => true,
            })
            .cloned()
            .collect()
    }

    /// `state` is upper-cased and matched exactly, `city` case-insensitively.
    /// Results are ordered by name.
    pub fn companies(&self, filters: &CompanyFilters) -> Vec<Company> {
        let state = non_empty(&filters.state).map(str::to_uppercase);
        let city = non_empty(&filters.city).map(str::to_lowercase);

        let mut found: Vec<Company> = self
            .companies
            .iter()
            .filter(|c| state.is_none() || c.state == state)
            .filter(|c| match &city {
                Some(city) => c.city.as_deref().is_some_and(|v| v.to_lowercase() == *city),
                None => true,
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    /// Newest first.
    pub fn reviews_for(&self, product_id: u64) -> Vec<Review> {
        let mut found: Vec<Review> = self
            .reviews
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        found
    }

    pub fn analytics(&self, company_id: u64, now: DateTime<Utc>) -> AnalyticsData {
        let since = now - TimeDelta::days(30);
        let views: Vec<DateTime<Utc>> = self
            .profile_views
            .iter()
            .filter(|(id, _)| *id == company_id)
            .map(|(_, ts)| *ts)
            .collect();

        let mut daily: Vec<DailyViews> = Vec::new();
        let mut recent: Vec<NaiveDate> = views
            .iter()
            .filter(|ts| **ts >= since)
            .map(|ts| ts.date_naive())
            .collect();
        recent.sort();
        for date in &recent {
            match daily.last_mut() {
                Some(day) if day.date == *date => day.views += 1,
                _ => daily.push(DailyViews {
                    date: *date,
                    views: 1,
                }),
            }
        }

        AnalyticsData {
            total_views: views.len() as u64,
            views_past_30_days: recent.len() as u64,
            daily_views: daily,
        }
    }

    /// Leads received by `company_id`, newest first.
    pub fn leads_received(&self, company_id: u64) -> Vec<Lead> {
        let mut found: Vec<Lead> = self
            .leads
            .iter()
            .filter(|l| l.supplier_id == company_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        found
    }

    /// Leads sent by `installer`, newest first, with the supplier's name.
    pub fn leads_sent(&self, installer: Uuid) -> Vec<SentLead> {
        let mut found: Vec<SentLead> = self
            .leads
            .iter()
            .filter(|l| l.installer_id == installer)
            .filter_map(|l| {
                let company = self.companies.iter().find(|c| c.id == l.supplier_id)?;
                Some(SentLead {
                    lead: l.clone(),
                    supplier_name: company.name.clone(),
                })
            })
            .collect();
        found.sort_by(|a, b| (b.lead.created_at, b.lead.id).cmp(&(a.lead.created_at, a.lead.id)));
        found
    }

    /// Plans ordered by price.
    pub fn plans(&self) -> Vec<Plan> {
        let mut plans = self.plans.clone();
        plans.sort_by(|a, b| a.price.total_cmp(&b.price));
        plans
    }

    /// One page of companies by name, each with its active plan.
    pub fn admin_companies(&self, page: u64, limit: u64) -> Vec<CompanyWithSubscription> {
        let mut companies: Vec<&Company> = self.companies.iter().collect();
        companies.sort_by(|a, b| a.name.cmp(&b.name));
        let offset = usize::try_from(page.saturating_sub(1).saturating_mul(limit)).unwrap_or(usize::MAX);

        companies
            .into_iter()
            .skip(offset)
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|c| {
                let active = self
                    .subscriptions
                    .iter()
                    .find(|s| s.company_id == c.id && s.status == "active");
                let plan = active.and_then(|s| self.plans.iter().find(|p| p.id == s.plan_id));
                CompanyWithSubscription {
                    id: c.id,
                    name: c.name.clone(),
                    description: c.description.clone(),
                    city: c.city.clone(),
                    state: c.state.clone(),
                    website: c.website.clone(),
                    current_plan: plan.map(|p| p.name.clone()),
                    plan_status: active.map(|s| s.status.clone()),
                    subscription_start: active.map(|s| s.start_date),
                    subscription_end: active.and_then(|s| s.end_date),
                }
            })
            .collect()
    }

    /// Subscription history of `company_id`, newest first.
    pub fn subscriptions_for(&self, company_id: u64) -> Vec<Subscription> {
        let mut found: Vec<Subscription> = self
            .subscriptions
            .iter()
            .filter(|s| s.company_id == company_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        found
    }

    fn user_for_token(&mut self, token: &str) -> User {
        if let Some(user) = self
            .tokens
            .get(token)
            .and_then(|id| self.users.iter().find(|u| u.id == *id))
        {
            return user.clone();
        }
        let id = Uuid::new_v4();
        let user = User {
            id,
            email: format!("{}@installers.local", id.simple()),
            role: "installer".to_string(),
            company_id: None,
        };
        self.tokens.insert(token.to_string(), user.id);
        self.users.push(user.clone());
        user
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::seeded()));
    Router::new()
        .route("/_healthz", get(health))
        .route("/routes/register", post(register_user))
        .route("/routes/products/", get(list_products))
        .route("/routes/products/{product_id}", get(get_product))
        .route("/routes/reviews/", post(submit_review))
        .route("/routes/reviews/{product_id}", get(list_reviews))
        .route("/routes/companies/", get(search_companies))
        .route("/routes/companies/{company_id}", get(get_company_profile))
        .route("/routes/dashboard/analytics", get(get_analytics))
        .route("/routes/leads/", post(create_lead))
        .route("/routes/leads/my-leads", get(list_my_leads))
        .route("/routes/leads/received", get(list_received_leads))
        .route("/routes/leads/status", put(update_lead_status))
        .route("/routes/leads/{lead_id}", get(get_lead))
        .route("/routes/admin/companies", get(list_admin_companies))
        .route("/routes/admin/plans", get(list_plans).post(create_plan))
        .route("/routes/admin/subscriptions", put(update_subscription))
        .route(
            "/routes/admin/subscriptions/{company_id}",
            get(list_subscriptions).delete(cancel_subscription),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock backend listening");
    }
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// One entry of a 422 `detail` list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub loc: Vec<Value>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ValidationIssue {
    fn new(loc: &[&str], msg: impl Into<String>, kind: &str) -> Self {
        Self {
            loc: loc.iter().map(|s| Value::from(*s)).collect(),
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum Failure {
    BadRequest(&'static str),
    Unauthorized,
    Forbidden(&'static str),
    NotFound(&'static str),
    Unprocessable(Vec<ValidationIssue>),
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Failure::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!(msg)),
            Failure::Unauthorized => (StatusCode::UNAUTHORIZED, json!("Not authenticated")),
            Failure::Forbidden(msg) => (StatusCode::FORBIDDEN, json!(msg)),
            Failure::NotFound(msg) => (StatusCode::NOT_FOUND, json!(msg)),
            Failure::Unprocessable(issues) => (StatusCode::UNPROCESSABLE_ENTITY, json!(issues)),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

fn parse_id(raw: &str, name: &str) -> Result<u64, Failure> {
    raw.parse().map_err(|_| {
        Failure::Unprocessable(vec![ValidationIssue::new(
            &["path", name],
            "Input should be a valid integer, unable to parse string as an integer",
            "int_parsing",
        )])
    })
}

fn check_email(value: &str, field: &str) -> Result<(), Failure> {
    if value.contains('@') {
        return Ok(());
    }
    Err(Failure::Unprocessable(vec![ValidationIssue::new(
        &["body", field],
        "value is not a valid email address: An email address must have an @-sign.",
        "value_error",
    )]))
}

fn check_range(value: i64, name: &str, min: i64, max: i64) -> Result<u64, Failure> {
    if value < min {
        return Err(Failure::Unprocessable(vec![ValidationIssue::new(
            &["query", name],
            format!("Input should be greater than or equal to {min}"),
            "greater_than_equal",
        )]));
    }
    if value > max {
        return Err(Failure::Unprocessable(vec![ValidationIssue::new(
            &["query", name],
            format!("Input should be less than or equal to {max}"),
            "less_than_equal",
        )]));
    }
    Ok(value as u64)
}

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// A request body type and the fields it cannot do without.
pub trait Schema: DeserializeOwned {
    const REQUIRED: &'static [&'static str];
}

impl Schema for ReviewRequest {
    const REQUIRED: &'static [&'static str] = &["product_id", "rating", "comment"];
}

impl Schema for RegistrationRequest {
    const REQUIRED: &'static [&'static str] = &["email", "password", "role", "full_name"];
}

impl Schema for CreateLeadRequest {
    const REQUIRED: &'static [&'static str] = &["supplier_id", "project_description", "contact_email"];
}

impl Schema for UpdateLeadStatusRequest {
    const REQUIRED: &'static [&'static str] = &["lead_id", "status"];
}

impl Schema for CreatePlanRequest {
    const REQUIRED: &'static [&'static str] = &["name", "price", "billing_cycle"];
}

impl Schema for UpdateSubscriptionRequest {
    const REQUIRED: &'static [&'static str] = &["company_id", "plan_id"];
}

/// JSON body whose failures are reported as a 422 `detail` list.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: Schema,
{
    type Rejection = Failure;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state).await.map_err(|e| {
            Failure::Unprocessable(vec![ValidationIssue::new(&["body"], e.body_text(), "json_invalid")])
        })?;

        let missing: Vec<ValidationIssue> = T::REQUIRED
            .iter()
            .filter(|field| value.get(**field).is_none_or(Value::is_null))
            .map(|field| ValidationIssue::new(&["body", *field], "Field required", "missing"))
            .collect();
        if !missing.is_empty() {
            return Err(Failure::Unprocessable(missing));
        }

        serde_json::from_value(value).map(ValidatedJson).map_err(|e| {
            Failure::Unprocessable(vec![ValidationIssue::new(&["body"], e.to_string(), "value_error")])
        })
    }
}

/// The caller identified by the request's bearer token.
#[derive(Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: String,
    pub company_id: Option<u64>,
}

impl AuthUser {
    fn require_admin(&self) -> Result<(), Failure> {
        if self.role == "admin" {
            Ok(())
        } else {
            Err(Failure::Forbidden("Admin access required"))
        }
    }
}

impl FromRequestParts<Db> for AuthUser {
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, db: &Db) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(Failure::Unauthorized)?;
        let user = db.write().await.user_for_token(token);
        Ok(AuthUser {
            id: user.id,
            role: user.role,
            company_id: user.company_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn register_user(
    State(db): State<Db>,
    ValidatedJson(input): ValidatedJson<RegistrationRequest>,
) -> Result<Json<UserResponse>, Failure> {
    check_email(&input.email, "email")?;

    let mut store = db.write().await;
    if store.users.iter().any(|u| u.email.eq_ignore_ascii_case(&input.email)) {
        return Err(Failure::BadRequest("User with this email already exists"));
    }
    if !ROLES.contains(&input.role.as_str()) {
        return Err(Failure::BadRequest("Invalid role specified"));
    }

    let mut company_id = None;
    if input.role == "supplier" {
        let name = non_empty(&input.company_name)
            .ok_or(Failure::BadRequest("Company name is required for suppliers"))?;
        let id = store.companies.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        let now = Utc::now();
        store.companies.push(Company {
            id,
            name: name.to_string(),
            description: None,
            website: None,
            city: None,
            state: None,
            years_in_business: None,
            created_at: now,
            updated_at: now,
        });
        company_id = Some(id);
    }

    let user = User {
        id: Uuid::new_v4(),
        email: input.email.clone(),
        role: input.role.clone(),
        company_id,
    };
    debug!(user_id = %user.id, role = %user.role, "registered user");
    store.users.push(user.clone());

    Ok(Json(UserResponse {
        id: user.id.to_string(),
        email: input.email,
        role: input.role,
        full_name: input.full_name,
        company_name: input.company_name,
    }))
}

async fn list_products(State(db): State<Db>, Query(filters): Query<ProductFilters>) -> Json<Vec<Product>> {
    Json(db.read().await.products(&filters))
}

async fn get_product(State(db): State<Db>, Path(raw): Path<String>) -> Result<Json<Product>, Failure> {
    let id = parse_id(&raw, "product_id")?;
    let store = db.read().await;
    store
        .products
        .iter()
        .find(|p| p.id == id)
        .cloned()
        .map(Json)
        .ok_or(Failure::NotFound("Product not found"))
}

async fn list_reviews(State(db): State<Db>, Path(raw): Path<String>) -> Result<Json<Vec<Review>>, Failure> {
    let id = parse_id(&raw, "product_id")?;
    Ok(Json(db.read().await.reviews_for(id)))
}

async fn submit_review(
    State(db): State<Db>,
    user: AuthUser,
    ValidatedJson(input): ValidatedJson<ReviewRequest>,
) -> Result<Json<Review>, Failure> {
    let mut store = db.write().await;
    if !store.products.iter().any(|p| p.id == input.product_id) {
        return Err(Failure::NotFound("Product not found"));
    }
    if store
        .reviews
        .iter()
        .any(|r| r.product_id == input.product_id && r.user_id == user.id)
    {
        return Err(Failure::BadRequest("You have already reviewed this product"));
    }

    let review = Review {
        id: store.reviews.iter().map(|r| r.id).max().unwrap_or(0) + 1,
        product_id: input.product_id,
        user_id: user.id,
        rating: input.rating,
        comment: Some(input.comment),
        created_at: Utc::now(),
    };
    debug!(review_id = review.id, product_id = review.product_id, "review submitted");
    store.reviews.push(review.clone());
    Ok(Json(review))
}

async fn search_companies(State(db): State<Db>, Query(filters): Query<CompanyFilters>) -> Json<Vec<Company>> {
    Json(db.read().await.companies(&filters))
}

async fn get_company_profile(
    State(db): State<Db>,
    Path(raw): Path<String>,
) -> Result<Json<CompanyProfile>, Failure> {
    let id = parse_id(&raw, "company_id")?;
    let mut store = db.write().await;
    let company = store
        .companies
        .iter()
        .find(|c| c.id == id)
        .cloned()
        .ok_or(Failure::NotFound("Company not found"))?;
    store.profile_views.push((id, Utc::now()));

    let mut products: Vec<Product> = store
        .products
        .iter()
        .filter(|p| p.supplier_id == id)
        .cloned()
        .collect();
    products.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(CompanyProfile { company, products }))
}

async fn get_analytics(State(db): State<Db>, user: AuthUser) -> Result<Json<AnalyticsData>, Failure> {
    let company_id = user
        .company_id
        .ok_or(Failure::Forbidden("User is not associated with a company."))?;
    Ok(Json(db.read().await.analytics(company_id, Utc::now())))
}

async fn create_lead(
    State(db): State<Db>,
    user: AuthUser,
    ValidatedJson(input): ValidatedJson<CreateLeadRequest>,
) -> Result<Json<Lead>, Failure> {
    check_email(&input.contact_email, "contact_email")?;
    if user.role != "installer" {
        return Err(Failure::Forbidden("Only installers can create leads"));
    }

    let mut store = db.write().await;
    if !store.companies.iter().any(|c| c.id == input.supplier_id) {
        return Err(Failure::NotFound("Supplier not found"));
    }
    let now = Utc::now();
    let lead = Lead {
        id: store.leads.iter().map(|l| l.id).max().unwrap_or(0) + 1,
        installer_id: user.id,
        supplier_id: input.supplier_id,
        project_description: input.project_description,
        project_type: input.project_type,
        estimated_budget: input.estimated_budget,
        location: input.location,
        contact_email: input.contact_email,
        contact_phone: input.contact_phone,
        preferred_contact_method: input.preferred_contact_method,
        timeline: input.timeline,
        status: "pending".to_string(),
        notes: None,
        created_at: now,
        updated_at: now,
    };
    debug!(lead_id = lead.id, supplier_id = lead.supplier_id, "lead created");
    store.leads.push(lead.clone());
    Ok(Json(lead))
}

async fn list_my_leads(State(db): State<Db>, user: AuthUser) -> Json<Vec<SentLead>> {
    Json(db.read().await.leads_sent(user.id))
}

async fn list_received_leads(State(db): State<Db>, user: AuthUser) -> Result<Json<Vec<Lead>>, Failure> {
    let company_id = user
        .company_id
        .ok_or(Failure::Forbidden("User is not associated with a company"))?;
    Ok(Json(db.read().await.leads_received(company_id)))
}

async fn update_lead_status(
    State(db): State<Db>,
    user: AuthUser,
    ValidatedJson(input): ValidatedJson<UpdateLeadStatusRequest>,
) -> Result<Json<Value>, Failure> {
    let company_id = user
        .company_id
        .ok_or(Failure::Forbidden("User is not associated with a company"))?;

    let mut store = db.write().await;
    let lead = store
        .leads
        .iter_mut()
        .find(|l| l.id == input.lead_id && l.supplier_id == company_id)
        .ok_or(Failure::NotFound("Lead not found or not authorized"))?;
    if !LEAD_STATUSES.contains(&input.status.as_str()) {
        return Err(Failure::BadRequest(
            "Invalid status. Must be one of: ['pending', 'contacted', 'quoted', 'closed']",
        ));
    }

    lead.status = input.status;
    lead.notes = input.notes;
    lead.updated_at = Utc::now();
    debug!(lead_id = lead.id, status = %lead.status, "lead status updated");
    Ok(Json(json!({ "message": "Lead status updated successfully" })))
}

/// Visible to the installer who sent the lead and the supplier who got it.
async fn get_lead(State(db): State<Db>, Path(raw): Path<String>, user: AuthUser) -> Result<Json<Lead>, Failure> {
    let id = parse_id(&raw, "lead_id")?;
    let store = db.read().await;
    store
        .leads
        .iter()
        .find(|l| l.id == id && (l.installer_id == user.id || Some(l.supplier_id) == user.company_id))
        .cloned()
        .map(Json)
        .ok_or(Failure::NotFound("Lead not found or not authorized"))
}

async fn list_admin_companies(
    State(db): State<Db>,
    user: AuthUser,
    Query(paging): Query<AdminPaging>,
) -> Result<Json<Vec<CompanyWithSubscription>>, Failure> {
    let page = check_range(paging.page.unwrap_or(1), "page", 1, i64::MAX)?;
    let limit = check_range(paging.limit.unwrap_or(50), "limit", 1, 100)?;
    user.require_admin()?;
    Ok(Json(db.read().await.admin_companies(page, limit)))
}

async fn list_plans(State(db): State<Db>, user: AuthUser) -> Result<Json<Vec<Plan>>, Failure> {
    user.require_admin()?;
    Ok(Json(db.read().await.plans()))
}

async fn create_plan(
    State(db): State<Db>,
    user: AuthUser,
    ValidatedJson(input): ValidatedJson<CreatePlanRequest>,
) -> Result<Json<Plan>, Failure> {
    user.require_admin()?;
    if !BILLING_CYCLES.contains(&input.billing_cycle.as_str()) {
        return Err(Failure::BadRequest("Billing cycle must be 'monthly' or 'yearly'"));
    }

    let mut store = db.write().await;
    if store.plans.iter().any(|p| p.name == input.name) {
        return Err(Failure::BadRequest("Plan with this name already exists"));
    }
    let plan = Plan {
        id: store.plans.iter().map(|p| p.id).max().unwrap_or(0) + 1,
        name: input.name,
        description: input.description,
        price: input.price,
        billing_cycle: input.billing_cycle,
        max_products: input.max_products,
        max_users: input.max_users,
        features: input.features,
        created_at: Utc::now(),
    };
    debug!(plan_id = plan.id, "plan created");
    store.plans.push(plan.clone());
    Ok(Json(plan))
}

/// Deactivates the company's active subscription and starts a new one.
async fn update_subscription(
    State(db): State<Db>,
    user: AuthUser,
    ValidatedJson(input): ValidatedJson<UpdateSubscriptionRequest>,
) -> Result<Json<Value>, Failure> {
    user.require_admin()?;
    let mut store = db.write().await;
    if !store.companies.iter().any(|c| c.id == input.company_id) {
        return Err(Failure::NotFound("Company not found"));
    }
    if !store.plans.iter().any(|p| p.id == input.plan_id) {
        return Err(Failure::NotFound("Plan not found"));
    }

    let now = Utc::now();
    for sub in store
        .subscriptions
        .iter_mut()
        .filter(|s| s.company_id == input.company_id && s.status == "active")
    {
        sub.status = "inactive".to_string();
        sub.updated_at = now;
    }
    let id = store.subscriptions.iter().map(|s| s.id).max().unwrap_or(0) + 1;
    store.subscriptions.push(Subscription {
        id,
        company_id: input.company_id,
        plan_id: input.plan_id,
        status: "active".to_string(),
        start_date: now,
        end_date: None,
        created_at: now,
        updated_at: now,
    });
    debug!(company_id = input.company_id, plan_id = input.plan_id, "subscription updated");
    Ok(Json(json!({ "message": "Subscription updated successfully" })))
}

async fn list_subscriptions(
    State(db): State<Db>,
    Path(raw): Path<String>,
    user: AuthUser,
) -> Result<Json<Vec<Subscription>>, Failure> {
    let company_id = parse_id(&raw, "company_id")?;
    user.require_admin()?;
    Ok(Json(db.read().await.subscriptions_for(company_id)))
}

async fn cancel_subscription(
    State(db): State<Db>,
    Path(raw): Path<String>,
    user: AuthUser,
) -> Result<Json<Value>, Failure> {
    let company_id = parse_id(&raw, "company_id")?;
    user.require_admin()?;

    let mut store = db.write().await;
    let now = Utc::now();
    let mut cancelled = 0;
    for sub in store
        .subscriptions
        .iter_mut()
        .filter(|s| s.company_id == company_id && s.status == "active")
    {
        sub.status = "cancelled".to_string();
        sub.updated_at = now;
        cancelled += 1;
    }
    if cancelled == 0 {
        return Err(Failure::NotFound("No active subscription found for this company"));
    }
    Ok(Json(json!({ "message": "Subscription cancelled successfully" })))
}
