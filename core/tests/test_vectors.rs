//! Verify request building and response decoding against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Each vector file describes inputs, the expected wire request, a simulated
//! response, and what decoding it must yield. Request bodies are compared as
//! parsed JSON so field order does not matter.

use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use solarsync_core::{
    routes, AdminCompaniesParams, ApiError, ApiResponse, ClientConfig, Company, CompanyProfile,
    CompanySubscription, CompanyWithSubscription, CreateLeadRequest, CreatePlanRequest, HealthResponse,
    HttpClient, HttpMethod, HttpResponse, HttpValidationError, Lead, ListProductsParams, MessageResponse,
    Plan, Product, RequestParams, RequestSpec, ResponseFormat, Review, ReviewRequest,
    SearchCompaniesParams, SentLead, UpdateLeadStatus, UpdateSubscriptionRequest,
};

const BASE_URL: &str = "http://localhost:8000";

fn client() -> HttpClient {
    HttpClient::new(ClientConfig::new(BASE_URL)).unwrap()
}

fn load(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn str_opt(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn check_request(name: &str, spec: &RequestSpec, case: &Value) {
    let expected = &case["expected_request"];
    let req = client().build_request(spec, &RequestParams::new()).unwrap();

    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{BASE_URL}{}", expected["url"].as_str().unwrap()), "{name}: url");

    match &expected["body"] {
        Value::Null => assert!(req.body.is_none(), "{name}: body should be None"),
        body => {
            let sent: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(&sent, body, "{name}: body");
            assert_eq!(req.header("content-type"), Some("application/json"), "{name}: content-type");
        }
    }
}

fn simulate<T, E>(case: &Value) -> ApiResponse<T, E> {
    let sim = &case["simulated_response"];
    ApiResponse::new(
        HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Bytes::from(serde_json::to_vec(&sim["body"]).unwrap()),
        },
        ResponseFormat::Json,
    )
}

fn expected_ids(case: &Value) -> Vec<u64> {
    case["expected_ids"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_u64().unwrap())
        .collect()
}

/// Check the outcome of a simulated response. `ids` extracts the ids of the
/// decoded success payload in order.
fn check_outcome<T: DeserializeOwned + fmt::Debug>(
    name: &str,
    case: &Value,
    response: ApiResponse<T, HttpValidationError>,
    ids: impl Fn(&T) -> Vec<u64>,
) {
    if case.get("expected_schema_mismatch").is_some() {
        let err = response.data().unwrap_err();
        assert!(matches!(err, ApiError::SchemaMismatch { .. }), "{name}: got {err:?}");
        return;
    }

    if let Some(status) = case.get("expected_status") {
        assert!(!response.ok(), "{name}: should not be ok");
        assert_eq!(u64::from(response.status()), status.as_u64().unwrap(), "{name}: status");
        assert!(matches!(response.data(), Err(ApiError::Http { .. })), "{name}: data on failure");

        if let Some(locations) = case.get("expected_locations") {
            let envelope = response.error().unwrap().unwrap();
            let got: Vec<String> = envelope.errors().iter().map(|e| e.location()).collect();
            let want: Vec<String> = serde_json::from_value(locations.clone()).unwrap();
            assert_eq!(got, want, "{name}: validation locations");
        }
        return;
    }

    assert!(response.ok(), "{name}: should be ok");
    assert!(response.error().unwrap().is_none(), "{name}: no error on success");
    let data = response.data().unwrap();
    assert_eq!(ids(&data), expected_ids(case), "{name}: ids in server order");
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[test]
fn product_test_vectors() {
    for case in load(include_str!("../../test-vectors/products.json")) {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];

        match case["operation"].as_str().unwrap() {
            "list_products" => {
                let filters = ListProductsParams {
                    category: str_opt(&input["category"]),
                    brand: str_opt(&input["brand"]),
                };
                check_request(name, &routes::list_products(&filters), &case);
                let response = simulate::<Vec<Product>, _>(&case);
                check_outcome(name, &case, response, |products| products.iter().map(|p| p.id).collect());
            }
            "get_product" => {
                let id = input["product_id"].as_u64().unwrap();
                check_request(name, &routes::get_product(id), &case);
                let response = simulate::<Product, _>(&case);
                check_outcome(name, &case, response, |product| vec![product.id]);
            }
            other => panic!("{name}: unknown operation {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Companies
// ---------------------------------------------------------------------------

#[test]
fn company_test_vectors() {
    for case in load(include_str!("../../test-vectors/companies.json")) {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];

        match case["operation"].as_str().unwrap() {
            "search_companies" => {
                let filters = SearchCompaniesParams {
                    state: str_opt(&input["state"]),
                    city: str_opt(&input["city"]),
                };
                check_request(name, &routes::search_companies(&filters), &case);
                let response = simulate::<Vec<Company>, _>(&case);
                check_outcome(name, &case, response, |companies| companies.iter().map(|c| c.id).collect());
            }
            "get_company_profile" => {
                let id = input["company_id"].as_u64().unwrap();
                check_request(name, &routes::get_company_profile(id), &case);
                let response = simulate::<CompanyProfile, _>(&case);
                if let Some(product_ids) = case.get("expected_product_ids") {
                    let profile = response.data().unwrap();
                    let got: Vec<u64> = profile.products.iter().map(|p| p.id).collect();
                    let want: Vec<u64> = serde_json::from_value(product_ids.clone()).unwrap();
                    assert_eq!(got, want, "{name}: profile products");
                }
                check_outcome(name, &case, response, |profile| vec![profile.company.id]);
            }
            other => panic!("{name}: unknown operation {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

#[test]
fn review_test_vectors() {
    for case in load(include_str!("../../test-vectors/reviews.json")) {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];

        match case["operation"].as_str().unwrap() {
            "list_reviews_for_product" => {
                let id = input["product_id"].as_u64().unwrap();
                check_request(name, &routes::list_reviews_for_product(id), &case);
                let response = simulate::<Vec<Review>, _>(&case);
                check_outcome(name, &case, response, |reviews| reviews.iter().map(|r| r.id).collect());
            }
            "submit_review" => {
                let review: ReviewRequest = serde_json::from_value(input.clone()).unwrap();
                check_request(name, &routes::submit_review(&review).unwrap(), &case);
                let response = simulate::<Review, _>(&case);
                if response.ok() {
                    let created = response.data().unwrap();
                    assert_eq!(created.product_id, review.product_id, "{name}: product_id");
                    assert_eq!(created.rating, review.rating, "{name}: rating");
                    assert_eq!(created.comment.as_deref(), Some(review.comment.as_str()), "{name}: comment");
                }
                check_outcome(name, &case, response, |review| vec![review.id]);
            }
            other => panic!("{name}: unknown operation {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Leads
// ---------------------------------------------------------------------------

#[test]
fn lead_test_vectors() {
    for case in load(include_str!("../../test-vectors/leads.json")) {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];

        match case["operation"].as_str().unwrap() {
            "create_lead" => {
                let request: CreateLeadRequest = serde_json::from_value(input.clone()).unwrap();
                check_request(name, &routes::create_lead(&request).unwrap(), &case);
                let response = simulate::<Lead, _>(&case);
                check_outcome(name, &case, response, |lead| vec![lead.id]);
            }
            "list_received_leads" => {
                check_request(name, &routes::list_received_leads(), &case);
                let response = simulate::<Vec<Lead>, _>(&case);
                check_outcome(name, &case, response, |leads| leads.iter().map(|l| l.id).collect());
            }
            "list_my_leads" => {
                check_request(name, &routes::list_my_leads(), &case);
                let response = simulate::<Vec<SentLead>, _>(&case);
                check_outcome(name, &case, response, |leads| leads.iter().map(|l| l.lead.id).collect());
            }
            "update_lead_status" => {
                let update: UpdateLeadStatus = serde_json::from_value(input.clone()).unwrap();
                check_request(name, &routes::update_lead_status(&update).unwrap(), &case);
                let response = simulate::<MessageResponse, _>(&case);
                check_outcome(name, &case, response, |_| Vec::new());
            }
            "get_lead" => {
                let id = input["lead_id"].as_u64().unwrap();
                check_request(name, &routes::get_lead(id), &case);
                let response = simulate::<Lead, _>(&case);
                check_outcome(name, &case, response, |lead| vec![lead.id]);
            }
            other => panic!("{name}: unknown operation {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[test]
fn admin_test_vectors() {
    for case in load(include_str!("../../test-vectors/admin.json")) {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];
        let company_id = || input["company_id"].as_u64().unwrap();

        match case["operation"].as_str().unwrap() {
            "list_admin_companies" => {
                let paging = AdminCompaniesParams {
                    page: input["page"].as_u64().map(|p| p as u32),
                    limit: input["limit"].as_u64().map(|l| l as u32),
                };
                check_request(name, &routes::list_admin_companies(&paging), &case);
                let response = simulate::<Vec<CompanyWithSubscription>, _>(&case);
                check_outcome(name, &case, response, |companies| companies.iter().map(|c| c.id).collect());
            }
            "list_plans" => {
                check_request(name, &routes::list_plans(), &case);
                let response = simulate::<Vec<Plan>, _>(&case);
                check_outcome(name, &case, response, |plans| plans.iter().map(|p| p.id).collect());
            }
            "create_plan" => {
                let plan: CreatePlanRequest = serde_json::from_value(input.clone()).unwrap();
                check_request(name, &routes::create_plan(&plan).unwrap(), &case);
                let response = simulate::<Plan, _>(&case);
                check_outcome(name, &case, response, |plan| vec![plan.id]);
            }
            "update_subscription" => {
                let update: UpdateSubscriptionRequest = serde_json::from_value(input.clone()).unwrap();
                check_request(name, &routes::update_subscription(&update).unwrap(), &case);
                let response = simulate::<MessageResponse, _>(&case);
                check_outcome(name, &case, response, |_| Vec::new());
            }
            "list_subscriptions" => {
                check_request(name, &routes::list_subscriptions(company_id()), &case);
                let response = simulate::<Vec<CompanySubscription>, _>(&case);
                check_outcome(name, &case, response, |history| history.iter().map(|s| s.id).collect());
            }
            "cancel_subscription" => {
                check_request(name, &routes::cancel_subscription(company_id()), &case);
                let response = simulate::<MessageResponse, _>(&case);
                check_outcome(name, &case, response, |_| Vec::new());
            }
            other => panic!("{name}: unknown operation {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[test]
fn health_test_vectors() {
    for case in load(include_str!("../../test-vectors/health.json")) {
        let name = case["name"].as_str().unwrap();
        check_request(name, &routes::check_health(), &case);

        let response = simulate::<HealthResponse, Value>(&case);
        if let Some(text) = case.get("expected_status_text") {
            assert!(response.ok(), "{name}: should be ok");
            assert_eq!(response.data().unwrap().status, text.as_str().unwrap(), "{name}: status");
        } else {
            assert_eq!(u64::from(response.status()), case["expected_status"].as_u64().unwrap());
            let body = response.error().unwrap().unwrap();
            assert_eq!(body, case["simulated_response"]["body"], "{name}: error body");
        }
    }
}
