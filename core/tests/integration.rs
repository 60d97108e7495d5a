//! End-to-end runs of the typed facade against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port, then drives
//! `SolarSyncApi` over real HTTP through the reqwest transport. This checks
//! that request building, auth, and response decoding agree with an actual
//! server, and catches schema drift between the two crates.

use solarsync_core::{
    AdminCompaniesParams, ApiError, BearerAuth, BillingCycle, CancellationToken, ClientConfig, CreateLeadRequest,
    CreatePlanRequest, FetchFailure, FetchState, HttpClient, HttpMethod, HttpValidationError, LeadStatus,
    ListProductsParams, Page, RequestParams, RequestSpec, ReviewRequest, SearchCompaniesParams, SolarSyncApi,
    SubscriptionStatus, UpdateLeadStatus, UpdateSubscriptionRequest,
};

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { mock_server::run(listener).await });
    format!("http://{addr}")
}

fn api(base_url: &str, token: Option<&'static str>) -> SolarSyncApi {
    let client: HttpClient = HttpClient::new(ClientConfig::new(base_url)).unwrap();
    let client = match token {
        Some(token) => client.with_security_worker(BearerAuth::fixed(token)),
        None => client,
    };
    SolarSyncApi::new(client)
}

#[tokio::test]
async fn browsing_flow() {
    let base_url = start_server().await;
    let api = api(&base_url, None);

    // Health.
    let health = api.check_health(RequestParams::new()).await.unwrap();
    assert!(health.ok());
    assert_eq!(health.data().unwrap().status, "ok");

    // Companies in Campinas, in server order.
    let filters = SearchCompaniesParams {
        state: Some("SP".to_string()),
        city: Some("Campinas".to_string()),
    };
    let companies = api
        .search_companies(&filters, RequestParams::new())
        .await
        .unwrap()
        .data()
        .unwrap();
    let names: Vec<&str> = companies.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Brilho Solar", "Sol Campinas Energia"]);

    // Listing products twice yields the same result.
    let filters = ListProductsParams::default();
    let first = api.list_products(&filters, RequestParams::new()).await.unwrap().data().unwrap();
    let second = api.list_products(&filters, RequestParams::new()).await.unwrap().data().unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, second);

    // A product and its profile page.
    let product = api.get_product(2, RequestParams::new()).await.unwrap().data().unwrap();
    assert_eq!(product.brand.as_deref(), Some("WEG"));
    let profile = api
        .get_company_profile(product.supplier_id, RequestParams::new())
        .await
        .unwrap()
        .data()
        .unwrap();
    assert!(profile.products.iter().any(|p| p.id == product.id));

    // Missing product: a value, not an error.
    let missing = api.get_product(404, RequestParams::new()).await.unwrap();
    assert_eq!(missing.status(), 404);
    assert!(matches!(missing.data(), Err(ApiError::Http { status: 404, .. })));
}

#[tokio::test]
async fn review_round_trip() {
    let base_url = start_server().await;
    let api = api(&base_url, Some("installer-e2e"));

    let input = ReviewRequest {
        product_id: 3,
        rating: 4,
        comment: "Instalação tranquila".to_string(),
    };
    let created = api.submit_review(&input, RequestParams::new()).await.unwrap().data().unwrap();
    assert_eq!(created.product_id, input.product_id);
    assert_eq!(created.rating, input.rating);
    assert_eq!(created.comment.as_deref(), Some(input.comment.as_str()));

    let reviews = api
        .list_reviews_for_product(3, RequestParams::new())
        .await
        .unwrap()
        .data()
        .unwrap();
    assert_eq!(reviews[0].id, created.id);

    // A second review of the same product is refused with a plain detail.
    let again = api.submit_review(&input, RequestParams::new()).await;
    let failure = FetchFailure::settle(again).unwrap_err();
    assert_eq!(failure.message(), "You have already reviewed this product");

    // An insecure call skips the bearer token entirely.
    let anonymous = api
        .submit_review(&input, RequestParams::new().with_secure(false))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), 401);
}

#[tokio::test]
async fn validation_errors_are_typed() {
    let base_url = start_server().await;
    let client: HttpClient = HttpClient::new(ClientConfig::new(&base_url)).unwrap();

    let spec = RequestSpec::new(HttpMethod::Get, "/routes/products/not-a-number");
    let response = client
        .request::<(), HttpValidationError>(spec, RequestParams::new())
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
    let envelope = response.error().unwrap().unwrap();
    assert_eq!(envelope.errors()[0].location(), "path.product_id");
}

#[tokio::test]
async fn supplier_analytics_count_profile_views() {
    let base_url = start_server().await;
    let anonymous = api(&base_url, None);
    let supplier = api(&base_url, Some(mock_server::SUPPLIER_TOKEN));

    anonymous.get_company_profile(1, RequestParams::new()).await.unwrap();
    let analytics = supplier.get_analytics(RequestParams::new()).await.unwrap().data().unwrap();
    assert!(analytics.views_past_30_days >= 1);
    assert!(analytics.total_views > analytics.views_past_30_days);

    let installer = api(&base_url, Some("installer-e2e"));
    let forbidden = installer.get_analytics(RequestParams::new()).await.unwrap();
    assert_eq!(forbidden.status(), 403);
}

#[tokio::test]
async fn page_loads_settle_state() {
    let base_url = start_server().await;
    let api = api(&base_url, None);
    let page = Page::new();

    let filters = SearchCompaniesParams {
        state: Some("mg".to_string()),
        city: None,
    };
    let (api, filters) = (&api, &filters);
    let outcome = page
        .load(|params| async move { FetchFailure::settle(api.search_companies(filters, params).await) })
        .await;
    let companies = outcome.data().unwrap();
    assert_eq!(companies.len(), 1);
    assert_eq!(companies[0].name, "Minas Sol");
    assert!(matches!(page.state(), FetchState::Ready(_)));
}

#[tokio::test]
async fn cancelled_token_prevents_the_call() {
    let base_url = start_server().await;
    let api = api(&base_url, None);

    let token = CancellationToken::new();
    token.cancel();
    let err = api
        .check_health(RequestParams::new().with_cancellation(token))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Cancelled));
}

#[tokio::test]
async fn lead_flow_between_installer_and_supplier() {
    let base_url = start_server().await;
    let installer = api(&base_url, Some("installer-e2e"));
    let supplier = api(&base_url, Some(mock_server::SUPPLIER_TOKEN));

    let mut input = CreateLeadRequest::new(1, "Telhado comercial, 20 kWp", "compras@example.com");
    input.location = Some("Campinas/SP".to_string());
    let lead = installer.create_lead(&input, RequestParams::new()).await.unwrap().data().unwrap();
    assert_eq!(lead.status, LeadStatus::Pending);
    assert_eq!(lead.supplier_id, 1);
    assert_eq!(lead.preferred_contact_method.as_deref(), Some("email"));

    let received = supplier
        .list_received_leads(RequestParams::new())
        .await
        .unwrap()
        .data()
        .unwrap();
    assert_eq!(received[0].id, lead.id);

    let update = UpdateLeadStatus {
        lead_id: lead.id,
        status: LeadStatus::Contacted,
        notes: Some("Visita agendada".to_string()),
    };
    let ack = supplier
        .update_lead_status(&update, RequestParams::new())
        .await
        .unwrap()
        .data()
        .unwrap();
    assert_eq!(ack.message, "Lead status updated successfully");

    // The installer cannot move their own lead along.
    let refused = installer.update_lead_status(&update, RequestParams::new()).await;
    let failure = FetchFailure::settle(refused).unwrap_err();
    assert_eq!(failure.message(), "User is not associated with a company");

    let sent = installer
        .list_my_leads(RequestParams::new())
        .await
        .unwrap()
        .data()
        .unwrap();
    assert_eq!(sent[0].lead.status, LeadStatus::Contacted);
    assert_eq!(sent[0].supplier_name, "Sol Campinas Energia");

    let detail = supplier.get_lead(lead.id, RequestParams::new()).await.unwrap();
    assert_eq!(detail.data().unwrap().notes.as_deref(), Some("Visita agendada"));
    let hidden = api(&base_url, Some("stranger")).get_lead(lead.id, RequestParams::new()).await.unwrap();
    assert_eq!(hidden.status(), 404);
}

#[tokio::test]
async fn admin_manages_plans_and_subscriptions() {
    let base_url = start_server().await;
    let admin = api(&base_url, Some(mock_server::ADMIN_TOKEN));

    let plan = CreatePlanRequest {
        name: "Inicial".to_string(),
        description: Some("Para quem está começando".to_string()),
        price: 49.0,
        billing_cycle: BillingCycle::Monthly,
        max_products: Some(3),
        max_users: None,
        features: None,
    };
    let created = admin.create_plan(&plan, RequestParams::new()).await.unwrap().data().unwrap();
    let plans = admin.list_plans(RequestParams::new()).await.unwrap().data().unwrap();
    assert_eq!(plans[0].id, created.id);

    let change = UpdateSubscriptionRequest {
        company_id: 2,
        plan_id: created.id,
    };
    admin
        .update_subscription(&change, RequestParams::new())
        .await
        .unwrap()
        .data()
        .unwrap();

    let companies = admin
        .list_admin_companies(&AdminCompaniesParams::default(), RequestParams::new())
        .await
        .unwrap()
        .data()
        .unwrap();
    let brilho = companies.iter().find(|c| c.id == 2).unwrap();
    assert_eq!(brilho.current_plan.as_deref(), Some("Inicial"));
    assert_eq!(brilho.plan_status, Some(SubscriptionStatus::Active));

    admin.cancel_subscription(2, RequestParams::new()).await.unwrap().data().unwrap();
    let history = admin.list_subscriptions(2, RequestParams::new()).await.unwrap().data().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, SubscriptionStatus::Cancelled);

    let again = admin.cancel_subscription(2, RequestParams::new()).await.unwrap();
    assert_eq!(again.status(), 404);

    let supplier = api(&base_url, Some(mock_server::SUPPLIER_TOKEN));
    let forbidden = supplier.list_plans(RequestParams::new()).await;
    assert_eq!(FetchFailure::settle(forbidden).unwrap_err().message(), "Admin access required");
}
