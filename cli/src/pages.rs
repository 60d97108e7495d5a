//! Terminal pages: each loads its data through a `Page` and renders it.

use std::fmt::Write;

use solarsync_core::{
    AdminCompaniesParams, AnalyticsData, Company, CompanyProfile, CompanySubscription, CompanyWithSubscription,
    CreateLeadRequest, CreatePlanRequest, FetchFailure, FetchState, HealthResponse, Lead, ListProductsParams,
    MessageResponse, Page, Plan, Product, RegistrationRequest, RequestParams, Review, ReviewRequest,
    SearchCompaniesParams, SentLead, SolarSyncApi, UpdateLeadStatus, UpdateSubscriptionRequest, UserResponse,
};

pub async fn health(api: &SolarSyncApi) -> FetchState<HealthResponse> {
    Page::new()
        .load(|params| async move { FetchFailure::settle(api.check_health(params).await) })
        .await
}

pub async fn products(api: &SolarSyncApi, filters: ListProductsParams) -> FetchState<Vec<Product>> {
    Page::new()
        .load(|params| async move { FetchFailure::settle(api.list_products(&filters, params).await) })
        .await
}

/// A product together with its reviews, loaded concurrently.
pub async fn product(api: &SolarSyncApi, product_id: u64) -> FetchState<(Product, Vec<Review>)> {
    Page::new()
        .load(|params: RequestParams| async move {
            let product = async { FetchFailure::settle(api.get_product(product_id, params.clone()).await) };
            let reviews = async { FetchFailure::settle(api.list_reviews_for_product(product_id, params.clone()).await) };
            tokio::try_join!(product, reviews)
        })
        .await
}

pub async fn companies(api: &SolarSyncApi, filters: SearchCompaniesParams) -> FetchState<Vec<Company>> {
    Page::new()
        .load(|params| async move { FetchFailure::settle(api.search_companies(&filters, params).await) })
        .await
}

pub async fn company(api: &SolarSyncApi, company_id: u64) -> FetchState<CompanyProfile> {
    Page::new()
        .load(|params| async move { FetchFailure::settle(api.get_company_profile(company_id, params).await) })
        .await
}

pub async fn review(api: &SolarSyncApi, input: ReviewRequest) -> FetchState<Review> {
    Page::new()
        .load(|params| async move { FetchFailure::settle(api.submit_review(&input, params).await) })
        .await
}

pub async fn register(api: &SolarSyncApi, input: RegistrationRequest) -> FetchState<UserResponse> {
    Page::new()
        .load(|params| async move { FetchFailure::settle(api.register_user(&input, params).await) })
        .await
}

pub async fn analytics(api: &SolarSyncApi) -> FetchState<AnalyticsData> {
    Page::new()
        .load(|params| async move { FetchFailure::settle(api.get_analytics(params).await) })
        .await
}

pub async fn create_lead(api: &SolarSyncApi, input: CreateLeadRequest) -> FetchState<Lead> {
    Page::new()
        .load(|params| async move { FetchFailure::settle(api.create_lead(&input, params).await) })
        .await
}

pub async fn received_leads(api: &SolarSyncApi) -> FetchState<Vec<Lead>> {
    Page::new()
        .load(|params| async move { FetchFailure::settle(api.list_received_leads(params).await) })
        .await
}

pub async fn sent_leads(api: &SolarSyncApi) -> FetchState<Vec<SentLead>> {
    Page::new()
        .load(|params| async move { FetchFailure::settle(api.list_my_leads(params).await) })
        .await
}

pub async fn update_lead_status(api: &SolarSyncApi, input: UpdateLeadStatus) -> FetchState<MessageResponse> {
    Page::new()
        .load(|params| async move { FetchFailure::settle(api.update_lead_status(&input, params).await) })
        .await
}

/// The admin panel: companies with their plans, next to the plan catalogue.
pub async fn admin_overview(
    api: &SolarSyncApi,
    paging: AdminCompaniesParams,
) -> FetchState<(Vec<CompanyWithSubscription>, Vec<Plan>)> {
    Page::new()
        .load(|params: RequestParams| async move {
            let companies = async { FetchFailure::settle(api.list_admin_companies(&paging, params.clone()).await) };
            let plans = async { FetchFailure::settle(api.list_plans(params.clone()).await) };
            tokio::try_join!(companies, plans)
        })
        .await
}

pub async fn create_plan(api: &SolarSyncApi, input: CreatePlanRequest) -> FetchState<Plan> {
    Page::new()
        .load(|params| async move { FetchFailure::settle(api.create_plan(&input, params).await) })
        .await
}

pub async fn subscribe(api: &SolarSyncApi, input: UpdateSubscriptionRequest) -> FetchState<MessageResponse> {
    Page::new()
        .load(|params| async move { FetchFailure::settle(api.update_subscription(&input, params).await) })
        .await
}

pub async fn cancel_subscription(api: &SolarSyncApi, company_id: u64) -> FetchState<MessageResponse> {
    Page::new()
        .load(|params| async move { FetchFailure::settle(api.cancel_subscription(company_id, params).await) })
        .await
}

pub async fn subscription_history(api: &SolarSyncApi, company_id: u64) -> FetchState<Vec<CompanySubscription>> {
    Page::new()
        .load(|params| async move { FetchFailure::settle(api.list_subscriptions(company_id, params).await) })
        .await
}

/// Render a settled page, or describe its failure.
pub fn render<T>(state: &FetchState<T>, view: impl Fn(&T) -> String) -> Result<String, String> {
    match state {
        FetchState::Ready(data) => Ok(view(data)),
        FetchState::Loading => Err("Still loading.".to_string()),
        FetchState::Failed(failure) => Err(describe_failure(failure)),
    }
}

pub fn describe_failure(failure: &FetchFailure) -> String {
    let mut out = failure.message();
    if let Some(detail) = failure.validation_detail() {
        for error in detail.errors() {
            let _ = write!(out, "\n  {}: {}", error.location(), error.msg);
        }
    }
    out
}

pub fn health_view(health: &HealthResponse) -> String {
    format!("backend status: {}", health.status)
}

pub fn products_view(products: &[Product]) -> String {
    if products.is_empty() {
        return "No products found.".to_string();
    }
    let mut out = String::new();
    for product in products {
        let _ = writeln!(
            out,
            "#{:<5} {}  [{}]",
            product.id,
            product.name,
            product.brand.as_deref().unwrap_or("-")
        );
    }
    out.trim_end().to_string()
}

pub fn product_view((product, reviews): &(Product, Vec<Review>)) -> String {
    let mut out = format!("{} (#{})", product.name, product.id);
    if let Some(brand) = &product.brand {
        let _ = write!(out, "\nbrand: {brand}");
    }
    if let Some(description) = &product.description {
        let _ = write!(out, "\n{description}");
    }
    if let Some(price) = &product.price_info {
        let _ = write!(out, "\nprice: {price}");
    }

    if reviews.is_empty() {
        out.push_str("\n\nNo reviews yet.");
        return out;
    }
    let average = reviews.iter().map(|r| f64::from(r.rating)).sum::<f64>() / reviews.len() as f64;
    let _ = write!(out, "\n\n{} review(s), average {average:.1}", reviews.len());
    for review in reviews {
        let _ = write!(
            out,
            "\n  {} {}/5 {}",
            review.created_at.as_datetime().format("%Y-%m-%d"),
            review.rating,
            review.comment.as_deref().unwrap_or("")
        );
    }
    out
}

fn location(company: &Company) -> String {
    match (&company.city, &company.state) {
        (Some(city), Some(state)) => format!("{city}/{state}"),
        (Some(city), None) => city.clone(),
        (None, Some(state)) => state.clone(),
        (None, None) => "-".to_string(),
    }
}

pub fn companies_view(companies: &[Company]) -> String {
    if companies.is_empty() {
        return "No companies found.".to_string();
    }
    companies
        .iter()
        .map(|c| format!("#{:<5} {}  ({})", c.id, c.name, location(c)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn company_view(profile: &CompanyProfile) -> String {
    let company = &profile.company;
    let mut out = format!("{} (#{})\n{}", company.name, company.id, location(company));
    if let Some(years) = company.years_in_business {
        let _ = write!(out, "\n{years} year(s) in business");
    }
    if let Some(website) = &company.website {
        let _ = write!(out, "\n{website}");
    }
    if let Some(description) = &company.description {
        let _ = write!(out, "\n{description}");
    }
    if !profile.products.is_empty() {
        let _ = write!(out, "\n\nProducts:\n{}", products_view(&profile.products));
    }
    out
}

pub fn review_view(review: &Review) -> String {
    format!("Review #{} saved for product #{} ({}/5).", review.id, review.product_id, review.rating)
}

pub fn user_view(user: &UserResponse) -> String {
    let mut out = format!("Registered {} <{}> as {} (id {})", user.full_name, user.email, user.role, user.id);
    if let Some(company) = &user.company_name {
        let _ = write!(out, "\ncompany: {company}");
    }
    out
}

pub fn analytics_view(data: &AnalyticsData) -> String {
    let mut out = format!(
        "profile views: {} total, {} in the past 30 days",
        data.total_views, data.views_past_30_days
    );
    for day in &data.daily_views {
        let _ = write!(out, "\n  {} {:>4} {}", day.date, day.views, "#".repeat(day.views.min(40) as usize));
    }
    out
}

pub fn message_view(ack: &MessageResponse) -> String {
    ack.message.clone()
}

pub fn lead_view(lead: &Lead) -> String {
    let mut out = format!("Lead #{} to company #{} is {}.", lead.id, lead.supplier_id, lead.status);
    if let Some(method) = &lead.preferred_contact_method {
        let _ = write!(out, "\nreply by {method} to {}", lead.contact_email);
    }
    out
}

fn lead_line(lead: &Lead) -> String {
    let mut line = format!("#{:<5} {:<9} {}", lead.id, lead.status, lead.project_description);
    if let Some(budget) = lead.estimated_budget {
        let _ = write!(line, "  (R$ {budget:.2})");
    }
    line
}

/// Leads a supplier received, with who to contact.
pub fn received_leads_view(leads: &[Lead]) -> String {
    if leads.is_empty() {
        return "No leads received yet.".to_string();
    }
    let mut out = String::new();
    for lead in leads {
        let _ = writeln!(out, "{}", lead_line(lead));
        let _ = writeln!(out, "       contact: {}", lead.contact_phone.as_deref().unwrap_or(&lead.contact_email));
        if let Some(notes) = &lead.notes {
            let _ = writeln!(out, "       notes: {notes}");
        }
    }
    out.trim_end().to_string()
}

pub fn sent_leads_view(leads: &[SentLead]) -> String {
    if leads.is_empty() {
        return "No leads sent yet.".to_string();
    }
    leads
        .iter()
        .map(|sent| format!("{}  -> {}", lead_line(&sent.lead), sent.supplier_name))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn plan_view(plan: &Plan) -> String {
    format!("#{:<3} {}  R$ {:.2}/{}", plan.id, plan.name, plan.price, plan.billing_cycle)
}

pub fn admin_view((companies, plans): &(Vec<CompanyWithSubscription>, Vec<Plan>)) -> String {
    let mut out = String::from("Companies:");
    if companies.is_empty() {
        out.push_str("\n  none");
    }
    for company in companies {
        let plan = match (&company.current_plan, company.plan_status) {
            (Some(plan), Some(status)) => format!("{plan} ({status})"),
            _ => "no plan".to_string(),
        };
        let _ = write!(out, "\n  #{:<5} {}  {plan}", company.id, company.name);
    }
    out.push_str("\n\nPlans:");
    if plans.is_empty() {
        out.push_str("\n  none");
    }
    for plan in plans {
        let _ = write!(out, "\n  {}", plan_view(plan));
    }
    out
}

pub fn subscriptions_view(history: &[CompanySubscription]) -> String {
    if history.is_empty() {
        return "No subscriptions.".to_string();
    }
    history
        .iter()
        .map(|sub| {
            let end = sub
                .end_date
                .as_ref()
                .map(|end| end.as_datetime().format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "...".to_string());
            format!(
                "#{:<4} plan #{:<3} {:<9} {} - {end}",
                sub.id,
                sub.plan_id,
                sub.status,
                sub.start_date.as_datetime().format("%Y-%m-%d")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
