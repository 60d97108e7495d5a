//! SolarSync terminal client.
//!
//! Every subcommand is a page: it loads its data through the typed API and
//! prints it. Ctrl-C closes the page, which cancels its in-flight requests.

mod pages;

use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use solarsync_core::{
    AdminCompaniesParams, BearerAuth, BillingCycle, ClientConfig, CreateLeadRequest, CreatePlanRequest, FetchState,
    HttpClient, LeadStatus, ListProductsParams, RegistrationRequest, ReviewRequest, SearchCompaniesParams,
    SolarSyncApi, UpdateLeadStatus, UpdateSubscriptionRequest,
};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "solarsync")]
#[command(about = "Browse the SolarSync solar-energy marketplace")]
#[command(version)]
struct Cli {
    /// Backend origin (default http://localhost:8000)
    #[arg(long, env = "SOLARSYNC_API_URL")]
    api_url: Option<String>,

    /// Bearer token for routes that need a signed-in user
    #[arg(long, env = "SOLARSYNC_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Request deadline in seconds (default: none)
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend is up
    Health,

    /// List products
    Products {
        /// Category name, e.g. Inverters
        #[arg(long)]
        category: Option<String>,

        /// Brand name or part of it
        #[arg(long)]
        brand: Option<String>,
    },

    /// Show a product and its reviews
    Product { id: u64 },

    /// Search companies by location
    Companies {
        /// Two-letter state code, e.g. SP
        #[arg(long)]
        state: Option<String>,

        #[arg(long)]
        city: Option<String>,
    },

    /// Show a company profile and its products
    Company { id: u64 },

    /// Review a product (needs a token)
    Review {
        product_id: u64,

        /// Rating from 1 to 5
        rating: i32,

        comment: String,
    },

    /// Create an account
    Register {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// installer or supplier
        #[arg(long, default_value = "installer")]
        role: String,

        #[arg(long)]
        full_name: String,

        /// Required for suppliers
        #[arg(long)]
        company_name: Option<String>,
    },

    /// Profile-view analytics for your company (needs a supplier token)
    Analytics,

    /// Ask a supplier company for a quote (needs an installer token)
    Lead {
        /// Company id of the supplier
        supplier_id: u64,

        /// What the project is about
        description: String,

        /// Where the supplier should reply
        #[arg(long)]
        email: String,

        #[arg(long)]
        phone: Option<String>,

        /// e.g. residential, commercial
        #[arg(long)]
        project_type: Option<String>,

        /// Estimated budget in BRL
        #[arg(long)]
        budget: Option<f64>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        timeline: Option<String>,

        /// email or phone (default email)
        #[arg(long)]
        contact_method: Option<String>,
    },

    /// Leads your company received, or with --sent the ones you sent
    Leads {
        #[arg(long)]
        sent: bool,
    },

    /// Move a received lead to a new status (needs a supplier token)
    LeadStatus {
        lead_id: u64,

        #[arg(value_enum)]
        status: StatusArg,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Plans and subscriptions (needs an admin token)
    #[command(subcommand)]
    Admin(AdminCommands),
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Companies with their current plan, and the plan catalogue
    Overview {
        #[arg(long)]
        page: Option<u32>,

        /// Companies per page, at most 100
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Add a plan to the catalogue
    CreatePlan {
        name: String,

        price: f64,

        #[arg(long, value_enum, default_value_t = CycleArg::Monthly)]
        cycle: CycleArg,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        max_products: Option<u32>,

        #[arg(long)]
        max_users: Option<u32>,
    },

    /// Put a company on a plan, ending its current one
    Subscribe { company_id: u64, plan_id: u64 },

    /// Cancel a company's active subscription
    Cancel { company_id: u64 },

    /// Subscription history of a company
    History { company_id: u64 },
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Pending,
    Contacted,
    Quoted,
    Closed,
}

impl From<StatusArg> for LeadStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => LeadStatus::Pending,
            StatusArg::Contacted => LeadStatus::Contacted,
            StatusArg::Quoted => LeadStatus::Quoted,
            StatusArg::Closed => LeadStatus::Closed,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CycleArg {
    Monthly,
    Yearly,
}

impl From<CycleArg> for BillingCycle {
    fn from(arg: CycleArg) -> Self {
        match arg {
            CycleArg::Monthly => BillingCycle::Monthly,
            CycleArg::Yearly => BillingCycle::Yearly,
        }
    }
}

fn build_api(cli: &Cli) -> anyhow::Result<SolarSyncApi> {
    let mut config = ClientConfig::from_env().context("reading client configuration")?;
    if let Some(url) = &cli.api_url {
        config.base_url = url.clone();
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    debug!(base_url = %config.base_url, timeout = ?config.timeout, "client configured");

    let token = cli.token.clone().filter(|t| !t.is_empty());
    let client: HttpClient = HttpClient::new(config)?.with_security_worker(BearerAuth::new(move || token.clone()));
    Ok(SolarSyncApi::new(client))
}

fn print<T>(state: FetchState<T>, view: impl Fn(&T) -> String) -> anyhow::Result<()> {
    match pages::render(&state, view) {
        Ok(text) => {
            println!("{text}");
            Ok(())
        }
        Err(message) => Err(anyhow!(message)),
    }
}

async fn run(api: &SolarSyncApi, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Health => print(pages::health(api).await, pages::health_view),
        Commands::Products { category, brand } => {
            let state = pages::products(api, ListProductsParams { category, brand }).await;
            print(state, |products| pages::products_view(products))
        }
        Commands::Product { id } => print(pages::product(api, id).await, pages::product_view),
        Commands::Companies { state, city } => {
            let page = pages::companies(api, SearchCompaniesParams { state, city }).await;
            print(page, |companies| pages::companies_view(companies))
        }
        Commands::Company { id } => print(pages::company(api, id).await, pages::company_view),
        Commands::Review {
            product_id,
            rating,
            comment,
        } => {
            let input = ReviewRequest {
                product_id,
                rating,
                comment,
            };
            print(pages::review(api, input).await, pages::review_view)
        }
        Commands::Register {
            email,
            password,
            role,
            full_name,
            company_name,
        } => {
            let input = RegistrationRequest {
                email,
                password,
                role,
                full_name,
                company_name,
            };
            print(pages::register(api, input).await, pages::user_view)
        }
        Commands::Analytics => print(pages::analytics(api).await, pages::analytics_view),
        Commands::Lead {
            supplier_id,
            description,
            email,
            phone,
            project_type,
            budget,
            location,
            timeline,
            contact_method,
        } => {
            let input = CreateLeadRequest {
                project_type,
                estimated_budget: budget,
                location,
                contact_phone: phone,
                preferred_contact_method: contact_method,
                timeline,
                ..CreateLeadRequest::new(supplier_id, description, email)
            };
            print(pages::create_lead(api, input).await, pages::lead_view)
        }
        Commands::Leads { sent: true } => print(pages::sent_leads(api).await, |leads| pages::sent_leads_view(leads)),
        Commands::Leads { sent: false } => {
            print(pages::received_leads(api).await, |leads| pages::received_leads_view(leads))
        }
        Commands::LeadStatus { lead_id, status, notes } => {
            let input = UpdateLeadStatus {
                lead_id,
                status: status.into(),
                notes,
            };
            print(pages::update_lead_status(api, input).await, pages::message_view)
        }
        Commands::Admin(command) => run_admin(api, command).await,
    }
}

async fn run_admin(api: &SolarSyncApi, command: AdminCommands) -> anyhow::Result<()> {
    match command {
        AdminCommands::Overview { page, limit } => {
            print(pages::admin_overview(api, AdminCompaniesParams { page, limit }).await, pages::admin_view)
        }
        AdminCommands::CreatePlan {
            name,
            price,
            cycle,
            description,
            max_products,
            max_users,
        } => {
            let input = CreatePlanRequest {
                name,
                description,
                price,
                billing_cycle: cycle.into(),
                max_products,
                max_users,
                features: None,
            };
            print(pages::create_plan(api, input).await, pages::plan_view)
        }
        AdminCommands::Subscribe { company_id, plan_id } => {
            let input = UpdateSubscriptionRequest { company_id, plan_id };
            print(pages::subscribe(api, input).await, pages::message_view)
        }
        AdminCommands::Cancel { company_id } => {
            print(pages::cancel_subscription(api, company_id).await, pages::message_view)
        }
        AdminCommands::History { company_id } => print(
            pages::subscription_history(api, company_id).await,
            |history| pages::subscriptions_view(history),
        ),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "solarsync=warn,solarsync_core=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let api = build_api(&cli)?;

    tokio::select! {
        result = run(&api, cli.command) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, cancelling in-flight requests");
            Err(anyhow!("cancelled"))
        }
    }
}
