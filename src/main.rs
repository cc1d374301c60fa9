use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use oxapi::cli::request::Verb;
use oxapi::{CacheStore, ClientConfig};

#[derive(Parser)]
#[command(name = "oxapi", version, about = "Log in to OpenX SSO and call the OpenX API")]
struct Cli {
    /// Directory holding the token and customer caches (default: home)
    #[arg(long, global = true, env = "OXAPI_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Print errors as JSON
    #[arg(long, global = true)]
    json_errors: bool,

    #[command(flatten)]
    customer: CustomerArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CustomerArgs {
    /// OAuth consumer key
    #[arg(long, global = true, env = "OXAPI_CUSTOMER_KEY")]
    customer_key: Option<String>,

    /// OAuth consumer secret
    #[arg(long, global = true, env = "OXAPI_CUSTOMER_SECRET", hide_env_values = true)]
    customer_secret: Option<String>,

    /// OAuth realm
    #[arg(long, global = true, env = "OXAPI_REALM")]
    realm: Option<String>,

    /// SSO domain, or a full base URL
    #[arg(long, global = true, env = "OXAPI_DOMAIN")]
    domain: Option<String>,

    /// API hostname
    #[arg(long, global = true, env = "OXAPI_API_HOSTNAME")]
    api_hostname: Option<String>,
}

impl From<CustomerArgs> for ClientConfig {
    fn from(args: CustomerArgs) -> Self {
        ClientConfig {
            customer_key: args.customer_key,
            customer_secret: args.customer_secret,
            realm: args.realm,
            domain: args.domain,
            api_hostname: args.api_hostname,
        }
    }
}

#[derive(Args)]
struct RequestArgs {
    /// API path (`/account`, `/ox/4.0/account`) or absolute URL
    url: String,

    /// Query parameter as key=value (repeatable)
    #[arg(long = "query", short = 'q')]
    query: Vec<String>,

    /// Print only the response body
    #[arg(long)]
    raw: bool,
}

#[derive(Args)]
struct BodyRequestArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Request body; sent as JSON when it parses as JSON
    #[arg(long, short = 'd')]
    data: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and cache the access token
    Login {
        /// Log in with a password instead of the browser
        #[arg(long, env = "OXAPI_USERNAME")]
        username: Option<String>,

        #[arg(long, env = "OXAPI_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Seconds to wait for the browser login to finish
        #[arg(long, env = "OXAPI_LOGIN_TIMEOUT_SECS", default_value_t = 300)]
        login_timeout: u64,
    },

    /// Remove the cached access token
    Logout,

    /// Send an authenticated GET request
    Get(RequestArgs),

    /// Send an authenticated HEAD request
    Head(RequestArgs),

    /// Send an authenticated OPTIONS request
    Options(RequestArgs),

    /// Send an authenticated DELETE request
    Delete(RequestArgs),

    /// Send an authenticated POST request
    Post(BodyRequestArgs),

    /// Send an authenticated PUT request
    Put(BodyRequestArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("OXAPI_LOG_LEVEL")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_errors = cli.json_errors;

    let result = run(cli).await;
    if let Err(e) = result {
        oxapi::cli::output::print_error(&e, json_errors);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), oxapi::OxApiError> {
    let store = CacheStore::new();
    let cache_dir = cli.cache_dir.as_deref();
    let overrides = ClientConfig::from(cli.customer);

    let (verb, request, data) = match cli.command {
        Commands::Login {
            username,
            password,
            login_timeout,
        } => {
            return oxapi::cli::login::run_login(
                &store,
                cache_dir,
                overrides,
                username.as_deref(),
                password.as_deref(),
                std::time::Duration::from_secs(login_timeout),
            )
            .await;
        }
        Commands::Logout => return oxapi::cli::login::run_logout(&store, cache_dir),
        Commands::Get(r) => (Verb::Get, r, None),
        Commands::Head(r) => (Verb::Head, r, None),
        Commands::Options(r) => (Verb::Options, r, None),
        Commands::Delete(r) => (Verb::Delete, r, None),
        Commands::Post(b) => (Verb::Post, b.request, b.data),
        Commands::Put(b) => (Verb::Put, b.request, b.data),
    };

    oxapi::cli::request::run_request(
        &store,
        cache_dir,
        overrides,
        verb,
        &request.url,
        &request.query,
        data.as_deref(),
        request.raw,
    )
    .await
}
