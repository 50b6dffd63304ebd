mod admin;
mod auth;
mod config;
mod engine;
mod error;
mod export;
mod forms;
mod models;
mod seed;
mod storage;
mod utils;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::admin::Admin;
use crate::auth::AdminSession;
use crate::config::AppConfig;
use crate::engine::{filter_and_sort, FilterCriteria, SortKey, StatsSummary, StatusFilter};
use crate::models::{IpoRecord, NewCompany, RawIpoForm};
use crate::storage::Repository;
use crate::utils::{fmt_number, fmt_pct, or_dash};

#[derive(Parser)]
#[command(name = "ipo-tracker", about = "IPO listings, analytics and admin tools", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Admin username (admin commands only)
    #[arg(long, env = "IPO_ADMIN_USER", global = true)]
    user: Option<String>,

    /// Admin password (admin commands only)
    #[arg(long, env = "IPO_ADMIN_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply schema migrations
    Migrate,

    /// Insert demo companies and IPOs (admin)
    Seed,

    /// List IPOs with optional status/search filters
    List {
        #[command(flatten)]
        filter: FilterArgs,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one IPO with its documents
    Show {
        id: i64,

        #[arg(long)]
        json: bool,
    },

    /// Export IPOs as CSV (stdout unless --out is given)
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output file, or a directory to receive <prefix>-YYYY-MM-DD.csv
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Analytics summary (admin)
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Manage companies
    Company {
        #[command(subcommand)]
        action: CompanyCommand,
    },

    /// Create an IPO (admin)
    Create(CreateArgs),

    /// Edit fields of an IPO, e.g. --set status=LISTED --set listingGain=12 (admin)
    Update {
        id: i64,

        /// FIELD=VALUE; an empty value clears an optional field
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        set: Vec<String>,
    },

    /// Delete an IPO and its documents (admin)
    Delete { id: i64 },

    /// Attach RHP/DRHP file paths to an IPO (admin)
    Docs {
        id: i64,

        #[arg(long)]
        rhp: Option<String>,

        #[arg(long)]
        drhp: Option<String>,
    },
}

#[derive(Subcommand)]
enum CompanyCommand {
    /// Add a company (admin)
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        symbol: Option<String>,

        #[arg(long)]
        logo: Option<String>,
    },

    /// List companies by name
    List,
}

#[derive(Args)]
struct FilterArgs {
    /// ALL, UPCOMING, OPEN, CLOSED or LISTED
    #[arg(long, default_value = "ALL")]
    status: StatusFilter,

    /// Case-insensitive match on company name, symbol or price band
    #[arg(long, default_value = "")]
    search: String,

    /// newest, oldest, gain-high, gain-low or name
    #[arg(long, default_value = "newest")]
    sort: SortKey,
}

impl From<FilterArgs> for FilterCriteria {
    fn from(a: FilterArgs) -> Self {
        FilterCriteria { status: a.status, search: a.search, sort: a.sort }
    }
}

/// Same fields as the admin IPO form; values are validated after parsing.
#[derive(Args)]
struct CreateArgs {
    #[arg(long)]
    company_id: Option<String>,
    #[arg(long)]
    price_band: Option<String>,
    #[arg(long)]
    open_date: Option<String>,
    #[arg(long)]
    close_date: Option<String>,
    #[arg(long)]
    issue_size: Option<String>,
    #[arg(long)]
    issue_type: Option<String>,
    #[arg(long)]
    listing_date: Option<String>,
    #[arg(long, default_value = "UPCOMING")]
    status: String,
    #[arg(long)]
    ipo_price: Option<String>,
    #[arg(long)]
    listing_price: Option<String>,
    #[arg(long)]
    listing_gain: Option<String>,
    #[arg(long)]
    current_market_price: Option<String>,
    #[arg(long)]
    current_return: Option<String>,
}

impl From<CreateArgs> for RawIpoForm {
    fn from(a: CreateArgs) -> Self {
        RawIpoForm {
            company_id: a.company_id,
            price_band: a.price_band,
            open_date: a.open_date,
            close_date: a.close_date,
            issue_size: a.issue_size,
            issue_type: a.issue_type,
            listing_date: a.listing_date,
            status: Some(a.status),
            ipo_price: a.ipo_price,
            listing_price: a.listing_price,
            listing_gain: a.listing_gain,
            current_market_price: a.current_market_price,
            current_return: a.current_return,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "ipo_tracker=info,warn",
        1 => "ipo_tracker=debug,info",
        _ => "trace",
    };

    // stdout carries CSV/JSON, so logs go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;
    let login = || {
        AdminSession::login(&config.admin, cli.user.as_deref(), cli.password.as_deref())
    };

    match cli.command {
        Command::Migrate => {
            Repository::open(&config.storage.db_path)?.run_migrations()?;
            println!("Migrations applied.");
        }

        Command::Seed => {
            let _t = utils::Timer::start("seed");
            let session = login()?;
            let repo = open_repo(&config)?;
            let n = seed::run(&Admin::new(&repo, &session))?;
            println!("Seeded {} IPOs.", n);
        }

        Command::List { filter, json } => {
            let repo = open_repo(&config)?;
            let criteria = log_criteria(filter.into());
            let ipos = filter_and_sort(&repo.list_ipos()?, &criteria);
            if json {
                println!("{}", serde_json::to_string_pretty(&ipos)?);
            } else {
                print_table(&ipos);
            }
        }

        Command::Show { id, json } => {
            let repo = open_repo(&config)?;
            let Some(record) = repo.get_ipo(id)? else {
                bail!("IPO {} not found", id);
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                print_detail(&record);
            }
        }

        Command::Export { filter, out } => {
            let _t = utils::Timer::start("CSV export");
            let repo = open_repo(&config)?;
            let criteria = log_criteria(filter.into());
            let ipos = filter_and_sort(&repo.list_ipos()?, &criteria);
            let csv = match config.export.date_format.as_str() {
                export::DEFAULT_DATE_FORMAT => export::to_csv(&ipos)?,
                custom => export::to_csv_with(&ipos, custom)?,
            };

            match out {
                Some(path) => {
                    let path = if path.is_dir() {
                        let today = chrono::Local::now().date_naive();
                        path.join(export::export_file_name(&config.export.file_prefix, today))
                    } else {
                        path
                    };
                    std::fs::write(&path, format!("{}\n", csv))
                        .with_context(|| format!("Could not write {:?}", path))?;
                    info!("Exported {} IPOs to {:?}", ipos.len(), path);
                }
                None => println!("{}", csv),
            }
        }

        Command::Stats { json } => {
            let session = login()?;
            let repo = open_repo(&config)?;
            let stats = Admin::new(&repo, &session).stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats, repo.company_count()?);
            }
        }

        Command::Company { action } => {
            let repo = open_repo(&config)?;
            match action {
                CompanyCommand::Add { name, symbol, logo } => {
                    let session = login()?;
                    let company = Admin::new(&repo, &session)
                        .create_company(&NewCompany { name, symbol, logo })?;
                    println!("Company {} created: {}", company.id, company.name);
                }
                CompanyCommand::List => {
                    let companies = repo.list_companies()?;
                    if companies.is_empty() {
                        println!("No companies yet. Run `seed` or `company add` first.");
                    }
                    for c in &companies {
                        println!("  {:>4}  {:<32} {}", c.id, c.name, or_dash(c.symbol.as_deref()));
                    }
                }
            }
        }

        Command::Create(args) => {
            let session = login()?;
            let repo = open_repo(&config)?;
            let record = Admin::new(&repo, &session).create_ipo(&args.into())?;
            println!("IPO {} created for {}.", record.ipo.id, record.company.name);
        }

        Command::Update { id, set } => {
            let session = login()?;
            let repo = open_repo(&config)?;
            let pairs = set
                .iter()
                .map(|s| forms::split_assignment(s))
                .collect::<Result<Vec<_>, _>>()?;
            match Admin::new(&repo, &session).update_ipo(id, pairs)? {
                Some(record) => print_detail(&record),
                None => bail!("IPO {} not found", id),
            }
        }

        Command::Delete { id } => {
            let session = login()?;
            let repo = open_repo(&config)?;
            if !Admin::new(&repo, &session).delete_ipo(id)? {
                bail!("IPO {} not found", id);
            }
            println!("IPO {} deleted.", id);
        }

        Command::Docs { id, rhp, drhp } => {
            if rhp.is_none() && drhp.is_none() {
                bail!("nothing to save: pass --rhp and/or --drhp");
            }
            let session = login()?;
            let repo = open_repo(&config)?;
            let Some(docs) = Admin::new(&repo, &session)
                .save_documents(id, rhp.as_deref(), drhp.as_deref())?
            else {
                bail!("IPO {} not found", id);
            };
            println!("RHP  : {}", or_dash(docs.rhp_pdf));
            println!("DRHP : {}", or_dash(docs.drhp_pdf));
        }
    }

    Ok(())
}

fn log_criteria(criteria: FilterCriteria) -> FilterCriteria {
    debug!(
        "status={} search={:?} sort={}",
        criteria.status, criteria.search, criteria.sort
    );
    criteria
}

fn open_repo(config: &AppConfig) -> Result<Repository> {
    let repo = Repository::open(&config.storage.db_path)?;
    if config.storage.run_migrations {
        repo.run_migrations()?;
    }
    Ok(repo)
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print_table(ipos: &[IpoRecord]) {
    if ipos.is_empty() {
        println!("No IPOs match.");
        return;
    }
    println!(
        "{:>4}  {:<24} {:<8} {:<9} {:<18} {:>10}  {:>9}",
        "ID", "Company", "Symbol", "Status", "Price Band", "Open", "Gain %"
    );
    for r in ipos {
        println!(
            "{:>4}  {:<24} {:<8} {:<9} {:<18} {:>10}  {:>9}",
            r.ipo.id,
            r.company.name,
            or_dash(r.company.symbol.as_deref()),
            r.ipo.status,
            r.ipo.price_band,
            r.ipo.open_date.to_string(),
            or_dash(r.ipo.listing_gain),
        );
    }
    println!("{} IPOs", ipos.len());
}

fn print_detail(r: &IpoRecord) {
    let ipo = &r.ipo;
    let docs = r.documents.as_ref();
    println!("─────────────────────────────────");
    println!("  {} ({})", r.company.name, or_dash(r.company.symbol.as_deref()));
    println!("─────────────────────────────────");
    println!("  ID            : {}", ipo.id);
    println!("  Status        : {}", ipo.status);
    println!("  Issue type    : {}", ipo.issue_type);
    println!("  Issue size    : {}", ipo.issue_size);
    println!("  Price band    : {}", ipo.price_band);
    println!("  Open / Close  : {} → {}", ipo.open_date, ipo.close_date);
    println!("  Listing date  : {}", or_dash(ipo.listing_date));
    println!("  IPO price     : {}", or_dash(ipo.ipo_price));
    println!("  Listing price : {}", or_dash(ipo.listing_price));
    println!("  Listing gain  : {}", or_dash(ipo.listing_gain.map(fmt_pct)));
    println!("  Market price  : {}", or_dash(ipo.current_market_price));
    println!("  Return        : {}", or_dash(ipo.current_return.map(fmt_pct)));
    println!("  RHP           : {}", or_dash(docs.and_then(|d| d.rhp_pdf.as_deref())));
    println!("  DRHP          : {}", or_dash(docs.and_then(|d| d.drhp_pdf.as_deref())));
    println!("─────────────────────────────────");
}

fn print_stats(s: &StatsSummary, companies: i64) {
    println!("─────────────────────────────────");
    println!("  IPO Analytics");
    println!("─────────────────────────────────");
    println!("  Companies     : {}", companies);
    println!("  Total IPOs    : {}", s.total_ipos);
    for entry in &s.status_breakdown {
        println!("  {:<13} : {}", entry.status, entry.count);
    }
    println!("  Avg gain      : {}", fmt_pct(s.average_listing_gain));
    println!("  Issue size Σ  : {}", fmt_number(s.total_issue_size));
    println!("─────────────────────────────────");
}
