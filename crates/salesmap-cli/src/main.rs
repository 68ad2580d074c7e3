mod report;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use salesmap_core::{FilterQuery, MapView};
use salesmap_sheets::{FileSource, RecordSource};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "salesmap-cli")]
#[command(about = "Sales location dashboard command line interface")]
struct Cli {
    /// Read and write this CSV file instead of the configured record source
    #[arg(long, global = true, env = "SALESMAP_RECORDS_FILE")]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the records that pass the filters
    List {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Location count and total sales per category
    Summary {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Print the map layer and legend as JSON
    Map {
        /// Marker or heatmap rendering
        #[arg(long, default_value_t = MapView::Markers)]
        view: MapView,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Write the filtered records as CSV
    Export {
        /// Destination file; stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Append a new location to the record source
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: String,
        #[arg(long, allow_hyphen_values = true)]
        lng: String,
        #[arg(long)]
        sales: f64,
        /// One of Deli, Grocery, Hotel, Restaurant, Other
        #[arg(long)]
        category: String,
        #[arg(long)]
        added_by: Option<String>,
    },
    /// Fetch the source and report row counts and dropped rows
    Check,
}

/// Filter flags shared by the read commands.
#[derive(Debug, Default, Args)]
struct FilterArgs {
    /// Categories to keep (repeatable or comma-separated); all when omitted
    #[arg(long = "category", value_delimiter = ',')]
    categories: Vec<String>,
    #[arg(long, allow_hyphen_values = true)]
    sales_min: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    sales_max: Option<f64>,
    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,
}

impl FilterArgs {
    fn to_query(&self) -> anyhow::Result<FilterQuery> {
        for bound in [self.sales_min, self.sales_max].into_iter().flatten() {
            anyhow::ensure!(!bound.is_nan(), "sales bounds must be numbers");
        }
        if let (Some(min), Some(max)) = (self.sales_min, self.sales_max) {
            anyhow::ensure!(min <= max, "--sales-min must not exceed --sales-max");
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            anyhow::ensure!(start <= end, "--start must not be after --end");
        }
        Ok(FilterQuery {
            categories: (!self.categories.is_empty()).then(|| self.categories.clone()),
            sales_min: self.sales_min,
            sales_max: self.sales_max,
            start: self.start,
            end: self.end,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("salesmap-cli: no command given; run with --help for usage");
        return Ok(());
    };

    let source = open_source(cli.file)?;
    let mut out = std::io::stdout().lock();

    match command {
        Commands::List { filters } => {
            report::run_list(source.as_ref(), &filters.to_query()?, &mut out).await
        }
        Commands::Summary { filters } => {
            report::run_summary(source.as_ref(), &filters.to_query()?, &mut out).await
        }
        Commands::Map { view, filters } => {
            report::run_map(source.as_ref(), &filters.to_query()?, view, &mut out).await
        }
        Commands::Export { output, filters } => {
            let query = filters.to_query()?;
            match output {
                Some(path) => report::run_export_to_file(source.as_ref(), &query, &path).await,
                None => report::run_export(source.as_ref(), &query, &mut out).await,
            }
        }
        Commands::Add {
            name,
            lat,
            lng,
            sales,
            category,
            added_by,
        } => {
            let form = salesmap_core::SubmissionForm {
                name,
                latitude: lat,
                longitude: lng,
                sales,
                category,
                added_by,
            };
            report::run_add(source.as_ref(), &form, &mut out).await
        }
        Commands::Check => report::run_check(source.as_ref(), &mut out).await,
    }
}

/// `--file` wins; otherwise the source comes from the environment config.
fn open_source(file: Option<PathBuf>) -> anyhow::Result<Arc<dyn RecordSource>> {
    if let Some(path) = file {
        return Ok(Arc::new(FileSource::new(path)));
    }
    let config = salesmap_core::load_app_config_from_env()?;
    Ok(salesmap_sheets::build_source(
        &config.source,
        config.request_timeout_secs,
    )?)
}
