use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};

use rusty_lines::data::filter::SpeciesFilter;
use rusty_lines::import::{self, ColumnSpec, Delimiter, ImportOptions, NewSource};
use rusty_lines::store::{CatalogSource, FileStore, SqliteStore};
use rusty_lines::state::LineBrowser;
use rusty_lines::{LineOrder, LineRecord, QueryWindow};

/// Browse, query and import spectral line lists
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Select the lines of a source inside a wavelength window
    Query(QueryArgs),
    /// List the sources of a store
    Sources(StoreArgs),
    /// Register a new source in a line database
    AddSource(AddSourceArgs),
    /// Import delimited text files into a line database
    Import(ImportArgs),
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// SQLite line database
    #[arg(long, conflicts_with = "dir", required_unless_present = "dir")]
    db: Option<PathBuf>,

    /// Directory of line-list files
    #[arg(long)]
    dir: Option<PathBuf>,

    /// JSON registry mapping source names to files in --dir
    #[arg(long, requires = "dir")]
    registry: Option<PathBuf>,
}

impl StoreArgs {
    fn open(&self) -> Result<Box<dyn CatalogSource>> {
        match (&self.db, &self.dir, &self.registry) {
            (Some(db), _, _) => {
                if !db.exists() {
                    bail!("line database {} does not exist", db.display());
                }
                Ok(Box::new(SqliteStore::open(db)?))
            }
            (None, Some(dir), Some(registry)) => Ok(Box::new(FileStore::from_registry_file(dir, registry)?)),
            (None, Some(dir), None) => Ok(Box::new(FileStore::new(dir))),
            (None, None, _) => bail!("either --db or --dir is required"),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OrderArg {
    Catalog,
    Wavelength,
    Strength,
}

impl From<OrderArg> for LineOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Catalog => LineOrder::Catalog,
            OrderArg::Wavelength => LineOrder::Wavelength,
            OrderArg::Strength => LineOrder::StrengthDescending,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Table,
    Json,
    Csv,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// Short name of the source
    #[arg(short, long)]
    source: String,

    /// Lower wavelength bound [angstrom], inclusive
    #[arg(long, allow_negative_numbers = true)]
    min: f64,

    /// Upper wavelength bound [angstrom], inclusive
    #[arg(long, allow_negative_numbers = true)]
    max: f64,

    /// Show only the N strongest lines (ties at the cutoff are kept)
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    limit: Option<i64>,

    /// Only lines of this species (repeatable)
    #[arg(long = "species")]
    species: Vec<String>,

    #[arg(long, value_enum, default_value_t = OrderArg::Catalog)]
    order: OrderArg,

    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,
}

#[derive(Args, Debug)]
struct AddSourceArgs {
    /// SQLite line database (created if missing)
    #[arg(short, long)]
    database: PathBuf,

    /// Short, unique name identifying the source
    #[arg(long)]
    short_name: String,

    /// Full name of the list, for display
    #[arg(long)]
    display_name: String,

    #[arg(long)]
    url: Option<String>,

    #[arg(long)]
    description: Option<String>,
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// SQLite line database (created if missing)
    #[arg(short, long)]
    database: PathBuf,

    /// Short name of the source the lines belong to
    #[arg(short, long)]
    source: String,

    /// Files to import; they must share separator and column layout
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Field separator
    #[arg(short = 'S', long, default_value_t = ',')]
    separator: char,

    /// Split fields on whitespace instead of --separator
    #[arg(short, long, conflicts_with = "separator")]
    whitespace: bool,

    /// Wavelength, species and priority columns: three header names, or
    /// three 0-based column numbers for files without a header row
    #[arg(short = 'H', long, default_value = "0,1,2")]
    headers: String,

    /// Lines to skip at the top of each file
    #[arg(long, default_value_t = 0)]
    skip_lines: usize,

    /// Register the source if it is not in the database yet
    #[arg(long)]
    create_source: bool,

    #[arg(short = 'n', long, requires = "create_source")]
    display_name: Option<String>,

    #[arg(short, long, requires = "create_source")]
    url: Option<String>,

    #[arg(long, requires = "create_source")]
    description: Option<String>,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Query(args) => run_query(args),
        Command::Sources(args) => run_sources(args),
        Command::AddSource(args) => run_add_source(args),
        Command::Import(args) => run_import(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_query(args: QueryArgs) -> Result<()> {
    let store = args.store.open()?;
    let lines = query_lines(store.as_ref(), &args)?;

    let stdout = std::io::stdout();
    write_lines(&mut stdout.lock(), &lines, args.format)
}

fn query_lines(store: &dyn CatalogSource, args: &QueryArgs) -> Result<Vec<LineRecord>> {
    let mut browser = LineBrowser::new(QueryWindow::new(args.min, args.max), args.limit);
    browser.order = args.order.into();
    browser.load_source(store, &args.source)?;
    if !args.species.is_empty() {
        browser.set_species(args.species.iter().cloned().collect::<SpeciesFilter>());
    }
    Ok(browser.query()?)
}

fn write_lines(out: &mut impl Write, lines: &[LineRecord], format: Format) -> Result<()> {
    match format {
        Format::Table => {
            writeln!(out, "{:>14}  {:<12}  {:>10}", "wavelength", "species", "priority")?;
            for line in lines {
                writeln!(out, "{:>14.4}  {:<12}  {:>10}", line.wavelength, line.species, line.strength)?;
            }
        }
        Format::Json => {
            serde_json::to_writer_pretty(&mut *out, lines).context("writing JSON")?;
            writeln!(out)?;
        }
        Format::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for line in lines {
                writer.serialize(line).context("writing CSV")?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

fn run_sources(args: StoreArgs) -> Result<()> {
    let store = args.open()?;
    for source in store.sources()? {
        println!(
            "{:>4}  {:<16}  {}{}",
            source.source_id,
            source.short_name,
            source.display_name,
            source.url.map(|u| format!("  <{u}>")).unwrap_or_default()
        );
    }
    Ok(())
}

fn run_add_source(args: AddSourceArgs) -> Result<()> {
    let store = SqliteStore::open(&args.database)?;
    let info = store.add_source(
        &args.short_name,
        &args.display_name,
        args.url.as_deref(),
        args.description.as_deref(),
    )?;
    println!("Added source {} (id {})", info.short_name, info.source_id);
    Ok(())
}

fn run_import(args: ImportArgs) -> Result<()> {
    let columns = ColumnSpec::parse(&args.headers)?;
    let delimiter = if args.whitespace {
        Delimiter::Whitespace
    } else {
        let sep = u8::try_from(args.separator)
            .with_context(|| format!("separator '{}' is not a single-byte character", args.separator))?;
        Delimiter::Char(sep)
    };
    let opts = ImportOptions {
        columns,
        delimiter,
        skip_lines: args.skip_lines,
    };

    let mut store = SqliteStore::open(&args.database)?;
    let create = args.create_source.then(|| NewSource {
        display_name: args.display_name.clone().unwrap_or_else(|| args.source.clone()),
        url: args.url.clone(),
        description: args.description.clone(),
    });
    let source = import::resolve_source(&store, &args.source, create.as_ref())?;

    let mut total = 0;
    for file in &args.files {
        let added = import::import_file(&mut store, &source, file, &opts)?;
        println!("{}: added {added} rows", file.display());
        total += added;
    }
    log::info!("Imported {total} lines into {}", source.short_name);
    Ok(())
}
