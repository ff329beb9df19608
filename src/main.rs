mod config;
mod contact;
mod latex;
mod search;
mod store;
mod ui;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};

use config::Config;
use contact::{Contact, Field};
use store::ContactStore;

#[derive(Parser, Debug)]
#[command(name = "academic-contacts", version, about = "Organize your academic contacts")]
struct Cli {
    /// Configuration file to use instead of the per-user default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Contact file (defaults to the last file opened)
    #[arg(long, short = 'f', global = true, value_name = "FILE")]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print contacts matching a query (all contacts when omitted)
    List(ListArgs),
    /// Append a contact to the contact file, creating it if needed
    Add(AddArgs),
    /// Print the contact list as LaTeX author and affiliation markup
    Export,
    /// Create an empty contact file and remember it
    Init(InitArgs),
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Case-insensitive text matched against every field
    query: Option<String>,
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    email: String,
    #[arg(long, default_value = "")]
    organization: String,
    #[arg(long, default_value = "")]
    addressline: String,
    #[arg(long, default_value = "")]
    city: String,
    #[arg(long, default_value = "")]
    postcode: String,
    #[arg(long, default_value = "")]
    state: String,
    #[arg(long, default_value = "")]
    country: String,
}

impl AddArgs {
    fn into_contact(self) -> Contact {
        Contact {
            name: Some(self.name),
            email: Some(self.email),
            organization: Some(self.organization),
            addressline: Some(self.addressline),
            city: Some(self.city),
            postcode: Some(self.postcode),
            state: Some(self.state),
            country: Some(self.country),
            ..Contact::default()
        }
    }
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(value_name = "FILE")]
    path: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.command.is_none());

    let mut config = config::load(cli.config.as_deref())?;
    log::debug!("loaded configuration from {}", config.config_path.display());

    let file = cli.file.as_deref().map(config::expand_tilde);

    match cli.command {
        Some(Command::List(args)) => handle_list(args, file.as_deref(), &mut config),
        Some(Command::Add(args)) => handle_add(args, file.as_deref(), &mut config),
        Some(Command::Export) => handle_export(file.as_deref(), &mut config),
        Some(Command::Init(args)) => handle_init(args, &mut config),
        None => run_session(file.as_deref(), &mut config),
    }
}

/// Subcommands log warnings to stderr; the interactive session stays quiet
/// unless RUST_LOG asks otherwise, since stderr shares the terminal.
fn init_logging(interactive: bool) {
    let default_filter = if interactive { "off" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn run_session(file: Option<&Path>, config: &mut Config) -> Result<()> {
    let startup = match file {
        Some(path) => Some(path.to_path_buf()),
        None => config.last_file().filter(|path| path.exists()),
    };

    let mut store = ContactStore::new();
    let mut app = ui::app::App::new(&mut store, config);
    if let Some(path) = startup {
        app.open_file(&path);
    }
    app.run()?;
    Ok(())
}

fn resolve_file(file: Option<&Path>, config: &Config) -> Result<PathBuf> {
    match file {
        Some(path) => Ok(path.to_path_buf()),
        None => match config.last_file() {
            Some(path) => Ok(path),
            None => bail!("no contact file given (use --file) and none opened before"),
        },
    }
}

fn handle_list(args: ListArgs, file: Option<&Path>, config: &mut Config) -> Result<()> {
    let path = resolve_file(file, config)?;
    let mut store = ContactStore::new();
    store.open(&path, config)?;

    let hits = store.filter(args.query.as_deref().unwrap_or_default());
    if hits.is_empty() {
        eprintln!("No matching contacts in {}", path.display());
    }

    // index<TAB>name<TAB>email<TAB>organization
    for hit in hits {
        println!(
            "{}\t{}\t{}\t{}",
            hit.index,
            hit.contact.display_name(),
            hit.contact.present(Field::Email).unwrap_or_default(),
            hit.contact.present(Field::Organization).unwrap_or_default()
        );
    }
    Ok(())
}

fn handle_add(args: AddArgs, file: Option<&Path>, config: &mut Config) -> Result<()> {
    let path = resolve_file(file, config)?;
    let mut store = ContactStore::new();
    if path.exists() {
        store.open(&path, config)?;
    }

    let contact = args.into_contact();
    let name = contact.display_name().to_string();
    store.add(contact);
    store.save_as(&path, config)?;

    println!("Added {} ({} contacts in {})", name, store.len(), path.display());
    Ok(())
}

fn handle_export(file: Option<&Path>, config: &mut Config) -> Result<()> {
    let path = resolve_file(file, config)?;
    let mut store = ContactStore::new();
    store.open(&path, config)?;

    let text = latex::export(&store.contacts())?;
    if !text.is_empty() {
        println!("{}", text);
    }
    Ok(())
}

fn handle_init(args: InitArgs, config: &mut Config) -> Result<()> {
    let path = config::expand_tilde(&args.path);
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    let mut store = ContactStore::new();
    store.save_as(&path, config)?;
    println!("Created {}", path.display());
    Ok(())
}
