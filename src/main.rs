use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use pet_clinic::{
    load_owners_csv, logging, seed_pet_types, ClinicService, Config, FormOutcome, NewVisit, Owner, Rejections,
    SearchOutcome, SqliteRepository,
};

#[derive(Parser)]
#[command(name = "pet-clinic", version, about = "Pet clinic records: owners, pets and visits")]
struct Cli {
    /// Database file (overrides PETCLINIC_DB)
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Create the schema and seed the default pet types
    Init,
    /// Import owners from a CSV (first_name,last_name,address,city,telephone)
    Import { csv: PathBuf },
    /// Search owners by last-name prefix
    Find {
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Show an owner with pets and visits
    Show { owner_id: i64 },
    /// List pet types
    Types,
    /// Register a new owner
    AddOwner {
        first_name: String,
        last_name: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        city: String,
        /// Ten digits
        #[arg(long)]
        telephone: String,
    },
    /// Add a pet to an owner
    AddPet {
        owner_id: i64,
        name: String,
        /// Pet type name, e.g. dog
        #[arg(long = "type")]
        pet_type: String,
        /// YYYY-MM-DD
        #[arg(long)]
        birth_date: NaiveDate,
    },
    /// Record a visit (date defaults to today)
    Visit {
        owner_id: i64,
        pet_id: i64,
        description: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete an owner with its pets and visits
    Delete { owner_id: i64 },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(db) = cli.db {
        config = config.with_database_path(db);
    }
    logging::init(&config);

    let repo = SqliteRepository::open(&config.database_path)
        .with_context(|| format!("opening database {}", config.database_path.display()))?;
    let mut service = ClinicService::new(repo).with_page_size(config.page_size);

    match cli.cmd {
        Cmd::Init => run_init(&service, &config),
        Cmd::Import { csv } => run_import(&mut service, &csv),
        Cmd::Find { last_name, page } => run_find(&service, last_name.as_deref(), page),
        Cmd::Show { owner_id } => {
            let owner = service.show_owner(owner_id)?;
            print_owner(&owner);
            Ok(())
        }
        Cmd::Types => {
            println!("🏷️  Pet types");
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            for pet_type in service.list_pet_types()? {
                println!("  {:>3}  {}", pet_type.id.unwrap_or_default(), pet_type.name);
            }
            Ok(())
        }
        Cmd::AddOwner {
            first_name,
            last_name,
            address,
            city,
            telephone,
        } => report(
            service.create_owner(Owner::new(first_name, last_name, address, city, telephone))?,
            "Owner added",
        ),
        Cmd::AddPet {
            owner_id,
            name,
            pet_type,
            birth_date,
        } => {
            match service.pet_from_form(&name, Some(birth_date), Some(&pet_type))? {
                Ok(pet) => report(service.create_pet(owner_id, pet)?, "Pet added"),
                Err(rejections) => {
                    print_rejections(&rejections);
                    bail!("Unknown pet type '{}' (see `pet-clinic types`)", pet_type);
                }
            }
        }
        Cmd::Visit {
            owner_id,
            pet_id,
            description,
            date,
        } => report(
            service.create_visit(owner_id, pet_id, NewVisit::new(date, description))?,
            "Visit recorded",
        ),
        Cmd::Delete { owner_id } => {
            service.delete_owner(owner_id)?;
            println!("🗑️  Owner {} deleted", owner_id);
            Ok(())
        }
    }
}

fn run_init(service: &ClinicService<SqliteRepository>, config: &Config) -> Result<()> {
    println!("🗄️  Pet Clinic - Database setup");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n🔧 Schema ready at {}", config.database_path.display());

    let seeded = seed_pet_types(service.repository().connection())?;
    if seeded > 0 {
        println!("✓ Seeded {} pet types", seeded);
    } else {
        println!("✓ Pet types already present");
    }

    Ok(())
}

fn run_import(service: &mut ClinicService<SqliteRepository>, csv: &Path) -> Result<()> {
    println!("🗄️  Pet Clinic - Owner import");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n📂 Loading CSV...");
    let owners = load_owners_csv(csv).with_context(|| format!("reading {}", csv.display()))?;
    println!("✓ Loaded {} owners from CSV", owners.len());

    println!("\n💾 Saving owners...");
    let report = service.import_owners(owners)?;
    for skipped in &report.skipped {
        println!("⚠️  Row {} ({}) skipped: {}", skipped.row, skipped.name, skipped.rejections);
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Imported {} owners", report.imported);
    if !report.skipped.is_empty() {
        println!("✓ Rejected rows: {}", report.skipped.len());
    }

    Ok(())
}

fn run_find(service: &ClinicService<SqliteRepository>, last_name: Option<&str>, page: usize) -> Result<()> {
    match service.find_owners(page, last_name)? {
        SearchOutcome::NotFound(_) => {
            println!("🔍 No owners found for '{}'", last_name.unwrap_or(""));
        }
        SearchOutcome::Single(owner) => print_owner(&owner),
        SearchOutcome::Page(view) => {
            println!(
                "🔍 Owners - page {} of {} ({} total)",
                view.current_page, view.total_pages, view.total_items
            );
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            for owner in &view.owners {
                let pets: Vec<&str> = owner.pets().iter().map(|p| p.name.as_str()).collect();
                println!(
                    "  {:>4}  {:<24} {:<20} {:<12} {}  [{}]",
                    owner.id.unwrap_or_default(),
                    owner.name.full_name(),
                    owner.address,
                    owner.city,
                    owner.telephone,
                    pets.join(", ")
                );
            }
        }
    }
    Ok(())
}

fn print_owner(owner: &Owner) {
    println!("🏠 {} (#{})", owner.name.full_name(), owner.id.unwrap_or_default());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Address:   {}", owner.address);
    println!("  City:      {}", owner.city);
    println!("  Telephone: {}", owner.telephone);

    for pet in owner.pets() {
        let birth = pet.birth_date.map(|d| d.to_string()).unwrap_or_default();
        println!(
            "\n  🐾 {} (#{}) {} born {}",
            pet.name,
            pet.id.unwrap_or_default(),
            pet.type_name().unwrap_or("?"),
            birth
        );
        for visit in pet.visits() {
            println!("     📅 {}  {}", visit.date, visit.description);
        }
    }
}

fn report(outcome: FormOutcome<Owner>, done: &str) -> Result<()> {
    match outcome {
        FormOutcome::Saved(owner) => {
            println!("✅ {}", done);
            print_owner(&owner);
            Ok(())
        }
        FormOutcome::Rejected(rejections) => {
            print_rejections(&rejections);
            bail!("{} rejected", rejections.len());
        }
    }
}

fn print_rejections(rejections: &Rejections) {
    eprintln!("❌ Not saved:");
    for rejection in rejections.iter() {
        eprintln!("   {}", rejection);
    }
}
