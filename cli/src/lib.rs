mod args;

pub use args::{Args, Commands, CreateSuperuserArgs};
use clap::Parser;
use common::{
    Database, ProjectInput, ROLE_ADMIN, ROLE_DONOR, ROLE_NGO, ROLE_VOLUNTEER, User,
    generate_wallet_address, slugify,
};

/// Runs the CLI command parser and executes the selected command.
/// Returns true if a CLI command was handled, false otherwise.
pub async fn run_cli() -> bool {
    let args = Args::parse();
    match &args.command {
        Some(Commands::CreateSuperuser(superuser_args)) => {
            if let Err(e) = create_superuser(
                &superuser_args.name,
                &superuser_args.email,
                &superuser_args.password,
            )
            .await
            {
                eprintln!("Failed to create superuser: {e}");
            }
            true
        }
        Some(Commands::SeedDemo) => {
            match seed_demo().await {
                Ok(_) => println!("Demo data seeded successfully."),
                Err(e) => eprintln!("Failed to seed demo data: {e}"),
            }
            true
        }
        None => false,
    }
}

/// Creates a superuser: validates input, hashes password, checks for duplicates, and saves to DB.
async fn create_superuser(name: &str, email: &str, password: &str) -> anyhow::Result<()> {
    // Validate and hash
    let user = User::new(name, email, password, None, ROLE_ADMIN, None)
        .map_err(|e| anyhow::anyhow!("Validation error: {e}"))?;

    let db = connect().await?;

    // Check if user already exists
    if db.get_user_by_email(email).await?.is_some() {
        return Err(anyhow::anyhow!(
            "A user with email '{}' already exists.",
            email
        ));
    }

    db.save_user(&user)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {e}"))?;

    println!("Superuser '{}' created successfully.", name);
    Ok(())
}

/// Inserts a small demo dataset: categories, one user per role, and a few
/// projects in different review states.
async fn seed_demo() -> anyhow::Result<()> {
    let db = connect().await?;

    for (name, icon) in [
        ("Lingkungan", "🌱"),
        ("Kemanusiaan", "🤝"),
        ("Pendidikan", "📚"),
        ("Air Bersih", "💧"),
    ] {
        db.save_category(name, Some(icon)).await?;
    }

    let donor = User::new(
        "Donatur Satu",
        "donatur1@gmail.com",
        "Password123",
        Some("0811111111"),
        ROLE_DONOR,
        Some(generate_wallet_address()),
    )?;
    let donor_id = db.save_user(&donor).await?;

    let volunteer = User::new(
        "Wiliiam Xavierus",
        "wilxav@gmail.com",
        "Password123",
        Some("0822222222"),
        ROLE_VOLUNTEER,
        Some(generate_wallet_address()),
    )?;
    db.save_user(&volunteer).await?;

    let ngo = User::new(
        "Green Earth Foundation",
        "ngo@gmail.com",
        "Password123",
        None,
        ROLE_NGO,
        None,
    )?;
    let ngo_id = db.save_user(&ngo).await?;

    let projects = [
        ProjectInput {
            title: "Reboisasi Hutan Kalimantan".to_string(),
            category_id: 1,
            description: "Program reboisasi untuk menanam 100.000 pohon di area hutan Kalimantan."
                .to_string(),
            location: Some("Kalimantan Timur, Indonesia".to_string()),
            duration_months: Some(12),
            target_amount: 100_000_000,
            thumbnail: None,
            banner_image: None,
            start_date: Some("2025-01-01".to_string()),
            end_date: Some("2025-12-31".to_string()),
        },
        ProjectInput {
            title: "Air Bersih untuk Desa".to_string(),
            category_id: 4,
            description: "Menyediakan akses air bersih dan sanitasi untuk desa terpencil."
                .to_string(),
            location: Some("NTT, Indonesia".to_string()),
            duration_months: Some(8),
            target_amount: 50_000_000,
            thumbnail: None,
            banner_image: None,
            start_date: Some("2025-02-01".to_string()),
            end_date: Some("2025-10-01".to_string()),
        },
    ];

    for input in &projects {
        let slug = slugify(&input.title);
        let project_id = db.save_project(ngo_id, &slug, "submitted", input).await?;
        db.review_project(project_id, true, Some(100)).await?;
    }

    println!("Seeded demo donor id={donor_id}, ngo id={ngo_id}.");
    Ok(())
}

/// Helper to open the database from DATABASE_URL.
async fn connect() -> anyhow::Result<Database> {
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL not set"))?;
    Database::new(&database_url).await
}
