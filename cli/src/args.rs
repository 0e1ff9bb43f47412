use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "TerraFund CLI - manage admin users and demo data")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a superuser (admin) account
    CreateSuperuser(CreateSuperuserArgs),

    /// Seed demo categories, users and projects (for testing only)
    ///
    /// Inserts a small demo dataset so the API has something to serve.
    /// For testing purposes only.
    SeedDemo,
}

#[derive(ClapArgs, Debug)]
pub struct CreateSuperuserArgs {
    /// Display name for the superuser
    #[arg(short, long, help = "Display name for the superuser")]
    pub name: String,

    /// Email address for the superuser
    #[arg(short, long, help = "Email address for the superuser")]
    pub email: String,

    /// Password for the superuser
    #[arg(short, long, help = "Password for the superuser")]
    pub password: String,
}
