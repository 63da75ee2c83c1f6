use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;

use kyc_wallet::config::Config;
use kyc_wallet::logging;
use kyc_wallet::pipeline::KycSession;

#[derive(Parser)]
#[command(name = "kyc_wallet")]
#[command(about = "Offline paperless KYC credential extractor")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a KYC record from a password-protected archive
    Process {
        /// Path to the credential archive (.zip)
        archive: PathBuf,
        /// Share code protecting the archive; may be empty
        #[arg(long, default_value = "")]
        password: String,
    },
    /// Validate the 12-digit identifier against the loaded record
    Validate {
        /// The full identifier, digits only
        number: String,
    },
    /// Print the currently stored record
    Show {
        /// Emit the record as JSON instead of the text summary
        #[arg(long)]
        json: bool,
    },
    /// Clear the stored record
    Reset,
}

fn main() -> anyhow::Result<()> {
    logging::init_logging();
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    let mut session = KycSession::open(&config).context("failed to open the record store")?;

    match cli.command {
        Commands::Process { archive, password } => {
            let bytes = std::fs::read(&archive)
                .with_context(|| format!("failed to read '{}'", archive.display()))?;
            match session.process_archive(&bytes, &password) {
                Ok(record) => {
                    println!("✅ Extracted record for {}", record.name);
                    println!("   Reference: {}", record.masked_identifier());
                    println!(
                        "   Portrait: {}",
                        if record.portrait_bytes().is_some() {
                            "present"
                        } else {
                            "absent or corrupted"
                        }
                    );
                    println!("   Run `kyc_wallet validate <number>` to bind your identifier.");
                }
                Err(e) => {
                    error!("pipeline failed: {}", e);
                    println!("⚠️  {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Validate { number } => match session.validate_identifier(&number) {
            Ok(()) => {
                println!("✅ Identifier accepted: {}", session.record().formatted_identifier());
            }
            Err(e) => {
                println!("⚠️  {e}");
                std::process::exit(1);
            }
        },
        Commands::Show { json } => {
            let record = session.record();
            if json {
                println!("{}", serde_json::to_string_pretty(record)?);
            } else if record.reference_id.is_empty() {
                println!("No record loaded. Run `kyc_wallet process <archive>` first.");
            } else {
                let address = &record.address;
                println!("Identifier: {}", if record.identifier_number.is_empty() {
                    record.masked_identifier()
                } else {
                    record.formatted_identifier()
                });
                println!("Name:   {}", record.name);
                println!("Gender: {}", record.gender);
                println!("DOB:    {}", record.dob);
                println!("Address:");
                println!("  {}, {}, {}", address.care_of, address.house, address.street);
                println!("  {}, {}", address.landmark, address.locality);
                println!("  {}, {}, {}", address.district, address.state, address.country);
                println!("  Pincode: {}", address.pincode);
                println!(
                    "Portrait: {}",
                    if record.portrait_bytes().is_some() {
                        "present"
                    } else {
                        "absent or corrupted"
                    }
                );
            }
        }
        Commands::Reset => {
            session.reset()?;
            println!("Stored record cleared.");
        }
    }

    Ok(())
}
