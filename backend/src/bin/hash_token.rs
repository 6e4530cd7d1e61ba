//! Print an identity registry entry for a bearer token.
//!
//! ```text
//! hash-token --user-id 7 --role technician "$TOKEN"
//! ```

use std::io::Write;

use clap::Parser;
use color_eyre::eyre::Result;
use repair_desk::domain::{Role, UserId};
use repair_desk::outbound::identity::{IdentityEntry, digest_token};

#[derive(Debug, Parser)]
#[command(about = "Digest a bearer token for the repair desk identity file")]
struct Args {
    /// User the token authenticates.
    #[arg(long)]
    user_id: i64,
    /// Role granted to the user; repeat for several.
    #[arg(long = "role", required = true)]
    roles: Vec<Role>,
    /// Plain token; only its SHA-256 digest is printed.
    token: String,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let entry = IdentityEntry {
        token_sha256: digest_token(&args.token),
        user_id: UserId::try_new(args.user_id)?,
        roles: args.roles,
    };
    writeln!(
        std::io::stdout().lock(),
        "{}",
        serde_json::to_string_pretty(&entry)?
    )?;
    Ok(())
}
