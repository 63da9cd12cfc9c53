//! Sign an access or refresh token for a user id.
//!
//! Bastion does not issue credentials itself; this is for operators and
//! local testing against the same secret the server verifies with.

use anyhow::{Context, Result};
use bastion_common_core::UserId;
use bastion_server::middleware::auth::{encode_token, Claims};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "bastion-mint-token", version, about = "Sign a Bastion token")]
struct Cli {
    /// Subject user id (`usr_<uuid>` or a bare UUID).
    #[arg(short, long)]
    user: String,

    /// Token lifetime in seconds.
    #[arg(short, long, default_value_t = 3600)]
    expires_in: i64,

    /// Sign a refresh token instead of an access token.
    #[arg(long)]
    refresh: bool,

    /// HMAC secret; must match the server's `auth.jwt_secret`.
    #[arg(long, env = "BASTION_AUTH__JWT_SECRET", hide_env_values = true)]
    secret: String,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let user_id = UserId::parse(&cli.user).context("invalid user id")?;
    if cli.secret.len() < 32 {
        anyhow::bail!("secret must be at least 32 characters");
    }

    let claims = if cli.refresh {
        Claims::new_refresh(user_id, cli.expires_in)
    } else {
        Claims::new_access(user_id, cli.expires_in)
    };
    let token = encode_token(&claims, &cli.secret).context("failed to sign token")?;
    println!("{token}");
    Ok(())
}
