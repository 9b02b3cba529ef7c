//! Prints an Argon2id digest for a tenant secret read from stdin, ready to
//! paste under a `[tenant-id]` section of the credentials file.

use std::io::{self, Write};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};

fn main() -> anyhow::Result<()> {
    eprint!("Enter tenant secret: ");
    io::stderr().flush()?;

    let mut secret = String::new();
    io::stdin().read_line(&mut secret)?;
    let secret = secret.trim();

    if secret.is_empty() {
        anyhow::bail!("Secret cannot be empty");
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash secret: {e}"))?;

    println!("{hash}");
    Ok(())
}
