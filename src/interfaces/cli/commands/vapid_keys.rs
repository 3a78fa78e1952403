//! Generate VAPID keys command

use colored::Colorize;

use crate::services::notifier::generate_vapid_keys;

/// Print a fresh P-256 key pair as `.env` lines
pub fn generate_vapid_key_pair() {
    let keys = generate_vapid_keys();

    println!("{}", "Generated VAPID key pair".bold().green());
    println!(
        "{}",
        "Add these lines to your .env file (keep the private key secret):".yellow()
    );
    println!();
    println!("VAPID_PUBLIC_KEY={}", keys.public_key);
    println!("VAPID_PRIVATE_KEY={}", keys.private_key);
    println!();
    println!(
        "  {} {}",
        "The frontend subscribes with the public key from".dimmed(),
        "GET /vapid-public-key".blue()
    );
}
