//! Interactive creation of an initial administrator account.
//!
//! Usage:
//!   cargo run -p catalog-api --bin create-admin
//!
//! Reads DATABASE_URL from the environment (or .env via dotenvy), prompts
//! for the account details, and inserts the user with the ADMIN and USER
//! roles. The password is hashed with Argon2id before it touches the wire.

use std::io::{self, Write};
use std::path::Path;

use diesel::pg::PgConnection;
use diesel::prelude::*;

use catalog_api::db::schema::{user_roles, users};
use catalog_api::models::user::{NewUser, ADMIN_ROLE, USER_ROLE};

fn prompt(label: &str) -> String {
    print!("{}: ", label);
    io::stdout().flush().unwrap();
    let mut input = String::new();
    io::stdin().read_line(&mut input).unwrap();
    input.trim().to_string()
}

fn optional(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn hash_password(password: &str) -> String {
    use argon2::Argon2;
    use password_hash::rand_core::OsRng;
    use password_hash::{PasswordHasher, SaltString};

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("argon2 hash")
        .to_string()
}

fn main() {
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    println!("=== Catalog admin setup ===\n");

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL env var is required");
    let mut conn = PgConnection::establish(&database_url).expect("failed to connect to database");

    let username = prompt("Username");
    if username.is_empty() {
        eprintln!("A username is required.");
        std::process::exit(1);
    }

    let first_name = optional(prompt("First name (optional)"));
    let last_name = optional(prompt("Last name (optional)"));
    let email = optional(prompt("Email (optional)"));

    let password = rpassword::prompt_password("Password: ").expect("failed to read password");
    if password.is_empty() {
        eprintln!("A password is required.");
        std::process::exit(1);
    }

    let new_user = NewUser {
        id: storefront_common::id::prefixed_ulid(storefront_common::id::prefix::USER),
        username: username.clone(),
        password_hash: hash_password(&password),
        first_name,
        last_name,
        email,
    };

    diesel::insert_into(users::table)
        .values(&new_user)
        .execute(&mut conn)
        .expect("failed to insert user");

    diesel::insert_into(user_roles::table)
        .values(&vec![
            (
                user_roles::user_id.eq(&new_user.id),
                user_roles::role.eq(ADMIN_ROLE),
            ),
            (
                user_roles::user_id.eq(&new_user.id),
                user_roles::role.eq(USER_ROLE),
            ),
        ])
        .execute(&mut conn)
        .expect("failed to assign roles");

    println!("\nCreated administrator '{}' ({}).", username, new_user.id);
}
