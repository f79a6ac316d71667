use std::{error::Error, io, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;

use budget_ledger::{
    Email, PasswordHash, Role, ValidatedPassword, create_user, get_user_by_email, initialize_db,
    set_user_role,
};

/// A utility for creating an administrator account, or promoting an existing
/// user to administrator.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// Email address of the administrator.
    #[arg(long)]
    email: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let db_path = Path::new(&args.db_path);
    validate_db_path(db_path);

    let email = match Email::new(&args.email) {
        Ok(email) => email,
        Err(error) => {
            print_error(error);
            exit(1);
        }
    };

    let connection = Connection::open(db_path)?;
    initialize_db(&connection)?;

    match get_user_by_email(&email, &connection) {
        Ok(user) if user.is_admin() => {
            println!("{email} is already an administrator.");
        }
        Ok(user) => {
            set_user_role(user.id, Role::Admin, &connection)?;
            println!("Promoted {email} to administrator.");
        }
        Err(budget_ledger::Error::NotFound) => {
            println!("Creating administrator {email}");

            let Some(password_hash) = get_new_password_hash(&email) else {
                return Ok(());
            };

            let user = create_user(&email, &password_hash, Role::Admin, &connection)?;
            println!("Created administrator {} with ID {}.", user.email, user.id);
        }
        Err(error) => return Err(error.into()),
    }

    Ok(())
}

fn validate_db_path(db_path: &Path) {
    match db_path.extension() {
        Some(extension) if !extension.is_empty() => {}
        _ => {
            print_error("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
    }
}

fn prompt(message: &str) -> Option<String> {
    match rpassword::prompt_password(message) {
        Ok(string) => Some(string),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => None,
        Err(error) => {
            print_error(format!("Could not read password from stdin: {error}"));
            None
        }
    }
}

fn get_new_password_hash(email: &Email) -> Option<PasswordHash> {
    loop {
        println!();

        let first_password = prompt("Enter a password: ")?;

        let password = match ValidatedPassword::new(&first_password, &[email.as_ref()]) {
            Ok(password) => password,
            Err(error) => {
                print_error(error);
                continue;
            }
        };

        let second_password = prompt("Enter the same password again: ")?;

        if first_password != second_password {
            print_error("Passwords must match, try again.");
            continue;
        }

        match PasswordHash::new(password, PasswordHash::DEFAULT_COST) {
            Ok(password_hash) => return Some(password_hash),
            Err(error) => {
                print_error(format!("Could not hash password: {error}. Try again."));
            }
        }
    }
}

fn print_error(error: impl ToString) {
    eprintln!(
        "\x1b[31;1m{}\x1b[0m",
        capitalise_first_char(&error.to_string())
    )
}

fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    first.to_uppercase().chain(chars).collect()
}
