//! Sends one message with the account described by the `SMTP_*` variables.
//!
//! ```sh
//! SMTP_EMAIL=me@outlook.com SMTP_ACCESS_TOKEN=... \
//!     cargo run --example xoauth2_send -- someone@example.com
//! ```

use smtp_xoauth2::{config::Config, Address, Message};

fn main() {
    tracing_subscriber::fmt::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    let to: Address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.email.clone())
        .parse()
        .unwrap();

    let mut email = Message::new();
    email
        .from(&config.email.parse().unwrap())
        .to(vec![to])
        .subject("Hello from smtp-xoauth2")
        .body("text/plain", "Hello ß☺ example");
    email.attach_with_type(b"Hello world!".to_vec(), "hello.txt", "text/plain");

    let mut session = config
        .session_builder()
        .connect(config.credentials())
        .unwrap();

    // Send the email
    match session.send(&email) {
        Ok(_) => println!("Email sent"),
        Err(e) => println!("Could not send email: {e:?}"),
    }

    if let Err(e) = session.quit() {
        println!("Could not close the session: {e}");
    }
}
