//! ### Sending Messages
//!
//! Messages built with [`Message`](crate::Message) are submitted over an
//! authenticated [`SmtpSession`](smtp::SmtpSession). It is the only
//! transport: the session is opened once, sends any number of messages
//! and is closed with [`quit`](smtp::SmtpSession::quit) or when dropped.

pub mod smtp;
