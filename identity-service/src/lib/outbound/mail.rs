pub mod memory;
pub mod smtp;

pub use memory::MailCollector;
pub use smtp::SmtpMailer;
