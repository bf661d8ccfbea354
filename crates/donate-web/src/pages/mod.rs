//! Page Components

mod donate;

pub use donate::DonatePage;
