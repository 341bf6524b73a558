pub mod health;
pub mod hooks;
