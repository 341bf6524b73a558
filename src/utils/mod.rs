pub mod disposition;
