#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgis")]
pub mod postgis;
