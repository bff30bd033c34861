pub mod health;
pub mod query;
pub mod tickets;
pub mod voice;

#[cfg(test)]
pub mod testing;
