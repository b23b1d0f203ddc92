mod health;
mod query;

pub use health::health;
pub use query::query;
