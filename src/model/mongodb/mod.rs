mod collection;
mod counter;

pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use counter::{tally_run_counter_id, Counter};
