mod desc;
mod results;

pub use desc::ElectionDescription;
pub use results::ElectionResults;
