pub mod util;

pub use util::{load_catalog, parse_seeds, split_csv};
