pub mod loaders;
pub mod outcome;
pub mod work_item;

pub use loaders::load_work_items;
pub use outcome::{AttemptOutcome, AttemptStatus};
pub use work_item::WorkItem;
