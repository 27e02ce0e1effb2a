mod macro_profile;
mod meal;

pub use macro_profile::MacroProfile;
pub use meal::{sort_newest_first, upsert_sorted, MealAnalysis, MealRecord};
