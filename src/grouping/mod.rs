// Semantic grouping of functions into categories
//
// Function → category packs are configuration, not code: the default pack for
// ML-KEM and ML-DSA is embedded from groupings-default.toml, and users can
// supply their own TOML file with the same layout.

mod breakdown;
mod registry;

pub use breakdown::{sort_by_total_desc, CategoryShare, CategoryTotal, GroupBreakdown};
pub use registry::{CategoryDefinition, CategoryMap, GroupingRegistry, SchemeDefinition};
