pub mod canonical;
pub mod label_clustering;

pub use canonical::{
    build_correction_map, construct_projects_table, generate_correction_map, CanonicalRule,
    CorrectionMap,
};
pub use label_clustering::{extract_clusters, Cluster, ClusterExtractor};
