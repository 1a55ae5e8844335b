pub mod count_optimized;
pub mod metadata_scan;
pub mod paging_scan;
pub mod prefetch;
pub mod remote_scan;

pub use count_optimized::CountOptimized;
pub use metadata_scan::{MetadataScan, MetadataTable};
pub use paging_scan::PagingScan;
pub use prefetch::Prefetch;
pub use remote_scan::RemoteScan;
