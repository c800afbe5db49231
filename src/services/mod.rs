pub mod chart;
pub mod table_loader;
pub mod vci;

pub use chart::ChartService;
pub use table_loader::{load_companies, load_predictions};
pub use vci::{VciClient, VciError};
