mod company;
mod price_bar;
mod screening;

pub use company::{CompanyProfile, NewsItem};
pub use price_bar::{PriceBar, PriceSeries};
pub use screening::{CellValue, ScreeningRow, ScreeningTable};
