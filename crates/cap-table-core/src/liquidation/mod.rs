pub mod conversion;
pub mod dividends;
pub mod share_class;
pub mod validation;
pub mod waterfall;
