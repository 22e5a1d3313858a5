// Domain layer: rate tables, calculation models and ports. No I/O here.

pub mod labels;
pub mod model;
pub mod outcome;
pub mod ports;
pub mod rates;
pub mod report;
