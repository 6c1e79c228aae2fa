pub mod order_models;
pub mod raw_table;
pub mod sales_record;
pub mod schema;

pub use order_models::*;
pub use raw_table::*;
pub use sales_record::*;
pub use schema::*;
